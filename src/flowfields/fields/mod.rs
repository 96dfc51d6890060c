//! The kinds of fields used by the algorithm.
//!
//! Both fields are sized to match an [OccupancyGrid] and use the same
//! row-major layout, index `row * width + column`
//!

pub mod direction_field;
pub mod distance_field;

use crate::prelude::*;

/// Defines required read access to field arrays
pub trait Field<T: Copy> {
	/// Number of `(columns, rows)` in the field
	fn get_dimensions(&self) -> (usize, usize);
	/// Get a reference to the row-major field array
	fn get(&self) -> &[T];
	/// Position of a cell within [Field::get], [None] when out of bounds
	fn get_array_index(&self, field_cell: GridCell) -> Option<usize> {
		let (width, height) = self.get_dimensions();
		if field_cell.get_column() < width && field_cell.get_row() < height {
			Some(field_cell.get_row() * width + field_cell.get_column())
		} else {
			None
		}
	}
	/// Retrieve a field cell value, [None] when out of bounds
	fn get_field_cell_value(&self, field_cell: GridCell) -> Option<T> {
		self.get_array_index(field_cell).map(|i| self.get()[i])
	}
}

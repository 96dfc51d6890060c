//! The [OccupancyGrid] describes which cells of the map exist and which of
//! them are blocked. It is built once from an [occupancy_source::OccupancySource]
//! and never mutated afterwards, the fields derived from it assume the grid
//! is static for their lifetime.
//!
//! A cell is only part of the map when a ground tile sits at its index. A
//! ground tile with an obstacle on top of it is still part of the map but it
//! is marked blocked. Indices without ground are treated as blocked forever:
//!
//! ```text
//!  ground        obstacles     grid
//!  _________     _________     _________
//! |g|g|g|g| |   | | | | | |   |.|.|.|.|~|
//! |g|g|g|g|g|   | |o|o| | |   |.|x|x|.|.|
//! |g|g|g|g|g|   | | | | | |   |.|.|.|.|.|
//! ```
//!
//! Where `.` is free, `x` is blocked by an obstacle and `~` is empty
//!

pub mod occupancy_source;

use crate::prelude::*;
use bevy::prelude::*;

/// ID of a cell within the grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct GridCell((usize, usize));

impl GridCell {
	/// Create a new instance of [GridCell]
	pub fn new(column: usize, row: usize) -> Self {
		GridCell((column, row))
	}
	/// Get the cell `(column, row)` tuple
	pub fn get_column_row(&self) -> (usize, usize) {
		self.0
	}
	/// Get the cell column
	pub fn get_column(&self) -> usize {
		self.0 .0
	}
	/// Get the cell row
	pub fn get_row(&self) -> usize {
		self.0 .1
	}
	/// Signed `(column, row)`, handy when stepping with an [Ordinal] offset
	pub fn as_signed(&self) -> (i32, i32) {
		(self.get_column() as i32, self.get_row() as i32)
	}
	/// Position of the cell centre in grid space where each cell is `1x1`
	pub fn get_centre(&self) -> Vec2 {
		Vec2::new(
			self.get_column() as f32 + 0.5,
			self.get_row() as f32 + 0.5,
		)
	}
}

/// What occupies a cell of the grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Reflect)]
pub enum Occupancy {
	/// No ground tile, never part of the map
	#[default]
	Empty,
	/// Ground that actors can walk over
	Traversable,
	/// Ground with an obstacle sat on it
	Blocked,
}

/// Conversion between world space and grid indices.
///
/// `origin` is the world position of the bottom-left corner of cell `(0, 0)`
/// and each cell is a square of `cell_size` world units
#[derive(Clone, Copy, PartialEq, Debug, Reflect)]
pub struct GridMapping {
	/// World position of the bottom-left corner of the grid
	origin: Vec2,
	/// Length of a cell side in world units
	cell_size: f32,
}

impl Default for GridMapping {
	fn default() -> Self {
		GridMapping {
			origin: Vec2::ZERO,
			cell_size: 1.0,
		}
	}
}

impl GridMapping {
	/// Create a new instance of [GridMapping]. Panics if `cell_size` is not a positive finite number or `origin` is not finite
	pub fn new(origin: Vec2, cell_size: f32) -> Self {
		if !cell_size.is_finite() || cell_size <= 0.0 {
			panic!("GridMapping cell size must be positive and finite, found {}", cell_size);
		}
		if !origin.is_finite() {
			panic!("GridMapping origin must be finite, found {:?}", origin);
		}
		GridMapping { origin, cell_size }
	}
	/// World position of the bottom-left corner of the grid
	pub fn get_origin(&self) -> Vec2 {
		self.origin
	}
	/// Length of a cell side in world units
	pub fn get_cell_size(&self) -> f32 {
		self.cell_size
	}
	/// The signed `(column, row)` a world position falls into, this may lie
	/// outside of a grid. [None] for a position that is NaN or infinite
	pub fn world_to_index(&self, position: Vec2) -> Option<(i32, i32)> {
		let local = (position - self.origin) / self.cell_size;
		if !local.is_finite() {
			return None;
		}
		// casts saturate, anything beyond i32 stays out of bounds
		Some((local.x.floor() as i32, local.y.floor() as i32))
	}
	/// World position of the centre of a cell
	pub fn index_to_world(&self, cell: GridCell) -> Vec2 {
		self.origin + cell.get_centre() * self.cell_size
	}
}

/// Fixed size `width x height` description of the map
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
	/// Number of `(columns, rows)`
	size: (usize, usize),
	/// Row-major cell contents
	cells: Vec<Occupancy>,
	/// World to cell conversion used at build and query time
	mapping: GridMapping,
	/// Which neighbours are adjacent to a cell
	neighbourhood: Neighbourhood,
}

impl OccupancyGrid {
	/// Create a new instance of [OccupancyGrid] where every cell is [Occupancy::Traversable]
	pub fn new(width: usize, height: usize, mapping: GridMapping) -> Self {
		OccupancyGrid {
			size: (width, height),
			cells: vec![Occupancy::Traversable; width * height],
			mapping,
			neighbourhood: Neighbourhood::default(),
		}
	}
	/// Build the grid by interrogating an [OccupancySource] for every index
	pub fn from_source(source: &impl OccupancySource, mapping: GridMapping) -> Self {
		let (width, height) = source.get_dimensions();
		let mut cells = Vec::with_capacity(width * height);
		for row in 0..height {
			for column in 0..width {
				let cell = GridCell::new(column, row);
				let occupancy = match (source.has_ground(cell), source.has_obstacle(cell)) {
					(false, _) => Occupancy::Empty,
					(true, false) => Occupancy::Traversable,
					(true, true) => Occupancy::Blocked,
				};
				cells.push(occupancy);
			}
		}
		let grid = OccupancyGrid {
			size: (width, height),
			cells,
			mapping,
			neighbourhood: Neighbourhood::default(),
		};
		debug!(
			"Built {}x{} occupancy grid, {} traversable cells",
			width,
			height,
			grid.count_traversable()
		);
		grid
	}
	/// Build the grid from a row-major list of cells, the first element being `(0, 0)`
	pub fn from_cells(
		width: usize,
		height: usize,
		cells: Vec<Occupancy>,
		mapping: GridMapping,
	) -> Result<Self, FlowFieldError> {
		if cells.len() != width * height {
			return Err(FlowFieldError::MalformedOccupancy(format!(
				"Expected {} cells for a {}x{} grid, found {}",
				width * height,
				width,
				height,
				cells.len()
			)));
		}
		Ok(OccupancyGrid {
			size: (width, height),
			cells,
			mapping,
			neighbourhood: Neighbourhood::default(),
		})
	}
	/// Mark cells as blocked by obstacles, any cell outside of the grid is ignored
	pub fn with_obstacles(mut self, obstacles: &[GridCell]) -> Self {
		for obstacle in obstacles.iter() {
			if let Some(i) = self.get_array_index(*obstacle) {
				self.cells[i] = Occupancy::Blocked;
			}
		}
		self
	}
	/// Change the [Neighbourhood] used when flooding and deriving directions
	pub fn with_neighbourhood(mut self, neighbourhood: Neighbourhood) -> Self {
		self.neighbourhood = neighbourhood;
		self
	}
	/// Number of columns
	pub fn get_width(&self) -> usize {
		self.size.0
	}
	/// Number of rows
	pub fn get_height(&self) -> usize {
		self.size.1
	}
	/// Number of `(columns, rows)`
	pub fn get_dimensions(&self) -> (usize, usize) {
		self.size
	}
	/// Total number of cells, blocked or otherwise
	pub fn len(&self) -> usize {
		self.cells.len()
	}
	/// A grid with zero columns or rows
	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}
	/// World to cell conversion of the grid
	pub fn get_mapping(&self) -> &GridMapping {
		&self.mapping
	}
	/// Which neighbours are adjacent to a cell
	pub fn get_neighbourhood(&self) -> Neighbourhood {
		self.neighbourhood
	}
	/// Is the cell within `[0, width) x [0, height)`
	pub fn in_bounds(&self, cell: GridCell) -> bool {
		cell.get_column() < self.size.0 && cell.get_row() < self.size.1
	}
	/// Signed variant of [OccupancyGrid::in_bounds]
	pub fn in_bounds_signed(&self, column: i32, row: i32) -> bool {
		column >= 0 && row >= 0 && (column as usize) < self.size.0 && (row as usize) < self.size.1
	}
	/// Position of a cell in the backing arrays of the grid and its fields
	pub fn get_array_index(&self, cell: GridCell) -> Option<usize> {
		if self.in_bounds(cell) {
			Some(cell.get_row() * self.size.0 + cell.get_column())
		} else {
			None
		}
	}
	/// The contents of a cell, [None] when out of bounds
	pub fn get_occupancy(&self, cell: GridCell) -> Option<Occupancy> {
		self.get_array_index(cell).map(|i| self.cells[i])
	}
	/// A cell is blocked when it's out of bounds, has no ground or has an obstacle
	pub fn is_blocked(&self, cell: GridCell) -> bool {
		!matches!(self.get_occupancy(cell), Some(Occupancy::Traversable))
	}
	/// Number of cells that can be walked over
	pub fn count_traversable(&self) -> usize {
		self.cells
			.iter()
			.filter(|c| **c == Occupancy::Traversable)
			.count()
	}
	/// Step from a cell in the direction of an [Ordinal]. Returns [None] if that leaves the grid
	pub fn get_neighbour(&self, cell: GridCell, ordinal: Ordinal) -> Option<GridCell> {
		let (column, row) = cell.as_signed();
		let (dx, dy) = ordinal.get_offset();
		let (n_column, n_row) = (column + dx, row + dy);
		if self.in_bounds_signed(n_column, n_row) {
			Some(GridCell::new(n_column as usize, n_row as usize))
		} else {
			None
		}
	}
	/// Check that a cell can act as the goal of a field
	pub fn validate_goal(&self, goal: GridCell) -> Result<(), FlowFieldError> {
		if self.is_blocked(goal) {
			Err(FlowFieldError::InvalidGoal(goal))
		} else {
			Ok(())
		}
	}
	/// Find the cell a world position lies in. Positions outside of the grid are an error, they are never clamped
	pub fn get_cell_from_world(&self, position: Vec2) -> Result<GridCell, FlowFieldError> {
		// a non-finite position is reported against the furthest possible index
		let (column, row) = self
			.mapping
			.world_to_index(position)
			.unwrap_or((i32::MIN, i32::MIN));
		if self.in_bounds_signed(column, row) {
			Ok(GridCell::new(column as usize, row as usize))
		} else {
			Err(FlowFieldError::OutOfBounds {
				x: position.x,
				y: position.y,
				column,
				row,
				width: self.size.0,
				height: self.size.1,
			})
		}
	}
	/// World position of the centre of a cell
	pub fn get_world_from_cell(&self, cell: GridCell) -> Vec2 {
		self.mapping.index_to_world(cell)
	}
	/// Iterate over every cell index in row-major order
	pub fn iter_cells(&self) -> impl Iterator<Item = GridCell> + '_ {
		(0..self.size.1)
			.flat_map(move |row| (0..self.size.0).map(move |column| GridCell::new(column, row)))
	}
}

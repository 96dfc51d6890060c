//! Errors produced when building or querying the fields
//!

use thiserror::Error;

use crate::prelude::*;

/// Failures surfaced to the caller, a goal that cannot be pathed to is not
/// one of them, see [crate::service::FlowFieldService::is_field_valid]
#[derive(Error, Debug)]
pub enum FlowFieldError {
	/// A world position maps to a cell outside of the grid. A NaN or infinite
	/// position is reported with `column` and `row` of [i32::MIN]
	#[error("Position ({x}, {y}) maps to cell ({column}, {row}) which is outside of the {width}x{height} grid")]
	OutOfBounds {
		/// World `x` that was queried
		x: f32,
		/// World `y` that was queried
		y: f32,
		/// Column the position mapped to
		column: i32,
		/// Row the position mapped to
		row: i32,
		/// Number of columns in the grid
		width: usize,
		/// Number of rows in the grid
		height: usize,
	},
	/// A goal cell is out of bounds or blocked
	#[error("Goal cell {0:?} is outside of the grid or blocked")]
	InvalidGoal(GridCell),
	/// Reading occupancy or settings from disk failed
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// A `ron` file could not be deserialized
	#[cfg(feature = "ron")]
	#[error("Failed deserializing ron: {0}")]
	Ron(#[from] ron::error::SpannedError),
	/// A `csv` file could not be read
	#[cfg(feature = "csv")]
	#[error("Failed reading csv: {0}")]
	Csv(#[from] csv::Error),
	/// Occupancy data was readable but does not describe a valid grid
	#[error("Malformed occupancy data: {0}")]
	MalformedOccupancy(String),
}

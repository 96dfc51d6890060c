//! The DistanceField contains a 2D array of signed values, each being the
//! number of hops an actor needs to take from a cell to reach the goal.
//!
//! When a new goal is set the field is reset to `-1` (unvisited) and the goal
//! cell is set to `0`. The goal is pushed onto a first-in-first-out queue
//! and cells are popped one at a time, each unvisited and unblocked neighbour
//! of a popped cell is given the popped cell's distance plus one and joins
//! the back of the queue. With the default 8-connected neighbourhood this
//! produces square rings expanding from the goal (`x` being blocked):
//!
//! ```text
//!  _______________________________
//! |     |     |     |     |     |
//! |  4  |  4  |  4  |  5  |  6  |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  3  |  3  |  x  |  5  |  6  |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  2  |  2  |  x  |  6  |  6  |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  1  |  1  |  x  |  7  |  7  |
//! |_____|_____|_____|_____|_____|
//! |     |     |     |     |     |
//! |  0  |  1  |  x  |  8  |  8  |
//! |_____|_____|_____|_____|_____|
//! ```
//!
//! Cells that cannot be reached from the goal stay at `-1`.
//!
//! A rebuild normally runs to completion in one call. [FloodFill] offers
//! the same propagation one pop at a time so that it can be spread over
//! several ticks, it floods into its own field which only replaces a live
//! field once complete.
//!

use std::{collections::VecDeque, fmt};

use crate::prelude::*;
use bevy::prelude::*;

/// Distance of a cell the flood fill has not reached
pub const UNVISITED: i32 = -1;

/// Hop count from each cell of the grid to the goal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistanceField {
	/// Number of `(columns, rows)`
	size: (usize, usize),
	/// Row-major hop counts
	distances: Vec<i32>,
	/// The goal the field was flooded from, [None] when degenerate
	goal: Option<GridCell>,
}

impl Field<i32> for DistanceField {
	fn get_dimensions(&self) -> (usize, usize) {
		self.size
	}
	fn get(&self) -> &[i32] {
		&self.distances
	}
}

impl DistanceField {
	/// Creates a new degenerate [DistanceField] where all cells are [UNVISITED]
	pub fn new(width: usize, height: usize) -> Self {
		DistanceField {
			size: (width, height),
			distances: vec![UNVISITED; width * height],
			goal: None,
		}
	}
	/// Creates a new degenerate [DistanceField] matching the dimensions of a grid
	pub fn sized_for(grid: &OccupancyGrid) -> Self {
		DistanceField::new(grid.get_width(), grid.get_height())
	}
	/// The goal of the last successful rebuild
	pub fn get_goal(&self) -> Option<GridCell> {
		self.goal
	}
	/// A field is valid when it was flooded from a usable goal
	pub fn is_valid(&self) -> bool {
		self.goal.is_some()
	}
	/// Has the flood fill reached the cell
	pub fn is_reachable(&self, cell: GridCell) -> bool {
		self.get_field_cell_value(cell)
			.is_some_and(|distance| distance != UNVISITED)
	}
	/// Set every cell back to [UNVISITED] and forget the goal
	pub fn reset(&mut self) {
		self.distances.fill(UNVISITED);
		self.goal = None;
	}
	/// Flood the field outward from `goal`.
	///
	/// An out of bounds or blocked `goal` leaves every cell [UNVISITED] and
	/// the reason is returned, the field is still in a defined (degenerate)
	/// state
	pub fn rebuild(&mut self, grid: &OccupancyGrid, goal: GridCell) -> Result<(), FlowFieldError> {
		if self.size != grid.get_dimensions() {
			*self = DistanceField::sized_for(grid);
		}
		self.reset();
		let mut queue = VecDeque::new();
		seed(self, &mut queue, grid, goal)?;
		let mut pops = 0;
		while let Some(cell) = queue.pop_front() {
			expand(self, &mut queue, grid, cell);
			pops += 1;
		}
		debug!("Flooded distance field from {:?} in {} pops", goal, pops);
		trace!("Distance field:\n{}", self);
		Ok(())
	}
	/// Position of a cell in the backing array, the field and the grid it was built from share a layout
	fn index_of(&self, cell: GridCell) -> Option<usize> {
		self.get_array_index(cell)
	}
}

/// Prepare an already reset field and queue for flooding from `goal`
fn seed(
	field: &mut DistanceField,
	queue: &mut VecDeque<GridCell>,
	grid: &OccupancyGrid,
	goal: GridCell,
) -> Result<(), FlowFieldError> {
	grid.validate_goal(goal)?;
	if let Some(i) = field.index_of(goal) {
		field.distances[i] = 0;
		field.goal = Some(goal);
		queue.push_back(goal);
	}
	Ok(())
}

/// Pop handler of the flood fill, assign distances to the neighbours of `cell`
fn expand(
	field: &mut DistanceField,
	queue: &mut VecDeque<GridCell>,
	grid: &OccupancyGrid,
	cell: GridCell,
) {
	// a blocked cell never propagates
	if grid.is_blocked(cell) {
		return;
	}
	let (Some(goal), Some(current_index)) = (field.goal, field.index_of(cell)) else {
		return;
	};
	let next_distance = field.distances[current_index] + 1;
	for ordinal in grid.get_neighbourhood().get_ordinals() {
		let Some(neighbour) = grid.get_neighbour(cell, *ordinal) else {
			continue;
		};
		if neighbour == goal || grid.is_blocked(neighbour) {
			continue;
		}
		let Some(i) = field.index_of(neighbour) else {
			continue;
		};
		let distance = field.distances[i];
		// the second arm can only trigger if edges stop being uniform cost
		if distance == UNVISITED || distance > next_distance {
			field.distances[i] = next_distance;
			queue.push_back(neighbour);
		}
	}
}

impl fmt::Display for DistanceField {
	/// Renders the field with the highest row at the top
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (width, height) = self.size;
		for row in (0..height).rev() {
			for column in 0..width {
				write!(f, "{:>4}", self.distances[row * width + column])?;
			}
			writeln!(f)?;
		}
		Ok(())
	}
}

/// A resumable flood fill, one call to [FloodFill::step] pops and expands a
/// single cell. The field being built is private to the fill until
/// [FloodFill::into_field] hands it over
#[derive(Clone, Debug)]
pub struct FloodFill {
	/// Shadow field receiving distances
	field: DistanceField,
	/// Cells waiting to be expanded
	queue: VecDeque<GridCell>,
	/// Number of cells popped so far
	pops: usize,
}

impl FloodFill {
	/// Create a new instance of [FloodFill] seeded at `goal`. An invalid goal produces a fill that is already complete with a degenerate field
	pub fn new(grid: &OccupancyGrid, goal: GridCell) -> Self {
		let mut field = DistanceField::sized_for(grid);
		let mut queue = VecDeque::new();
		if let Err(e) = seed(&mut field, &mut queue, grid, goal) {
			debug!("Flood fill will be degenerate: {}", e);
		}
		FloodFill {
			field,
			queue,
			pops: 0,
		}
	}
	/// Pop and expand the next cell, returns the cell or [None] when the fill is complete
	pub fn step(&mut self, grid: &OccupancyGrid) -> Option<GridCell> {
		let cell = self.queue.pop_front()?;
		expand(&mut self.field, &mut self.queue, grid, cell);
		self.pops += 1;
		Some(cell)
	}
	/// Run the fill until it completes or `max_pops` cells have been expanded. Returns `true` once the fill is complete
	pub fn advance(&mut self, grid: &OccupancyGrid, max_pops: usize) -> bool {
		for _ in 0..max_pops {
			if self.step(grid).is_none() {
				break;
			}
		}
		self.is_complete()
	}
	/// The queue has drained and the field is final
	pub fn is_complete(&self) -> bool {
		self.queue.is_empty()
	}
	/// Number of cells expanded so far
	pub fn get_pops(&self) -> usize {
		self.pops
	}
	/// The goal the fill was seeded from, [None] if it was invalid
	pub fn get_goal(&self) -> Option<GridCell> {
		self.field.get_goal()
	}
	/// Peek at the partially flooded field, for visualising progress
	pub fn get_field(&self) -> &DistanceField {
		&self.field
	}
	/// Iterate the fill, each item being a popped cell
	pub fn iter<'a>(&'a mut self, grid: &'a OccupancyGrid) -> FloodFillSteps<'a> {
		FloodFillSteps { fill: self, grid }
	}
	/// Take the flooded field
	pub fn into_field(self) -> DistanceField {
		self.field
	}
}

/// Iterator over the pops of a [FloodFill]
pub struct FloodFillSteps<'a> {
	/// Fill being driven
	fill: &'a mut FloodFill,
	/// Grid the fill is flooding
	grid: &'a OccupancyGrid,
}

impl Iterator for FloodFillSteps<'_> {
	type Item = GridCell;
	fn next(&mut self) -> Option<Self::Item> {
		self.fill.step(self.grid)
	}
}

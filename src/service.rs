//! The [FlowFieldService] owns an [OccupancyGrid] along with the
//! [DistanceField] and [DirectionField] derived from it for the current goal.
//!
//! Actors ask the service which way to move from a world position with
//! [FlowFieldService::query_direction]. Something else decides where the goal
//! is and tells the service, either directly through
//! [FlowFieldService::set_goal] or by sending an [EventSetGoal].
//!
//! A rebuild normally completes within the call that requested it. For large
//! grids the flood fill can instead be staged with
//! [FlowFieldService::begin_goal] and driven a slice at a time with
//! [FlowFieldService::advance], the live fields keep serving queries for
//! the previous goal until the staged build completes and they are swapped
//! out in one step.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A flood fill in progress toward a goal that has not been published yet
#[derive(Clone, Debug)]
struct StagedBuild {
	/// Goal being flooded from
	goal: GridCell,
	/// Resumable flood fill writing into a shadow field
	fill: FloodFill,
}

/// Grid, goal and fields of a single map
#[derive(Component, Clone, Debug)]
pub struct FlowFieldService {
	/// Static description of the map
	grid: OccupancyGrid,
	/// Goal the live fields were built for
	goal: Option<GridCell>,
	/// Live hop counts
	distance_field: DistanceField,
	/// Live steering directions
	direction_field: DirectionField,
	/// Whether the live fields were built from a usable goal
	is_valid: bool,
	/// Time-sliced rebuild in flight
	staged: Option<StagedBuild>,
}

impl FlowFieldService {
	/// Create a new instance of [FlowFieldService] with fields sized to the grid. No goal is set so the field starts degenerate
	pub fn new(grid: OccupancyGrid) -> Self {
		let distance_field = DistanceField::sized_for(&grid);
		let direction_field = DirectionField::sized_for(&grid);
		FlowFieldService {
			grid,
			goal: None,
			distance_field,
			direction_field,
			is_valid: false,
			staged: None,
		}
	}
	/// Set the goal and rebuild both fields before returning.
	///
	/// A goal that is out of bounds or blocked does not fail the call, the
	/// service becomes degenerate (see [FlowFieldService::is_field_valid])
	/// and a warning is logged. Any staged build is discarded
	pub fn set_goal(&mut self, goal: GridCell) {
		if self.staged.take().is_some() {
			debug!("Discarding staged build, superseded by goal {:?}", goal);
		}
		self.goal = Some(goal);
		match self.distance_field.rebuild(&self.grid, goal) {
			Ok(()) => self.is_valid = true,
			Err(e) => {
				warn!("Flow field is degenerate: {}", e);
				self.is_valid = false;
			}
		}
		self.direction_field
			.rebuild(&self.grid, &self.distance_field);
	}
	/// Set the goal to the cell containing a world position. A position outside of the grid is an error and the current fields are kept
	pub fn set_goal_from_world(&mut self, position: Vec2) -> Result<GridCell, FlowFieldError> {
		let goal = self.grid.get_cell_from_world(position)?;
		self.set_goal(goal);
		Ok(goal)
	}
	/// Start a time-sliced rebuild toward `goal`. The live fields are untouched until [FlowFieldService::advance] reports completion. Starting a new build discards any build already in flight
	pub fn begin_goal(&mut self, goal: GridCell) {
		if let Some(previous) = &self.staged {
			debug!(
				"Discarding staged build toward {:?}, superseded by goal {:?}",
				previous.goal, goal
			);
		}
		let fill = FloodFill::new(&self.grid, goal);
		self.staged = Some(StagedBuild { goal, fill });
	}
	/// Expand up to `max_pops` cells of a staged build. Once the flood fill
	/// completes the direction field is derived and both replace the live
	/// fields, returning `true`. Returns `false` while work remains or when
	/// nothing is staged
	pub fn advance(&mut self, max_pops: usize) -> bool {
		let Some(staged) = self.staged.as_mut() else {
			return false;
		};
		if !staged.fill.advance(&self.grid, max_pops) {
			return false;
		}
		let Some(staged) = self.staged.take() else {
			return false;
		};
		let pops = staged.fill.get_pops();
		let distance_field = staged.fill.into_field();
		let mut direction_field = DirectionField::sized_for(&self.grid);
		direction_field.rebuild(&self.grid, &distance_field);
		self.is_valid = distance_field.is_valid();
		if !self.is_valid {
			warn!(
				"Flow field is degenerate: {}",
				FlowFieldError::InvalidGoal(staged.goal)
			);
		}
		self.goal = Some(staged.goal);
		self.distance_field = distance_field;
		self.direction_field = direction_field;
		debug!(
			"Staged build toward {:?} published after {} pops",
			staged.goal, pops
		);
		true
	}
	/// Is a staged build in flight
	pub fn is_building(&self) -> bool {
		self.staged.is_some()
	}
	/// Goal of the staged build in flight
	pub fn get_staged_goal(&self) -> Option<GridCell> {
		self.staged.as_ref().map(|s| s.goal)
	}
	/// Direction an actor at `position` should move in. A position outside
	/// of the grid is an error, it is never clamped. Blocked cells, the goal
	/// and every cell of a degenerate field give a zero vector
	pub fn query_direction(&self, position: Vec2) -> Result<Vec2, FlowFieldError> {
		let cell = self.grid.get_cell_from_world(position)?;
		Ok(self.direction_field.get_direction(cell))
	}
	/// Direction stored for a cell, zero when out of bounds
	pub fn get_direction(&self, cell: GridCell) -> Vec2 {
		self.direction_field.get_direction(cell)
	}
	/// Has the flood fill reached the cell
	pub fn is_reachable(&self, cell: GridCell) -> bool {
		self.distance_field.is_reachable(cell)
	}
	/// Were the live fields built from a usable goal
	pub fn is_field_valid(&self) -> bool {
		self.is_valid
	}
	/// The goal of the live fields, which may be invalid
	pub fn get_goal(&self) -> Option<GridCell> {
		self.goal
	}
	/// The grid the fields are built over
	pub fn get_grid(&self) -> &OccupancyGrid {
		&self.grid
	}
	/// Live hop counts
	pub fn get_distance_field(&self) -> &DistanceField {
		&self.distance_field
	}
	/// Live steering directions
	pub fn get_direction_field(&self) -> &DirectionField {
		&self.direction_field
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// ```text
	///  _______________
	/// |__|__|x_|__|__|
	/// |__|__|x_|__|__|
	/// |__|__|x_|__|__|
	/// |__|__|x_|__|__|
	/// |__|__|__|__|__|
	/// ```
	fn walled_grid() -> OccupancyGrid {
		OccupancyGrid::new(5, 5, GridMapping::default()).with_obstacles(&[
			GridCell::new(2, 1),
			GridCell::new(2, 2),
			GridCell::new(2, 3),
			GridCell::new(2, 4),
		])
	}

	#[test]
	fn new_is_degenerate() {
		let service = FlowFieldService::new(walled_grid());
		assert!(!service.is_field_valid());
		assert_eq!(None, service.get_goal());
		assert_eq!(Vec2::ZERO, service.query_direction(Vec2::new(0.5, 0.5)).unwrap());
	}
	#[test]
	fn open_grid_scenario() {
		let mut service = FlowFieldService::new(OccupancyGrid::new(5, 5, GridMapping::default()));
		service.set_goal(GridCell::new(2, 2));
		assert!(service.is_field_valid());
		let distances = service.get_distance_field();
		assert_eq!(Some(0), distances.get_field_cell_value(GridCell::new(2, 2)));
		assert_eq!(Some(2), distances.get_field_cell_value(GridCell::new(0, 0)));
		let direction = service.query_direction(Vec2::new(0.2, 0.7)).unwrap();
		assert!(direction.x > 0.0 && direction.y > 0.0);
	}
	#[test]
	fn rebuild_is_idempotent() {
		let mut service = FlowFieldService::new(walled_grid());
		service.set_goal(GridCell::new(4, 4));
		let distances = service.get_distance_field().clone();
		let directions = service.get_direction_field().clone();
		service.set_goal(GridCell::new(4, 4));
		assert_eq!(&distances, service.get_distance_field());
		assert_eq!(&directions, service.get_direction_field());
	}
	#[test]
	fn blocked_goal_is_degenerate() {
		let mut service = FlowFieldService::new(walled_grid());
		service.set_goal(GridCell::new(0, 0));
		assert!(service.is_field_valid());
		service.set_goal(GridCell::new(2, 2));
		assert!(!service.is_field_valid());
		assert_eq!(Some(GridCell::new(2, 2)), service.get_goal());
		assert!(!service.is_reachable(GridCell::new(0, 0)));
		for x in 0..5 {
			let position = Vec2::new(x as f32 + 0.5, 0.5);
			assert_eq!(Vec2::ZERO, service.query_direction(position).unwrap());
		}
	}
	#[test]
	fn out_of_range_goal_is_degenerate() {
		let mut service = FlowFieldService::new(walled_grid());
		service.set_goal(GridCell::new(7, 1));
		assert!(!service.is_field_valid());
	}
	#[test]
	fn query_outside_grid() {
		let mut service = FlowFieldService::new(walled_grid());
		service.set_goal(GridCell::new(4, 4));
		let result = service.query_direction(Vec2::new(5.0, 1.0));
		assert!(matches!(
			result,
			Err(FlowFieldError::OutOfBounds { column: 5, row: 1, .. })
		));
		assert!(service.query_direction(Vec2::new(1.0, -0.5)).is_err());
	}
	#[test]
	fn query_nan_position() {
		let mut service = FlowFieldService::new(OccupancyGrid::new(5, 5, GridMapping::default()));
		service.set_goal(GridCell::new(4, 4));
		let result = service.query_direction(Vec2::new(f32::NAN, f32::NAN));
		assert!(matches!(result, Err(FlowFieldError::OutOfBounds { .. })));
		assert!(service.set_goal_from_world(Vec2::new(f32::NAN, 0.0)).is_err());
		assert_eq!(Some(GridCell::new(4, 4)), service.get_goal());
	}
	#[test]
	fn goal_from_world() {
		let mapping = GridMapping::new(Vec2::new(-10.0, -10.0), 4.0);
		let mut service = FlowFieldService::new(OccupancyGrid::new(5, 5, mapping));
		let goal = service.set_goal_from_world(Vec2::new(9.0, -9.0)).unwrap();
		assert_eq!(GridCell::new(4, 0), goal);
		assert_eq!(Some(goal), service.get_goal());
		assert!(service.set_goal_from_world(Vec2::new(11.0, 0.0)).is_err());
		assert_eq!(Some(goal), service.get_goal());
	}
	#[test]
	fn staged_build_publishes_on_completion() {
		let mut synchronous = FlowFieldService::new(walled_grid());
		synchronous.set_goal(GridCell::new(4, 4));

		let mut service = FlowFieldService::new(walled_grid());
		service.set_goal(GridCell::new(0, 4));
		let before = service.get_distance_field().clone();
		service.begin_goal(GridCell::new(4, 4));
		assert!(service.is_building());
		assert!(!service.advance(2));
		// live field still serves the old goal
		assert_eq!(&before, service.get_distance_field());
		assert_eq!(Some(GridCell::new(0, 4)), service.get_goal());
		while !service.advance(2) {}
		assert!(!service.is_building());
		assert_eq!(Some(GridCell::new(4, 4)), service.get_goal());
		assert_eq!(synchronous.get_distance_field(), service.get_distance_field());
		assert_eq!(synchronous.get_direction_field(), service.get_direction_field());
		assert!(service.is_field_valid());
	}
	#[test]
	fn staged_build_last_goal_wins() {
		let mut service = FlowFieldService::new(walled_grid());
		service.begin_goal(GridCell::new(0, 4));
		assert!(!service.advance(3));
		service.begin_goal(GridCell::new(4, 0));
		assert_eq!(Some(GridCell::new(4, 0)), service.get_staged_goal());
		assert!(service.advance(usize::MAX));
		assert_eq!(Some(GridCell::new(4, 0)), service.get_goal());
		assert_eq!(
			Some(0),
			service.get_distance_field().get_field_cell_value(GridCell::new(4, 0))
		);
	}
	#[test]
	fn set_goal_discards_staged_build() {
		let mut service = FlowFieldService::new(walled_grid());
		service.begin_goal(GridCell::new(0, 4));
		service.set_goal(GridCell::new(4, 0));
		assert!(!service.is_building());
		assert!(!service.advance(10));
		assert_eq!(Some(GridCell::new(4, 0)), service.get_goal());
	}
	#[test]
	fn staged_invalid_goal_publishes_degenerate_field() {
		let mut service = FlowFieldService::new(walled_grid());
		service.set_goal(GridCell::new(0, 0));
		service.begin_goal(GridCell::new(2, 3));
		assert!(service.advance(1));
		assert!(!service.is_field_valid());
		assert!(service
			.get_direction_field()
			.get()
			.iter()
			.all(|d| *d == Vec2::ZERO));
	}
}

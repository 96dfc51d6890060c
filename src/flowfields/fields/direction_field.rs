//! The DirectionField is derived from a [DistanceField] and stores a unit
//! vector in each cell pointing the way an actor should move to get closer
//! to the goal.
//!
//! Cells are split into two kinds:
//!
//! * Interior - every neighbour is inside the grid and unblocked. The
//!   direction follows the negated gradient of the distance field, the sum of
//!   each neighbour's distance multiplied by its offset from the cell,
//!   normalised
//! * Boundary - at least one neighbour is blocked or off the grid. Blending
//!   around an obstacle could steer an actor into it so instead the
//!   direction points straight at the single visited neighbour with the
//!   smallest distance
//!
//! ```text
//!  _____________________________
//! |         |         |         |
//! |    ↑    |    ↗    |    G    |
//! |_________|_________|_________|
//! |         |         |         |
//! |    ↑    |    x    |    ↑    |
//! |_________|_________|_________|
//! |         |         |         |
//! |    ↑    |    →    |    ↑    |
//! |_________|_________|_________|
//! ```
//!
//! When neither rule produces a direction (an interior gradient that
//! cancels out to zero or a boundary cell with no visited neighbour) the
//! cell falls back to pointing straight at the goal. The goal cell, blocked
//! cells and every cell of a field without a valid goal hold a zero vector.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// How the direction of a cell was decided
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Reflect)]
pub enum DirectionRule {
	/// The field has not been built from a valid goal
	#[default]
	Unset,
	/// Cell is blocked, zero vector
	Blocked,
	/// Cell is the goal, zero vector
	Goal,
	/// Normalised negated gradient
	Interior,
	/// Points at the cheapest neighbour
	Boundary,
	/// Fallback, points at the goal centre
	StraightLine,
}

/// Unit vectors steering toward the goal for each cell of the grid
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionField {
	/// Number of `(columns, rows)`
	size: (usize, usize),
	/// Row-major unit vectors, or [Vec2::ZERO]
	directions: Vec<Vec2>,
	/// Row-major record of the rule that produced each direction
	rules: Vec<DirectionRule>,
}

impl Field<Vec2> for DirectionField {
	fn get_dimensions(&self) -> (usize, usize) {
		self.size
	}
	fn get(&self) -> &[Vec2] {
		&self.directions
	}
}

impl DirectionField {
	/// Create a new instance of [DirectionField] where every direction is zero
	pub fn new(width: usize, height: usize) -> Self {
		DirectionField {
			size: (width, height),
			directions: vec![Vec2::ZERO; width * height],
			rules: vec![DirectionRule::Unset; width * height],
		}
	}
	/// Create a new zeroed [DirectionField] matching the dimensions of a grid
	pub fn sized_for(grid: &OccupancyGrid) -> Self {
		DirectionField::new(grid.get_width(), grid.get_height())
	}
	/// The rule that decided the direction of a cell, [None] when out of bounds
	pub fn get_rule(&self, cell: GridCell) -> Option<DirectionRule> {
		self.get_array_index(cell).map(|i| self.rules[i])
	}
	/// Direction of a cell, a zero vector when out of bounds
	pub fn get_direction(&self, cell: GridCell) -> Vec2 {
		self.get_field_cell_value(cell).unwrap_or(Vec2::ZERO)
	}
	/// Recompute every direction from a fully flooded distance field
	pub fn rebuild(&mut self, grid: &OccupancyGrid, distance_field: &DistanceField) {
		if self.size != grid.get_dimensions() {
			*self = DirectionField::sized_for(grid);
		}
		self.directions.fill(Vec2::ZERO);
		let Some(goal) = distance_field.get_goal() else {
			self.rules.fill(DirectionRule::Unset);
			return;
		};
		let mut fallbacks = 0;
		for (i, cell) in grid.iter_cells().enumerate() {
			let (direction, rule) = if cell == goal {
				(Vec2::ZERO, DirectionRule::Goal)
			} else if grid.is_blocked(cell) {
				(Vec2::ZERO, DirectionRule::Blocked)
			} else if is_boundary(grid, cell) {
				match cheapest_neighbour(grid, distance_field, cell) {
					Some(ordinal) => (ordinal.as_unit_vec2(), DirectionRule::Boundary),
					None => (straight_line(cell, goal), DirectionRule::StraightLine),
				}
			} else {
				match negated_gradient(grid, distance_field, cell) {
					Some(direction) => (direction, DirectionRule::Interior),
					None => (straight_line(cell, goal), DirectionRule::StraightLine),
				}
			};
			if rule == DirectionRule::StraightLine {
				fallbacks += 1;
			}
			self.directions[i] = direction;
			self.rules[i] = rule;
		}
		debug!(
			"Derived direction field toward {:?}, {} cells fell back to a straight line",
			goal, fallbacks
		);
	}
}

/// A cell is on a boundary when any neighbour is blocked or off the grid
fn is_boundary(grid: &OccupancyGrid, cell: GridCell) -> bool {
	grid.get_neighbourhood()
		.get_ordinals()
		.iter()
		.any(|ordinal| match grid.get_neighbour(cell, *ordinal) {
			Some(neighbour) => grid.is_blocked(neighbour),
			None => true,
		})
}

/// The ordinal of the visited, unblocked neighbour with the strictly
/// smallest distance. Ties keep the first in [Ordinal::ALL] order
fn cheapest_neighbour(
	grid: &OccupancyGrid,
	distance_field: &DistanceField,
	cell: GridCell,
) -> Option<Ordinal> {
	let mut best: Option<(Ordinal, i32)> = None;
	for ordinal in grid.get_neighbourhood().get_ordinals() {
		let Some(neighbour) = grid.get_neighbour(cell, *ordinal) else {
			continue;
		};
		if grid.is_blocked(neighbour) {
			continue;
		}
		let Some(distance) = distance_field.get_field_cell_value(neighbour) else {
			continue;
		};
		if distance == UNVISITED {
			continue;
		}
		match best {
			Some((_, best_distance)) if distance >= best_distance => {}
			_ => best = Some((*ordinal, distance)),
		}
	}
	best.map(|(ordinal, _)| ordinal)
}

/// Negated, normalised sum of neighbour distance times offset. [None] when
/// the sum cancels to zero
fn negated_gradient(
	grid: &OccupancyGrid,
	distance_field: &DistanceField,
	cell: GridCell,
) -> Option<Vec2> {
	// integer accumulation so a cancelling sum is exactly zero
	let mut sum = IVec2::ZERO;
	for ordinal in grid.get_neighbourhood().get_ordinals() {
		let Some(neighbour) = grid.get_neighbour(cell, *ordinal) else {
			continue;
		};
		let distance = distance_field
			.get_field_cell_value(neighbour)
			.unwrap_or(UNVISITED);
		let (dx, dy) = ordinal.get_offset();
		sum += IVec2::new(dx, dy) * distance;
	}
	if sum == IVec2::ZERO {
		None
	} else {
		Some((-sum).as_vec2().normalize())
	}
}

/// Unit vector from the centre of `cell` to the centre of `goal`
fn straight_line(cell: GridCell, goal: GridCell) -> Vec2 {
	(goal.get_centre() - cell.get_centre()).normalize_or_zero()
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Build both fields for a grid
	fn build(grid: &OccupancyGrid, goal: GridCell) -> (DistanceField, DirectionField) {
		let mut distance_field = DistanceField::sized_for(grid);
		let _ = distance_field.rebuild(grid, goal);
		let mut direction_field = DirectionField::sized_for(grid);
		direction_field.rebuild(grid, &distance_field);
		(distance_field, direction_field)
	}
	/// Compare vectors allowing for float error
	fn assert_close(expected: Vec2, actual: Vec2) {
		assert!(
			expected.abs_diff_eq(actual, 1e-5),
			"expected {:?}, found {:?}",
			expected,
			actual
		);
	}

	#[test]
	fn open_grid_edges_point_at_cheapest_neighbour() {
		let grid = OccupancyGrid::new(5, 5, GridMapping::default());
		let (_, field) = build(&grid, GridCell::new(2, 2));
		// corner has NE as the only neighbour at distance 1
		assert_close(Ordinal::NorthEast.as_unit_vec2(), field.get_direction(GridCell::new(0, 0)));
		assert_eq!(Some(DirectionRule::Boundary), field.get_rule(GridCell::new(0, 0)));
		// W, NW and SW are all distance 1, W comes first
		assert_close(Vec2::new(-1.0, 0.0), field.get_direction(GridCell::new(4, 2)));
	}
	#[test]
	fn open_grid_interior_follows_gradient() {
		let grid = OccupancyGrid::new(5, 5, GridMapping::default());
		let (_, field) = build(&grid, GridCell::new(2, 2));
		assert_close(Vec2::new(0.0, 1.0), field.get_direction(GridCell::new(2, 1)));
		assert_eq!(Some(DirectionRule::Interior), field.get_rule(GridCell::new(2, 1)));
		assert_close(Ordinal::NorthEast.as_unit_vec2(), field.get_direction(GridCell::new(1, 1)));
		assert_eq!(Some(DirectionRule::Interior), field.get_rule(GridCell::new(1, 1)));
	}
	#[test]
	fn goal_is_zero() {
		let grid = OccupancyGrid::new(5, 5, GridMapping::default());
		let (_, field) = build(&grid, GridCell::new(2, 2));
		assert_eq!(Vec2::ZERO, field.get_direction(GridCell::new(2, 2)));
		assert_eq!(Some(DirectionRule::Goal), field.get_rule(GridCell::new(2, 2)));
	}
	#[test]
	fn steer_around_blocked_centre() {
		//  __________
		// |__|__|G_|
		// |__|x_|__|
		// |__|__|__|
		let grid = OccupancyGrid::new(3, 3, GridMapping::default())
			.with_obstacles(&[GridCell::new(1, 1)]);
		let (_, field) = build(&grid, GridCell::new(2, 2));
		// N and E tie on distance 2, never NE through the obstacle
		assert_close(Vec2::new(0.0, 1.0), field.get_direction(GridCell::new(0, 0)));
		assert_eq!(Vec2::ZERO, field.get_direction(GridCell::new(1, 1)));
		assert_eq!(Some(DirectionRule::Blocked), field.get_rule(GridCell::new(1, 1)));
		assert_close(Vec2::new(1.0, 0.0), field.get_direction(GridCell::new(1, 2)));
	}
	#[test]
	fn enclosed_corner_falls_back_to_straight_line() {
		let grid = OccupancyGrid::new(5, 5, GridMapping::default()).with_obstacles(&[
			GridCell::new(3, 3),
			GridCell::new(3, 4),
			GridCell::new(4, 3),
		]);
		let (_, field) = build(&grid, GridCell::new(0, 0));
		assert_eq!(Some(DirectionRule::StraightLine), field.get_rule(GridCell::new(4, 4)));
		assert_close(
			Vec2::new(-1.0, -1.0).normalize(),
			field.get_direction(GridCell::new(4, 4)),
		);
	}
	#[test]
	fn cancelling_gradient_falls_back_to_straight_line() {
		// a walled off 3x3 pocket, its centre is interior but every neighbour is unvisited
		let mut walls = Vec::new();
		for i in 2..=6 {
			walls.push(GridCell::new(i, 2));
			walls.push(GridCell::new(i, 6));
			walls.push(GridCell::new(2, i));
			walls.push(GridCell::new(6, i));
		}
		let grid = OccupancyGrid::new(7, 7, GridMapping::default()).with_obstacles(&walls);
		let (distance_field, field) = build(&grid, GridCell::new(0, 0));
		assert!(!distance_field.is_reachable(GridCell::new(4, 4)));
		assert_eq!(Some(DirectionRule::StraightLine), field.get_rule(GridCell::new(4, 4)));
		assert_close(
			Vec2::new(-1.0, -1.0).normalize(),
			field.get_direction(GridCell::new(4, 4)),
		);
		assert_eq!(Some(DirectionRule::StraightLine), field.get_rule(GridCell::new(3, 5)));
		assert_close(
			Vec2::new(-3.0, -5.0).normalize(),
			field.get_direction(GridCell::new(3, 5)),
		);
	}
	#[test]
	fn degenerate_field_is_zero() {
		let grid = OccupancyGrid::new(4, 4, GridMapping::default())
			.with_obstacles(&[GridCell::new(1, 1)]);
		let (_, field) = build(&grid, GridCell::new(1, 1));
		assert!(field.get().iter().all(|d| *d == Vec2::ZERO));
		assert_eq!(Some(DirectionRule::Unset), field.get_rule(GridCell::new(0, 0)));
	}
	#[test]
	fn von_neumann_boundary_only_moves_orthogonally() {
		let grid = OccupancyGrid::new(3, 3, GridMapping::default())
			.with_neighbourhood(Neighbourhood::VonNeumann);
		let (_, field) = build(&grid, GridCell::new(2, 2));
		// N and E tie on distance 3
		assert_close(Vec2::new(0.0, 1.0), field.get_direction(GridCell::new(0, 0)));
		// only interior cell, gradient is the sum of orthogonal neighbours
		assert_close(Vec2::new(1.0, 1.0).normalize(), field.get_direction(GridCell::new(1, 1)));
		assert_eq!(Some(DirectionRule::Interior), field.get_rule(GridCell::new(1, 1)));
	}
	#[test]
	fn directions_are_unit_or_zero() {
		let grid = OccupancyGrid::new(8, 6, GridMapping::default()).with_obstacles(&[
			GridCell::new(3, 1),
			GridCell::new(3, 2),
			GridCell::new(3, 3),
			GridCell::new(5, 4),
		]);
		let (_, field) = build(&grid, GridCell::new(7, 0));
		for direction in field.get() {
			let length = direction.length();
			assert!(length == 0.0 || (length - 1.0).abs() < 1e-5);
		}
	}
}

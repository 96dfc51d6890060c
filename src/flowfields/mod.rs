//! Flowfields are a means of handling pathfinding for a crowd of actors.
//!
//! [jdxdev](https://www.jdxdev.com/blog/2020/05/03/flowfields/)
//!
//! [leifnode](https://leifnode.com/2013/12/flow-field-pathfinding/)
//!
//! Rather than each actor searching for its own path, a single flood fill is
//! performed outward from one shared goal and every cell of the map is handed
//! a direction to move in. Any number of actors can then sample the field for
//! the cell they stand in.
//!
//! The map is an [grid::OccupancyGrid] of `width x height` cells indexed by
//! `(column, row)` from the bottom-left corner, i.e column increases with the
//! world `x` axis and row increases with the world `y` axis:
//!
//! ```text
//!  row
//!   4 |__|__|__|__|__|
//!   3 |__|__|__|__|__|
//!   2 |__|__|G_|__|__|
//!   1 |__|__|__|__|__|
//!   0 |__|__|__|__|__|
//!      0  1  2  3  4  column
//! ```
//!
//! Definitions:
//!
//! * Occupancy grid - which cells exist (have ground) and which of those are blocked by an obstacle
//! * Distance field - number of hops from each cell to the goal, `-1` where the goal cannot be reached
//! * Direction field - a unit vector per cell pointing down the distance gradient toward the goal
//!

pub mod error;
pub mod fields;
pub mod grid;
pub mod utilities;

//! Useful structures and tools used by the fields
//!

use bevy::prelude::*;

/// Convenience way of stepping from a grid cell to one of its 8 neighbours.
///
/// Rows grow with the world `y` axis so [Ordinal::North] is `row + 1`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Reflect)]
pub enum Ordinal {
	North,
	East,
	South,
	West,
	NorthEast,
	SouthEast,
	SouthWest,
	NorthWest,
}

impl Ordinal {
	/// Every direction, orthogonals first
	pub const ALL: [Ordinal; 8] = [
		Ordinal::North,
		Ordinal::East,
		Ordinal::South,
		Ordinal::West,
		Ordinal::NorthEast,
		Ordinal::SouthEast,
		Ordinal::SouthWest,
		Ordinal::NorthWest,
	];
	/// The 4 orthogonal directions
	pub const ORTHOGONAL: [Ordinal; 4] = [
		Ordinal::North,
		Ordinal::East,
		Ordinal::South,
		Ordinal::West,
	];
	/// The `(column, row)` step taken when moving in this direction
	pub fn get_offset(&self) -> (i32, i32) {
		match self {
			Ordinal::North => (0, 1),
			Ordinal::East => (1, 0),
			Ordinal::South => (0, -1),
			Ordinal::West => (-1, 0),
			Ordinal::NorthEast => (1, 1),
			Ordinal::SouthEast => (1, -1),
			Ordinal::SouthWest => (-1, -1),
			Ordinal::NorthWest => (-1, 1),
		}
	}
	/// The raw (non-normalised) offset as a vector, diagonals have a length of `sqrt(2)`
	pub fn as_offset_vec2(&self) -> Vec2 {
		let (x, y) = self.get_offset();
		Vec2::new(x as f32, y as f32)
	}
	/// Unit vector pointing in this direction
	pub fn as_unit_vec2(&self) -> Vec2 {
		self.as_offset_vec2().normalize()
	}
	/// Returns the opposite [Ordinal] of the current
	pub fn inverse(&self) -> Ordinal {
		match self {
			Ordinal::North => Ordinal::South,
			Ordinal::East => Ordinal::West,
			Ordinal::South => Ordinal::North,
			Ordinal::West => Ordinal::East,
			Ordinal::NorthEast => Ordinal::SouthWest,
			Ordinal::SouthEast => Ordinal::NorthWest,
			Ordinal::SouthWest => Ordinal::NorthEast,
			Ordinal::NorthWest => Ordinal::SouthEast,
		}
	}
	/// Find the [Ordinal] pointing from a `source` offset to an adjacent `target`. Returns [None] if the two are not orthogonally or diagonally adjacent
	pub fn cell_to_cell_direction(target: (i32, i32), source: (i32, i32)) -> Option<Self> {
		let direction = (target.0 - source.0, target.1 - source.1);
		Ordinal::ALL
			.iter()
			.find(|ord| ord.get_offset() == direction)
			.copied()
	}
	/// Snap an arbitrary vector to the closest of the 8 directions by rounding each component of its unit form. Returns [None] for a zero vector
	pub fn from_direction(direction: Vec2) -> Option<Self> {
		let unit = direction.try_normalize()?;
		let rounded = unit.round();
		Ordinal::cell_to_cell_direction((rounded.x as i32, rounded.y as i32), (0, 0))
	}
}

/// Which neighbours of a cell are considered adjacent when flooding the
/// distance field and deriving directions
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Reflect)]
pub enum Neighbourhood {
	/// 8-connected, diagonal moves are allowed
	#[default]
	Moore,
	/// 4-connected, only orthogonal moves
	VonNeumann,
}

impl Neighbourhood {
	/// The directions that make up the neighbourhood
	pub fn get_ordinals(&self) -> &'static [Ordinal] {
		match self {
			Neighbourhood::Moore => &Ordinal::ALL,
			Neighbourhood::VonNeumann => &Ordinal::ORTHOGONAL,
		}
	}
}

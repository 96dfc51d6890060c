//! Sources of occupancy used to build an [OccupancyGrid].
//!
//! A map is usually authored as two tile layers, one of ground and one of
//! obstacles, each positioned by their own tile coordinates. [TileLayers]
//! captures that arrangement and anything else can implement
//! [OccupancySource] directly.
//!
//! With the `csv` or `heightmap` features a grid can also be read straight
//! from disk.
//!

use std::collections::BTreeSet;

use crate::prelude::*;

/// Reports what sits at each index of a `width x height` grid
pub trait OccupancySource {
	/// Number of `(columns, rows)` the grid should have
	fn get_dimensions(&self) -> (usize, usize);
	/// Is there a traversable tile at the index
	fn has_ground(&self, cell: GridCell) -> bool;
	/// Is there an obstacle tile at the index
	fn has_obstacle(&self, cell: GridCell) -> bool;
}

/// Ground and obstacle tile layers addressed by tile coordinates.
///
/// `origin` is the tile coordinate that becomes [GridCell] `(0, 0)`, so a
/// layer authored around negative tile coordinates can still be mapped onto
/// the grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileLayers {
	/// Tile coordinate of the bottom-left cell
	origin: (i32, i32),
	/// Number of `(columns, rows)` in the grid
	size: (usize, usize),
	/// Tiles that can be walked over
	ground: BTreeSet<(i32, i32)>,
	/// Tiles blocking movement
	obstacles: BTreeSet<(i32, i32)>,
}

impl TileLayers {
	/// Create a new instance of [TileLayers] with no tiles
	pub fn new(origin: (i32, i32), size: (usize, usize)) -> Self {
		TileLayers {
			origin,
			size,
			ground: BTreeSet::new(),
			obstacles: BTreeSet::new(),
		}
	}
	/// Tile coordinate of grid cell `(0, 0)`
	pub fn get_origin(&self) -> (i32, i32) {
		self.origin
	}
	/// Place a ground tile
	pub fn add_ground(&mut self, tile: (i32, i32)) {
		self.ground.insert(tile);
	}
	/// Place an obstacle tile
	pub fn add_obstacle(&mut self, tile: (i32, i32)) {
		self.obstacles.insert(tile);
	}
	/// Cover every index of the grid in ground
	pub fn fill_ground(&mut self) {
		for row in 0..self.size.1 as i32 {
			for column in 0..self.size.0 as i32 {
				self.ground
					.insert((self.origin.0 + column, self.origin.1 + row));
			}
		}
	}
	/// Tile coordinate of a grid cell
	fn tile_of(&self, cell: GridCell) -> (i32, i32) {
		let (column, row) = cell.as_signed();
		(self.origin.0 + column, self.origin.1 + row)
	}
	/// From a `ron` file generate the [TileLayers]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Result<Self, FlowFieldError> {
		let file = std::fs::File::open(path)?;
		let layers: TileLayers = ron::de::from_reader(file)?;
		Ok(layers)
	}
}

impl OccupancySource for TileLayers {
	fn get_dimensions(&self) -> (usize, usize) {
		self.size
	}
	fn has_ground(&self, cell: GridCell) -> bool {
		self.ground.contains(&self.tile_of(cell))
	}
	fn has_obstacle(&self, cell: GridCell) -> bool {
		self.obstacles.contains(&self.tile_of(cell))
	}
}

/// CSV value of an index with no ground
#[cfg(feature = "csv")]
const CSV_EMPTY: u8 = 0;
/// CSV value of a traversable cell
#[cfg(feature = "csv")]
const CSV_GROUND: u8 = 1;
/// CSV value of a cell blocked by an obstacle
#[cfg(feature = "csv")]
const CSV_OBSTACLE: u8 = 255;

impl OccupancyGrid {
	/// Read a grid from a headerless `csv` file. Each line is a row of the
	/// map with the first line being the top of the map (the highest row).
	/// Values are `0` for no ground, `1` for ground and `255` for an obstacle
	#[cfg(feature = "csv")]
	pub fn from_csv(path: &str, mapping: GridMapping) -> Result<Self, FlowFieldError> {
		let file = std::fs::File::open(path)?;
		OccupancyGrid::from_csv_reader(file, mapping)
	}
	/// See [OccupancyGrid::from_csv]
	#[cfg(feature = "csv")]
	pub fn from_csv_reader(
		reader: impl std::io::Read,
		mapping: GridMapping,
	) -> Result<Self, FlowFieldError> {
		let mut rdr = csv::ReaderBuilder::new()
			.has_headers(false)
			.from_reader(reader);
		let mut lines: Vec<Vec<Occupancy>> = Vec::new();
		for record in rdr.records() {
			let record = record?;
			let mut line = Vec::with_capacity(record.len());
			for value in record.iter() {
				let value_u8: u8 = value.trim().parse().map_err(|_| {
					FlowFieldError::MalformedOccupancy(format!("CSV expects u8 values, found {}", value))
				})?;
				let occupancy = match value_u8 {
					CSV_EMPTY => Occupancy::Empty,
					CSV_GROUND => Occupancy::Traversable,
					CSV_OBSTACLE => Occupancy::Blocked,
					other => {
						return Err(FlowFieldError::MalformedOccupancy(format!(
							"CSV value {} is not one of {}, {} or {}",
							other, CSV_EMPTY, CSV_GROUND, CSV_OBSTACLE
						)))
					}
				};
				line.push(occupancy);
			}
			lines.push(line);
		}
		let height = lines.len();
		let width = lines.first().map(|l| l.len()).unwrap_or(0);
		if lines.iter().any(|l| l.len() != width) {
			return Err(FlowFieldError::MalformedOccupancy(
				"CSV rows have differing lengths".to_string(),
			));
		}
		// the bottom line of the file is row 0
		let cells = lines.into_iter().rev().flatten().collect();
		OccupancyGrid::from_cells(width, height, cells, mapping)
	}
	/// Create a grid from an image where each pixel is a cell. The top row
	/// of pixels is the top of the map. A fully transparent pixel has no
	/// ground, a dark pixel (mean RGB below 128) is an obstacle and anything
	/// else is ground
	#[cfg(feature = "heightmap")]
	pub fn from_heightmap(path: &str, mapping: GridMapping) -> Result<Self, FlowFieldError> {
		use photon_rs::native::open_image;
		let img = open_image(path).map_err(|e| {
			FlowFieldError::MalformedOccupancy(format!("Failed to open heightmap: {:?}", e))
		})?;
		let width = img.get_width() as usize;
		let height = img.get_height() as usize;
		OccupancyGrid::from_raw_pixels(&img.get_raw_pixels(), width, height, mapping)
	}
	/// Classify raw RGB or RGBA pixels, arranged from the top left of the
	/// image, into a grid. See [OccupancyGrid::from_heightmap]
	#[cfg(feature = "heightmap")]
	fn from_raw_pixels(
		raw_pixels: &[u8],
		width: usize,
		height: usize,
		mapping: GridMapping,
	) -> Result<Self, FlowFieldError> {
		// pixels come in sets of either 3 or 4 (if alpha channel is inlcuded)
		let has_alpha = raw_pixels.len() == width * height * 4;
		let chunk_size = if has_alpha { 4 } else { 3 };
		if width == 0 || raw_pixels.len() != width * height * chunk_size {
			return Err(FlowFieldError::MalformedOccupancy(format!(
				"Heightmap of {}x{} pixels has {} channel values",
				width,
				height,
				raw_pixels.len()
			)));
		}
		let mut lines: Vec<Vec<Occupancy>> = Vec::with_capacity(height);
		for line in raw_pixels.chunks(width * chunk_size) {
			let occupancy_line = line
				.chunks(chunk_size)
				.map(|px| {
					// careful of u8 overflow
					let colour_avg = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
					if has_alpha && px[3] == 0 {
						Occupancy::Empty
					} else if colour_avg < 128.0 {
						Occupancy::Blocked
					} else {
						Occupancy::Traversable
					}
				})
				.collect();
			lines.push(occupancy_line);
		}
		// the top line of pixels is the highest row
		let cells = lines.into_iter().rev().flatten().collect();
		OccupancyGrid::from_cells(width, height, cells, mapping)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn layers_build_grid() {
		//  ___________
		// |g_|g_|g_|__|
		// |g_|go|g_|g_|
		// |g_|g_|g_|g_|
		let mut layers = TileLayers::new((-2, -1), (4, 3));
		layers.fill_ground();
		// remove top right corner ground
		layers.ground.remove(&(1, 1));
		layers.add_obstacle((-1, 0));
		// obstacles without ground stay empty
		layers.add_obstacle((1, 1));
		let grid = OccupancyGrid::from_source(&layers, GridMapping::default());
		assert_eq!((4, 3), grid.get_dimensions());
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(1, 1)));
		assert_eq!(Some(Occupancy::Empty), grid.get_occupancy(GridCell::new(3, 2)));
		assert_eq!(Some(Occupancy::Traversable), grid.get_occupancy(GridCell::new(0, 0)));
		assert_eq!(10, grid.count_traversable());
	}
	#[test]
	fn layers_outside_origin_are_ignored() {
		let mut layers = TileLayers::new((0, 0), (2, 2));
		layers.add_ground((-1, 0));
		layers.add_ground((1, 1));
		let grid = OccupancyGrid::from_source(&layers, GridMapping::default());
		assert_eq!(1, grid.count_traversable());
		assert!(!grid.is_blocked(GridCell::new(1, 1)));
	}
	#[test]
	#[cfg(feature = "ron")]
	fn layers_file() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/tile_layers.ron";
		let layers = TileLayers::from_ron(&path).unwrap();
		let grid = OccupancyGrid::from_source(&layers, GridMapping::default());
		assert_eq!((6, 4), grid.get_dimensions());
		assert!(grid.is_blocked(GridCell::new(3, 1)));
	}
	#[test]
	#[cfg(feature = "csv")]
	fn csv_top_line_is_top_row() {
		let data = "1,1,0\n1,255,1\n";
		let grid = OccupancyGrid::from_csv_reader(data.as_bytes(), GridMapping::default()).unwrap();
		assert_eq!((3, 2), grid.get_dimensions());
		assert_eq!(Some(Occupancy::Empty), grid.get_occupancy(GridCell::new(2, 1)));
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(1, 0)));
	}
	#[test]
	#[cfg(feature = "csv")]
	fn csv_rejects_unknown_values() {
		let data = "1,7\n1,1\n";
		let result = OccupancyGrid::from_csv_reader(data.as_bytes(), GridMapping::default());
		assert!(matches!(result, Err(FlowFieldError::MalformedOccupancy(_))));
	}
	#[test]
	#[cfg(feature = "heightmap")]
	fn heightmap_file() {
		// top line: transparent, white, white, black
		// middle:   white, black, white, white
		// bottom:   black, white, light grey, dark grey
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/heightmap_occupancy.png";
		let grid = OccupancyGrid::from_heightmap(&path, GridMapping::default()).unwrap();
		assert_eq!((4, 3), grid.get_dimensions());
		assert_eq!(Some(Occupancy::Empty), grid.get_occupancy(GridCell::new(0, 2)));
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(3, 2)));
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(1, 1)));
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(0, 0)));
		assert_eq!(Some(Occupancy::Traversable), grid.get_occupancy(GridCell::new(2, 0)));
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(3, 0)));
		assert_eq!(Some(Occupancy::Traversable), grid.get_occupancy(GridCell::new(1, 2)));
		assert_eq!(7, grid.count_traversable());
	}
	#[test]
	#[cfg(feature = "heightmap")]
	fn heightmap_missing_file() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/not_a_heightmap.png";
		let result = OccupancyGrid::from_heightmap(&path, GridMapping::default());
		assert!(matches!(result, Err(FlowFieldError::MalformedOccupancy(_))));
	}
	#[test]
	#[cfg(feature = "heightmap")]
	fn heightmap_rgb_pixels() {
		// 2x2 without alpha, top line dark then light
		let raw = [10, 10, 10, 250, 250, 250, 200, 200, 200, 0, 0, 0];
		let grid = OccupancyGrid::from_raw_pixels(&raw, 2, 2, GridMapping::default()).unwrap();
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(0, 1)));
		assert_eq!(Some(Occupancy::Traversable), grid.get_occupancy(GridCell::new(1, 1)));
		assert_eq!(Some(Occupancy::Traversable), grid.get_occupancy(GridCell::new(0, 0)));
		assert_eq!(Some(Occupancy::Blocked), grid.get_occupancy(GridCell::new(1, 0)));
	}
	#[test]
	#[cfg(feature = "heightmap")]
	fn heightmap_channel_mismatch() {
		let raw = [255; 10];
		let result = OccupancyGrid::from_raw_pixels(&raw, 2, 2, GridMapping::default());
		assert!(matches!(result, Err(FlowFieldError::MalformedOccupancy(_))));
	}
	#[test]
	#[cfg(feature = "csv")]
	fn csv_file() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/occupancy.csv";
		let grid = OccupancyGrid::from_csv(&path, GridMapping::default()).unwrap();
		assert_eq!((8, 6), grid.get_dimensions());
	}
}

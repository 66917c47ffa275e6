//! Navigation never owns the pixels of a scene, it reads them through [TerrainQuery]. Whatever
//! stores the material bitmap of a game implements the trait and the [NavGrid] samples it when
//! building or patching.
//!
//! [MaterialGrid] is a simple owned implementation, one [MaterialId] per pixel stored row by
//! row from the top left, plus a sparse map of door permissions. It can be built in code or
//! loaded from disk:
//!
//! * `ron` - a serialised [MaterialGrid]
//! * `csv` - one row of comma separated material ids per line of pixels
//! * `bitmap` - a greyscale image where black is indestructible and white is air
//!

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::prelude::*;

/// Read-only view of a material bitmap
pub trait TerrainQuery {
	/// Number of pixel columns
	fn width(&self) -> u32;
	/// Number of pixel rows
	fn height(&self) -> u32;
	/// Whether walking off the right edge leads back onto the left
	fn wraps_x(&self) -> bool;
	/// Whether walking off the bottom edge leads back onto the top
	fn wraps_y(&self) -> bool;
	/// Material of the pixel at `x, y` where `x < width` and `y < height`
	fn material_at(&self, x: u32, y: u32) -> MaterialId;
	/// If the pixel at `x, y` is part of a door, the teams allowed through it.
	///
	/// Pixels of a door material without a permission are treated as a door shut to everybody
	fn door_team_permission(&self, _x: u32, _y: u32) -> Option<TeamMask> {
		None
	}
}

/// An in-memory material bitmap
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialGrid {
	/// Number of pixel columns
	width: u32,
	/// Number of pixel rows
	height: u32,
	/// Horizontal wrapping
	#[cfg_attr(feature = "serde", serde(default))]
	wraps_x: bool,
	/// Vertical wrapping
	#[cfg_attr(feature = "serde", serde(default))]
	wraps_y: bool,
	/// Row major material ids
	materials: Vec<MaterialId>,
	/// Door permissions keyed by `(x, y)`
	#[cfg_attr(feature = "serde", serde(default))]
	doors: BTreeMap<(u32, u32), TeamMask>,
}

impl TerrainQuery for MaterialGrid {
	fn width(&self) -> u32 {
		self.width
	}
	fn height(&self) -> u32 {
		self.height
	}
	fn wraps_x(&self) -> bool {
		self.wraps_x
	}
	fn wraps_y(&self) -> bool {
		self.wraps_y
	}
	fn material_at(&self, x: u32, y: u32) -> MaterialId {
		self.materials[self.index(x, y)]
	}
	fn door_team_permission(&self, x: u32, y: u32) -> Option<TeamMask> {
		self.doors.get(&(x, y)).copied()
	}
}

impl MaterialGrid {
	/// Create a new grid of air
	pub fn new(width: u32, height: u32, wraps_x: bool, wraps_y: bool) -> Self {
		MaterialGrid::new_with_material(width, height, wraps_x, wraps_y, MaterialId::AIR)
	}
	/// Create a new grid filled with a single material
	pub fn new_with_material(
		width: u32,
		height: u32,
		wraps_x: bool,
		wraps_y: bool,
		material: MaterialId,
	) -> Self {
		MaterialGrid {
			width,
			height,
			wraps_x,
			wraps_y,
			materials: vec![material; width as usize * height as usize],
			doors: BTreeMap::new(),
		}
	}
	/// Create a grid from row major material ids
	pub fn from_materials(
		width: u32,
		height: u32,
		wraps_x: bool,
		wraps_y: bool,
		materials: Vec<MaterialId>,
	) -> NavigationResult<Self> {
		let grid = MaterialGrid {
			width,
			height,
			wraps_x,
			wraps_y,
			materials,
			doors: BTreeMap::new(),
		};
		grid.validate()?;
		Ok(grid)
	}
	/// Ensure the material buffer and door map agree with the dimensions
	fn validate(&self) -> NavigationResult<()> {
		let expected = self.width as usize * self.height as usize;
		if self.materials.len() != expected {
			return Err(NavigationError::InvalidTerrain(format!(
				"{}x{} terrain needs {} materials, found {}",
				self.width,
				self.height,
				expected,
				self.materials.len()
			)));
		}
		if let Some((x, y)) = self
			.doors
			.keys()
			.find(|(x, y)| *x >= self.width || *y >= self.height)
		{
			return Err(NavigationError::InvalidTerrain(format!(
				"door at ({}, {}) lies outside of the {}x{} terrain",
				x, y, self.width, self.height
			)));
		}
		Ok(())
	}
	/// Position of a pixel in the material buffer
	fn index(&self, x: u32, y: u32) -> usize {
		if x >= self.width || y >= self.height {
			panic!(
				"Pixel ({}, {}) is outside of the terrain, dimensions are {}x{}",
				x, y, self.width, self.height
			);
		}
		y as usize * self.width as usize + x as usize
	}
	/// Change the material of a single pixel
	pub fn set_material(&mut self, x: u32, y: u32, material: MaterialId) {
		let i = self.index(x, y);
		self.materials[i] = material;
	}
	/// Fill a rectangle with a material. Parts of the rectangle hanging over a wrapping edge
	/// are written to the opposite side, over other edges they are dropped
	pub fn fill_rect(&mut self, rect: TerrainRect, material: MaterialId) {
		let wrap = WrapAdapter::from_terrain(self);
		for piece in wrap.normalize_region(rect) {
			for y in piece.y..piece.bottom() {
				for x in piece.x..piece.right() {
					self.set_material(x as u32, y as u32, material);
				}
			}
		}
	}
	/// Mark a pixel as a door open to `teams`
	pub fn set_door(&mut self, x: u32, y: u32, teams: TeamMask) {
		// validates the pixel
		self.index(x, y);
		self.doors.insert((x, y), teams);
	}
	/// Turn a door pixel back into plain material
	pub fn clear_door(&mut self, x: u32, y: u32) {
		self.doors.remove(&(x, y));
	}
	pub fn get_materials(&self) -> &[MaterialId] {
		&self.materials
	}
	pub fn get_doors(&self) -> &BTreeMap<(u32, u32), TeamMask> {
		&self.doors
	}
	/// Load a serialised [MaterialGrid] from a `.ron` file
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> NavigationResult<Self> {
		let file = std::fs::File::open(path)?;
		let grid: MaterialGrid = ron::de::from_reader(file)?;
		grid.validate()?;
		debug!(
			"Loaded {}x{} terrain from {}",
			grid.width, grid.height, path
		);
		Ok(grid)
	}
	/// Load a grid from a `.csv` file where each line is a row of pixels and each value is a
	/// material id
	#[cfg(feature = "csv")]
	pub fn from_csv(path: &str, wraps_x: bool, wraps_y: bool) -> NavigationResult<Self> {
		let data = std::fs::File::open(path)?;
		let mut rdr = csv::ReaderBuilder::new()
			.has_headers(false)
			.trim(csv::Trim::All)
			.from_reader(data);
		let mut materials = Vec::new();
		let mut width = None;
		let mut height = 0;
		for (row, record) in rdr.records().enumerate() {
			let record = record?;
			match width {
				None => width = Some(record.len()),
				Some(w) if w != record.len() => {
					return Err(NavigationError::InvalidTerrain(format!(
						"row {} has {} materials, expected {}",
						row,
						record.len(),
						w
					)));
				}
				_ => {}
			}
			for value in record.iter() {
				let id: u8 = value.parse().map_err(|_| {
					NavigationError::InvalidTerrain(format!(
						"row {} contains '{}' which is not a material id",
						row, value
					))
				})?;
				materials.push(MaterialId(id));
			}
			height += 1;
		}
		let grid = MaterialGrid::from_materials(
			width.unwrap_or(0) as u32,
			height,
			wraps_x,
			wraps_y,
			materials,
		)?;
		debug!(
			"Loaded {}x{} terrain from {}",
			grid.width, grid.height, path
		);
		Ok(grid)
	}
	/// Create a grid from a greyscale image where each pixel is a material. Black pixels are
	/// indestructible, white pixels are air and the shades in between grow more resistant the
	/// darker they get
	#[cfg(feature = "bitmap")]
	pub fn from_bitmap(path: &str, wraps_x: bool, wraps_y: bool) -> NavigationResult<Self> {
		use photon_rs::native::open_image;
		let img = open_image(path).map_err(|e| NavigationError::Bitmap(e.to_string()))?;
		let width = img.get_width();
		let height = img.get_height();
		let raw_pixels = img.get_raw_pixels();
		// raw pixels come in sets of either 3 or 4 (if alpha channel is included) from the top left
		let chunk_size = if width as usize * height as usize * 4 == raw_pixels.len() {
			4
		} else {
			3
		};
		let materials = raw_pixels
			.chunks(chunk_size)
			.map(|px| {
				// careful of u8 overflow
				let colour_avg = (px[0] as f32 + px[1] as f32 + px[2] as f32) / 3.0;
				MaterialId(255 - colour_avg as u8)
			})
			.collect();
		MaterialGrid::from_materials(width, height, wraps_x, wraps_y, materials)
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn new_is_air() {
		let grid = MaterialGrid::new(4, 3, false, true);
		assert_eq!(4, grid.width());
		assert_eq!(3, grid.height());
		assert!(!grid.wraps_x());
		assert!(grid.wraps_y());
		assert_eq!(MaterialId::AIR, grid.material_at(3, 2));
		assert_eq!(None, grid.door_team_permission(0, 0));
	}
	#[test]
	fn set_material() {
		let mut grid = MaterialGrid::new(4, 3, false, false);
		grid.set_material(1, 2, MaterialId(9));
		assert_eq!(MaterialId(9), grid.material_at(1, 2));
		assert_eq!(MaterialId(9), grid.get_materials()[9]);
	}
	#[test]
	#[should_panic]
	fn out_of_bounds() {
		let grid = MaterialGrid::new(4, 3, false, false);
		grid.material_at(4, 0);
	}
	#[test]
	fn fill_rect_wraps() {
		let mut grid = MaterialGrid::new(5, 5, true, false);
		grid.fill_rect(TerrainRect::new(-1, 4, 2, 3), MaterialId(3));
		assert_eq!(MaterialId(3), grid.material_at(4, 4));
		assert_eq!(MaterialId(3), grid.material_at(0, 4));
		assert_eq!(MaterialId::AIR, grid.material_at(1, 4));
		assert_eq!(2, grid.get_materials().iter().filter(|m| m.get() == 3).count());
	}
	#[test]
	fn doors() {
		let mut grid = MaterialGrid::new(4, 4, false, false);
		grid.set_door(2, 2, TeamMask::single(1));
		assert_eq!(Some(TeamMask::single(1)), grid.door_team_permission(2, 2));
		grid.clear_door(2, 2);
		assert_eq!(None, grid.door_team_permission(2, 2));
	}
	#[test]
	fn from_materials_validates() {
		let result = MaterialGrid::from_materials(3, 3, false, false, vec![MaterialId::AIR; 8]);
		assert!(matches!(result, Err(NavigationError::InvalidTerrain(_))));
	}
	#[test]
	#[cfg(feature = "ron")]
	fn material_grid_file_ron() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/terrain.ron";
		let grid = MaterialGrid::from_ron(&path).unwrap();
		assert_eq!(8, grid.width());
		assert_eq!(6, grid.height());
		assert!(grid.wraps_x());
		assert_eq!(MaterialId::INDESTRUCTIBLE, grid.material_at(4, 0));
		assert_eq!(Some(TeamMask::single(1)), grid.door_team_permission(4, 3));
	}
	#[test]
	#[cfg(feature = "csv")]
	fn material_grid_file_csv() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/terrain.csv";
		let grid = MaterialGrid::from_csv(&path, false, false).unwrap();
		assert_eq!(10, grid.width());
		assert_eq!(10, grid.height());
		assert_eq!(MaterialId(100), grid.material_at(5, 0));
		assert_eq!(MaterialId::AIR, grid.material_at(0, 0));
	}
	#[test]
	#[cfg(feature = "bitmap")]
	fn material_grid_file_bitmap() {
		let path = env!("CARGO_MANIFEST_DIR").to_string() + "/assets/terrain_bitmap.png";
		let grid = MaterialGrid::from_bitmap(&path, true, false).unwrap();
		assert_eq!(4, grid.width());
		assert_eq!(2, grid.height());
		assert!(grid.wraps_x());
		assert_eq!(MaterialId::AIR, grid.material_at(0, 0));
		assert_eq!(MaterialId::INDESTRUCTIBLE, grid.material_at(1, 0));
		assert_eq!(MaterialId(127), grid.material_at(2, 0));
		assert_eq!(MaterialId::AIR, grid.material_at(3, 1));
	}
	#[test]
	#[cfg(feature = "bitmap")]
	fn material_grid_missing_bitmap() {
		let result = MaterialGrid::from_bitmap("does/not/exist.png", false, false);
		assert!(matches!(result, Err(NavigationError::Bitmap(_))));
	}
	#[test]
	#[cfg(feature = "csv")]
	fn material_grid_missing_csv() {
		let result = MaterialGrid::from_csv("does/not/exist.csv", false, false);
		assert!(matches!(result, Err(NavigationError::Io(_))));
	}
}

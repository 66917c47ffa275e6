//! Configuration of the navigation of a scene
//!

use bevy::prelude::*;

use crate::prelude::*;

/// Tunables shared by every component of a [SceneNavigation]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationSettings {
	/// Side length in pixels of the square block of terrain represented by a single node
	node_size: u32,
	/// Number of teams which get their own [PathFinder], on top of the shared one
	max_teams: usize,
	/// Number of threads resolving asynchronous path requests
	worker_count: usize,
	/// Scales material resistance into additional traversal cost
	dig_cost_factor: f32,
	/// Behaviour of every material
	palette: MaterialPalette,
}

impl Default for NavigationSettings {
	fn default() -> Self {
		NavigationSettings {
			node_size: 1,
			max_teams: 4,
			worker_count: 2,
			dig_cost_factor: 0.1,
			palette: MaterialPalette::default(),
		}
	}
}

impl NavigationSettings {
	/// Create a new instance of [NavigationSettings], panics if any of the values cannot be
	/// worked with
	pub fn new(
		node_size: u32,
		max_teams: usize,
		worker_count: usize,
		dig_cost_factor: f32,
		palette: MaterialPalette,
	) -> Self {
		let settings = NavigationSettings {
			node_size,
			max_teams,
			worker_count,
			dig_cost_factor,
			palette,
		};
		if let Err(e) = settings.validate() {
			panic!("{}", e);
		}
		settings
	}
	/// Check the values are usable
	fn validate(&self) -> Result<(), String> {
		if self.node_size == 0 {
			return Err("node_size must be at least 1".to_string());
		}
		if self.max_teams > MAX_TEAM_COUNT {
			return Err(format!(
				"max_teams is {}, at most {} teams are supported",
				self.max_teams, MAX_TEAM_COUNT
			));
		}
		if self.worker_count == 0 {
			return Err("worker_count must be at least 1".to_string());
		}
		if self.dig_cost_factor.is_nan() || self.dig_cost_factor < 0.0 {
			return Err(format!(
				"dig_cost_factor must be zero or greater, found {}",
				self.dig_cost_factor
			));
		}
		// palettes read from files never went through MaterialProperties::solid
		if let Some((id, properties)) = self.palette.get_overrides().find(|(_, p)| {
			let resistance = p.get_resistance();
			resistance.is_nan() || resistance < 0.0
		}) {
			return Err(format!(
				"material {} has resistance {}, it must be zero or greater",
				id.get(),
				properties.get_resistance()
			));
		}
		Ok(())
	}
	pub fn get_node_size(&self) -> u32 {
		self.node_size
	}
	pub fn get_max_teams(&self) -> usize {
		self.max_teams
	}
	pub fn get_worker_count(&self) -> usize {
		self.worker_count
	}
	pub fn get_dig_cost_factor(&self) -> f32 {
		self.dig_cost_factor
	}
	pub fn get_palette(&self) -> &MaterialPalette {
		&self.palette
	}
	/// Number of [PathFinder]s a scene holds, one per team plus the shared one
	pub fn get_path_finder_count(&self) -> usize {
		self.max_teams + 1
	}
	pub fn with_node_size(mut self, node_size: u32) -> Self {
		self.node_size = node_size;
		self.checked()
	}
	pub fn with_max_teams(mut self, max_teams: usize) -> Self {
		self.max_teams = max_teams;
		self.checked()
	}
	pub fn with_worker_count(mut self, worker_count: usize) -> Self {
		self.worker_count = worker_count;
		self.checked()
	}
	pub fn with_dig_cost_factor(mut self, dig_cost_factor: f32) -> Self {
		self.dig_cost_factor = dig_cost_factor;
		self.checked()
	}
	pub fn with_palette(mut self, palette: MaterialPalette) -> Self {
		self.palette = palette;
		self.checked()
	}
	/// Panic if a builder produced unusable values
	fn checked(self) -> Self {
		if let Err(e) = self.validate() {
			panic!("{}", e);
		}
		self
	}
	/// Load settings from a `.ron` file, fields which are left out take their default values
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> NavigationResult<Self> {
		let file = std::fs::File::open(path)?;
		let settings: NavigationSettings = ron::de::from_reader(file)?;
		settings
			.validate()
			.map_err(NavigationError::InvalidSettings)?;
		info!("Loaded navigation settings from {}", path);
		Ok(settings)
	}
}

//! The CostModel turns the material of a piece of terrain into the price of moving across it.
//!
//! Every [MaterialId] has a resistance. Air has a resistance of `0` and can always be crossed at
//! the cost of the distance travelled. Anything more resistant has to be dug through, a requester
//! supplies a dig strength and any material with a resistance greater than it cannot be crossed.
//! Materials that can be dug through cost more the more resistant they are:
//!
//! ```text
//! cost = distance * (1 + resistance * dig_cost_factor)
//! ```
//!
//! Doors are special, they are open to some teams and shut to others. A shut door can never be
//! crossed no matter how hard a requester can dig, an open door adds no resistance of its own.
//!

use bevy::prelude::*;

use crate::prelude::*;

/// Describes how a single material behaves when pathing through it
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct MaterialProperties {
	/// How much dig strength is needed to pass through, [f32::INFINITY] marks an indestructible material
	resistance: f32,
	/// Whether the material forms a door whose passability depends on the requesting team
	door: bool,
}

impl MaterialProperties {
	/// Empty space
	pub const AIR: MaterialProperties = MaterialProperties {
		resistance: 0.0,
		door: false,
	};
	/// A material that can never be dug through
	pub const INDESTRUCTIBLE: MaterialProperties = MaterialProperties {
		resistance: f32::INFINITY,
		door: false,
	};
	/// A team restricted door
	pub const DOOR: MaterialProperties = MaterialProperties {
		resistance: 0.0,
		door: true,
	};
	/// A solid material with some resistance to digging
	pub fn solid(resistance: f32) -> Self {
		if resistance.is_nan() || resistance < 0.0 {
			panic!("Material resistance must be zero or greater, found {}", resistance);
		}
		MaterialProperties {
			resistance,
			door: false,
		}
	}
	pub fn get_resistance(&self) -> f32 {
		self.resistance
	}
	pub fn is_door(&self) -> bool {
		self.door
	}
}

/// Lookup of every [MaterialId] to its [MaterialProperties].
///
/// By default id `0` is air, ids `1..=254` resist digging with their own numeric value and id
/// `255` is indestructible
#[cfg_attr(
	feature = "serde",
	derive(serde::Deserialize, serde::Serialize),
	serde(from = "PaletteOverrides", into = "PaletteOverrides")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialPalette(Vec<MaterialProperties>);

impl Default for MaterialPalette {
	fn default() -> Self {
		let materials = (0..=u8::MAX).map(default_properties).collect();
		MaterialPalette(materials)
	}
}

/// The properties an id has when nothing overrides it
fn default_properties(id: u8) -> MaterialProperties {
	match id {
		0 => MaterialProperties::AIR,
		u8::MAX => MaterialProperties::INDESTRUCTIBLE,
		n => MaterialProperties::solid(n as f32),
	}
}

impl MaterialPalette {
	/// Get the properties of a material
	pub fn get(&self, material: MaterialId) -> &MaterialProperties {
		// the palette always holds an entry for every possible id
		&self.0[material.get() as usize]
	}
	/// Replace the properties of a material
	pub fn set(&mut self, material: MaterialId, properties: MaterialProperties) {
		self.0[material.get() as usize] = properties;
	}
	/// Builder style variant of [MaterialPalette::set]
	pub fn with(mut self, material: MaterialId, properties: MaterialProperties) -> Self {
		self.set(material, properties);
		self
	}
	/// Ids whose properties differ from the defaults
	pub fn get_overrides(&self) -> impl Iterator<Item = (MaterialId, &MaterialProperties)> {
		self.0
			.iter()
			.enumerate()
			.filter(|(id, p)| **p != default_properties(*id as u8))
			.map(|(id, p)| (MaterialId(id as u8), p))
	}
}

/// Serialised form of a [MaterialPalette], only the ids which differ from the defaults are stored
#[cfg(feature = "serde")]
#[derive(serde::Deserialize, serde::Serialize)]
struct PaletteOverrides {
	/// Properties keyed by material id
	#[serde(default)]
	overrides: std::collections::BTreeMap<u8, MaterialProperties>,
}

#[cfg(feature = "serde")]
impl From<PaletteOverrides> for MaterialPalette {
	fn from(value: PaletteOverrides) -> Self {
		let mut palette = MaterialPalette::default();
		for (id, properties) in value.overrides {
			palette.set(MaterialId(id), properties);
		}
		palette
	}
}

#[cfg(feature = "serde")]
impl From<MaterialPalette> for PaletteOverrides {
	fn from(value: MaterialPalette) -> Self {
		let overrides = value
			.get_overrides()
			.map(|(id, p)| (id.get(), *p))
			.collect();
		PaletteOverrides { overrides }
	}
}

/// Result of pricing a single move between two nodes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EdgeCost {
	/// The move can be made at this cost
	Passable(f32),
	/// The move cannot be made
	Impassable,
}

impl EdgeCost {
	/// The cost of a passable edge
	pub fn get_cost(&self) -> Option<f32> {
		match self {
			EdgeCost::Passable(c) => Some(*c),
			EdgeCost::Impassable => None,
		}
	}
	pub fn is_passable(&self) -> bool {
		matches!(self, EdgeCost::Passable(_))
	}
}

/// Prices moves across the terrain. It holds no mutable state and is shared between every
/// [PathFinder] of a scene
#[derive(Clone, Debug, PartialEq)]
pub struct CostModel {
	/// Per material behaviour
	palette: MaterialPalette,
	/// Scales resistance into additional cost
	dig_cost_factor: f32,
}

impl Default for CostModel {
	fn default() -> Self {
		CostModel::from_settings(&NavigationSettings::default())
	}
}

impl CostModel {
	pub fn new(palette: MaterialPalette, dig_cost_factor: f32) -> Self {
		if dig_cost_factor.is_nan() || dig_cost_factor < 0.0 {
			panic!(
				"dig_cost_factor must be zero or greater, found {}",
				dig_cost_factor
			);
		}
		if let Some((id, properties)) = palette
			.get_overrides()
			.find(|(_, p)| p.resistance.is_nan() || p.resistance < 0.0)
		{
			panic!(
				"Material {} has resistance {}, it must be zero or greater",
				id.get(),
				properties.resistance
			);
		}
		CostModel {
			palette,
			dig_cost_factor,
		}
	}
	/// Create a model from the palette and dig cost factor of some [NavigationSettings]
	pub fn from_settings(settings: &NavigationSettings) -> Self {
		CostModel::new(
			settings.get_palette().clone(),
			settings.get_dig_cost_factor(),
		)
	}
	pub fn get_palette(&self) -> &MaterialPalette {
		&self.palette
	}
	pub fn get_dig_cost_factor(&self) -> f32 {
		self.dig_cost_factor
	}
	/// Dig strength needed to pass through a material
	pub fn resistance(&self, material: MaterialId) -> f32 {
		self.palette.get(material).get_resistance()
	}
	/// Whether no amount of digging will get through a material
	pub fn is_indestructible(&self, material: MaterialId) -> bool {
		self.resistance(material).is_infinite()
	}
	pub fn is_door(&self, material: MaterialId) -> bool {
		self.palette.get(material).is_door()
	}
	/// Cost per unit of distance through a material when no digging is allowed, [None] if it
	/// would need digging
	pub fn base_cost(&self, material: MaterialId) -> Option<f32> {
		self.edge_cost(material, 1.0, 0.0, false, true).get_cost()
	}
	/// Price a move of `distance` through `material` for a requester able to dig through
	/// `dig_strength` worth of resistance
	pub fn edge_cost(
		&self,
		material: MaterialId,
		distance: f32,
		dig_strength: f32,
		is_door: bool,
		door_passable: bool,
	) -> EdgeCost {
		if is_door && !door_passable {
			return EdgeCost::Impassable;
		}
		let resistance = self.resistance(material);
		// NaN dig strength compares false and so is treated as no strength at all
		if resistance.is_infinite() || (resistance > 0.0 && !(resistance <= dig_strength)) {
			return EdgeCost::Impassable;
		}
		EdgeCost::Passable(distance * (1.0 + resistance * self.dig_cost_factor))
	}
}

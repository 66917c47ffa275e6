//! Useful structures and tools shared by the navigation components
//!

use bevy::prelude::*;

/// Largest number of teams a scene can hold, a [TeamMask] has one bit per team
pub const MAX_TEAM_COUNT: usize = 8;

/// Identifies a material in the terrain bitmap. The terrain stores one id per pixel
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct MaterialId(pub u8);

impl MaterialId {
	/// Empty space, always traversable at the lowest cost
	pub const AIR: MaterialId = MaterialId(0);
	/// The strongest id, by default it cannot be dug through
	pub const INDESTRUCTIBLE: MaterialId = MaterialId(u8::MAX);
	/// Get the raw id
	pub fn get(&self) -> u8 {
		self.0
	}
}

/// The team a path is requested for. Team identity decides which doors are
/// passable
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub enum Team {
	/// Team agnostic requests, served by the shared solver in slot `0`
	#[default]
	NoTeam,
	/// A team index in `0..max_teams`
	Id(u8),
}

impl Team {
	/// The position of this team's solver within a team indexed array where
	/// slot `0` is reserved for [Team::NoTeam]
	pub fn slot(&self) -> usize {
		match self {
			Team::NoTeam => 0,
			Team::Id(id) => *id as usize + 1,
		}
	}
	/// Inverse of [Team::slot]
	pub fn from_slot(slot: usize) -> Self {
		if slot == 0 {
			Team::NoTeam
		} else {
			Team::Id((slot - 1) as u8)
		}
	}
}

/// Bitmask of teams allowed through a door, bit `n` grants [Team::Id] `n`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct TeamMask(pub u8);

impl TeamMask {
	/// Nobody may pass
	pub const NONE: TeamMask = TeamMask(0);
	/// Everybody may pass, including team agnostic requests
	pub const ALL: TeamMask = TeamMask(u8::MAX);
	/// A mask granting a single team
	pub fn single(team: u8) -> Self {
		if team as usize >= MAX_TEAM_COUNT {
			panic!(
				"Team {} cannot be held in a TeamMask, at most {} teams are supported",
				team, MAX_TEAM_COUNT
			);
		}
		TeamMask(1 << team)
	}
	/// Combine two masks granting the teams of both
	pub fn with(self, other: TeamMask) -> Self {
		TeamMask(self.0 | other.0)
	}
	/// Teams granted by both masks
	pub fn intersection(self, other: TeamMask) -> Self {
		TeamMask(self.0 & other.0)
	}
	/// Whether a request made by `team` is allowed through. Team agnostic
	/// requests only pass doors open to everybody
	pub fn allows(&self, team: Team) -> bool {
		match team {
			Team::NoTeam => *self == TeamMask::ALL,
			Team::Id(id) => (id as usize) < MAX_TEAM_COUNT && self.0 & (1 << id) != 0,
		}
	}
}

/// An axis aligned, half-open rectangle `[x, x + width) x [y, y + height)` in
/// terrain coordinates. It may extend outside of the terrain and is only
/// wrapped or clipped when it gets applied
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct TerrainRect {
	/// Left edge
	pub x: i32,
	/// Top edge
	pub y: i32,
	/// Horizontal extent
	pub width: i32,
	/// Vertical extent
	pub height: i32,
}

impl TerrainRect {
	/// Create a new instance of [TerrainRect]
	pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
		TerrainRect {
			x,
			y,
			width,
			height,
		}
	}
	/// Create a rectangle spanning two corners, `max` is exclusive
	pub fn from_corners(min: IVec2, max: IVec2) -> Self {
		TerrainRect::new(min.x, min.y, max.x - min.x, max.y - min.y)
	}
	/// A single cell
	pub fn cell(x: i32, y: i32) -> Self {
		TerrainRect::new(x, y, 1, 1)
	}
	/// Exclusive right edge
	pub fn right(&self) -> i32 {
		self.x + self.width
	}
	/// Exclusive bottom edge
	pub fn bottom(&self) -> i32 {
		self.y + self.height
	}
	/// Whether the rectangle covers no cells
	pub fn is_empty(&self) -> bool {
		self.width <= 0 || self.height <= 0
	}
	/// Whether `other` lies entirely inside of this rectangle
	pub fn contains_rect(&self, other: &TerrainRect) -> bool {
		other.x >= self.x
			&& other.y >= self.y
			&& other.right() <= self.right()
			&& other.bottom() <= self.bottom()
	}
	/// Whether a cell lies inside of this rectangle
	pub fn contains_cell(&self, cell: IVec2) -> bool {
		cell.x >= self.x && cell.x < self.right() && cell.y >= self.y && cell.y < self.bottom()
	}
	/// The overlap of two rectangles, [None] if they don't touch
	pub fn intersection(&self, other: &TerrainRect) -> Option<TerrainRect> {
		let min = IVec2::new(self.x.max(other.x), self.y.max(other.y));
		let max = IVec2::new(
			self.right().min(other.right()),
			self.bottom().min(other.bottom()),
		);
		let rect = TerrainRect::from_corners(min, max);
		if rect.is_empty() {
			None
		} else {
			Some(rect)
		}
	}
	/// Grow the rectangle by `amount` cells on every side
	pub fn expand(&self, amount: i32) -> Self {
		TerrainRect::new(
			self.x - amount,
			self.y - amount,
			self.width + amount * 2,
			self.height + amount * 2,
		)
	}
}

/// Convenience way of accessing the 8 directions of movement between
/// neighbouring nodes of a [crate::prelude::NavGrid]. The grid origin is the
/// top left so North is `-y`
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
	/// The `(x, y)` step taken when moving in this direction
	pub fn offset(&self) -> IVec2 {
		match self {
			Ordinal::North => IVec2::new(0, -1),
			Ordinal::East => IVec2::new(1, 0),
			Ordinal::South => IVec2::new(0, 1),
			Ordinal::West => IVec2::new(-1, 0),
			Ordinal::NorthEast => IVec2::new(1, -1),
			Ordinal::SouthEast => IVec2::new(1, 1),
			Ordinal::SouthWest => IVec2::new(-1, 1),
			Ordinal::NorthWest => IVec2::new(-1, -1),
		}
	}
	/// Whether moving this way crosses a corner
	pub fn is_diagonal(&self) -> bool {
		matches!(
			self,
			Ordinal::NorthEast | Ordinal::SouthEast | Ordinal::SouthWest | Ordinal::NorthWest
		)
	}
	/// Length of a unit step in this direction
	pub fn step_length(&self) -> f32 {
		if self.is_diagonal() {
			std::f32::consts::SQRT_2
		} else {
			1.0
		}
	}
	/// For a diagonal direction the two orthogonal directions whose cells are
	/// brushed past when cutting the corner, [None] for orthogonals
	pub fn flanks(&self) -> Option<[Ordinal; 2]> {
		match self {
			Ordinal::NorthEast => Some([Ordinal::North, Ordinal::East]),
			Ordinal::SouthEast => Some([Ordinal::South, Ordinal::East]),
			Ordinal::SouthWest => Some([Ordinal::South, Ordinal::West]),
			Ordinal::NorthWest => Some([Ordinal::North, Ordinal::West]),
			_ => None,
		}
	}
}

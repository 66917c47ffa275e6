//! Scenes may wrap around on either axis, walking off the right hand side of a horizontally
//! wrapping scene puts you back on the left hand side. The [WrapAdapter] is the single place
//! where positions, cells and regions are normalised onto such a torus.
//!
//! On an axis that doesn't wrap values are clamped into the scene instead.
//!
//! ```text
//!        wraps_x = true
//!  ___________________________
//! |  |                    |  |
//! |b |                    |a |   shortest_delta(a, b) crosses the seam
//! |__|____________________|__|   rather than the whole width
//! ```
//!

use bevy::prelude::*;

use crate::prelude::*;

/// Normalises coordinates for a scene of `width` x `height` which may wrap on either axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WrapAdapter {
	/// Size along `x`
	width: u32,
	/// Size along `y`
	height: u32,
	/// Whether `x` wraps around
	wraps_x: bool,
	/// Whether `y` wraps around
	wraps_y: bool,
}

impl WrapAdapter {
	/// Create a new instance of [WrapAdapter]
	pub fn new(width: u32, height: u32, wraps_x: bool, wraps_y: bool) -> Self {
		WrapAdapter {
			width,
			height,
			wraps_x,
			wraps_y,
		}
	}
	/// Create an adapter matching the dimensions and topology of some terrain
	pub fn from_terrain<T: TerrainQuery + ?Sized>(terrain: &T) -> Self {
		WrapAdapter::new(
			terrain.width(),
			terrain.height(),
			terrain.wraps_x(),
			terrain.wraps_y(),
		)
	}
	pub fn get_width(&self) -> u32 {
		self.width
	}
	pub fn get_height(&self) -> u32 {
		self.height
	}
	pub fn wraps_x(&self) -> bool {
		self.wraps_x
	}
	pub fn wraps_y(&self) -> bool {
		self.wraps_y
	}
	/// Whether the adapter covers no area at all
	pub fn is_degenerate(&self) -> bool {
		self.width == 0 || self.height == 0
	}
	/// Bring a scene position into `[0, width) x [0, height)`
	pub fn wrap_position(&self, position: Vec2) -> Vec2 {
		Vec2::new(
			wrap_f32(position.x, self.width, self.wraps_x),
			wrap_f32(position.y, self.height, self.wraps_y),
		)
	}
	/// Bring a cell coordinate into `[0, width) x [0, height)`
	pub fn wrap_cell(&self, cell: IVec2) -> IVec2 {
		IVec2::new(
			wrap_i32(cell.x, self.width, self.wraps_x),
			wrap_i32(cell.y, self.height, self.wraps_y),
		)
	}
	/// The vector travelled when going from `a` to `b` by the shortest route. On a wrapping axis
	/// this may cross the seam. When both routes are exactly as long the direct one is used so
	/// that `shortest_delta(a, b) == -shortest_delta(b, a)`
	pub fn shortest_delta(&self, a: Vec2, b: Vec2) -> Vec2 {
		let a = self.wrap_position(a);
		let b = self.wrap_position(b);
		Vec2::new(
			shortest_f32(b.x - a.x, self.width, self.wraps_x),
			shortest_f32(b.y - a.y, self.height, self.wraps_y),
		)
	}
	/// Cell variant of [WrapAdapter::shortest_delta]
	pub fn shortest_cell_delta(&self, a: IVec2, b: IVec2) -> IVec2 {
		let a = self.wrap_cell(a);
		let b = self.wrap_cell(b);
		IVec2::new(
			shortest_i32(b.x - a.x, self.width, self.wraps_x),
			shortest_i32(b.y - a.y, self.height, self.wraps_y),
		)
	}
	/// Split a rectangle that may hang over the edges of the scene into pieces lying inside of
	/// it. Overhangs on a wrapping axis reappear on the opposite side, on other axes they are
	/// clipped away. A rectangle at least as large as a wrapping axis covers the whole axis.
	///
	/// Returns at most four pieces and none if nothing of the rectangle lies in the scene
	pub fn normalize_region(&self, rect: TerrainRect) -> Vec<TerrainRect> {
		if rect.is_empty() || self.is_degenerate() {
			return vec![];
		}
		let xs = split_span(rect.x, rect.width, self.width, self.wraps_x);
		let ys = split_span(rect.y, rect.height, self.height, self.wraps_y);
		let mut pieces = Vec::with_capacity(xs.len() * ys.len());
		for (x, width) in xs.iter() {
			for (y, height) in ys.iter() {
				pieces.push(TerrainRect::new(*x, *y, *width, *height));
			}
		}
		pieces
	}
}

/// Wrap or clamp a float along an axis of length `dim`
fn wrap_f32(value: f32, dim: u32, wraps: bool) -> f32 {
	if dim == 0 {
		return 0.0;
	}
	let dim = dim as f32;
	if wraps {
		let wrapped = value.rem_euclid(dim);
		// tiny negative values can round up to exactly dim
		if wrapped >= dim {
			0.0
		} else {
			wrapped
		}
	} else {
		// largest float strictly below dim
		let max = f32::from_bits(dim.to_bits() - 1);
		value.clamp(0.0, max)
	}
}

/// Wrap or clamp an integer along an axis of length `dim`
fn wrap_i32(value: i32, dim: u32, wraps: bool) -> i32 {
	if dim == 0 {
		return 0;
	}
	let dim = dim as i32;
	if wraps {
		value.rem_euclid(dim)
	} else {
		value.clamp(0, dim - 1)
	}
}

/// Pick the shorter of the direct and across-seam difference of two wrapped floats
fn shortest_f32(raw: f32, dim: u32, wraps: bool) -> f32 {
	if !wraps {
		return raw;
	}
	let dim = dim as f32;
	if raw * 2.0 > dim {
		raw - dim
	} else if raw * 2.0 < -dim {
		raw + dim
	} else {
		raw
	}
}

/// Pick the shorter of the direct and across-seam difference of two wrapped integers
fn shortest_i32(raw: i32, dim: u32, wraps: bool) -> i32 {
	if !wraps {
		return raw;
	}
	let dim = dim as i32;
	if raw * 2 > dim {
		raw - dim
	} else if raw * 2 < -dim {
		raw + dim
	} else {
		raw
	}
}

/// Split a span `[start, start + len)` into `(start, len)` pieces inside of `[0, dim)`
fn split_span(start: i32, len: i32, dim: u32, wraps: bool) -> Vec<(i32, i32)> {
	let dim = dim as i32;
	if wraps {
		if len >= dim {
			return vec![(0, dim)];
		}
		let start = start.rem_euclid(dim);
		let end = start + len;
		if end <= dim {
			vec![(start, len)]
		} else {
			vec![(start, dim - start), (0, end - dim)]
		}
	} else {
		let min = start.max(0);
		let max = start.saturating_add(len).min(dim);
		if max > min {
			vec![(min, max - min)]
		} else {
			vec![]
		}
	}
}

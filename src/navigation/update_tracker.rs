//! Terrain edits are reported as dirty rectangles and applied to every [PathFinder] in one go,
//! rather than rebuilding the navigation of the whole scene after each dig.
//!

use parking_lot::Mutex;

use bevy::prelude::*;

use crate::prelude::*;

/// Collects rectangles of changed terrain until they are flushed into the [PathFinder]s
#[derive(Debug, Default)]
pub struct PartialUpdateTracker {
	/// Regions changed since the last flush, in scene pixels
	dirty: Mutex<Vec<TerrainRect>>,
}

impl PartialUpdateTracker {
	/// Record a changed region of terrain. The rectangle may hang over the edges of the scene
	pub fn register_change(&self, rect: TerrainRect) {
		if rect.is_empty() {
			return;
		}
		self.dirty.lock().push(rect);
	}
	/// Number of regions waiting to be applied
	pub fn pending(&self) -> usize {
		self.dirty.lock().len()
	}
	/// Forget every recorded region without applying it, used when navigation is rebuilt from
	/// scratch anyway
	pub fn clear(&self) {
		self.dirty.lock().clear();
	}
	/// Remove and coalesce the recorded regions. Duplicates and regions lying inside of another
	/// region are dropped, the result is sorted so it doesn't depend on the order changes were
	/// registered in
	pub fn take_coalesced(&self) -> Vec<TerrainRect> {
		let mut regions = std::mem::take(&mut *self.dirty.lock());
		regions.sort();
		regions.dedup();
		// largest first so a region only needs checking against those already kept, and a
		// container is always kept before anything it contains
		regions.sort_by_key(|r| std::cmp::Reverse(r.width as i64 * r.height as i64));
		let mut coalesced: Vec<TerrainRect> = Vec::with_capacity(regions.len());
		for rect in regions {
			if !coalesced.iter().any(|kept| kept.contains_rect(&rect)) {
				coalesced.push(rect);
			}
		}
		coalesced.sort();
		coalesced
	}
	/// Apply every recorded region to each of the `path_finders` and forget them. Returns
	/// whether any node was resampled
	pub fn flush_and_patch<T, P>(&self, terrain: &T, path_finders: &[P]) -> bool
	where
		T: TerrainQuery + ?Sized,
		P: AsRef<PathFinder>,
	{
		let regions = self.take_coalesced();
		if regions.is_empty() {
			return false;
		}
		let mut resampled = 0;
		for path_finder in path_finders.iter() {
			for rect in regions.iter() {
				resampled += path_finder.as_ref().patch_region(terrain, *rect);
			}
		}
		debug!(
			"Flushed {} dirty regions into {} path finders, {} nodes resampled",
			regions.len(),
			path_finders.len(),
			resampled
		);
		resampled > 0
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	#[test]
	fn register_and_clear() {
		let tracker = PartialUpdateTracker::default();
		tracker.register_change(TerrainRect::new(0, 0, 2, 2));
		tracker.register_change(TerrainRect::new(0, 0, 0, 2));
		assert_eq!(1, tracker.pending());
		tracker.clear();
		assert_eq!(0, tracker.pending());
	}
	#[test]
	fn coalesce_drops_duplicates_and_contained() {
		let tracker = PartialUpdateTracker::default();
		tracker.register_change(TerrainRect::new(5, 5, 1, 1));
		tracker.register_change(TerrainRect::new(0, 0, 10, 10));
		tracker.register_change(TerrainRect::new(20, 0, 2, 2));
		tracker.register_change(TerrainRect::new(20, 0, 2, 2));
		let result = tracker.take_coalesced();
		let actual = vec![TerrainRect::new(0, 0, 10, 10), TerrainRect::new(20, 0, 2, 2)];
		assert_eq!(actual, result);
		assert_eq!(0, tracker.pending());
	}
	#[test]
	fn coalesce_many_single_pixel_digs() {
		let tracker = PartialUpdateTracker::default();
		for x in 0..50 {
			for y in 0..50 {
				tracker.register_change(TerrainRect::cell(x, y));
				tracker.register_change(TerrainRect::cell(x, y));
			}
		}
		tracker.register_change(TerrainRect::new(10, 10, 5, 5));
		tracker.register_change(TerrainRect::new(0, 0, 20, 20));
		let result = tracker.take_coalesced();
		assert_eq!(2500 - 400 + 1, result.len());
		assert!(result.contains(&TerrainRect::new(0, 0, 20, 20)));
		assert!(!result.contains(&TerrainRect::new(10, 10, 5, 5)));
		assert!(result.windows(2).all(|w| w[0] < w[1]));
	}
	#[test]
	fn coalesce_order_independent() {
		let rects = [
			TerrainRect::new(3, 3, 2, 2),
			TerrainRect::new(1, 1, 1, 1),
			TerrainRect::new(0, 0, 4, 4),
		];
		let forward = PartialUpdateTracker::default();
		let backward = PartialUpdateTracker::default();
		for r in rects.iter() {
			forward.register_change(*r);
		}
		for r in rects.iter().rev() {
			backward.register_change(*r);
		}
		assert_eq!(forward.take_coalesced(), backward.take_coalesced());
	}
	#[test]
	fn flush_patches_every_path_finder() {
		let mut terrain = MaterialGrid::new(6, 3, false, false);
		terrain.fill_rect(TerrainRect::new(3, 0, 1, 3), MaterialId::INDESTRUCTIBLE);
		let settings = NavigationSettings::default();
		let cost_model = Arc::new(CostModel::from_settings(&settings));
		let path_finders: Vec<Arc<PathFinder>> = (0..3)
			.map(|slot| {
				Arc::new(PathFinder::new(
					&terrain,
					&settings,
					cost_model.clone(),
					Team::from_slot(slot),
				))
			})
			.collect();
		let tunnel = TerrainRect::cell(3, 1);
		terrain.fill_rect(tunnel, MaterialId::AIR);
		let tracker = PartialUpdateTracker::default();
		assert!(!tracker.flush_and_patch(&terrain, &path_finders));
		tracker.register_change(tunnel);
		assert!(tracker.flush_and_patch(&terrain, &path_finders));
		for path_finder in path_finders.iter() {
			let result = path_finder.find_path(Vec2::new(0.5, 1.5), Vec2::new(5.5, 1.5), 0.0);
			assert!(result.is_some());
		}
	}
	#[test]
	fn flush_outside_terrain() {
		let terrain = MaterialGrid::new(4, 4, false, false);
		let settings = NavigationSettings::default();
		let path_finders = vec![Arc::new(PathFinder::new(
			&terrain,
			&settings,
			Arc::new(CostModel::default()),
			Team::NoTeam,
		))];
		let tracker = PartialUpdateTracker::default();
		tracker.register_change(TerrainRect::new(10, 10, 2, 2));
		assert!(!tracker.flush_and_patch(&terrain, &path_finders));
		assert_eq!(0, tracker.pending());
	}
}

//! [SceneNavigation] ties the navigation of a scene together. It owns the terrain, a
//! [PathFinder] per team, the tracker of terrain changes and the scheduler of asynchronous
//! requests.
//!

use std::sync::Arc;

use bevy::prelude::*;

use crate::prelude::*;

/// Navigation of a single scene over terrain `T`
#[derive(Debug)]
pub struct SceneNavigation<T: TerrainQuery> {
	/// The material bitmap being navigated
	terrain: T,
	/// Configuration the navigation was built with
	settings: NavigationSettings,
	/// One solver per team plus the shared one
	path_finders: Arc<PathFinderSet>,
	/// Regions of terrain changed since the last update
	tracker: PartialUpdateTracker,
	/// Workers resolving asynchronous requests
	scheduler: PathRequestScheduler,
	/// Whether the last maintenance pass changed the navigation
	updated: bool,
}

impl<T: TerrainQuery> SceneNavigation<T> {
	/// Build the navigation of some terrain and start the path workers
	pub fn new(terrain: T, settings: NavigationSettings) -> Self {
		let cost_model = Arc::new(CostModel::from_settings(&settings));
		let path_finders = Arc::new(PathFinderSet::new(&terrain, &settings, cost_model));
		let scheduler = PathRequestScheduler::new(path_finders.clone(), settings.get_worker_count());
		SceneNavigation {
			terrain,
			settings,
			path_finders,
			tracker: PartialUpdateTracker::default(),
			scheduler,
			updated: false,
		}
	}
	/// Find a path on the calling thread. Positions off the terrain are wrapped or clamped onto
	/// it, a team without its own solver uses the shared one
	pub fn calculate_path(
		&self,
		start: Vec2,
		end: Vec2,
		dig_strength: f32,
		team: Team,
	) -> Option<PathResult> {
		self.path_finders
			.get(team)
			.find_path(start, end, dig_strength)
	}
	/// Queue a path query on the workers, see [SchedulerHandle::submit_async]
	pub fn calculate_path_async(
		&self,
		start: Vec2,
		end: Vec2,
		dig_strength: f32,
		team: Team,
		callback: Option<PathCallback>,
	) -> Arc<PathRequest> {
		self.scheduler
			.submit_async(start, end, dig_strength, team, callback)
	}
	/// Rebuild the navigation of every team from the whole terrain. Any pending changes are
	/// covered by the rebuild and dropped
	pub fn reset_path_finding(&mut self) {
		self.tracker.clear();
		self.path_finders.rebuild(&self.terrain);
		self.updated = true;
	}
	/// Apply the terrain changes registered since the last update to every team
	pub fn update_path_finding(&mut self) {
		self.updated = self
			.tracker
			.flush_and_patch(&self.terrain, self.path_finders.get_all());
	}
	/// Whether the last [SceneNavigation::update_path_finding] or
	/// [SceneNavigation::reset_path_finding] changed anything
	pub fn path_finding_updated(&self) -> bool {
		self.updated
	}
	/// Block until every asynchronous request made so far has been resolved
	pub fn block_until_all_pathing_requests_complete(&self) {
		self.scheduler.block_until_all_complete();
	}
	/// Record that a region of terrain has changed, it is applied by the next
	/// [SceneNavigation::update_path_finding]
	pub fn register_change(&self, rect: TerrainRect) {
		self.tracker.register_change(rect);
	}
	/// Mutate the terrain and register the edited region in one go
	pub fn edit_terrain<F>(&mut self, rect: TerrainRect, edit: F)
	where
		F: FnOnce(&mut T),
	{
		edit(&mut self.terrain);
		self.tracker.register_change(rect);
	}
	pub fn terrain(&self) -> &T {
		&self.terrain
	}
	pub fn settings(&self) -> &NavigationSettings {
		&self.settings
	}
	/// A cloneable handle for submitting requests from other threads
	pub fn scheduler(&self) -> SchedulerHandle {
		self.scheduler.handle()
	}
	/// The solver serving a team
	pub fn path_finder(&self, team: Team) -> &Arc<PathFinder> {
		self.path_finders.get(team)
	}
	/// Number of terrain changes waiting for the next update
	pub fn pending_changes(&self) -> usize {
		self.tracker.pending()
	}
}

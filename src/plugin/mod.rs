//! Defines the Bevy [Plugin] for SceneNavigation
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod path_layer;
pub mod terrain_layer;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum NavigationSet {
	/// Terrain changes are applied to the navigation
	Maintain,
	/// Path requests are dispatched and answered
	Query,
}

pub struct SceneNavigationPlugin;

impl Plugin for SceneNavigationPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<Ordinal>()
			.register_type::<Team>()
			.register_type::<TeamMask>()
			.register_type::<MaterialId>()
			.register_type::<TerrainRect>()
			.init_resource::<path_layer::PendingPathRequests>()
			.add_event::<terrain_layer::EventTerrainChanged>()
			.add_event::<terrain_layer::EventPathFindingUpdated>()
			.add_event::<path_layer::EventPathRequest>()
			.add_event::<path_layer::EventPathResolved>()
			.configure_sets(Update, (NavigationSet::Maintain, NavigationSet::Query).chain())
			.add_systems(
				Update,
				(
					(
						terrain_layer::process_terrain_changes,
						terrain_layer::update_path_finding,
					)
						.chain()
						.in_set(NavigationSet::Maintain),
					(
						path_layer::dispatch_path_requests,
						path_layer::publish_resolved_paths,
					)
						.chain()
						.in_set(NavigationSet::Query),
				),
			);
	}
}

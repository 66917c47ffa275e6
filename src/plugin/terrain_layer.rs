//! Logic for handling changes to the terrain of a scene which in turn resamples the navigation
//! of every team over the changed regions
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The navigation of the scene, inserted by the game once its terrain is known
#[derive(Resource, Debug)]
pub struct NavigationScene(SceneNavigation<MaterialGrid>);

impl NavigationScene {
	/// Create a new instance of [NavigationScene] by building the navigation of `terrain`
	pub fn new(terrain: MaterialGrid, settings: NavigationSettings) -> Self {
		NavigationScene(SceneNavigation::new(terrain, settings))
	}
	pub fn get(&self) -> &SceneNavigation<MaterialGrid> {
		&self.0
	}
	pub fn get_mut(&mut self) -> &mut SceneNavigation<MaterialGrid> {
		&mut self.0
	}
}

/// Used to report a region of terrain which has changed, optionally filling it with a new
/// material at the same time
#[derive(Event, Debug, Clone, Copy)]
pub struct EventTerrainChanged {
	/// Region in scene pixels, it may hang over the edges of the scene
	rect: TerrainRect,
	/// Material written into the region before it is registered
	fill: Option<MaterialId>,
}

impl EventTerrainChanged {
	/// The terrain under `rect` has already been changed
	pub fn new(rect: TerrainRect) -> Self {
		EventTerrainChanged { rect, fill: None }
	}
	/// Fill `rect` with `material`, e.g. digging a tunnel with [MaterialId::AIR]
	pub fn fill(rect: TerrainRect, material: MaterialId) -> Self {
		EventTerrainChanged {
			rect,
			fill: Some(material),
		}
	}
	pub fn get_rect(&self) -> TerrainRect {
		self.rect
	}
	pub fn get_fill(&self) -> Option<MaterialId> {
		self.fill
	}
}

/// Emitted when a maintenance pass changed the navigation of the scene
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPathFindingUpdated;

/// Read [EventTerrainChanged], apply any fills to the terrain and register the regions
#[cfg(not(tarpaulin_include))]
pub fn process_terrain_changes(
	mut events: EventReader<EventTerrainChanged>,
	scene: Option<ResMut<NavigationScene>>,
) {
	let Some(mut scene) = scene else {
		events.clear();
		return;
	};
	// coalesce events to avoid processing duplicates
	let mut coalesced: Vec<EventTerrainChanged> = Vec::new();
	for event in events.read() {
		if !coalesced
			.iter()
			.any(|c| c.rect == event.rect && c.fill == event.fill)
		{
			coalesced.push(*event);
		}
	}
	for event in coalesced.iter() {
		debug!("Terrain changed in {:?}", event.rect);
		let rect = event.rect;
		match event.fill {
			Some(material) => scene
				.get_mut()
				.edit_terrain(rect, |terrain| terrain.fill_rect(rect, material)),
			None => scene.get().register_change(rect),
		}
	}
}

/// Apply registered terrain changes to the navigation of every team, a frame without changes
/// leaves [SceneNavigation::path_finding_updated] `false`
#[cfg(not(tarpaulin_include))]
pub fn update_path_finding(
	scene: Option<ResMut<NavigationScene>>,
	mut event_updated: EventWriter<EventPathFindingUpdated>,
) {
	let Some(mut scene) = scene else {
		return;
	};
	// runs every frame so the updated flag only ever describes this frame's pass
	scene.get_mut().update_path_finding();
	if scene.get().path_finding_updated() {
		event_updated.write(EventPathFindingUpdated);
	}
}

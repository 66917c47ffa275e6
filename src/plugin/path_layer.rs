//! Logic for queueing path requests made through events onto the workers of the scene and
//! publishing their outcomes
//!

use std::sync::Arc;

use crate::prelude::*;
use bevy::prelude::*;

/// A request to path from `start` to `end`, resolved asynchronously and answered with an
/// [EventPathResolved]
#[derive(Event, Debug, Clone, Copy)]
pub struct EventPathRequest {
	/// Whoever wants the path, handed back in the [EventPathResolved]
	requester: Option<Entity>,
	/// Scene position to path from
	start: Vec2,
	/// Scene position to path to
	end: Vec2,
	/// Material resistance the requester can dig through
	dig_strength: f32,
	/// Team of the requester
	team: Team,
}

impl EventPathRequest {
	pub fn new(
		requester: Option<Entity>,
		start: Vec2,
		end: Vec2,
		dig_strength: f32,
		team: Team,
	) -> Self {
		EventPathRequest {
			requester,
			start,
			end,
			dig_strength,
			team,
		}
	}
	pub fn get_requester(&self) -> Option<Entity> {
		self.requester
	}
}

/// The outcome of an [EventPathRequest]
#[derive(Event, Debug, Clone)]
pub struct EventPathResolved {
	/// Whoever asked for the path
	requester: Option<Entity>,
	/// The answer
	outcome: PathOutcome,
}

impl EventPathResolved {
	pub fn get_requester(&self) -> Option<Entity> {
		self.requester
	}
	pub fn get_outcome(&self) -> &PathOutcome {
		&self.outcome
	}
}

/// Requests on the workers which haven't been published yet
#[derive(Resource, Debug, Default)]
pub struct PendingPathRequests(Vec<(Option<Entity>, Arc<PathRequest>)>);

impl PendingPathRequests {
	/// Number of requests still in flight
	pub fn len(&self) -> usize {
		self.0.len()
	}
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Read [EventPathRequest] and queue them onto the workers of the scene
#[cfg(not(tarpaulin_include))]
pub fn dispatch_path_requests(
	mut events: EventReader<EventPathRequest>,
	scene: Option<Res<NavigationScene>>,
	mut pending: ResMut<PendingPathRequests>,
) {
	let Some(scene) = scene else {
		events.clear();
		return;
	};
	for event in events.read() {
		let request = scene.get().calculate_path_async(
			event.start,
			event.end,
			event.dig_strength,
			event.team,
			None,
		);
		pending.0.push((event.requester, request));
	}
}

/// Publish an [EventPathResolved] for every request the workers have finished
#[cfg(not(tarpaulin_include))]
pub fn publish_resolved_paths(
	mut pending: ResMut<PendingPathRequests>,
	mut event_resolved: EventWriter<EventPathResolved>,
) {
	pending.0.retain(|(requester, request)| {
		let Some(outcome) = request.get_result() else {
			return true;
		};
		event_resolved.write(EventPathResolved {
			requester: *requester,
			outcome: outcome.clone(),
		});
		false
	});
}

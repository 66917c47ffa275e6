//! Path queries can be expensive over large scenes so they are resolved away from the caller by
//! a small pool of worker threads draining a shared queue.
//!
//! ```text
//!  submit_async ──┐                ┌─> worker 0 ──┐
//!  submit_async ──┼──> queue ──────┼─> worker 1 ──┼──> PathRequest::resolve
//!  submit_sync  ──┘                └─> worker n ──┘
//! ```
//!
//! Every request gets a sequence number on submission and stays outstanding until a worker has
//! resolved it, [SchedulerHandle::block_until_all_complete] waits on the outstanding set rather
//! than polling.
//!

use std::{
	collections::BTreeSet,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	thread::JoinHandle,
};

use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::prelude::*;

pub mod path_request;

/// State shared between the handles and the workers
#[derive(Debug)]
struct SchedulerShared {
	/// Solvers searched by the workers
	path_finders: Arc<PathFinderSet>,
	/// Sequence number of the next request
	next_sequence: AtomicU64,
	/// Sequence numbers submitted but not yet resolved
	outstanding: Mutex<BTreeSet<u64>>,
	/// Signalled whenever a request leaves `outstanding`
	drained: Condvar,
}

impl SchedulerShared {
	/// Search for and resolve a single request
	fn process(&self, request: &PathRequest) {
		let outcome = if request.is_cancelled() {
			PathOutcome::Cancelled
		} else {
			self.path_finders.get(request.get_team()).find_path_cancellable(
				request.get_start(),
				request.get_end(),
				request.get_dig_strength(),
				request.get_cancel_flag(),
			)
		};
		debug!(
			"Resolved path request {} for {:?}: {}",
			request.get_sequence(),
			request.get_team(),
			match &outcome {
				PathOutcome::Found(_) => "found",
				PathOutcome::NoPath => "no path",
				PathOutcome::Cancelled => "cancelled",
			}
		);
		request.resolve(outcome);
		self.outstanding.lock().remove(&request.get_sequence());
		self.drained.notify_all();
	}
}

/// Cloneable access to a [PathRequestScheduler] for submitting requests from any thread
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
	/// State shared with the workers
	shared: Arc<SchedulerShared>,
	/// Entry to the queue, taken when the scheduler shuts down
	sender: Arc<RwLock<Option<Sender<Arc<PathRequest>>>>>,
}

impl SchedulerHandle {
	/// Queue a path query and return immediately. `callback` is run on the resolving worker,
	/// it must not block on other requests of the same scheduler.
	///
	/// Panics if the scheduler has been shut down
	pub fn submit_async(
		&self,
		start: Vec2,
		end: Vec2,
		dig_strength: f32,
		team: Team,
		callback: Option<PathCallback>,
	) -> Arc<PathRequest> {
		let sequence = self.shared.next_sequence.fetch_add(1, Ordering::SeqCst);
		let request = Arc::new(PathRequest::new(
			sequence,
			start,
			end,
			dig_strength,
			team,
			callback,
		));
		// outstanding before queued so a worker can never remove it first
		self.shared.outstanding.lock().insert(sequence);
		let sender = self.sender.read();
		let Some(sender) = sender.as_ref() else {
			self.shared.outstanding.lock().remove(&sequence);
			self.shared.drained.notify_all();
			panic!("Path request submitted after the scheduler was shut down");
		};
		if let Err(e) = sender.send(request.clone()) {
			// every worker is gone, resolve on the calling thread rather than never
			error!("Path workers have stopped, resolving request inline: {}", e);
			self.shared.process(&request);
		}
		request
	}
	/// Queue a path query and block until it is resolved
	pub fn submit_sync(&self, start: Vec2, end: Vec2, dig_strength: f32, team: Team) -> PathOutcome {
		self.submit_async(start, end, dig_strength, team, None).wait()
	}
	/// Block until every request submitted before this call has been resolved. Requests
	/// submitted while waiting are not waited on
	pub fn block_until_all_complete(&self) {
		let barrier = self.shared.next_sequence.load(Ordering::SeqCst);
		let mut outstanding = self.shared.outstanding.lock();
		while outstanding.first().is_some_and(|s| *s < barrier) {
			self.shared.drained.wait(&mut outstanding);
		}
	}
	/// Number of requests submitted but not yet resolved
	pub fn outstanding(&self) -> usize {
		self.shared.outstanding.lock().len()
	}
	/// Whether new requests are still accepted
	pub fn is_running(&self) -> bool {
		self.sender.read().is_some()
	}
}

/// Owns the worker threads resolving [PathRequest]s
#[derive(Debug)]
pub struct PathRequestScheduler {
	/// Submission side
	handle: SchedulerHandle,
	/// Running workers, joined on shutdown
	workers: Vec<JoinHandle<()>>,
}

impl PathRequestScheduler {
	/// Start `worker_count` threads searching the `path_finders`
	pub fn new(path_finders: Arc<PathFinderSet>, worker_count: usize) -> Self {
		let shared = Arc::new(SchedulerShared {
			path_finders,
			next_sequence: AtomicU64::new(0),
			outstanding: Mutex::new(BTreeSet::new()),
			drained: Condvar::new(),
		});
		let (sender, receiver) = crossbeam_channel::unbounded();
		let mut workers = Vec::with_capacity(worker_count);
		for i in 0..worker_count {
			let worker_shared = shared.clone();
			let worker_receiver = receiver.clone();
			let spawned = std::thread::Builder::new()
				.name(format!("path-worker-{}", i))
				.spawn(move || worker_loop(worker_receiver, worker_shared));
			match spawned {
				Ok(worker) => workers.push(worker),
				Err(e) => error!("Failed to start path worker {}: {}", i, e),
			}
		}
		info!("Started {} path workers", workers.len());
		PathRequestScheduler {
			handle: SchedulerHandle {
				shared,
				sender: Arc::new(RwLock::new(Some(sender))),
			},
			workers,
		}
	}
	/// A cloneable handle for submitting from other threads
	pub fn handle(&self) -> SchedulerHandle {
		self.handle.clone()
	}
	/// See [SchedulerHandle::submit_async]
	pub fn submit_async(
		&self,
		start: Vec2,
		end: Vec2,
		dig_strength: f32,
		team: Team,
		callback: Option<PathCallback>,
	) -> Arc<PathRequest> {
		self.handle
			.submit_async(start, end, dig_strength, team, callback)
	}
	/// See [SchedulerHandle::submit_sync]
	pub fn submit_sync(&self, start: Vec2, end: Vec2, dig_strength: f32, team: Team) -> PathOutcome {
		self.handle.submit_sync(start, end, dig_strength, team)
	}
	/// See [SchedulerHandle::block_until_all_complete]
	pub fn block_until_all_complete(&self) {
		self.handle.block_until_all_complete();
	}
	/// See [SchedulerHandle::outstanding]
	pub fn outstanding(&self) -> usize {
		self.handle.outstanding()
	}
	/// Stop accepting requests, let the workers finish what is already queued and join them.
	/// Submitting through any handle afterwards panics
	pub fn shutdown(&mut self) {
		// dropping the only sender disconnects the queue once it is empty
		if self.handle.sender.write().take().is_none() {
			return;
		}
		for worker in self.workers.drain(..) {
			if worker.join().is_err() {
				error!("A path worker panicked");
			}
		}
		info!("Path workers stopped");
	}
}

impl Drop for PathRequestScheduler {
	fn drop(&mut self) {
		self.shutdown();
	}
}

/// Resolve requests until the queue disconnects
fn worker_loop(receiver: Receiver<Arc<PathRequest>>, shared: Arc<SchedulerShared>) {
	while let Ok(request) = receiver.recv() {
		shared.process(&request);
	}
}

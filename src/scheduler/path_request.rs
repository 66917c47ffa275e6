//! A PathRequest is the handle to a query resolved on a worker thread. It is shared between the
//! caller and the worker through an [Arc], the caller can poll [PathRequest::is_complete], block
//! on [PathRequest::wait] or hand over a callback run once the result is known.
//!

use std::{
	panic::AssertUnwindSafe,
	sync::{
		atomic::{AtomicBool, Ordering},
		OnceLock,
	},
};

use bevy::prelude::*;
use parking_lot::{Condvar, Mutex};

use crate::prelude::*;

/// Run on the worker thread once a request has been resolved
pub type PathCallback = Box<dyn FnOnce(&PathOutcome) + Send + 'static>;

/// An asynchronous path query
pub struct PathRequest {
	/// Order of submission, used by the scheduler to know which requests came before a barrier
	sequence: u64,
	/// Scene position to path from, wrapped or clamped when searched
	start: Vec2,
	/// Scene position to path to, wrapped or clamped when searched
	end: Vec2,
	/// Material resistance the requester can dig through
	dig_strength: f32,
	/// Team of the requester
	team: Team,
	/// Raised once `result` holds the outcome
	complete: AtomicBool,
	/// Written exactly once by the resolving worker
	result: OnceLock<PathOutcome>,
	/// Raised by the caller when it no longer needs the outcome
	cancelled: AtomicBool,
	/// Optional notification of completion
	callback: Mutex<Option<PathCallback>>,
	/// Guards waiting on `completed`
	wait_lock: Mutex<()>,
	/// Signalled when `complete` is raised
	completed: Condvar,
}

impl std::fmt::Debug for PathRequest {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PathRequest")
			.field("sequence", &self.sequence)
			.field("start", &self.start)
			.field("end", &self.end)
			.field("dig_strength", &self.dig_strength)
			.field("team", &self.team)
			.field("complete", &self.is_complete())
			.field("cancelled", &self.is_cancelled())
			.field("result", &self.get_result())
			.finish()
	}
}

impl PathRequest {
	/// Create a new instance of [PathRequest]
	pub(crate) fn new(
		sequence: u64,
		start: Vec2,
		end: Vec2,
		dig_strength: f32,
		team: Team,
		callback: Option<PathCallback>,
	) -> Self {
		PathRequest {
			sequence,
			start,
			end,
			dig_strength,
			team,
			complete: AtomicBool::new(false),
			result: OnceLock::new(),
			cancelled: AtomicBool::new(false),
			callback: Mutex::new(callback),
			wait_lock: Mutex::new(()),
			completed: Condvar::new(),
		}
	}
	pub fn get_sequence(&self) -> u64 {
		self.sequence
	}
	pub fn get_start(&self) -> Vec2 {
		self.start
	}
	pub fn get_end(&self) -> Vec2 {
		self.end
	}
	pub fn get_dig_strength(&self) -> f32 {
		self.dig_strength
	}
	pub fn get_team(&self) -> Team {
		self.team
	}
	/// Whether the outcome is available. Once this returns `true` [PathRequest::get_result]
	/// is guaranteed to return the outcome
	pub fn is_complete(&self) -> bool {
		self.complete.load(Ordering::Acquire)
	}
	/// The outcome, [None] until the request completes
	pub fn get_result(&self) -> Option<&PathOutcome> {
		if self.is_complete() {
			self.result.get()
		} else {
			None
		}
	}
	/// Ask for the request to be abandoned. A request still waiting in the queue resolves as
	/// [PathOutcome::Cancelled] without searching, one being searched stops at its next check.
	/// A request which already completed keeps its outcome
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);
	}
	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Acquire)
	}
	/// Flag polled by the search
	pub(crate) fn get_cancel_flag(&self) -> &AtomicBool {
		&self.cancelled
	}
	/// Block the calling thread until the request completes and return the outcome
	pub fn wait(&self) -> PathOutcome {
		let mut guard = self.wait_lock.lock();
		loop {
			if let Some(outcome) = self.get_result() {
				return outcome.clone();
			}
			self.completed.wait(&mut guard);
		}
	}
	/// Store the outcome, wake any waiters and run the callback. Only the first call has any
	/// effect, returns whether this call resolved the request. A panic in the callback is
	/// logged and swallowed
	pub(crate) fn resolve(&self, outcome: PathOutcome) -> bool {
		if self.result.set(outcome).is_err() {
			error!("Path request {} was resolved twice", self.sequence);
			return false;
		}
		{
			// raised under the lock so a waiter can't miss the wake up between its check and wait
			let _guard = self.wait_lock.lock();
			self.complete.store(true, Ordering::Release);
		}
		self.completed.notify_all();
		let callback = self.callback.lock().take();
		if let (Some(callback), Some(outcome)) = (callback, self.result.get()) {
			// a panicking callback must not take the resolving worker down with it
			let ran = std::panic::catch_unwind(AssertUnwindSafe(|| callback(outcome)));
			if ran.is_err() {
				error!("Callback of path request {} panicked", self.sequence);
			}
		}
		true
	}
}

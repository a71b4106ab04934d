//! The multi-resolution path record handed out per request
//!
//! A [MultiPath] carries up to three sub-paths of the same journey, one per
//! resolution. The fine sub-path covers the stretch just ahead of the agent,
//! the medium and low sub-paths cover the remainder coarsely and are refined
//! chunk by chunk as the agent advances. All sub-paths store their waypoints
//! goal first and are consumed from the tail.
//!

use bevy::prelude::*;

use crate::prelude::*;

/// A path across up to three resolutions plus its request parameters
#[derive(Clone, Debug)]
pub struct MultiPath {
	/// The class the path was planned for
	class_id: MobilityClassId,
	/// The agent the path belongs to
	caller: CallerId,
	/// Where the request started
	start: Vec3,
	/// What the request asked to reach
	goal: SearchGoal,
	/// Cell-resolution stretch just ahead of the agent
	fine: SubPath,
	/// Medium-resolution remainder
	med: SubPath,
	/// Low-resolution remainder
	low: SubPath,
	/// Lifecycle state, starts [PathResult::Uninitialized] until a search has
	/// run
	result: PathResult,
	/// Raised when a batch drain rewrote the sub-paths, cleared by the caller
	/// once it has re-read them
	updated: bool,
}

impl MultiPath {
	/// Create a new instance of [MultiPath] with no sub-paths yet
	pub fn new(class_id: MobilityClassId, caller: CallerId, start: Vec3, goal: SearchGoal) -> Self {
		MultiPath {
			class_id,
			caller,
			start,
			goal,
			fine: SubPath::default(),
			med: SubPath::default(),
			low: SubPath::default(),
			result: PathResult::Uninitialized,
			updated: false,
		}
	}
	/// Whether the sub-paths were rewritten since the flag was last cleared
	pub fn is_updated(&self) -> bool {
		self.updated
	}
	/// Raise the rewrite flag
	pub fn mark_updated(&mut self) {
		self.updated = true;
	}
	/// Clear the rewrite flag
	pub fn clear_updated(&mut self) {
		self.updated = false;
	}
	/// Get the class the path was planned for
	pub fn get_class_id(&self) -> MobilityClassId {
		self.class_id
	}
	/// Get the agent the path belongs to
	pub fn get_caller(&self) -> CallerId {
		self.caller
	}
	/// Get the start of the request
	pub fn get_start(&self) -> Vec3 {
		self.start
	}
	/// Get the goal of the request
	pub fn get_goal(&self) -> &SearchGoal {
		&self.goal
	}
	/// Get the lifecycle state
	pub fn get_result(&self) -> PathResult {
		self.result
	}
	/// Set the lifecycle state
	pub fn set_result(&mut self, result: PathResult) {
		self.result = result;
	}
	/// Get the fine sub-path
	pub fn get_fine(&self) -> &SubPath {
		&self.fine
	}
	/// Get the fine sub-path mutably
	pub fn get_fine_mut(&mut self) -> &mut SubPath {
		&mut self.fine
	}
	/// Get the medium sub-path
	pub fn get_med(&self) -> &SubPath {
		&self.med
	}
	/// Get the medium sub-path mutably
	pub fn get_med_mut(&mut self) -> &mut SubPath {
		&mut self.med
	}
	/// Get the low sub-path
	pub fn get_low(&self) -> &SubPath {
		&self.low
	}
	/// Get the low sub-path mutably
	pub fn get_low_mut(&mut self) -> &mut SubPath {
		&mut self.low
	}
	/// Replace the fine sub-path
	pub fn set_fine(&mut self, path: SubPath) {
		self.fine = path;
	}
	/// Replace the medium sub-path
	pub fn set_med(&mut self, path: SubPath) {
		self.med = path;
	}
	/// Replace the low sub-path
	pub fn set_low(&mut self, path: SubPath) {
		self.low = path;
	}
	/// Whether every sub-path has been consumed or was never produced
	pub fn is_consumed(&self) -> bool {
		self.fine.is_empty() && self.med.is_empty() && self.low.is_empty()
	}
	/// The coarse sub-path the next refinement chunk comes from, the medium
	/// one while it lasts
	pub fn coarse_mut(&mut self) -> Option<&mut SubPath> {
		if !self.med.is_empty() {
			Some(&mut self.med)
		} else if !self.low.is_empty() {
			Some(&mut self.low)
		} else {
			None
		}
	}
	/// Stitch the sub-paths into one continuous journey
	///
	/// The finest produced sub-path gets its tail pinned to the start of the
	/// request, each coarser sub-path gets its tail pinned to the head of the
	/// next finer one, and the coarsest gets its head pinned to the goal. The
	/// goal pin is skipped when the path ends at a closest approach instead
	pub fn finalize(&mut self, start: Vec3, cant_get_closer: bool) {
		let finest = if !self.fine.is_empty() {
			&mut self.fine
		} else if !self.med.is_empty() {
			&mut self.med
		} else {
			&mut self.low
		};
		finest.set_tail(start);
		if !self.fine.is_empty() && !self.med.is_empty() {
			let head = self.fine.get_waypoints()[0];
			self.med.set_tail(head);
		}
		if !self.med.is_empty() && !self.low.is_empty() {
			let head = self.med.get_waypoints()[0];
			self.low.set_tail(head);
		}
		if cant_get_closer {
			return;
		}
		let goal = self.goal.get_goal();
		let coarsest = if !self.low.is_empty() {
			&mut self.low
		} else if !self.med.is_empty() {
			&mut self.med
		} else {
			&mut self.fine
		};
		coarsest.set_head(goal);
	}
}

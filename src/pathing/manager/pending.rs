//! The registry of searches waiting to run
//!
//! Synced callers never search inline, their requests are parked here and
//! drained in one batch by the per-tick update so the work can be spread
//! across workers while commits stay in a fixed order. The table is an
//! ordered map keyed by path id, which is also the drain order.
//!

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::prelude::*;

/// ID of the agent a path belongs to, used for traffic bookkeeping
#[derive(
	serde::Deserialize, serde::Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect,
)]
pub struct CallerId(u32);

impl CallerId {
	/// Create a new instance of [CallerId]
	pub fn new(id: u32) -> Self {
		CallerId(id)
	}
	/// Get the raw id
	pub fn get(&self) -> u32 {
		self.0
	}
}

/// What kind of work a parked search will do
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PendingKind {
	/// Arrange a freshly requested path across the resolutions
	Fresh,
	/// Refine the next chunk of an existing coarse path into cell resolution
	Extend,
}

/// One parked search
#[derive(Clone, Copy, Debug)]
pub struct PendingSearch {
	/// The work to do
	pub kind: PendingKind,
	/// Where the caller was when the search was parked
	pub start: Vec3,
}

/// All parked searches keyed by the path they belong to
#[derive(Default)]
pub struct PendingTable {
	/// The parked searches in path id order
	entries: BTreeMap<PathId, PendingSearch>,
}

impl PendingTable {
	/// Create a new empty instance of [PendingTable]
	pub fn new() -> Self {
		PendingTable {
			entries: BTreeMap::new(),
		}
	}
	/// Park a search for a path. A path can only hold one parked search, a
	/// second push for the same id is dropped so a fresh arrangement is never
	/// downgraded to an extension
	pub fn push(&mut self, id: PathId, search: PendingSearch) {
		self.entries.entry(id).or_insert(search);
	}
	/// Whether a path has a parked search
	pub fn contains(&self, id: PathId) -> bool {
		self.entries.contains_key(&id)
	}
	/// Iterate the parked searches in ascending path id order
	pub fn iter(&self) -> impl Iterator<Item = (&PathId, &PendingSearch)> {
		self.entries.iter()
	}
	/// Get the parked search of a path mutably
	pub fn get_mut(&mut self, id: PathId) -> Option<&mut PendingSearch> {
		self.entries.get_mut(&id)
	}
	/// Drop the parked search of a path, used when the path is deleted
	pub fn remove(&mut self, id: PathId) {
		self.entries.remove(&id);
	}
	/// Number of parked searches
	pub fn len(&self) -> usize {
		self.entries.len()
	}
	/// Whether no searches are parked
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
	/// Take every parked search in ascending path id order, leaving the table
	/// empty
	pub fn drain(&mut self) -> Vec<(PathId, PendingSearch)> {
		std::mem::take(&mut self.entries).into_iter().collect()
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn drain_is_id_ordered() {
		let mut table = PendingTable::new();
		for id in [7, 2, 9, 4] {
			table.push(
				PathId::new(id),
				PendingSearch {
					kind: PendingKind::Fresh,
					start: Vec3::ZERO,
				},
			);
		}
		let ids: Vec<u32> = table.drain().iter().map(|(id, _)| id.get()).collect();
		assert_eq!(vec![2, 4, 7, 9], ids);
		assert!(table.is_empty());
	}
	#[test]
	fn second_push_is_dropped() {
		let mut table = PendingTable::new();
		let id = PathId::new(3);
		table.push(
			id,
			PendingSearch {
				kind: PendingKind::Fresh,
				start: Vec3::ZERO,
			},
		);
		table.push(
			id,
			PendingSearch {
				kind: PendingKind::Extend,
				start: Vec3::ONE,
			},
		);
		let drained = table.drain();
		assert_eq!(1, drained.len());
		assert_eq!(PendingKind::Fresh, drained[0].1.kind);
	}
}

//! Defines the Bevy [Plugin] wiring the path manager into an [App]
//!
//! The manager lives in a [PathingResource] the game inserts at startup once
//! the terrain is known. Game systems talk to it through events for requests,
//! deletions and terrain edits, while queries such as
//! [PathManager::next_waypoint] are called directly on the resource. One
//! system per frame advances the manager a tick
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Ordering of the per-frame pathing work, event ingestion first, then the
/// batch drain of the manager
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum OrderingSet {
	/// Consume the events game systems emitted
	Ingest,
	/// Drain parked searches and update dirty blocks
	Advance,
}

/// The simulation tick counter driving the manager update cadence
#[derive(Resource, Default)]
pub struct SimulationTick(u32);

impl SimulationTick {
	/// Get the current tick
	pub fn get(&self) -> u32 {
		self.0
	}
}

/// Resource owning the [PathManager]
#[derive(Resource)]
pub struct PathingResource {
	/// The manager itself
	manager: PathManager,
}

impl PathingResource {
	/// Create a new instance of [PathingResource]
	pub fn new(manager: PathManager) -> Self {
		PathingResource { manager }
	}
	/// Get the manager
	pub fn get(&self) -> &PathManager {
		&self.manager
	}
	/// Get the manager mutably
	pub fn get_mut(&mut self) -> &mut PathManager {
		&mut self.manager
	}
}

/// Used to request a path for an agent
#[derive(Event)]
pub struct EventRequestPath {
	/// The mobility class the agent moves with
	class_id: MobilityClassId,
	/// The agent the path is for
	caller: CallerId,
	/// Where the agent is
	start: Vec3,
	/// Where the agent wants to go
	goal: Vec3,
	/// How close to the goal counts as arrival, in world units
	goal_radius: f32,
}

impl EventRequestPath {
	/// Create a new instance of [EventRequestPath]
	#[cfg(not(tarpaulin_include))]
	pub fn new(class_id: MobilityClassId, caller: CallerId, start: Vec3, goal: Vec3, goal_radius: f32) -> Self {
		EventRequestPath {
			class_id,
			caller,
			start,
			goal,
			goal_radius,
		}
	}
	/// Get the mobility class of the request
	#[cfg(not(tarpaulin_include))]
	pub fn get_class_id(&self) -> MobilityClassId {
		self.class_id
	}
	/// Get the agent the event concerns
	#[cfg(not(tarpaulin_include))]
	pub fn get_caller(&self) -> CallerId {
		self.caller
	}
	/// Get the start position
	#[cfg(not(tarpaulin_include))]
	pub fn get_start(&self) -> Vec3 {
		self.start
	}
	/// Get the goal position
	#[cfg(not(tarpaulin_include))]
	pub fn get_goal(&self) -> Vec3 {
		self.goal
	}
	/// Get the arrival radius
	#[cfg(not(tarpaulin_include))]
	pub fn get_goal_radius(&self) -> f32 {
		self.goal_radius
	}
}

/// Emitted once a request has been given its handle
#[derive(Event)]
pub struct EventPathAssigned {
	/// The agent the handle belongs to
	caller: CallerId,
	/// The handle of the stored path
	id: PathId,
}

impl EventPathAssigned {
	/// Create a new instance of [EventPathAssigned]
	pub fn new(caller: CallerId, id: PathId) -> Self {
		EventPathAssigned { caller, id }
	}
	/// Get the agent the event concerns
	#[cfg(not(tarpaulin_include))]
	pub fn get_caller(&self) -> CallerId {
		self.caller
	}
	/// Get the path handle
	#[cfg(not(tarpaulin_include))]
	pub fn get_id(&self) -> PathId {
		self.id
	}
}

/// Used to discard a path an agent no longer walks
#[derive(Event)]
pub struct EventDeletePath {
	/// The handle to discard
	id: PathId,
}

impl EventDeletePath {
	/// Create a new instance of [EventDeletePath]
	#[cfg(not(tarpaulin_include))]
	pub fn new(id: PathId) -> Self {
		EventDeletePath { id }
	}
	/// Get the path handle
	#[cfg(not(tarpaulin_include))]
	pub fn get_id(&self) -> PathId {
		self.id
	}
}

/// Used to notify the manager of an edited cell rectangle
#[derive(Event)]
pub struct EventTerrainChange {
	/// North west corner of the edit
	min: GridCell,
	/// South east corner of the edit
	max: GridCell,
}

impl EventTerrainChange {
	/// Create a new instance of [EventTerrainChange]
	#[cfg(not(tarpaulin_include))]
	pub fn new(min: GridCell, max: GridCell) -> Self {
		EventTerrainChange { min, max }
	}
	/// Get the north west corner of the edit
	#[cfg(not(tarpaulin_include))]
	pub fn get_min(&self) -> GridCell {
		self.min
	}
	/// Get the south east corner of the edit
	#[cfg(not(tarpaulin_include))]
	pub fn get_max(&self) -> GridCell {
		self.max
	}
}

/// Read [EventRequestPath] and park the requests with the manager, answering
/// each with an [EventPathAssigned]
pub fn process_path_requests(
	mut events: EventReader<EventRequestPath>,
	manager: Option<ResMut<PathingResource>>,
	mut assigned: EventWriter<EventPathAssigned>,
) {
	let Some(mut resource) = manager else {
		return;
	};
	for event in events.read() {
		let id = resource.get_mut().request_path(
			event.get_class_id(),
			event.get_caller(),
			event.get_start(),
			event.get_goal(),
			event.get_goal_radius(),
			true,
		);
		debug!("Path {} assigned to caller {}", id.get(), event.get_caller().get());
		assigned.write(EventPathAssigned::new(event.get_caller(), id));
	}
}

/// Read [EventDeletePath] and discard the named paths
pub fn process_path_deletions(
	mut events: EventReader<EventDeletePath>,
	manager: Option<ResMut<PathingResource>>,
) {
	let Some(mut resource) = manager else {
		return;
	};
	for event in events.read() {
		resource.get_mut().delete_path(event.get_id());
	}
}

/// Read [EventTerrainChange] and queue the touched blocks for recomputation
pub fn process_terrain_changes(
	mut events: EventReader<EventTerrainChange>,
	manager: Option<ResMut<PathingResource>>,
) {
	let Some(mut resource) = manager else {
		return;
	};
	for event in events.read() {
		resource.get_mut().terrain_changed(event.get_min(), event.get_max());
	}
}

/// Advance the manager one simulation tick
pub fn advance_manager(mut tick: ResMut<SimulationTick>, manager: Option<ResMut<PathingResource>>) {
	let Some(mut resource) = manager else {
		return;
	};
	tick.0 = tick.0.wrapping_add(1);
	resource.get_mut().update(tick.0);
}

/// The plugin wiring the path manager into a Bevy [App]
pub struct HierarchicalPathingPlugin;

impl Plugin for HierarchicalPathingPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		app.register_type::<GridCell>()
			.register_type::<BlockPos>()
			.register_type::<GridDimensions>()
			.register_type::<MobilityClassId>()
			.register_type::<MobilityClass>()
			.register_type::<MobilityRegistry>()
			.register_type::<PathId>()
			.register_type::<CallerId>()
			.register_type::<PathResult>()
			.init_resource::<SimulationTick>()
			.add_event::<EventRequestPath>()
			.add_event::<EventPathAssigned>()
			.add_event::<EventDeletePath>()
			.add_event::<EventTerrainChange>()
			.configure_sets(Update, (OrderingSet::Ingest, OrderingSet::Advance).chain())
			.add_systems(
				Update,
				(
					(
						process_terrain_changes,
						process_path_requests,
						process_path_deletions,
					)
						.chain()
						.in_set(OrderingSet::Ingest),
					advance_manager.in_set(OrderingSet::Advance),
				),
			);
	}
}

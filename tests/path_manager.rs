//! End to end behaviour of the path manager, from request to walked goal
//!

use bevy::prelude::*;
use bevy_hierarchical_pathing_plugin::prelude::*;

/// A manager over a flat map with the given impassable cells and one walker
/// class, no cache
fn manager(columns: u32, rows: u32, walls: &[(u32, u32)], workers: usize) -> PathManager {
	let dims = GridDimensions::new(columns, rows, 1.0);
	let mut terrain = TerrainGrid::flat(dims);
	for (column, row) in walls {
		terrain.set_surface(GridCell::new(*column, *row), 1);
	}
	let registry = MobilityRegistry::new(vec![MobilityClass::new("walker", vec![1.0, 0.0])]);
	PathManager::new(PathingConfig::new("testmap", None, workers), terrain, registry)
}

/// Walk an agent along a path until the goal or a step limit, returning the
/// final position
fn walk(manager: &mut PathManager, id: PathId, mut position: Vec3, mut tick: u32) -> Vec3 {
	for _ in 0..500 {
		let Some(waypoint) = manager.next_waypoint(id, position, 1.5, true) else {
			break;
		};
		if waypoint.y < 0.0 {
			// provisional, the real answer is still parked
			tick += 1;
			manager.update(tick);
			continue;
		}
		position = Vec3::new(waypoint.x, 0.0, waypoint.z);
	}
	position
}

#[test]
fn reserved_id_yields_no_waypoint() {
	let mut manager = manager(32, 32, &[], 1);
	assert!(manager
		.next_waypoint(PathId::NONE, Vec3::ZERO, 1.0, true)
		.is_none());
	assert_eq!(PathResult::Error, manager.path_result(PathId::new(999)));
}

#[test]
fn synced_request_is_parked_then_solved() {
	let mut manager = manager(32, 32, &[], 1);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(1),
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(30.5, 0.0, 30.5),
		1.0,
		true,
	);
	assert!(!id.is_none());
	assert_eq!(PathResult::Uninitialized, manager.path_result(id));
	assert_eq!(1, manager.queued_search_count());
	// before the drain the caller gets a provisional direction to set off in
	let provisional = manager
		.next_waypoint(id, Vec3::new(0.5, 0.0, 0.5), 1.0, true)
		.unwrap();
	assert_eq!(-1.0, provisional.y);
	manager.update(1);
	assert_eq!(PathResult::Ok, manager.path_result(id));
	assert_eq!(0, manager.queued_search_count());
	// the rewrite flag tells the caller to re-read its waypoints
	assert!(manager.path_updated(id));
	manager.clear_path_updated(id);
	assert!(!manager.path_updated(id));
}

#[test]
fn unsynced_request_is_solved_inline() {
	let mut manager = manager(32, 32, &[], 1);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(1),
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(30.5, 0.0, 30.5),
		1.0,
		false,
	);
	assert_eq!(PathResult::Ok, manager.path_result(id));
	assert_eq!(0, manager.queued_search_count());
}

#[test]
fn short_path_walks_to_goal() {
	let mut manager = manager(32, 32, &[], 1);
	let goal = Vec3::new(28.5, 0.0, 3.5);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(1),
		Vec3::new(0.5, 0.0, 0.5),
		goal,
		1.0,
		true,
	);
	manager.update(1);
	let arrived = walk(&mut manager, id, Vec3::new(0.5, 0.0, 0.5), 1);
	assert!(sq_distance_2d(arrived, goal) < 4.0);
}

#[test]
fn long_path_refines_coarse_into_fine() {
	// distance beyond the fine arrangement cap, solved coarsely then refined
	let mut manager = manager(128, 128, &[], 1);
	let start = Vec3::new(0.5, 0.0, 0.5);
	let goal = Vec3::new(120.5, 0.0, 120.5);
	let id = manager.request_path(MobilityClassId::new(0), CallerId::new(9), start, goal, 2.0, true);
	manager.update(1);
	assert_eq!(PathResult::Ok, manager.path_result(id));
	// first answer steers along the coarse remainder while refinement parks
	let first = manager.next_waypoint(id, start, 1.5, true).unwrap();
	assert_eq!(-1.0, first.y);
	assert_eq!(1, manager.queued_search_count());
	manager.update(2);
	let refined = manager.next_waypoint(id, start, 1.5, true).unwrap();
	assert!(refined.y >= 0.0);
	let arrived = walk(&mut manager, id, start, 2);
	assert!(sq_distance_2d(arrived, goal) < 9.0);
}

#[test]
fn unknown_class_is_an_error() {
	let mut manager = manager(32, 32, &[], 1);
	let id = manager.request_path(
		MobilityClassId::new(7),
		CallerId::new(1),
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(30.5, 0.0, 30.5),
		1.0,
		false,
	);
	assert_eq!(PathResult::Error, manager.path_result(id));
	assert!(manager
		.next_waypoint(id, Vec3::new(0.5, 0.0, 0.5), 1.0, false)
		.is_none());
	// the parked flavour answers the same way after the drain
	let parked = manager.request_path(
		MobilityClassId::new(7),
		CallerId::new(2),
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(30.5, 0.0, 30.5),
		1.0,
		true,
	);
	manager.update(1);
	assert_eq!(PathResult::Error, manager.path_result(parked));
}

#[test]
fn re_request_before_the_drain_reuses_the_parked_search() {
	let mut manager = manager(64, 64, &[], 1);
	let start = Vec3::new(0.5, 0.0, 0.5);
	let first = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(3),
		start,
		Vec3::new(40.5, 0.0, 0.5),
		1.0,
		true,
	);
	let second = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(3),
		start,
		Vec3::new(0.5, 0.0, 40.5),
		1.0,
		true,
	);
	assert_eq!(first, second);
	assert_eq!(1, manager.live_path_count());
	assert_eq!(1, manager.queued_search_count());
	// another caller still gets its own handle
	let other = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(4),
		start,
		Vec3::new(40.5, 0.0, 40.5),
		1.0,
		true,
	);
	assert_ne!(first, other);
	manager.update(1);
	// the reused record answers the later goal
	let waypoints = manager.detailed_waypoints(second).unwrap();
	let head = *waypoints.last().unwrap();
	assert!(sq_distance_2d(head, Vec3::new(0.5, 0.0, 40.5)) < 4.0);
}

#[test]
fn height_gap_widens_the_search_distance() {
	// a plateau goal within fine range on the ground but not once the climb
	// counts
	let mut manager = manager(64, 64, &[], 1);
	for row in 0..64 {
		for column in 48..64 {
			manager.get_terrain_mut().set_height(GridCell::new(column, row), 30.0);
		}
	}
	let start = Vec3::new(10.5, 0.0, 10.5);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(1),
		start,
		Vec3::new(52.5, 30.0, 10.5),
		1.0,
		true,
	);
	manager.update(1);
	assert_eq!(PathResult::Ok, manager.path_result(id));
	// solved at block resolution, so the first answer is provisional while
	// the fine refinement parks
	let waypoint = manager.next_waypoint(id, start, 1.5, true).unwrap();
	assert_eq!(-1.0, waypoint.y);
}

#[test]
fn distant_goal_gets_the_medium_retry() {
	// a wall with a gap threaded by the medium blocks but not the low ones,
	// at a distance past the medium cap
	let walls: Vec<(u32, u32)> = (0..64).filter(|row| *row < 7 || *row > 9).map(|row| (500, row)).collect();
	let mut manager = manager(1100, 64, &walls, 1);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(1),
		Vec3::new(0.5, 0.0, 8.5),
		Vec3::new(1090.5, 0.0, 8.5),
		1.0,
		false,
	);
	assert_eq!(PathResult::Ok, manager.path_result(id));
}

#[test]
fn sealed_goal_ends_at_closest_approach() {
	// a full wall sealing off the east side
	let walls: Vec<(u32, u32)> = (0..32).map(|row| (20, row)).collect();
	let mut manager = manager(32, 32, &walls, 1);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(1),
		Vec3::new(0.5, 0.0, 15.5),
		Vec3::new(30.5, 0.0, 15.5),
		1.0,
		true,
	);
	manager.update(1);
	assert_eq!(PathResult::CantGetCloser, manager.path_result(id));
	// the caller still gets something to walk, all of it west of the wall
	let waypoints = manager.detailed_waypoints(id).unwrap();
	assert!(!waypoints.is_empty());
	for waypoint in waypoints {
		assert!(waypoint.x < 20.0);
	}
}

#[test]
fn identical_requests_identical_answers_across_worker_counts() {
	let walls: Vec<(u32, u32)> = (8..120).map(|row| (64, row)).collect();
	let mut narrow = manager(128, 128, &walls, 1);
	let mut wide = manager(128, 128, &walls, 4);
	let mut ids = Vec::new();
	for caller in 0..8 {
		let start = Vec3::new(1.5 + caller as f32 * 3.0, 0.0, 1.5);
		let goal = Vec3::new(126.5, 0.0, 100.5 + caller as f32);
		let a = narrow.request_path(MobilityClassId::new(0), CallerId::new(caller), start, goal, 1.0, true);
		let b = wide.request_path(MobilityClassId::new(0), CallerId::new(caller), start, goal, 1.0, true);
		assert_eq!(a, b);
		ids.push(a);
	}
	narrow.update(1);
	wide.update(1);
	for id in ids {
		assert_eq!(narrow.path_result(id), wide.path_result(id));
		assert_eq!(narrow.detailed_waypoints(id), wide.detailed_waypoints(id));
	}
	assert_eq!(narrow.path_checksum(), wide.path_checksum());
}

#[test]
fn terrain_edit_reroutes_later_requests() {
	let mut manager = manager(64, 64, &[], 1);
	let start = Vec3::new(0.5, 0.0, 32.5);
	let goal = Vec3::new(62.5, 0.0, 32.5);
	let before = manager.request_path(MobilityClassId::new(0), CallerId::new(1), start, goal, 1.0, true);
	manager.update(1);
	assert_eq!(PathResult::Ok, manager.path_result(before));
	// seal the map down the middle
	for row in 0..64 {
		manager.get_terrain_mut().set_surface(GridCell::new(40, row), 1);
	}
	manager.terrain_changed(GridCell::new(40, 0), GridCell::new(40, 63));
	let (med_queued, low_queued) = manager.queued_update_counts();
	assert!(med_queued > 0 && low_queued > 0);
	let mut tick = 1;
	while manager.queued_update_counts() != (0, 0) {
		tick += 1;
		manager.update(tick);
	}
	let after = manager.request_path(MobilityClassId::new(0), CallerId::new(2), start, goal, 1.0, true);
	tick += 1;
	manager.update(tick);
	assert_eq!(PathResult::CantGetCloser, manager.path_result(after));
}

#[test]
fn overlay_costs_survive_roundtrip_per_domain() {
	let mut manager = manager(32, 32, &[], 1);
	let cell = GridCell::new(10, 10);
	manager.set_node_extra_cost(cell, 25.0, true);
	manager.set_node_extra_cost(cell, 5.0, false);
	assert_eq!(25.0, manager.get_node_extra_cost(cell, true));
	assert_eq!(5.0, manager.get_node_extra_cost(cell, false));
	manager.set_node_extra_costs(vec![0.0; 32 * 32], true);
	assert_eq!(0.0, manager.get_node_extra_cost(cell, true));
	assert_eq!(5.0, manager.get_node_extra_cost(cell, false));
}

#[test]
fn deleted_paths_are_gone() {
	let mut manager = manager(32, 32, &[], 1);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(1),
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(30.5, 0.0, 30.5),
		1.0,
		true,
	);
	assert_eq!(1, manager.live_path_count());
	manager.delete_path(id);
	assert_eq!(0, manager.live_path_count());
	assert_eq!(0, manager.queued_search_count());
	assert!(manager.next_waypoint(id, Vec3::ZERO, 1.0, true).is_none());
	// deleting again is harmless
	manager.delete_path(id);
}

#[test]
fn traffic_booking_is_withdrawn_with_the_path() {
	let mut manager = manager(32, 32, &[], 1);
	let id = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(4),
		Vec3::new(0.5, 0.0, 0.5),
		Vec3::new(20.5, 0.0, 0.5),
		1.0,
		false,
	);
	manager.update_path(id);
	// a second unsynced request along the same row pays the heat and swerves
	let other = manager.request_path(
		MobilityClassId::new(0),
		CallerId::new(5),
		Vec3::new(0.5, 0.0, 2.5),
		Vec3::new(20.5, 0.0, 2.5),
		1.0,
		false,
	);
	assert_eq!(PathResult::Ok, manager.path_result(other));
	manager.delete_path(id);
}

#[test]
fn cache_roundtrip_between_managers() {
	let dir = tempfile::tempdir().unwrap();
	let dims = GridDimensions::new(64, 64, 1.0);
	let registry = MobilityRegistry::new(vec![MobilityClass::new("walker", vec![1.0, 0.0])]);
	let config = PathingConfig::new("glacier", Some(dir.path().to_path_buf()), 1);
	let first = PathManager::new(config.clone(), TerrainGrid::flat(dims), registry.clone());
	assert!(dir.path().join(cache_file_name("glacier", MED_BLOCK_SIZE)).exists());
	assert!(dir.path().join(cache_file_name("glacier", LOW_BLOCK_SIZE)).exists());
	let second = PathManager::new(config, TerrainGrid::flat(dims), registry);
	assert_eq!(first.path_checksum(), second.path_checksum());
	second.remove_cache_files().unwrap();
	assert!(!dir.path().join(cache_file_name("glacier", MED_BLOCK_SIZE)).exists());
}

//! The path manager, owner of all planner state and the only entry point
//! callers talk to
//!
//! Requests come in as a class, a start and a goal and go out as an opaque
//! [PathId]. Synced requests are parked in the pending table and solved in a
//! batch by the per-tick [PathManager::update], which spreads the searches
//! across a fixed set of worker-private engine triplets and commits the
//! results in ascending path id order so every participant of a lockstep
//! session sees identical state. Unsynced requests, previews and the like,
//! are solved inline.
//!

use std::collections::BTreeMap;
use std::path::PathBuf;

use bevy::prelude::*;
use rayon::prelude::*;

use crate::prelude::*;

pub mod multipath;
pub mod pending;

/// Opaque handle of a stored path, id `0` always means "no path"
#[derive(
	serde::Deserialize, serde::Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect,
)]
pub struct PathId(u32);

impl PathId {
	/// The reserved "no path" id
	pub const NONE: PathId = PathId(0);
	/// Create a new instance of [PathId]
	pub fn new(id: u32) -> Self {
		PathId(id)
	}
	/// Get the raw id
	pub fn get(&self) -> u32 {
		self.0
	}
	/// Whether this is the reserved "no path" id
	pub fn is_none(&self) -> bool {
		self.0 == 0
	}
}

/// Setup parameters of a [PathManager]
#[derive(Clone, Debug)]
pub struct PathingConfig {
	/// Name of the map, keys the cache files
	map_name: String,
	/// Where cache files live, [None] disables persistence
	cache_directory: Option<PathBuf>,
	/// Number of worker-private engine triplets built for the batch drain
	workers: usize,
}

impl PathingConfig {
	/// Create a new instance of [PathingConfig]
	pub fn new(map_name: &str, cache_directory: Option<PathBuf>, workers: usize) -> Self {
		if workers == 0 {
			panic!("A path manager needs at least one worker");
		}
		PathingConfig {
			map_name: map_name.to_string(),
			cache_directory,
			workers,
		}
	}
	/// Get the map name
	pub fn get_map_name(&self) -> &str {
		&self.map_name
	}
	/// Get the cache directory
	pub fn get_cache_directory(&self) -> Option<&PathBuf> {
		self.cache_directory.as_ref()
	}
	/// Get the worker count
	pub fn get_workers(&self) -> usize {
		self.workers
	}
}

/// The private search engines of one worker, one finder per resolution so a
/// worker never contends for scratch buffers
pub struct EngineSet {
	/// Cell-resolution finder
	fine: CellFinder,
	/// Medium block finder
	med: BlockFinder,
	/// Low block finder
	low: BlockFinder,
}

/// The operations a path planning backend exposes to the simulation, the
/// seam along which an alternative planner could be swapped in
pub trait PathingBackend {
	/// Request a path and get its handle, see [PathManager::request_path]
	fn request_path(
		&mut self,
		class_id: MobilityClassId,
		caller: CallerId,
		start: Vec3,
		goal: Vec3,
		goal_radius: f32,
		synced: bool,
	) -> PathId;
	/// The next point to walk toward, see [PathManager::next_waypoint]
	fn next_waypoint(&mut self, id: PathId, position: Vec3, radius: f32, synced: bool) -> Option<Vec3>;
	/// Discard a path, see [PathManager::delete_path]
	fn delete_path(&mut self, id: PathId);
	/// Advance one simulation tick, see [PathManager::update]
	fn update(&mut self, tick: u32);
	/// Note an edited cell rectangle, see [PathManager::terrain_changed]
	fn terrain_changed(&mut self, min: GridCell, max: GridCell);
	/// Lifecycle state of a path, see [PathManager::path_result]
	fn path_result(&self, id: PathId) -> PathResult;
}

/// Owner of every piece of planner state
pub struct PathManager {
	/// Setup parameters
	config: PathingConfig,
	/// Heights and surface types
	terrain: TerrainGrid,
	/// Movement capability profiles
	mobility: MobilityRegistry,
	/// Externally written extra costs
	overlay: CostOverlay,
	/// Recently trafficked cells
	heat: TrafficHeatMap,
	/// Dominant travel directions
	flow: TrafficFlowMap,
	/// Medium-resolution block data
	med_level: LevelState,
	/// Low-resolution block data
	low_level: LevelState,
	/// Worker-private engine triplets
	engines: Vec<EngineSet>,
	/// Every live path keyed by handle, ordered so batch commits and
	/// checksums are reproducible
	paths: BTreeMap<PathId, MultiPath>,
	/// Searches parked for the next batch drain
	pending: PendingTable,
	/// Next handle to hand out
	next_id: u32,
	/// How many of the per-tick block updates go to the medium level, the
	/// rest go to the low level
	med_share: usize,
}

impl PathManager {
	/// Create a new instance of [PathManager], loading the coarse levels from
	/// cache when a valid cache exists and building then persisting them
	/// otherwise
	pub fn new(config: PathingConfig, terrain: TerrainGrid, mobility: MobilityRegistry) -> Self {
		let dims = *terrain.get_dimensions();
		let hash = terrain.content_hash();
		let med_level = Self::load_or_build(&config, &terrain, &mobility, MED_BLOCK_SIZE, hash);
		let low_level = Self::load_or_build(&config, &terrain, &mobility, LOW_BLOCK_SIZE, hash);
		let engines = (0..config.workers)
			.map(|_| EngineSet {
				fine: CellFinder::new(dims),
				med: BlockFinder::new(&med_level),
				low: BlockFinder::new(&low_level),
			})
			.collect();
		info!(
			"Path manager ready for map '{}', {}x{} cells, {} workers",
			config.map_name,
			dims.get_columns(),
			dims.get_rows(),
			config.workers
		);
		PathManager {
			config,
			overlay: CostOverlay::new(dims),
			heat: TrafficHeatMap::new(dims),
			flow: TrafficFlowMap::new(dims),
			med_level,
			low_level,
			engines,
			paths: BTreeMap::new(),
			pending: PendingTable::new(),
			next_id: 1,
			med_share: BLOCKS_TO_UPDATE / 2,
			terrain,
			mobility,
		}
	}
	/// Load one coarse level from cache, falling back to a fresh build that
	/// is then persisted for the next load
	fn load_or_build(
		config: &PathingConfig,
		terrain: &TerrainGrid,
		mobility: &MobilityRegistry,
		block_size: u32,
		terrain_hash: u32,
	) -> LevelState {
		let dims = *terrain.get_dimensions();
		if let Some(directory) = &config.cache_directory {
			match load_level(directory, &config.map_name, block_size, terrain_hash) {
				Ok(data) => {
					if let Some(level) = LevelState::from_data(dims, data, mobility) {
						debug!("Loaded block size {block_size} level of '{}' from cache", config.map_name);
						return level;
					}
					debug!("Cached block size {block_size} level does not fit the map, rebuilding");
				}
				Err(error) => {
					warn!("No usable block size {block_size} cache for '{}': {error}", config.map_name);
				}
			}
		}
		let level = LevelState::build(dims, block_size, terrain, mobility);
		if let Some(directory) = &config.cache_directory {
			if let Err(error) = save_level(directory, &config.map_name, terrain_hash, &level) {
				error!("Failed to persist block size {block_size} cache: {error}");
			}
		}
		level
	}
	/// Request a path for a class from a start to within a radius of a goal.
	/// Synced requests are parked and solved by the next [PathManager::update],
	/// their paths answer with provisional waypoints until then, and a caller
	/// re-requesting while it still has a parked request keeps its handle.
	/// Unsynced requests are solved before this returns
	pub fn request_path(
		&mut self,
		class_id: MobilityClassId,
		caller: CallerId,
		start: Vec3,
		goal: Vec3,
		goal_radius: f32,
		synced: bool,
	) -> PathId {
		let dims = *self.terrain.get_dimensions();
		let start = dims.clamp_world(start);
		let goal_pos = dims.clamp_world(goal);
		let search_goal = SearchGoal::new(goal_pos, goal_radius * goal_radius, FINE_NODE_BUDGET, synced);
		let mut path = MultiPath::new(class_id, caller, start, search_goal);
		if synced {
			// a caller re-requesting before its parked search ran overwrites
			// the parked record instead of leaking a second one
			let parked = self.pending.iter().find_map(|(id, search)| {
				(search.kind == PendingKind::Fresh
					&& self.paths.get(id).is_some_and(|held| held.get_caller() == caller))
				.then_some(*id)
			});
			let id = match parked {
				Some(id) => {
					if let Some(entry) = self.pending.get_mut(id) {
						entry.start = start;
					}
					id
				}
				None => {
					let id = self.allocate_id();
					self.pending.push(
						id,
						PendingSearch {
							kind: PendingKind::Fresh,
							start,
						},
					);
					id
				}
			};
			self.paths.insert(id, path);
			return id;
		}
		let id = self.allocate_id();
		{
			let PathManager {
				engines,
				terrain,
				mobility,
				overlay,
				heat,
				flow,
				med_level,
				low_level,
				..
			} = self;
			let ctx = SearchContext {
				terrain: &*terrain,
				mobility: &*mobility,
				overlay: &*overlay,
				heat: &*heat,
				flow: &*flow,
			};
			Self::arrange(&mut engines[0], &ctx, med_level, low_level, &mut path, start);
		}
		self.paths.insert(id, path);
		id
	}
	/// The next point a caller should walk toward
	///
	/// Waypoints already within the radius of the position are consumed. A
	/// waypoint with a `y` of `-1.0` is provisional, a direction to set off
	/// in while the real search or refinement is still parked. [None] means
	/// the path is unknown, failed or fully consumed
	pub fn next_waypoint(&mut self, id: PathId, position: Vec3, radius: f32, synced: bool) -> Option<Vec3> {
		if id.is_none() {
			return None;
		}
		let PathManager {
			engines,
			terrain,
			mobility,
			overlay,
			heat,
			flow,
			paths,
			pending,
			..
		} = self;
		let path = paths.get_mut(&id)?;
		let dims = *terrain.get_dimensions();
		let step = radius.max(dims.get_cell_size() * 2.0);
		match path.get_result() {
			PathResult::Error => return None,
			PathResult::Uninitialized => {
				return Some(provisional(position, path.get_goal().get_goal(), step));
			}
			_ => {}
		}
		// top up the fine sub-path before it runs dry
		let extension = FINE_EXTENSION_DISTANCE * dims.get_cell_size();
		let fine_head = path.get_fine().get_waypoints().first().copied();
		let runs_dry = path.get_fine().len() <= 2
			|| match fine_head {
				Some(head) => sq_distance_2d(position, head) < extension * extension,
				None => true,
			};
		if runs_dry && (!path.get_med().is_empty() || !path.get_low().is_empty()) {
			if synced {
				if !pending.contains(id) {
					pending.push(
						id,
						PendingSearch {
							kind: PendingKind::Extend,
							start: position,
						},
					);
				}
			} else {
				let ctx = SearchContext {
					terrain: &*terrain,
					mobility: &*mobility,
					overlay: &*overlay,
					heat: &*heat,
					flow: &*flow,
				};
				Self::refine(&mut engines[0], &ctx, path, position);
			}
		}
		let sq_radius = radius * radius;
		let fine = path.get_fine_mut();
		while let Some(waypoint) = fine.next_waypoint() {
			if fine.len() > 1 && sq_distance_2d(waypoint, position) <= sq_radius {
				fine.pop_waypoint();
			} else {
				break;
			}
		}
		if let Some(waypoint) = path.get_fine().next_waypoint() {
			if sq_distance_2d(waypoint, position) > sq_radius {
				return Some(waypoint);
			}
			path.get_fine_mut().pop_waypoint();
		}
		// fine exhausted, steer toward the coarse remainder while the
		// refinement catches up
		if let Some(coarse) = path.coarse_mut() {
			let target = coarse.next_waypoint()?;
			return Some(provisional(position, target, step));
		}
		None
	}
	/// Discard a path and everything booked against it
	pub fn delete_path(&mut self, id: PathId) {
		if let Some(path) = self.paths.remove(&id) {
			self.heat.withdraw(path.get_caller());
		}
		self.pending.remove(id);
	}
	/// Advance one simulation tick. Drains the parked searches across the
	/// workers, decays the traffic layers and recomputes a bounded number of
	/// dirty blocks, splitting the bound between the levels by their queue
	/// pressure
	pub fn update(&mut self, tick: u32) {
		self.drain_pending();
		self.heat.decay();
		self.flow.decay();
		if tick % TICKS_PER_RATIO_REFRESH == 0 {
			let med_queued = self.med_level.queued_updates();
			let low_queued = self.low_level.queued_updates();
			self.med_share = if med_queued + low_queued == 0 {
				BLOCKS_TO_UPDATE / 2
			} else {
				(BLOCKS_TO_UPDATE * med_queued).div_ceil(med_queued + low_queued)
			};
		}
		let med_quota = self.med_share.min(BLOCKS_TO_UPDATE);
		self.med_level.update_blocks(&self.terrain, &self.mobility, med_quota);
		self.low_level
			.update_blocks(&self.terrain, &self.mobility, BLOCKS_TO_UPDATE - med_quota);
	}
	/// Run every parked search, spread across the worker engines, and commit
	/// the results in ascending path id order
	fn drain_pending(&mut self) {
		if self.pending.is_empty() {
			return;
		}
		let work = self.pending.drain();
		let PathManager {
			engines,
			terrain,
			mobility,
			overlay,
			heat,
			flow,
			med_level,
			low_level,
			paths,
			..
		} = self;
		let terrain = &*terrain;
		let mobility = &*mobility;
		let overlay = &*overlay;
		let heat = &*heat;
		let flow = &*flow;
		let med_level = &*med_level;
		let low_level = &*low_level;
		// snapshot the records so workers never touch the shared table
		let jobs: Vec<(PathId, PendingSearch, MultiPath)> = work
			.into_iter()
			.filter_map(|(id, search)| paths.get(&id).map(|path| (id, search, path.clone())))
			.collect();
		if jobs.is_empty() {
			return;
		}
		let chunk_size = jobs.len().div_ceil(engines.len());
		let results: Vec<Vec<(PathId, MultiPath)>> = engines
			.par_iter_mut()
			.zip(jobs.par_chunks(chunk_size))
			.map(|(engine, chunk)| {
				let ctx = SearchContext {
					terrain,
					mobility,
					overlay,
					heat,
					flow,
				};
				chunk
					.iter()
					.map(|(id, search, path)| {
						let mut path = path.clone();
						match search.kind {
							PendingKind::Fresh => {
								Self::arrange(engine, &ctx, med_level, low_level, &mut path, search.start);
							}
							PendingKind::Extend => {
								Self::refine(engine, &ctx, &mut path, search.start);
							}
						}
						(*id, path)
					})
					.collect()
			})
			.collect();
		// chunks were cut from an id-sorted list, flattening in chunk order
		// commits in id order
		for chunk in results {
			for (id, mut path) in chunk {
				if paths.contains_key(&id) {
					path.mark_updated();
					paths.insert(id, path);
				}
			}
		}
	}
	/// Solve a fresh request across the resolutions
	///
	/// A straight-line walk is tried for nearby goals, then the levels are
	/// tried finest first under their distance caps, keeping the best
	/// outcome. A request whose capped tries left it short of the goal gets one
	/// distance-uncapped medium try, so a far goal is never stuck with what
	/// the low resolution alone could recover. The winning sub-paths are
	/// stitched and, at a closest
	/// approach with nothing to walk, a lone start waypoint is planted so the
	/// caller still receives an answer
	fn arrange(
		engine: &mut EngineSet,
		ctx: &SearchContext,
		med_level: &LevelState,
		low_level: &LevelState,
		path: &mut MultiPath,
		start: Vec3,
	) {
		let dims = *ctx.terrain.get_dimensions();
		let start = dims.clamp_world(start);
		let request = *path.get_goal();
		let class_id = path.get_class_id();
		// the climb counts toward the estimate so cliff goals pick the right
		// resolution
		let distance_cells = (sq_distance_2d(start, request.get_goal()).sqrt()
			+ (request.get_goal().y - start.y).abs())
			/ dims.get_cell_size();
		path.set_fine(SubPath::default());
		path.set_med(SubPath::default());
		path.set_low(SubPath::default());
		let mut best = PathResult::Uninitialized;
		if distance_cells < RAW_SEARCH_DISTANCE {
			let goal = with_budget(&request, FINE_NODE_BUDGET);
			if let Some(sub) = engine.fine.raw_search(ctx, start, &goal, class_id) {
				path.set_fine(sub);
				best = PathResult::Ok;
			}
		}
		if best != PathResult::Ok && distance_cells < FINE_SEARCH_DISTANCE {
			let goal = with_budget(&request, FINE_NODE_BUDGET);
			let outcome = engine.fine.search(ctx, start, &goal, class_id);
			if outcome.result < best {
				best = outcome.result;
				path.set_fine(outcome.path);
			}
		}
		let mut med_tried = false;
		if best != PathResult::Ok && distance_cells < MED_SEARCH_DISTANCE {
			med_tried = true;
			let goal = with_budget(&request, COARSE_NODE_BUDGET);
			let outcome = engine.med.search(ctx, med_level, start, &goal, class_id);
			if outcome.result < best {
				best = outcome.result;
				path.set_fine(SubPath::default());
				path.set_med(outcome.path);
			}
		}
		if best != PathResult::Ok {
			let goal = with_budget(&request, COARSE_NODE_BUDGET);
			let outcome = engine.low.search(ctx, low_level, start, &goal, class_id);
			if outcome.result < best {
				best = outcome.result;
				path.set_fine(SubPath::default());
				path.set_med(SubPath::default());
				path.set_low(outcome.path);
			}
		}
		if best != PathResult::Ok && !med_tried {
			let goal = with_budget(&request, COARSE_NODE_BUDGET);
			let outcome = engine.med.search(ctx, med_level, start, &goal, class_id);
			if outcome.result < best {
				best = outcome.result;
				path.set_fine(SubPath::default());
				path.set_low(SubPath::default());
				path.set_med(outcome.path);
			}
		}
		if best == PathResult::Uninitialized {
			best = PathResult::Error;
		}
		path.set_result(best);
		let cant_get_closer = best == PathResult::CantGetCloser;
		path.finalize(start, cant_get_closer);
		if cant_get_closer && path.is_consumed() {
			let cell = dims.clamped_cell_from_world(start);
			path.get_fine_mut().push_tail(start, cell);
		}
	}
	/// Refine the next chunk of the coarse remainder of a path into cell
	/// resolution
	///
	/// The targeted coarse waypoint is kept as the tail of the remainder and
	/// the refined fine sub-path is pinned to it, so the resolutions always
	/// meet at a shared seam. Only the final coarse waypoint is consumed by
	/// its refinement
	fn refine(engine: &mut EngineSet, ctx: &SearchContext, path: &mut MultiPath, position: Vec3) {
		let dims = *ctx.terrain.get_dimensions();
		let extension = FINE_EXTENSION_DISTANCE * dims.get_cell_size();
		let class_id = path.get_class_id();
		let synced = path.get_goal().is_synced();
		let target = {
			let Some(coarse) = path.coarse_mut() else {
				return;
			};
			// coarse points the caller has effectively walked past are spent
			while coarse.len() > 1 {
				let Some(next) = coarse.next_waypoint() else {
					break;
				};
				if sq_distance_2d(next, position) < extension * extension {
					coarse.pop_waypoint();
				} else {
					break;
				}
			}
			let Some(target) = coarse.next_waypoint() else {
				return;
			};
			target
		};
		let arrival = dims.get_cell_size() * 1.5;
		let goal = SearchGoal::new(target, arrival * arrival, REFINE_NODE_BUDGET, synced);
		let outcome = engine.fine.search(ctx, position, &goal, class_id);
		match outcome.result {
			PathResult::Ok => {
				let mut fine = outcome.path;
				if let Some(coarse) = path.coarse_mut() {
					if coarse.len() > 1 {
						// the target stays, it is the seam the next
						// refinement resumes from
						fine.set_head(target);
					} else {
						coarse.pop_waypoint();
					}
				}
				path.set_fine(fine);
			}
			PathResult::GoalOutOfRange => {
				path.set_fine(outcome.path);
			}
			_ => {}
		}
	}
	/// Note that a cell rectangle of the terrain was edited, queueing the
	/// touched blocks of both levels for recomputation
	pub fn terrain_changed(&mut self, min: GridCell, max: GridCell) {
		self.med_level.terrain_changed(min, max);
		self.low_level.terrain_changed(min, max);
	}
	/// Lifecycle state of a path, [PathResult::Error] for unknown handles
	pub fn path_result(&self, id: PathId) -> PathResult {
		self.paths
			.get(&id)
			.map(|path| path.get_result())
			.unwrap_or(PathResult::Error)
	}
	/// Book the traffic of a path against its owner, depositing heat on its
	/// fine cells and flow along its fine waypoints. Called when the owner
	/// actually starts walking the path
	pub fn update_path(&mut self, id: PathId) {
		let Some(path) = self.paths.get(&id) else {
			return;
		};
		let owner = path.get_caller();
		let cells: Vec<GridCell> = path.get_fine().get_cells().to_vec();
		let waypoints = path.get_fine().get_waypoints();
		let mut flows: Vec<(GridCell, bevy::math::Vec2)> = Vec::new();
		for i in 1..waypoints.len() {
			// walking order runs tail to head
			let step = waypoints[i - 1] - waypoints[i];
			flows.push((
				path.get_fine().get_cells()[i - 1],
				bevy::math::Vec2::new(step.x, step.z),
			));
		}
		self.heat.deposit(owner, &cells);
		for (cell, direction) in flows {
			self.flow.add_flow(cell, direction);
		}
	}
	/// Set the extra traversal cost of a cell in one determinism domain
	pub fn set_node_extra_cost(&mut self, cell: GridCell, cost: f32, synced: bool) {
		self.overlay.set_cost(cell, cost, synced);
	}
	/// Read back the extra traversal cost of a cell in one domain
	pub fn get_node_extra_cost(&self, cell: GridCell, synced: bool) -> f32 {
		self.overlay.raw_cost(cell, synced)
	}
	/// Replace the whole extra-cost grid of one domain
	pub fn set_node_extra_costs(&mut self, costs: Vec<f32>, synced: bool) {
		self.overlay.set_costs(costs, synced);
	}
	/// Read back the whole extra-cost grid of one domain
	pub fn get_node_extra_costs(&self, synced: bool) -> &[f32] {
		self.overlay.costs(synced)
	}
	/// Whether a path was re-searched since the flag was last cleared, so
	/// callers know to re-read their waypoints
	pub fn path_updated(&self, id: PathId) -> bool {
		self.paths.get(&id).is_some_and(|path| path.is_updated())
	}
	/// Clear the re-search flag of a path
	pub fn clear_path_updated(&mut self, id: PathId) {
		if let Some(path) = self.paths.get_mut(&id) {
			path.clear_updated();
		}
	}
	/// A stable checksum over the coarse state, compared across the
	/// participants of a lockstep session to catch desyncs
	pub fn path_checksum(&self) -> u32 {
		self.med_level.checksum() ^ self.low_level.checksum().rotate_left(16)
	}
	/// Dirty block counts of the medium and low levels
	pub fn queued_update_counts(&self) -> (usize, usize) {
		(self.med_level.queued_updates(), self.low_level.queued_updates())
	}
	/// Number of searches parked for the next update
	pub fn queued_search_count(&self) -> usize {
		self.pending.len()
	}
	/// The remaining fine waypoints of a path in walking order, for debug
	/// drawing
	pub fn detailed_waypoints(&self, id: PathId) -> Option<Vec<Vec3>> {
		self.paths
			.get(&id)
			.map(|path| path.get_fine().get_waypoints().iter().rev().copied().collect())
	}
	/// Delete the cache files of this map, forcing a rebuild on next load
	pub fn remove_cache_files(&self) -> Result<(), CacheError> {
		if let Some(directory) = &self.config.cache_directory {
			crate::pathing::cache::remove_cache_files(
				directory,
				&self.config.map_name,
				&[MED_BLOCK_SIZE, LOW_BLOCK_SIZE],
			)?;
		}
		Ok(())
	}
	/// Get the terrain
	pub fn get_terrain(&self) -> &TerrainGrid {
		&self.terrain
	}
	/// Get the terrain mutably, edits must be followed by
	/// [PathManager::terrain_changed]
	pub fn get_terrain_mut(&mut self) -> &mut TerrainGrid {
		&mut self.terrain
	}
	/// Get the mobility registry
	pub fn get_mobility(&self) -> &MobilityRegistry {
		&self.mobility
	}
	/// Get the setup parameters
	pub fn get_config(&self) -> &PathingConfig {
		&self.config
	}
	/// Number of live paths
	pub fn live_path_count(&self) -> usize {
		self.paths.len()
	}
	/// Hand out the next path handle, skipping the reserved id on wrap
	fn allocate_id(&mut self) -> PathId {
		let id = PathId::new(self.next_id);
		self.next_id = self.next_id.wrapping_add(1);
		if self.next_id == 0 {
			self.next_id = 1;
		}
		id
	}
}

impl PathingBackend for PathManager {
	fn request_path(
		&mut self,
		class_id: MobilityClassId,
		caller: CallerId,
		start: Vec3,
		goal: Vec3,
		goal_radius: f32,
		synced: bool,
	) -> PathId {
		PathManager::request_path(self, class_id, caller, start, goal, goal_radius, synced)
	}
	fn next_waypoint(&mut self, id: PathId, position: Vec3, radius: f32, synced: bool) -> Option<Vec3> {
		PathManager::next_waypoint(self, id, position, radius, synced)
	}
	fn delete_path(&mut self, id: PathId) {
		PathManager::delete_path(self, id)
	}
	fn update(&mut self, tick: u32) {
		PathManager::update(self, tick)
	}
	fn terrain_changed(&mut self, min: GridCell, max: GridCell) {
		PathManager::terrain_changed(self, min, max)
	}
	fn path_result(&self, id: PathId) -> PathResult {
		PathManager::path_result(self, id)
	}
}

/// A copy of a request goal with a different node budget
fn with_budget(goal: &SearchGoal, node_budget: u32) -> SearchGoal {
	SearchGoal::new(goal.get_goal(), goal.get_sq_radius(), node_budget, goal.is_synced())
}

/// A stand-in waypoint pointing from a position toward a target, marked with
/// a `y` of `-1.0` so callers can tell it from a real one
fn provisional(position: Vec3, target: Vec3, step: f32) -> Vec3 {
	let delta = Vec3::new(target.x - position.x, 0.0, target.z - position.z);
	let direction = delta.normalize_or_zero();
	let mut point = position + direction * step;
	point.y = -1.0;
	point
}

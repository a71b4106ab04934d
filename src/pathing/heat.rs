//! Crowd-avoidance layers fed by the paths agents actually walk
//!
//! The heat map charges extra cost for cells that recently carried traffic so
//! later searches spread agents out instead of funnelling everyone down the
//! same corridor. The flow map records the dominant travel direction per cell
//! and penalizes moving against it. Both layers decay over simulation ticks
//! and both are part of the synced state, every participant must feed them
//! identically.
//!

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::prelude::*;

/// Fraction of heat retained by a cell per decay tick
const HEAT_DECAY: f32 = 0.96;
/// Heat deposited on a cell of a freshly walked path
const HEAT_PER_CELL: f32 = 4.0;
/// Weight of heat when folded into a traversal cost
const HEAT_COST_WEIGHT: f32 = 0.125;
/// Fraction of flow retained by a cell per decay tick
const FLOW_DECAY: f32 = 0.90;
/// Largest cost penalty for moving head-on against the flow of a cell
const FLOW_COST_WEIGHT: f32 = 0.5;

/// Recently-trafficked cells and the extra cost they carry
pub struct TrafficHeatMap {
	/// Dimensions of the map
	dims: GridDimensions,
	/// Current heat per cell in row-major order
	heat: Vec<f32>,
	/// Cells each owner last deposited on, so a re-deposit replaces rather
	/// than stacks. Ordered map keeps removal deterministic
	deposits: BTreeMap<CallerId, Vec<usize>>,
}

impl TrafficHeatMap {
	/// Create a new instance of [TrafficHeatMap] with no heat anywhere
	pub fn new(dims: GridDimensions) -> Self {
		TrafficHeatMap {
			dims,
			heat: vec![0.0; dims.cell_count()],
			deposits: BTreeMap::new(),
		}
	}
	/// Current heat of a cell
	pub fn heat(&self, cell: GridCell) -> f32 {
		self.heat[self.dims.cell_index(cell)]
	}
	/// Extra traversal cost a search pays for entering a cell
	pub fn cost(&self, cell: GridCell) -> f32 {
		self.heat[self.dims.cell_index(cell)] * HEAT_COST_WEIGHT
	}
	/// Deposit heat along the cells of a path on behalf of an owner. Any
	/// previous deposit of the same owner is withdrawn first
	pub fn deposit(&mut self, owner: CallerId, cells: &[GridCell]) {
		self.withdraw(owner);
		let mut indices = Vec::with_capacity(cells.len());
		for cell in cells {
			let index = self.dims.cell_index(*cell);
			self.heat[index] += HEAT_PER_CELL;
			indices.push(index);
		}
		if !indices.is_empty() {
			self.deposits.insert(owner, indices);
		}
	}
	/// Withdraw the current deposit of an owner, typically because the owner
	/// abandoned its path or died
	pub fn withdraw(&mut self, owner: CallerId) {
		if let Some(indices) = self.deposits.remove(&owner) {
			for index in indices {
				self.heat[index] = (self.heat[index] - HEAT_PER_CELL).max(0.0);
			}
		}
	}
	/// Decay all heat by one tick
	pub fn decay(&mut self) {
		for value in self.heat.iter_mut() {
			*value *= HEAT_DECAY;
		}
	}
}

/// Dominant travel direction per cell and the penalty for opposing it
pub struct TrafficFlowMap {
	/// Dimensions of the map
	dims: GridDimensions,
	/// Accumulated travel direction per cell across the ground plane
	flow: Vec<Vec2>,
}

impl TrafficFlowMap {
	/// Create a new instance of [TrafficFlowMap] with no flow anywhere
	pub fn new(dims: GridDimensions) -> Self {
		TrafficFlowMap {
			dims,
			flow: vec![Vec2::ZERO; dims.cell_count()],
		}
	}
	/// Current flow of a cell
	pub fn flow(&self, cell: GridCell) -> Vec2 {
		self.flow[self.dims.cell_index(cell)]
	}
	/// Record movement through a cell in a ground-plane direction
	pub fn add_flow(&mut self, cell: GridCell, direction: Vec2) {
		let index = self.dims.cell_index(cell);
		self.flow[index] += direction.normalize_or_zero();
	}
	/// Extra traversal cost for stepping into a cell along a direction. Moving
	/// with the flow is free, moving head-on against a saturated flow pays the
	/// full weight
	pub fn cost(&self, cell: GridCell, direction: Vec2) -> f32 {
		let flow = self.flow[self.dims.cell_index(cell)];
		if flow == Vec2::ZERO {
			return 0.0;
		}
		let against = -direction.normalize_or_zero().dot(flow.clamp_length_max(1.0));
		against.max(0.0) * FLOW_COST_WEIGHT
	}
	/// Decay all flow by one tick
	pub fn decay(&mut self) {
		for value in self.flow.iter_mut() {
			*value *= FLOW_DECAY;
		}
	}
}

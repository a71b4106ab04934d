//! Measure the initial block-data build of the coarse levels
//!
//! World is 512 by 512 cells
//!

use bevy_hierarchical_pathing_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Build one coarse level from scratch
fn build(terrain: &TerrainGrid, registry: &MobilityRegistry, block_size: u32) -> LevelState {
	LevelState::build(*terrain.get_dimensions(), block_size, terrain, registry)
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("initialisation");
	group.significance_level(0.05).sample_size(20);
	let dims = GridDimensions::new(512, 512, 1.0);
	let terrain = TerrainGrid::flat(dims);
	let registry = MobilityRegistry::new(vec![
		MobilityClass::new("walker", vec![1.0, 0.0]),
		MobilityClass::new("hover", vec![1.0, 0.6]),
	]);
	group.bench_function("build_med_level", |b| {
		b.iter(|| build(black_box(&terrain), black_box(&registry), MED_BLOCK_SIZE))
	});
	group.bench_function("build_low_level", |b| {
		b.iter(|| build(black_box(&terrain), black_box(&registry), LOW_BLOCK_SIZE))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

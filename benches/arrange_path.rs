//! Measure solving a batch of long-range requests in one update
//!
//! World is 512 by 512 cells with a scattering of walls
//!

use bevy::prelude::*;
use bevy_hierarchical_pathing_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Build a manager over a walled map
fn prepare_manager(workers: usize) -> PathManager {
	let dims = GridDimensions::new(512, 512, 1.0);
	let mut terrain = TerrainGrid::flat(dims);
	for row in 64..448 {
		terrain.set_surface(GridCell::new(256, row), 1);
	}
	for column in 64..448 {
		terrain.set_surface(GridCell::new(column, 128), 1);
	}
	let registry = MobilityRegistry::new(vec![MobilityClass::new("walker", vec![1.0, 0.0])]);
	PathManager::new(PathingConfig::new("bench", None, workers), terrain, registry)
}

/// Park a batch of requests in the four map corners and drain them
fn arrange_batch(manager: &mut PathManager) {
	for caller in 0..32u32 {
		let offset = caller as f32 * 2.0;
		manager.request_path(
			MobilityClassId::new(0),
			CallerId::new(caller),
			Vec3::new(2.5 + offset, 0.0, 2.5),
			Vec3::new(500.5 - offset, 0.0, 500.5),
			2.0,
			true,
		);
	}
	manager.update(1);
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(50);
	group.bench_function("arrange_batch_4_workers", |b| {
		b.iter_with_setup(
			|| prepare_manager(4),
			|mut manager| arrange_batch(black_box(&mut manager)),
		)
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

//! Measure finding a path across a large scene
//!
//! Scene is 512 by 512 pixels scattered with diggable and indestructible material
//!

use std::sync::Arc;

use bevy::prelude::Vec2;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use scene_navigation_tiles::prelude::*;

/// Create terrain where roughly a quarter of the pixels are rock and a twentieth indestructible
fn prepare_terrain(width: u32, height: u32) -> MaterialGrid {
	let mut rng = StdRng::seed_from_u64(7);
	let mut terrain = MaterialGrid::new(width, height, true, false);
	for y in 0..height {
		for x in 0..width {
			let roll: f32 = rng.random();
			if roll < 0.05 {
				terrain.set_material(x, y, MaterialId::INDESTRUCTIBLE);
			} else if roll < 0.3 {
				terrain.set_material(x, y, MaterialId(rng.random_range(1..100)));
			}
		}
	}
	// keep the start and end clear
	terrain.fill_rect(TerrainRect::new(0, 0, 4, 4), MaterialId::AIR);
	terrain.fill_rect(TerrainRect::new(width as i32 - 4, height as i32 - 4, 4, 4), MaterialId::AIR);
	terrain
}

/// Find a path from the top left to the bottom right corner
fn calc(path_finder: &PathFinder, end: Vec2, dig_strength: f32) {
	let _path = path_finder.find_path(Vec2::new(1.0, 1.0), end, dig_strength);
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(50);
	let terrain = prepare_terrain(512, 512);
	let settings = NavigationSettings::default();
	let path_finder = PathFinder::new(
		&terrain,
		&settings,
		Arc::new(CostModel::from_settings(&settings)),
		Team::NoTeam,
	);
	let end = Vec2::new(510.0, 510.0);
	group.bench_function("calc_path_no_dig", |b| {
		b.iter(|| calc(&path_finder, black_box(end), black_box(0.0)))
	});
	group.bench_function("calc_path_dig", |b| {
		b.iter(|| calc(&path_finder, black_box(end), black_box(50.0)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

//! Planner benchmarks
//!
//! Benchmarks for the CPU-heavy planning operations:
//! - Bulk traversability expansion (plane fits over a full map)
//! - Successor generation, serial and parallel
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;

use bhumi_map::{CellIndex, MlsGrid, SurfacePatch};
use chatur_nav::{
    DiscreteAngle, Mobility, Motion, MotionKind, MotionTable, NavEnvironment, Pose2, PoseWithCell,
    SearchSpace, TravBuilder, TraversabilityConfig,
};
use nalgebra::{Vector2, Vector3};

const NUM_ANGLES: u16 = 16;

/// Gently rolling 60 x 60 terrain.
fn rolling_mls(n: usize) -> Arc<MlsGrid> {
    let mut grid = MlsGrid::new(n, n, 0.1, Vector2::zeros());
    for y in 0..n as i32 {
        for x in 0..n as i32 {
            let z = 0.05 * (x as f64 * 0.2).sin() + 0.05 * (y as f64 * 0.3).cos();
            grid.add_patch(CellIndex::new(x, y), SurfacePatch::thin(z));
        }
    }
    Arc::new(grid)
}

fn bench_config(parallel: bool) -> TraversabilityConfig {
    TraversabilityConfig {
        robot_height: 1.2,
        parallelism_enabled: parallel,
        ..TraversabilityConfig::default()
    }
}

/// Straight and diagonal hops out of every heading bin.
fn bench_table() -> MotionTable {
    let mut table = MotionTable::new(NUM_ANGLES);
    for bin in 0..NUM_ANGLES as i32 {
        let theta = DiscreteAngle::new(bin, NUM_ANGLES);
        for (dx, dy) in [(1, 0), (1, 1), (1, -1), (0, 1), (0, -1)] {
            let dist = 0.1 * ((dx * dx + dy * dy) as f64).sqrt();
            table
                .push(Motion {
                    id: chatur_nav::MotionId(0),
                    start_theta: theta,
                    end_theta: theta,
                    dx,
                    dy,
                    intermediate_steps: vec![PoseWithCell {
                        pose: Pose2 {
                            x: 0.0,
                            y: 0.0,
                            orientation: theta.to_radians(),
                        },
                        cell: CellIndex::new(0, 0),
                    }],
                    translational_dist: dist,
                    angular_dist: 0.0,
                    base_cost: Motion::calculate_cost(dist, 0.0, 1.0, 1.0, 1),
                    speed: 1.0,
                    cost_multiplier: 1,
                    kind: MotionKind::Forward,
                })
                .unwrap();
        }
    }
    table
}

fn bench_expand_all(c: &mut Criterion) {
    let mls = rolling_mls(60);

    c.bench_function("expand_all_60x60", |b| {
        b.iter_batched(
            || {
                let builder = TravBuilder::new(mls.clone(), bench_config(false));
                let start = builder
                    .generate_start_node(&Vector3::new(3.05, 3.05, 0.0))
                    .unwrap();
                (builder, start)
            },
            |(builder, start)| {
                builder.expand_all(start);
                black_box(builder.map().num_nodes())
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_successors(c: &mut Criterion) {
    for parallel in [false, true] {
        let mut env = NavEnvironment::new(
            rolling_mls(60),
            bench_config(parallel),
            Mobility::default(),
            Arc::new(bench_table()),
        )
        .unwrap();
        let start = env
            .set_start(&Vector3::new(0.55, 0.55, 0.0), 0.0)
            .unwrap();
        env.set_goal(&Vector3::new(5.05, 5.05, 0.0), 0.0).unwrap();

        let name = if parallel {
            "successors_parallel"
        } else {
            "successors_serial"
        };
        c.bench_function(name, |b| {
            b.iter(|| black_box(env.successors(start).unwrap()));
        });
    }
}

criterion_group!(benches, bench_expand_all, bench_successors);
criterion_main!(benches);

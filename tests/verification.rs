// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use approx::assert_relative_eq;

use wave_leapfrog::core::{PartitionTable, SimulationConfig, SlabStorage};
use wave_leapfrog::error::{Result, WaveError};
use wave_leapfrog::io::{SnapshotHistory, SnapshotWriter};
use wave_leapfrog::scheduler::{Snapshot, WaveSolver};
use wave_leapfrog::update_kernels::Forcing;

/// Sequential three-level leapfrog with separate arrays for every time level.
fn three_level_reference(config: &SimulationConfig) -> Vec<f64> {
    let n = config.nodes();
    let dt = config.dt();
    let dx = config.dx();
    let a = config.amplitude();
    let b = f64::from(config.boundary());
    let forcing = Forcing::from_config(config);

    let mut older = vec![b; n];
    let mut old = vec![b; n];
    for step in 0..config.step_count() {
        let t = step as f64 * dt;
        let mut new = old.clone();
        for x in 1..n - 1 {
            let d2 = (old[x + 1] - 2.0 * old[x] + old[x - 1]) / (dx * dx);
            new[x] = dt * dt * (a * a * d2 + forcing.value(x, t)) + 2.0 * old[x] - older[x];
        }
        older = old;
        old = new;
    }
    old
}

/// End-to-end: 4 threads, T = 1.0, 16 nodes, boundary 0.
#[test]
fn end_to_end_small_run() {
    let config = SimulationConfig::new(4, 1.0, 16).unwrap();
    let solver = WaveSolver::new(config).unwrap();

    let mut history = SnapshotHistory::new(16);
    let mut cb = |s: &Snapshot<'_>| -> Result<()> { history.push(s) };
    let summary = solver.solve(Some(&mut cb)).unwrap();

    assert_eq!(summary.steps, 10);
    assert_eq!(summary.snapshots, 10);
    assert_eq!(history.len(), 10);

    let last = solver.final_values();
    assert_eq!(history.row(9), Some(last.as_slice()));
    assert!(history.row(10).is_none());
    for &v in &last[1..15] {
        assert!(v.is_finite());
        assert!(v.abs() < 10.0, "value {} exceeds sanity bound", v);
    }
    assert!(last[1..15].iter().any(|&v| v != 0.0));
}

/// The two-slab update reproduces the textbook three-level scheme.
#[test]
fn two_slabs_match_three_level_scheme() {
    let config = SimulationConfig::new(4, 3.0, 64)
        .unwrap()
        .with_amplitude(0.8)
        .unwrap()
        .with_boundary(-3)
        .unwrap();
    let solver = WaveSolver::new(config.clone()).unwrap();
    solver.solve(None).unwrap();

    let expected = three_level_reference(&config);
    let got = solver.final_values();
    assert_eq!(got.len(), expected.len());
    for (g, e) in got.iter().zip(expected.iter()) {
        assert_relative_eq!(*g, *e, epsilon = 1e-12, max_relative = 1e-12);
    }
}

#[test]
fn partition_covers_interior_exactly() {
    for &(nodes, threads) in &[(16, 4), (64, 8), (80, 5), (8, 8), (8, 1), (240, 6)] {
        let table = PartitionTable::new(nodes, threads).unwrap();
        assert_eq!(table.len(), threads);

        let mut owner = vec![0usize; nodes];
        for p in table.entries() {
            assert_eq!(p.len(), nodes / threads);
            for x in p.interior() {
                owner[x] += 1;
            }
        }
        assert_eq!(owner[0], 0);
        assert_eq!(owner[nodes - 1], 0);
        assert!(
            owner[1..nodes - 1].iter().all(|&c| c == 1),
            "interior not covered exactly once for nodes={} threads={}",
            nodes,
            threads
        );
    }
}

#[test]
fn invalid_configuration_rejected_before_spawn() {
    assert!(matches!(
        SimulationConfig::new(4, 1.0, 12),
        Err(WaveError::NodesNotMultipleOfEight(12))
    ));
    assert!(matches!(
        SimulationConfig::new(3, 1.0, 16),
        Err(WaveError::NodesNotDivisibleByThreads { .. })
    ));
    assert!(matches!(
        SimulationConfig::new(2, -1.0, 16),
        Err(WaveError::InvalidTimeInterval(_))
    ));
    assert!(matches!(
        PartitionTable::new(24, 16),
        Err(WaveError::NodesNotDivisibleByThreads { .. })
    ));
}

#[test]
fn boundary_held_every_step() {
    let config = SimulationConfig::new(2, 1.5, 32)
        .unwrap()
        .with_boundary(42)
        .unwrap()
        .with_amplitude(1.0)
        .unwrap();
    let solver = WaveSolver::new(config).unwrap();

    let mut edges = Vec::new();
    let mut cb = |s: &Snapshot<'_>| -> Result<()> {
        edges.push((s.values[0], s.values[31]));
        Ok(())
    };
    solver.solve(Some(&mut cb)).unwrap();
    assert_eq!(edges.len(), 15);
    assert!(edges.iter().all(|&e| e == (42.0, 42.0)));
    for slab in 0..2 {
        assert_eq!(solver.grid().read(slab, 0), 42.0);
        assert_eq!(solver.grid().read(slab, 31), 42.0);
    }
}

#[test]
fn deterministic_across_runs_and_thread_counts() {
    let run = |threads: usize| -> Vec<Vec<f64>> {
        let config = SimulationConfig::new(threads, 2.0, 96).unwrap();
        let solver = WaveSolver::new(config).unwrap();
        let mut rows = Vec::new();
        let mut cb = |s: &Snapshot<'_>| -> Result<()> {
            rows.push(s.values.to_vec());
            Ok(())
        };
        solver.solve(Some(&mut cb)).unwrap();
        rows
    };

    let reference = run(1);
    assert_eq!(reference.len(), 20);
    assert_eq!(run(1), reference);
    assert_eq!(run(3), reference);
    assert_eq!(run(12), reference);
}

#[test]
fn repeated_solve_is_identical() {
    let config = SimulationConfig::new(4, 1.0, 32).unwrap();
    let solver = WaveSolver::new(config).unwrap();
    solver.solve(None).unwrap();
    let first = solver.final_values();
    solver.solve(None).unwrap();
    assert_eq!(solver.final_values(), first);
}

#[test]
fn workers_stay_in_lockstep() {
    let config = SimulationConfig::new(8, 5.0, 512).unwrap();
    let solver = WaveSolver::new(config).unwrap().with_lockstep_check(true);
    let summary = solver.solve(None).unwrap();
    assert_eq!(summary.steps, 50);
    assert_eq!(summary.lockstep_violations, Some(0));
}

#[test]
fn unforced_field_stays_at_rest() {
    // The pulse only reaches nodes within 15 of the centre; far nodes stay put
    // until the wave arrives, and with amplitude 0 it never does.
    let config = SimulationConfig::new(2, 1.0, 128)
        .unwrap()
        .with_amplitude(0.0)
        .unwrap()
        .with_boundary(5)
        .unwrap();
    let solver = WaveSolver::new(config).unwrap();
    solver.solve(None).unwrap();
    let values = solver.final_values();
    for (x, v) in values.iter().enumerate() {
        if x.abs_diff(64) >= 15 {
            assert_eq!(*v, 5.0, "node {} moved", x);
        } else {
            assert!(*v != 5.0, "node {} not forced", x);
        }
    }
}

#[test]
fn data_file_has_one_block_per_step() {
    let config = SimulationConfig::new(4, 1.0, 16).unwrap();
    let dx = config.dx();
    let solver = WaveSolver::new(config).unwrap();

    let path = std::env::temp_dir().join("wave_leapfrog_verification_data.txt");
    let mut writer = SnapshotWriter::create(&path, dx).unwrap();
    let mut cb = |s: &Snapshot<'_>| -> Result<()> { writer.write_snapshot(s) };
    solver.solve(Some(&mut cb)).unwrap();
    assert_eq!(writer.blocks(), 10);
    writer.finish().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let blocks: Vec<&str> = text
        .split("\n\n\n")
        .filter(|b| !b.trim().is_empty())
        .collect();
    assert_eq!(blocks.len(), 10);
    for block in blocks {
        assert_eq!(block.lines().count(), 16);
        assert!(block.starts_with("0.000000 0.000000"));
    }
    let _ = std::fs::remove_file(&path);
}

#[test]
fn panicking_callback_returns_error() {
    let config = SimulationConfig::new(2, 1.0, 16).unwrap();
    let solver = WaveSolver::new(config).unwrap();

    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let mut cb = |s: &Snapshot<'_>| -> Result<()> {
            if s.step == 2 {
                panic!("callback failure at step 2");
            }
            Ok(())
        };
        let _ = tx.send(solver.solve(Some(&mut cb)));
    });

    let result = rx
        .recv_timeout(std::time::Duration::from_secs(10))
        .expect("solve did not return after the callback panicked");
    assert!(matches!(result, Err(WaveError::SnapshotPanicked { step: 2 })));
}

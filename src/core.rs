// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, WaveError};

/// Default time step.
pub const DEFAULT_DT: f64 = 0.1;
/// Default spatial step.
pub const DEFAULT_DX: f64 = 0.1;
/// Default wave amplitude (propagation speed).
pub const DEFAULT_AMPLITUDE: f64 = 0.05;
/// Largest accepted magnitude for the boundary value.
pub const MAX_BOUNDARY: i32 = 100;

// Relative tolerance for treating time_interval / dt as a whole number of steps.
const STEP_EPSILON: f64 = 1e-9;

/// Validated parameters of a single run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    threads: usize,
    time_interval: f64,
    nodes: usize,
    boundary: i32,
    amplitude: f64,
    dt: f64,
    dx: f64,
}

impl SimulationConfig {
    /// Create a configuration with the default boundary, amplitude and steps.
    ///
    /// # Errors
    /// Returns an error if the thread count, node count or time interval is
    /// invalid (see [`SimulationConfig::validate`]).
    pub fn new(threads: usize, time_interval: f64, nodes: usize) -> Result<Self> {
        let config = SimulationConfig {
            threads,
            time_interval,
            nodes,
            boundary: 0,
            amplitude: DEFAULT_AMPLITUDE,
            dt: DEFAULT_DT,
            dx: DEFAULT_DX,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the value held by both boundary nodes (and the initial field).
    pub fn with_boundary(mut self, boundary: i32) -> Result<Self> {
        self.boundary = boundary;
        self.validate()?;
        Ok(self)
    }

    /// Set the wave amplitude.
    pub fn with_amplitude(mut self, amplitude: f64) -> Result<Self> {
        self.amplitude = amplitude;
        self.validate()?;
        Ok(self)
    }

    /// Set the time step.
    pub fn with_time_step(mut self, dt: f64) -> Result<Self> {
        self.dt = dt;
        self.validate()?;
        Ok(self)
    }

    /// Set the spatial step.
    pub fn with_space_step(mut self, dx: f64) -> Result<Self> {
        self.dx = dx;
        self.validate()?;
        Ok(self)
    }

    /// Check every configuration rule, returning the first one violated.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(WaveError::InvalidThreadCount(self.threads));
        }
        if self.nodes == 0 {
            return Err(WaveError::InvalidNodeCount(self.nodes));
        }
        if self.nodes % 8 != 0 {
            return Err(WaveError::NodesNotMultipleOfEight(self.nodes));
        }
        if self.nodes % self.threads != 0 {
            return Err(WaveError::NodesNotDivisibleByThreads {
                nodes: self.nodes,
                threads: self.threads,
            });
        }
        if !self.time_interval.is_finite() || self.time_interval <= 0.0 {
            return Err(WaveError::InvalidTimeInterval(self.time_interval));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(WaveError::InvalidStepSize {
                name: "dt",
                value: self.dt,
            });
        }
        if !self.dx.is_finite() || self.dx <= 0.0 {
            return Err(WaveError::InvalidStepSize {
                name: "dx",
                value: self.dx,
            });
        }
        if !(-MAX_BOUNDARY..=MAX_BOUNDARY).contains(&self.boundary) {
            return Err(WaveError::BoundaryOutOfRange(self.boundary));
        }
        if !(0.0..=1.0).contains(&self.amplitude) {
            return Err(WaveError::AmplitudeOutOfRange(self.amplitude));
        }
        Ok(())
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Total simulated time.
    pub fn time_interval(&self) -> f64 {
        self.time_interval
    }

    /// Number of spatial nodes, boundaries included.
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Boundary value.
    pub fn boundary(&self) -> i32 {
        self.boundary
    }

    /// Wave amplitude.
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Time step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Spatial step.
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Number of time steps needed to cover the time interval (at least one).
    pub fn step_count(&self) -> usize {
        let ratio = self.time_interval / self.dt;
        let nearest = ratio.round();
        let steps = if (ratio - nearest).abs() <= STEP_EPSILON * nearest.max(1.0) {
            nearest
        } else {
            ratio.ceil()
        };
        (steps as usize).max(1)
    }

    /// Nominal number of nodes assigned to each worker.
    pub fn partition_len(&self) -> usize {
        self.nodes / self.threads
    }
}

/// Slab-level access to the two time levels of the field.
pub trait SlabStorage {
    /// Read the value at `index` of `slab` (0 or 1).
    fn read(&self, slab: usize, index: usize) -> f64;

    /// Write the value at `index` of `slab` (0 or 1).
    fn write(&self, slab: usize, index: usize, value: f64);

    /// Number of nodes in each slab.
    fn nodes_count(&self) -> usize;
}

/// Which slab is written during a step and which one is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlabPair {
    /// Slab receiving the new time level.
    pub current: usize,
    /// Slab holding the latest completed time level.
    pub previous: usize,
}

impl SlabPair {
    /// Selector for the step that starts at simulation time `time`.
    ///
    /// `current = floor(time / dt + 1) mod 2`. The ratio is rounded first so a
    /// time like `0.30000000000000004` still maps to step 3.
    pub fn at_time(time: f64, dt: f64) -> Self {
        let step = (time / dt).round().max(0.0) as usize;
        Self::for_step(step)
    }

    /// Selector for the step with index `step`.
    pub fn for_step(step: usize) -> Self {
        let current = (step + 1) % 2;
        SlabPair {
            current,
            previous: 1 - current,
        }
    }
}

/// The two time slabs of the 1D field.
///
/// Values are stored as `f64` bit patterns in atomics so that workers and the
/// controller can share the grid without a lock. All accesses use `Relaxed`
/// ordering; the happens-before edges between writers and readers come from the
/// barrier rendezvous that separates every compute phase.
pub struct Grid {
    slabs: [Box<[AtomicU64]>; 2],
    nodes: usize,
}

impl Grid {
    /// Allocate both slabs and fill them with `boundary`.
    pub fn new(nodes: usize, boundary: f64) -> Self {
        let slab = || -> Box<[AtomicU64]> {
            (0..nodes)
                .map(|_| AtomicU64::new(boundary.to_bits()))
                .collect::<Vec<_>>()
                .into_boxed_slice()
        };
        Grid {
            slabs: [slab(), slab()],
            nodes,
        }
    }

    /// Refill both slabs with `boundary`.
    pub fn reset(&self, boundary: f64) {
        for slab in &self.slabs {
            for cell in slab.iter() {
                cell.store(boundary.to_bits(), Ordering::Relaxed);
            }
        }
    }

    /// Copy one slab out of the grid.
    pub fn slab_values(&self, slab: usize) -> Vec<f64> {
        self.slabs[slab]
            .iter()
            .map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
            .collect()
    }
}

impl SlabStorage for Grid {
    fn read(&self, slab: usize, index: usize) -> f64 {
        f64::from_bits(self.slabs[slab][index].load(Ordering::Relaxed))
    }

    fn write(&self, slab: usize, index: usize, value: f64) {
        self.slabs[slab][index].store(value.to_bits(), Ordering::Relaxed);
    }

    fn nodes_count(&self) -> usize {
        self.nodes
    }
}

/// Contiguous block of node indices owned by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    /// First node index (inclusive).
    pub first: usize,
    /// Last node index (inclusive).
    pub last: usize,
    nodes: usize,
}

#[allow(clippy::len_without_is_empty)]
impl Partition {
    /// Nominal number of nodes in the block, boundary nodes included.
    ///
    /// Never zero; use [`Partition::interior`] for the nodes actually updated.
    pub fn len(&self) -> usize {
        self.last + 1 - self.first
    }

    /// The block clipped to the interior nodes `[1, nodes - 2]`.
    ///
    /// Empty for a block made only of a boundary node.
    pub fn interior(&self) -> RangeInclusive<usize> {
        let first = self.first.max(1);
        let last = self.last.min(self.nodes.saturating_sub(2));
        first..=last
    }
}

/// Static equal-size division of the domain between workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionTable {
    entries: Vec<Partition>,
}

impl PartitionTable {
    /// Split `nodes` into `threads` equal blocks.
    ///
    /// The blocks tile `[0, nodes - 1]`; boundary nodes that fall into the
    /// first or last block are skipped through [`Partition::interior`].
    ///
    /// # Errors
    /// Returns a configuration error if `threads` is zero or `nodes` is not a
    /// non-zero multiple of both 8 and `threads`.
    pub fn new(nodes: usize, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(WaveError::InvalidThreadCount(threads));
        }
        if nodes == 0 {
            return Err(WaveError::InvalidNodeCount(nodes));
        }
        if nodes % 8 != 0 {
            return Err(WaveError::NodesNotMultipleOfEight(nodes));
        }
        if nodes % threads != 0 {
            return Err(WaveError::NodesNotDivisibleByThreads { nodes, threads });
        }

        let step = nodes / threads;
        let entries = (0..threads)
            .map(|i| Partition {
                first: i * step,
                last: (i + 1) * step - 1,
                nodes,
            })
            .collect();
        Ok(PartitionTable { entries })
    }

    /// Build the table for a validated configuration.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        Self::new(config.nodes(), config.threads())
    }

    /// All blocks, ordered by worker index.
    pub fn entries(&self) -> &[Partition] {
        &self.entries
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no blocks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

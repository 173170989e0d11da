// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};
use tracing::{debug, info, warn};

use crate::core::{Grid, Partition, PartitionTable, SimulationConfig, SlabPair};
use crate::error::{Result, WaveError};
use crate::update_kernels::{explicit_scheme, SchemeParams};

/// A completed time level handed to the snapshot callback.
pub struct Snapshot<'a> {
    /// Index of the step that produced the values (0-based).
    pub step: usize,
    /// Simulation time at which the step started.
    pub time: f64,
    /// Field values of the slab written by the step, boundaries included.
    pub values: &'a [f64],
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Number of steps computed.
    pub steps: usize,
    /// Number of snapshots delivered to the callback.
    pub snapshots: usize,
    /// Wall-clock time spent in the time loop.
    pub elapsed: Duration,
    /// Lockstep violations seen by the workers, if the check was enabled.
    pub lockstep_violations: Option<usize>,
}

/// Controller state across the time loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// Steps remain after the current one.
    Running,
    /// The termination flag is set; the current step is the final one.
    LastStep,
    /// No further rendezvous will be issued.
    Finished,
}

/// Per-worker completed step counters used to detect lockstep violations.
struct LockstepProbe {
    completed: Box<[AtomicUsize]>,
    violations: AtomicUsize,
}

impl LockstepProbe {
    fn new(workers: usize) -> Self {
        LockstepProbe {
            completed: (0..workers)
                .map(|_| AtomicUsize::new(0))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            violations: AtomicUsize::new(0),
        }
    }

    // Every worker must have finished all steps before `step`.
    fn enter(&self, step: usize) {
        let behind = self
            .completed
            .iter()
            .filter(|c| c.load(Ordering::Acquire) < step)
            .count();
        if behind > 0 {
            self.violations.fetch_add(behind, Ordering::Relaxed);
        }
    }

    fn leave(&self, worker: usize, step: usize) {
        self.completed[worker].store(step + 1, Ordering::Release);
    }
}

const NO_FAILURE: usize = usize::MAX;

/// State shared by the controller and every worker for one run.
struct SimulationContext<'g> {
    grid: &'g Grid,
    params: SchemeParams,
    barrier: Barrier,
    step: AtomicUsize,
    done: AtomicBool,
    failed_worker: AtomicUsize,
    probe: Option<LockstepProbe>,
    #[cfg(test)]
    fault: Option<(usize, usize)>,
}

impl SimulationContext<'_> {
    fn time(&self) -> f64 {
        self.step.load(Ordering::Relaxed) as f64 * self.params.dt
    }

    // Only the first panicking worker is recorded. The termination flag must be
    // set before the worker arrives at the second rendezvous.
    fn record_panic(&self, worker: usize) {
        let _ = self.failed_worker.compare_exchange(
            NO_FAILURE,
            worker,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
        self.done.store(true, Ordering::Release);
    }

    fn failed_worker(&self) -> Option<usize> {
        match self.failed_worker.load(Ordering::Acquire) {
            NO_FAILURE => None,
            worker => Some(worker),
        }
    }
}

/// Multithreaded explicit solver for the forced 1D wave equation.
///
/// A fixed pool of worker threads each owns one block of the
/// [`PartitionTable`]. The calling thread acts as controller and meets the
/// workers at two barrier rendezvous per step: the first releases the compute
/// phase, the second confirms that every worker has written its block. Between
/// the second rendezvous and the next first one no worker touches the grid, so
/// the controller can read the completed slab and advance the clock.
pub struct WaveSolver {
    config: SimulationConfig,
    grid: Grid,
    partitions: PartitionTable,
    lockstep_check: bool,
    #[cfg(test)]
    fault: Option<(usize, usize)>,
}

impl WaveSolver {
    /// Create a solver for a validated configuration.
    ///
    /// # Errors
    /// Returns a configuration error if the partition table cannot be built.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let partitions = PartitionTable::from_config(&config)?;
        let grid = Grid::new(config.nodes(), f64::from(config.boundary()));
        Ok(WaveSolver {
            config,
            grid,
            partitions,
            lockstep_check: false,
            #[cfg(test)]
            fault: None,
        })
    }

    /// Make `worker` panic when it computes `step`.
    #[cfg(test)]
    fn with_fault(mut self, worker: usize, step: usize) -> Self {
        self.fault = Some((worker, step));
        self
    }

    /// Have workers record whether any of them ever runs ahead of the others.
    pub fn with_lockstep_check(mut self, enabled: bool) -> Self {
        self.lockstep_check = enabled;
        self
    }

    /// The configuration of this solver.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Get a reference to the grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The partition table used by the workers.
    pub fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    /// Values of the slab written by the final step of the last run.
    pub fn final_values(&self) -> Vec<f64> {
        let last_step = self.config.step_count() - 1;
        self.grid.slab_values(SlabPair::for_step(last_step).current)
    }

    /// Run the whole time interval.
    ///
    /// The grid is reset to the boundary value first, so repeated calls give
    /// identical results. `on_snapshot` is called after every step with the
    /// slab that step completed. If it returns an error or panics, the run is
    /// wound down at the next step and the first error is returned. A panicking
    /// worker stops the run at the end of the current step.
    ///
    /// # Errors
    /// Returns [`WaveError::ThreadSpawn`] if a worker thread cannot be created
    /// (no step is computed in that case), [`WaveError::WorkerPanicked`] if a
    /// worker panics, [`WaveError::SnapshotPanicked`] if `on_snapshot` panics,
    /// or the first error returned by `on_snapshot`.
    pub fn solve(
        &self,
        mut on_snapshot: Option<&mut dyn FnMut(&Snapshot<'_>) -> Result<()>>,
    ) -> Result<RunSummary> {
        let threads = self.config.threads();
        let steps = self.config.step_count();
        self.grid.reset(f64::from(self.config.boundary()));

        let ctx = SimulationContext {
            grid: &self.grid,
            params: SchemeParams::from_config(&self.config),
            barrier: Barrier::new(threads + 1),
            step: AtomicUsize::new(0),
            done: AtomicBool::new(false),
            failed_worker: AtomicUsize::new(NO_FAILURE),
            probe: self.lockstep_check.then(|| LockstepProbe::new(threads)),
            #[cfg(test)]
            fault: self.fault,
        };

        info!(
            threads,
            nodes = self.config.nodes(),
            steps,
            "starting wave solver"
        );

        let mut snapshots = 0usize;
        let mut failure: Option<WaveError> = None;
        let start = Instant::now();

        std::thread::scope(|s| -> Result<()> {
            let (start_tx, start_rx) = bounded::<()>(threads);
            let mut handles = Vec::with_capacity(threads);

            for (worker, partition) in self.partitions.entries().iter().enumerate() {
                let ctx = &ctx;
                let start_rx = start_rx.clone();
                let partition = *partition;
                let spawned = std::thread::Builder::new()
                    .name(format!("wave-worker-{}", worker))
                    .spawn_scoped(s, move || run_worker(ctx, worker, partition, start_rx));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        // Closing the gate makes the spawned workers return
                        // before they reach the barrier.
                        drop(start_tx);
                        return Err(WaveError::ThreadSpawn(e));
                    }
                }
            }
            drop(start_rx);

            for _ in 0..threads {
                start_tx
                    .send(())
                    .map_err(|_| WaveError::Other("worker start gate closed".to_string()))?;
            }

            let mut state = ControllerState::Running;
            while state != ControllerState::Finished {
                ctx.barrier.wait();

                let step = ctx.step.load(Ordering::Relaxed);
                if step + 1 >= steps || failure.is_some() {
                    ctx.done.store(true, Ordering::Release);
                    state = ControllerState::LastStep;
                }

                ctx.barrier.wait();

                if let Some(worker) = ctx.failed_worker() {
                    warn!(step, worker, "worker panicked, stopping run");
                    failure.get_or_insert(WaveError::WorkerPanicked { worker });
                    ctx.step.store(step + 1, Ordering::Relaxed);
                    break;
                }

                if failure.is_none() {
                    if let Some(cb) = on_snapshot.as_deref_mut() {
                        let values = ctx.grid.slab_values(SlabPair::for_step(step).current);
                        let snapshot = Snapshot {
                            step,
                            time: ctx.time(),
                            values: &values,
                        };
                        match panic::catch_unwind(AssertUnwindSafe(|| cb(&snapshot))) {
                            Ok(Ok(())) => snapshots += 1,
                            Ok(Err(e)) => {
                                warn!(step, error = %e, "snapshot sink failed, stopping run");
                                failure = Some(e);
                            }
                            Err(_) => {
                                warn!(step, "snapshot sink panicked, stopping run");
                                failure = Some(WaveError::SnapshotPanicked { step });
                            }
                        }
                    }
                }
                debug!(step, time = ctx.time(), "step complete");

                ctx.step.store(step + 1, Ordering::Relaxed);
                if state == ControllerState::LastStep {
                    state = ControllerState::Finished;
                }
            }

            for (worker, handle) in handles.into_iter().enumerate() {
                handle
                    .join()
                    .map_err(|_| WaveError::WorkerPanicked { worker })?;
            }
            Ok(())
        })?;

        if let Some(e) = failure {
            return Err(e);
        }

        let elapsed = start.elapsed();
        let lockstep_violations = ctx
            .probe
            .as_ref()
            .map(|p| p.violations.load(Ordering::Relaxed));
        info!(
            steps,
            snapshots,
            elapsed_s = elapsed.as_secs_f64(),
            "wave solver finished"
        );

        Ok(RunSummary {
            steps: ctx.step.load(Ordering::Relaxed),
            snapshots,
            elapsed,
            lockstep_violations,
        })
    }
}

fn run_worker(
    ctx: &SimulationContext<'_>,
    worker: usize,
    partition: Partition,
    start: Receiver<()>,
) {
    if start.recv().is_err() {
        debug!(worker, "start gate closed before run");
        return;
    }

    let range = partition.interior();
    while !ctx.done.load(Ordering::Acquire) {
        ctx.barrier.wait();

        let step = ctx.step.load(Ordering::Relaxed);
        let computed = panic::catch_unwind(AssertUnwindSafe(|| {
            if let Some(probe) = &ctx.probe {
                probe.enter(step);
            }
            #[cfg(test)]
            if ctx.fault == Some((worker, step)) {
                panic!("injected fault in worker {} at step {}", worker, step);
            }
            explicit_scheme(ctx.grid, range.clone(), ctx.time(), &ctx.params);
            if let Some(probe) = &ctx.probe {
                probe.leave(worker, step);
            }
        }));
        if computed.is_err() {
            // Still arrive below so the controller and the other workers are released.
            ctx.record_panic(worker);
        }

        ctx.barrier.wait();
    }
    debug!(
        worker,
        first = partition.first,
        last = partition.last,
        "worker exiting"
    );
}

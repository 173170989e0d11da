// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! A multithreaded explicit finite-difference solver for the 1D wave equation.
//!
//! The field lives in two time slabs shared by a fixed pool of worker threads.
//! Each worker owns an equal contiguous block of nodes and advances it with a
//! leapfrog update, in lock-step with the others: a controller meets all
//! workers at two barrier rendezvous per step and uses the gap between them to
//! read the completed slab, advance the clock and decide termination.

#![warn(missing_docs)]

/// Configuration, grid storage and the partition table.
pub mod core;
/// Error types for the library.
pub mod error;
/// Gnuplot and .npy output of snapshots.
pub mod io;
/// Controller and worker threads.
pub mod scheduler;
/// Forcing term and explicit scheme update.
pub mod update_kernels;

pub use crate::core::{Grid, PartitionTable, SimulationConfig};
pub use crate::error::{Result, WaveError};
pub use crate::scheduler::{RunSummary, Snapshot, WaveSolver};

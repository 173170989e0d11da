// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during solver configuration, output, or execution.
#[derive(Debug)]
pub enum WaveError {
    /// Worker thread count is zero.
    InvalidThreadCount(usize),
    /// Node count is zero.
    InvalidNodeCount(usize),
    /// Node count is not a multiple of 8.
    NodesNotMultipleOfEight(usize),
    /// Node count cannot be split evenly between the worker threads.
    NodesNotDivisibleByThreads {
        /// The node count provided.
        nodes: usize,
        /// The thread count provided.
        threads: usize,
    },
    /// Total simulated time is not positive and finite.
    InvalidTimeInterval(f64),
    /// A time or space step is not positive and finite.
    InvalidStepSize {
        /// Which step was rejected ("dt" or "dx").
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// Boundary value lies outside [-100, 100].
    BoundaryOutOfRange(i32),
    /// Wave amplitude lies outside [0, 1].
    AmplitudeOutOfRange(f64),
    /// The operating system refused to create a worker thread.
    ThreadSpawn(std::io::Error),
    /// A worker thread panicked while the run was in progress.
    WorkerPanicked {
        /// Index of the worker that panicked.
        worker: usize,
    },
    /// The snapshot callback panicked.
    SnapshotPanicked {
        /// Step whose snapshot was being delivered.
        step: usize,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for WaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveError::InvalidThreadCount(threads) => {
                write!(f, "invalid thread count: {} (must be >= 1)", threads)
            }
            WaveError::InvalidNodeCount(nodes) => {
                write!(f, "invalid node count: {} (must be >= 1)", nodes)
            }
            WaveError::NodesNotMultipleOfEight(nodes) => {
                write!(f, "node count {} is not a multiple of 8", nodes)
            }
            WaveError::NodesNotDivisibleByThreads { nodes, threads } => {
                write!(
                    f,
                    "node count {} is not divisible by thread count {}",
                    nodes, threads
                )
            }
            WaveError::InvalidTimeInterval(t) => {
                write!(
                    f,
                    "invalid time interval: {} (must be positive and finite)",
                    t
                )
            }
            WaveError::InvalidStepSize { name, value } => {
                write!(
                    f,
                    "invalid {}: {} (must be positive and finite)",
                    name, value
                )
            }
            WaveError::BoundaryOutOfRange(b) => {
                write!(f, "boundary value {} out of range [-100, 100]", b)
            }
            WaveError::AmplitudeOutOfRange(a) => {
                write!(f, "amplitude {} out of range [0, 1]", a)
            }
            WaveError::ThreadSpawn(e) => write!(f, "failed to spawn worker thread: {}", e),
            WaveError::WorkerPanicked { worker } => {
                write!(f, "worker {} panicked", worker)
            }
            WaveError::SnapshotPanicked { step } => {
                write!(f, "snapshot callback panicked at step {}", step)
            }
            WaveError::IoError(e) => write!(f, "I/O error: {}", e),
            WaveError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for WaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaveError::IoError(e) | WaveError::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WaveError {
    fn from(e: std::io::Error) -> Self {
        WaveError::IoError(e)
    }
}

/// Convenience type alias for Results with WaveError.
pub type Result<T> = std::result::Result<T, WaveError>;

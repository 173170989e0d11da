// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::error::{Result, WaveError};
use crate::scheduler::Snapshot;

/// Write one time level as a gnuplot data block.
///
/// Each node becomes a `position value` line with six decimals, where
/// `position = index * dx`. The block ends with two blank lines so that gnuplot
/// addresses consecutive snapshots with `index i`.
pub fn write_block<W: Write>(w: &mut W, values: &[f64], dx: f64) -> Result<()> {
    for (j, v) in values.iter().enumerate() {
        writeln!(w, "{:.6} {:.6}", j as f64 * dx, v)?;
    }
    w.write_all(b"\n\n")?;
    Ok(())
}

/// Appends snapshots to a gnuplot data file.
pub struct SnapshotWriter<W: Write> {
    out: W,
    dx: f64,
    blocks: usize,
}

impl SnapshotWriter<BufWriter<File>> {
    /// Create (or truncate) the data file at `path`.
    pub fn create(path: &Path, dx: f64) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), dx))
    }
}

impl<W: Write> SnapshotWriter<W> {
    /// Wrap an existing writer.
    pub fn new(out: W, dx: f64) -> Self {
        SnapshotWriter { out, dx, blocks: 0 }
    }

    /// Append one snapshot as a data block.
    pub fn write_snapshot(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        write_block(&mut self.out, snapshot.values, self.dx)?;
        self.blocks += 1;
        Ok(())
    }

    /// Number of blocks written so far.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Write the gnuplot script that animates the data file.
///
/// `frames` is the number of data blocks to play back.
pub fn write_gnuplot_script<W: Write>(
    w: &mut W,
    data_path: &Path,
    nodes: usize,
    dx: f64,
    frames: usize,
) -> Result<()> {
    writeln!(w, "set xrange[0:{:.6}]", nodes.saturating_sub(1) as f64 * dx)?;
    writeln!(w, "set yrange[-5:5]")?;
    writeln!(w, "do for [i=0:{}] {{", frames as i64 - 1)?;
    writeln!(
        w,
        "   plot '{}' index i smooth bezier",
        data_path.display()
    )?;
    writeln!(w, "   pause 0.05")?;
    writeln!(w, "}}")?;
    writeln!(w, "pause -1")?;
    Ok(())
}

/// Write the gnuplot script to a file.
pub fn save_gnuplot_script(
    path: &Path,
    data_path: &Path,
    nodes: usize,
    dx: f64,
    frames: usize,
) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_gnuplot_script(&mut w, data_path, nodes, dx, frames)?;
    w.flush()?;
    Ok(())
}

/// Collects every snapshot of a run in memory.
#[derive(Clone, Debug, Default)]
pub struct SnapshotHistory {
    nodes: usize,
    data: Vec<f64>,
    times: Vec<f64>,
}

impl SnapshotHistory {
    /// Empty history for a grid of `nodes` nodes.
    pub fn new(nodes: usize) -> Self {
        SnapshotHistory {
            nodes,
            data: Vec::new(),
            times: Vec::new(),
        }
    }

    /// Record one snapshot.
    pub fn push(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        if snapshot.values.len() != self.nodes {
            return Err(WaveError::Other(format!(
                "snapshot has {} nodes, history expects {}",
                snapshot.values.len(),
                self.nodes
            )));
        }
        self.data.extend_from_slice(snapshot.values);
        self.times.push(snapshot.time);
        Ok(())
    }

    /// Number of recorded snapshots.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Start times of the recorded steps.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Values of snapshot `i`, or `None` if fewer snapshots were recorded.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i >= self.len() {
            return None;
        }
        Some(&self.data[i * self.nodes..(i + 1) * self.nodes])
    }

    /// The history as a `snapshots x nodes` array.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        Array2::from_shape_vec((self.len(), self.nodes), self.data.clone())
            .map_err(|e| WaveError::Other(format!("shape error: {}", e)))
    }
}

/// Save the snapshot history to a .npy file.
pub fn save_npy_history(history: &SnapshotHistory, path: &Path) -> Result<()> {
    let arr = history.to_array()?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| WaveError::Other(format!("npy write error: {}", e)))?;
    Ok(())
}

// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wave_leapfrog::core::{SimulationConfig, DEFAULT_AMPLITUDE, DEFAULT_DT, DEFAULT_DX};
use wave_leapfrog::io::{self, SnapshotHistory, SnapshotWriter};
use wave_leapfrog::scheduler::{Snapshot, WaveSolver};

#[derive(Parser)]
#[command(
    name = "wave-leapfrog",
    about = "Multithreaded explicit solver for the forced 1D wave equation",
    allow_negative_numbers = true
)]
struct Cli {
    /// Number of worker threads
    threads: usize,

    /// Total simulated time
    time_interval: f64,

    /// Number of nodes (multiple of 8 and of the thread count)
    nodes: usize,

    /// Boundary value in [-100, 100]
    #[arg(short = 'b', long, default_value_t = 0)]
    boundary: i32,

    /// Wave amplitude in [0, 1]
    #[arg(short = 'a', long, default_value_t = DEFAULT_AMPLITUDE)]
    amplitude: f64,

    /// Time step
    #[arg(long, default_value_t = DEFAULT_DT)]
    dt: f64,

    /// Spatial step
    #[arg(long, default_value_t = DEFAULT_DX)]
    dx: f64,

    /// Gnuplot data file
    #[arg(short = 'o', long, default_value = "data.txt")]
    output: PathBuf,

    /// Gnuplot control script written at the end of the run
    #[arg(long, default_value = "config.dat")]
    control: PathBuf,

    /// Append every completed step to the data file
    #[arg(long)]
    plot: bool,

    /// Also save the snapshot history as a .npy array
    #[arg(long)]
    npy: Option<PathBuf>,

    /// Count workers that run ahead of the others (diagnostic)
    #[arg(long)]
    check_lockstep: bool,
}

fn build_config(cli: &Cli) -> Result<SimulationConfig> {
    let config = SimulationConfig::new(cli.threads, cli.time_interval, cli.nodes)?
        .with_boundary(cli.boundary)?
        .with_amplitude(cli.amplitude)?
        .with_time_step(cli.dt)?
        .with_space_step(cli.dx)?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Usage errors exit with status 1 like every other startup failure.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };
    let config = build_config(&cli).context("invalid configuration")?;
    let nodes = config.nodes();
    let dx = config.dx();

    let solver = WaveSolver::new(config)?.with_lockstep_check(cli.check_lockstep);

    let mut writer = SnapshotWriter::create(&cli.output, dx)
        .with_context(|| format!("cannot create {}", cli.output.display()))?;
    let mut history = cli.npy.as_ref().map(|_| SnapshotHistory::new(nodes));

    let record = cli.plot || history.is_some();
    let mut sink = |snapshot: &Snapshot<'_>| -> wave_leapfrog::Result<()> {
        if cli.plot {
            writer.write_snapshot(snapshot)?;
        }
        if let Some(h) = history.as_mut() {
            h.push(snapshot)?;
        }
        Ok(())
    };

    let summary = if record {
        solver.solve(Some(&mut sink))?
    } else {
        solver.solve(None)?
    };

    println!(
        "Calculation time: {:.6} seconds.",
        summary.elapsed.as_secs_f64()
    );
    if let Some(violations) = summary.lockstep_violations {
        info!(violations, "lockstep check");
        if violations > 0 {
            bail!("{} lockstep violations detected", violations);
        }
    }

    writer.finish().context("cannot flush data file")?;
    println!("Data saved in '{}'", cli.output.display());

    if let (Some(path), Some(h)) = (cli.npy.as_ref(), history.as_ref()) {
        io::save_npy_history(h, path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), snapshots = h.len(), "saved snapshot history");
    }

    io::save_gnuplot_script(&cli.control, &cli.output, nodes, dx, summary.steps)
        .with_context(|| format!("cannot write {}", cli.control.display()))?;

    Ok(())
}

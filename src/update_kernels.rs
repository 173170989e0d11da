// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::f64::consts::PI;
use std::ops::RangeInclusive;

use crate::core::{SimulationConfig, SlabPair, SlabStorage};

/// Peak value of the source pulse.
pub const PULSE_MAGNITUDE: f64 = 0.5;
/// Nodes strictly closer than this to the domain centre receive the pulse.
pub const PULSE_HALF_WIDTH: usize = 15;
/// Number of time steps during which the pulse is active.
pub const PULSE_STEPS: f64 = 5.0;

/// Source term of the wave equation: a short sinusoidal pulse near the centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Forcing {
    centre: usize,
    cutoff: f64,
}

impl Forcing {
    /// Pulse centred on `nodes / 2`, active while `time < 5 * dt`.
    pub fn new(nodes: usize, dt: f64) -> Self {
        Forcing {
            centre: nodes / 2,
            cutoff: PULSE_STEPS * dt,
        }
    }

    /// Forcing for a configured run.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.nodes(), config.dt())
    }

    /// Source value at node `index` and simulation time `time`.
    pub fn value(&self, index: usize, time: f64) -> f64 {
        if time < self.cutoff && index.abs_diff(self.centre) < PULSE_HALF_WIDTH {
            PULSE_MAGNITUDE * (2.0 * PI * time).sin()
        } else {
            0.0
        }
    }
}

/// Coefficients of the explicit scheme that stay fixed for a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchemeParams {
    /// Time step.
    pub dt: f64,
    /// Spatial step.
    pub dx: f64,
    /// Wave amplitude.
    pub amplitude: f64,
    /// Source term.
    pub forcing: Forcing,
}

impl SchemeParams {
    /// Scheme coefficients for a configured run.
    pub fn from_config(config: &SimulationConfig) -> Self {
        SchemeParams {
            dt: config.dt(),
            dx: config.dx(),
            amplitude: config.amplitude(),
            forcing: Forcing::from_config(config),
        }
    }
}

/// Next value of one interior node.
///
/// `prev` holds the latest time level and `stale` the value the target slab
/// still carries from two levels ago:
///
/// ```text
/// d2 = (prev[x+1] - 2 prev[x] + prev[x-1]) / dx^2
/// u  = dt^2 (a^2 d2 + f(x, t)) + 2 prev[x] - stale
/// ```
#[inline]
pub fn update_node(
    left: f64,
    centre: f64,
    right: f64,
    stale: f64,
    source: f64,
    params: &SchemeParams,
) -> f64 {
    let d2 = (right - 2.0 * centre + left) / (params.dx * params.dx);
    params.dt * params.dt * (params.amplitude * params.amplitude * d2 + source) + 2.0 * centre
        - stale
}

/// Advance the nodes of `range` by one step starting at simulation time `time`.
///
/// Reads the previous slab and overwrites the current one in place. Boundary
/// nodes (0 and `nodes - 1`) are skipped if the range contains them.
pub fn explicit_scheme<G: SlabStorage>(
    grid: &G,
    range: RangeInclusive<usize>,
    time: f64,
    params: &SchemeParams,
) {
    let nodes = grid.nodes_count();
    let SlabPair { current, previous } = SlabPair::at_time(time, params.dt);

    for x in range {
        if x == 0 || x + 1 >= nodes {
            continue;
        }
        let value = update_node(
            grid.read(previous, x - 1),
            grid.read(previous, x),
            grid.read(previous, x + 1),
            grid.read(current, x),
            params.forcing.value(x, time),
            params,
        );
        grid.write(current, x, value);
    }
}

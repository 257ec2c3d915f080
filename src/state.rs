//! Nodal flow state: one `faer` column of depths and one of discharges.

use faer_core::{Mat, MatMut, MatRef};

use crate::{channel::Channel, error::ConfigError};

/// Column holding the water depth `h`.
pub const DEPTH: usize = 0;
/// Column holding the discharge `Q`.
pub const DISCHARGE: usize = 1;

#[derive(Debug, Clone)]
pub struct State {
    pub(crate) u: Mat<f64>,
}

impl State {
    pub fn uniform(nodes: usize, h0: f64, q0: f64) -> Result<Self, ConfigError> {
        check_depth(0, h0)?;
        check_discharge(0, q0)?;
        Ok(Self {
            u: Mat::from_fn(nodes, 2, |_, j| if j == DEPTH { h0 } else { q0 }),
        })
    }

    pub fn from_arrays(nodes: usize, h: &[f64], q: &[f64]) -> Result<Self, ConfigError> {
        if h.len() != nodes {
            return Err(ConfigError::LengthMismatch {
                field: "h",
                expected: nodes,
                got: h.len(),
            });
        }
        if q.len() != nodes {
            return Err(ConfigError::LengthMismatch {
                field: "Q",
                expected: nodes,
                got: q.len(),
            });
        }
        for (i, (&hi, &qi)) in h.iter().zip(q).enumerate() {
            check_depth(i, hi)?;
            check_discharge(i, qi)?;
        }

        Ok(Self {
            u: Mat::from_fn(nodes, 2, |i, j| if j == DEPTH { h[i] } else { q[i] }),
        })
    }

    pub fn nodes(&self) -> usize {
        self.u.nrows()
    }

    pub fn depth(&self, i: usize) -> f64 {
        self.u.read(i, DEPTH)
    }

    pub fn discharge(&self, i: usize) -> f64 {
        self.u.read(i, DISCHARGE)
    }

    pub fn as_ref(&self) -> MatRef<'_, f64> {
        self.u.as_ref()
    }

    pub fn as_mut(&mut self) -> MatMut<'_, f64> {
        self.u.as_mut()
    }
}

fn check_depth(node: usize, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidInitialDepth { node, value })
    }
}

fn check_discharge(node: usize, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidInitialDischarge { node })
    }
}

/// Largest `|v| + sqrt(g h)` over every node of `u`.
pub fn max_wave_speed(channel: &Channel, u: MatRef<'_, f64>) -> f64 {
    (0..u.nrows())
        .map(|i| channel.wave_speed(u.read(i, DEPTH), u.read(i, DISCHARGE)))
        .fold(0.0, f64::max)
}

/// First node holding a negative depth or a non-finite value.
pub fn first_invalid_node(u: MatRef<'_, f64>) -> Option<usize> {
    (0..u.nrows()).find(|&i| {
        let (h, q) = (u.read(i, DEPTH), u.read(i, DISCHARGE));
        !(h.is_finite() && q.is_finite() && h >= 0.0)
    })
}

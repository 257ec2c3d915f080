//! Fixed-interval sampling of the flow state and the resulting time series.

use faer::Mat;
use faer_core::MatRef;

use crate::{
    channel::Channel,
    error::ConfigError,
    faer_add::{col_to_vec, row_to_vec, trapezoid, zip_map},
    mesh::Grid,
    state::{DEPTH, DISCHARGE},
};

// absorbs round-off in the accumulated simulation clock
const TARGET_SLACK: f64 = 1e-9;
/// Largest number of samples a single run may request.
pub const MAX_SAMPLES: usize = 1 << 24;

/// Time-major samples of a run: row `k` of `h`, `q` and `v` is the state
/// at `times[k]`.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub(crate) x: Vec<f64>,
    pub(crate) times: Vec<f64>,
    pub(crate) h: Mat<f64>,
    pub(crate) q: Mat<f64>,
    pub(crate) v: Mat<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub sample: usize,
    pub time: f64,
    pub discharge: f64,
}

impl SimulationResult {
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn h(&self) -> MatRef<'_, f64> {
        self.h.as_ref()
    }

    pub fn q(&self) -> MatRef<'_, f64> {
        self.q.as_ref()
    }

    pub fn v(&self) -> MatRef<'_, f64> {
        self.v.as_ref()
    }

    pub fn samples(&self) -> usize {
        self.times.len()
    }

    pub fn nodes(&self) -> usize {
        self.x.len()
    }

    pub fn depth_profile(&self, sample: usize) -> Vec<f64> {
        row_to_vec(self.h(), sample)
    }

    pub fn discharge_profile(&self, sample: usize) -> Vec<f64> {
        row_to_vec(self.q(), sample)
    }

    pub fn depth_series(&self, node: usize) -> Vec<f64> {
        col_to_vec(self.h(), node)
    }

    pub fn discharge_series(&self, node: usize) -> Vec<f64> {
        col_to_vec(self.q(), node)
    }

    pub fn froude(&self, channel: &Channel) -> Mat<f64> {
        zip_map(self.h(), self.q(), |h, q| channel.froude_number(h, q))
    }

    pub fn wave_speed(&self, channel: &Channel) -> Mat<f64> {
        zip_map(self.h(), self.q(), |h, q| channel.wave_speed(h, q))
    }

    /// Largest sampled discharge at `node`, first occurrence on ties.
    pub fn peak_discharge(&self, node: usize) -> Option<Peak> {
        let mut peak: Option<Peak> = None;
        for (k, &time) in self.times.iter().enumerate() {
            let discharge = self.q.read(k, node);
            if peak.map_or(true, |p| discharge > p.discharge) {
                peak = Some(Peak {
                    sample: k,
                    time,
                    discharge,
                });
            }
        }
        peak
    }

    /// Water volume held in the reach, `b * integral(h dx)`.
    pub fn storage(&self, sample: usize, channel: &Channel) -> f64 {
        let dx = if self.x.len() > 1 {
            self.x[1] - self.x[0]
        } else {
            0.0
        };
        channel.width() * trapezoid(&self.depth_profile(sample), dx)
    }
}

pub(crate) fn sample_count(t_end: f64, dt_output: f64) -> Result<usize, ConfigError> {
    for (name, value) in [("t_end", t_end), ("dt_output", dt_output)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigError::InvalidHorizon { name, value });
        }
    }
    let intervals = (t_end / dt_output - TARGET_SLACK).ceil();
    if !(intervals < MAX_SAMPLES as f64) {
        return Err(ConfigError::TooManySamples { t_end, dt_output });
    }
    (intervals.max(0.0) as usize)
        .checked_add(1)
        .ok_or(ConfigError::TooManySamples { t_end, dt_output })
}

pub(crate) struct Recorder {
    dt_output: f64,
    len: usize,
    result: SimulationResult,
}

impl Recorder {
    pub fn new(grid: &Grid, t_end: f64, dt_output: f64) -> Result<Self, ConfigError> {
        let nt = sample_count(t_end, dt_output)?;
        let nx = grid.nodes();
        Ok(Self {
            dt_output,
            len: 0,
            result: SimulationResult {
                x: grid.iter().collect(),
                times: Vec::with_capacity(nt),
                h: Mat::zeros(nt, nx),
                q: Mat::zeros(nt, nx),
                v: Mat::zeros(nt, nx),
            },
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_complete(&self) -> bool {
        self.len == self.result.h.nrows()
    }

    pub fn next_target(&self) -> f64 {
        self.len as f64 * self.dt_output
    }

    pub fn is_due(&self, t: f64) -> bool {
        !self.is_complete() && t + TARGET_SLACK * self.dt_output >= self.next_target()
    }

    pub fn record(&mut self, t: f64, channel: &Channel, u: MatRef<'_, f64>) {
        let k = self.len;
        for i in 0..u.nrows() {
            let (h, q) = (u.read(i, DEPTH), u.read(i, DISCHARGE));
            self.result.h.write(k, i, h);
            self.result.q.write(k, i, q);
            self.result.v.write(k, i, channel.velocity(h, q));
        }
        self.result.times.push(t);
        self.len += 1;
    }

    /// Hands over the samples taken so far.
    pub fn finish(mut self) -> SimulationResult {
        let (len, nx) = (self.len, self.result.x.len());
        if len < self.result.h.nrows() {
            for m in [&mut self.result.h, &mut self.result.q, &mut self.result.v] {
                m.resize_with(len, nx, |_, _| 0.0);
            }
        }
        self.result
    }

    /// Copy of the samples taken so far, for error reports.
    pub fn snapshot(&self) -> SimulationResult {
        let nx = self.result.x.len();
        let rows = |m: &Mat<f64>| Mat::from_fn(self.len, nx, |k, i| m.read(k, i));
        SimulationResult {
            x: self.result.x.clone(),
            times: self.result.times.clone(),
            h: rows(&self.result.h),
            q: rows(&self.result.q),
            v: rows(&self.result.v),
        }
    }
}

//! Time-dependent boundary forcing: flood hydrographs and tidal stages.
//!
//! These are plain functions of time. They become boundary endpoints through
//! the `into_*` conversions, which move them into boxed closures.

use std::f64::consts::PI;

use crate::{bc::BoundaryEndpoint, channel::Channel, error::SimError};

const HOUR: f64 = 3600.0;

/// Single-peaked inflow hydrograph: constant base flow, linear rise to the
/// peak, linear recession back to base flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangularHydrograph {
    pub base: f64,
    pub peak: f64,
    pub peak_time: f64,
    pub rise: f64,
    pub fall: f64,
}

impl TriangularHydrograph {
    /// `peak_time`, `rise` and `fall` are in seconds.
    pub fn new(base: f64, peak: f64, peak_time: f64, rise: f64, fall: f64) -> Self {
        Self {
            base,
            peak,
            peak_time,
            rise,
            fall,
        }
    }

    pub fn discharge(&self, t: f64) -> f64 {
        let start = self.peak_time - self.rise;
        let end = self.peak_time + self.fall;
        let excess = self.peak - self.base;

        if t <= start || t >= end {
            self.base
        } else if t <= self.peak_time {
            self.base + excess * (t - start) / self.rise
        } else {
            self.peak - excess * (t - self.peak_time) / self.fall
        }
    }

    pub fn into_discharge(self) -> BoundaryEndpoint {
        BoundaryEndpoint::discharge(move |t| self.discharge(t))
    }

    /// Pairs the discharge with its normal depth in `channel`.
    ///
    /// Normal depth grows monotonically with discharge, so solving it at the
    /// base and peak flows up front covers every value the hydrograph takes.
    pub fn into_stage_discharge(self, channel: Channel) -> Result<BoundaryEndpoint, SimError> {
        channel.normal_depth(self.base)?;
        channel.normal_depth(self.peak)?;

        Ok(BoundaryEndpoint::prescribed(move |t| {
            let q = self.discharge(t);
            // non-finite depths are reported by the step validation
            (channel.normal_depth(q).unwrap_or(f64::NAN), q)
        }))
    }
}

/// One harmonic component of the tide.
#[derive(Debug, Clone, PartialEq)]
pub struct TidalConstituent {
    pub name: &'static str,
    /// Amplitude in meters.
    pub amplitude: f64,
    /// Period in seconds.
    pub period: f64,
    /// Phase in radians.
    pub phase: f64,
}

impl TidalConstituent {
    pub fn new(name: &'static str, amplitude: f64, period: f64, phase: f64) -> Self {
        Self {
            name,
            amplitude,
            period,
            phase,
        }
    }

    pub fn angular_frequency(&self) -> f64 {
        2.0 * PI / self.period
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        self.amplitude * (self.angular_frequency() * t + self.phase).cos()
    }

    /// Principal lunar semidiurnal, 12.42 h.
    pub fn m2(amplitude: f64, phase: f64) -> Self {
        Self::new("M2", amplitude, 12.42 * HOUR, phase)
    }

    /// Principal solar semidiurnal, 12 h.
    pub fn s2(amplitude: f64, phase: f64) -> Self {
        Self::new("S2", amplitude, 12.0 * HOUR, phase)
    }

    /// Lunisolar diurnal, 23.93 h.
    pub fn k1(amplitude: f64, phase: f64) -> Self {
        Self::new("K1", amplitude, 23.93 * HOUR, phase)
    }

    /// Lunar diurnal, 25.82 h.
    pub fn o1(amplitude: f64, phase: f64) -> Self {
        Self::new("O1", amplitude, 25.82 * HOUR, phase)
    }
}

/// Water depth at a tidal mouth: `mean + R(t) * sum(A cos(wt + phi))`.
#[derive(Debug, Clone, PartialEq)]
pub struct TidalStage {
    pub mean_depth: f64,
    pub constituents: Vec<TidalConstituent>,
    /// Length of the start-up ramp in seconds, `None` for no ramp.
    pub ramp: Option<f64>,
}

impl TidalStage {
    pub fn new(mean_depth: f64) -> Self {
        Self {
            mean_depth,
            constituents: Vec::new(),
            ramp: None,
        }
    }

    pub fn with_constituent(mut self, constituent: TidalConstituent) -> Self {
        self.constituents.push(constituent);
        self
    }

    pub fn with_ramp(mut self, duration: f64) -> Self {
        self.ramp = Some(duration);
        self
    }

    // half-cosine ramp from 0 to 1
    fn ramp_factor(&self, t: f64) -> f64 {
        match self.ramp {
            Some(d) if d > 0.0 && t < d => 0.5 * (1.0 - (PI * t.max(0.0) / d).cos()),
            _ => 1.0,
        }
    }

    pub fn depth(&self, t: f64) -> f64 {
        let tide: f64 = self.constituents.iter().map(|c| c.evaluate(t)).sum();
        self.mean_depth + self.ramp_factor(t) * tide
    }

    pub fn into_stage(self) -> BoundaryEndpoint {
        BoundaryEndpoint::stage(move |t| self.depth(t))
    }
}

/// Steady forcing holding both fields fixed.
pub fn constant(h: f64, q: f64) -> BoundaryEndpoint {
    BoundaryEndpoint::prescribed(move |_| (h, q))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flood() -> TriangularHydrograph {
        TriangularHydrograph::new(500.0, 2000.0, 6.0 * HOUR, 6.0 * HOUR, 12.0 * HOUR)
    }

    #[test]
    fn triangular_hydrograph_shape() {
        let f = flood();
        assert_eq!(f.discharge(0.0), 500.0);
        assert_eq!(f.discharge(3.0 * HOUR), 1250.0);
        assert_eq!(f.discharge(6.0 * HOUR), 2000.0);
        assert_eq!(f.discharge(12.0 * HOUR), 1250.0);
        assert_eq!(f.discharge(18.0 * HOUR), 500.0);
        assert_eq!(f.discharge(30.0 * HOUR), 500.0);
    }

    #[test]
    fn stage_discharge_endpoint_uses_normal_depth() {
        let channel = Channel::new(80.0, 1e-4, 0.03).unwrap();
        let endpoint = flood().into_stage_discharge(channel).unwrap();
        let BoundaryEndpoint::Prescribed(f) = endpoint else {
            panic!("expected a prescribed endpoint");
        };
        let (h, q) = f(6.0 * HOUR);
        assert_eq!(q, 2000.0);
        assert!((h - channel.normal_depth(2000.0).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn stage_discharge_needs_a_normal_depth() {
        let flat = Channel::new(80.0, 0.0, 0.03).unwrap();
        assert!(matches!(
            flood().into_stage_discharge(flat),
            Err(SimError::Convergence { .. })
        ));
    }

    #[test]
    fn tidal_stage_oscillates_about_the_mean() {
        let tide = TidalStage::new(5.0).with_constituent(TidalConstituent::m2(1.2, 0.0));
        assert!((tide.depth(0.0) - 6.2).abs() < 1e-12);
        assert!((tide.depth(0.5 * 12.42 * HOUR) - 3.8).abs() < 1e-9);
        assert!((tide.depth(12.42 * HOUR) - 6.2).abs() < 1e-9);
    }

    #[test]
    fn ramp_starts_from_the_mean() {
        let tide = TidalStage::new(5.0)
            .with_constituent(TidalConstituent::m2(1.0, 0.0))
            .with_constituent(TidalConstituent::k1(0.3, 0.4))
            .with_ramp(6.0 * HOUR);
        assert_eq!(tide.depth(0.0), 5.0);
        let full = TidalStage {
            ramp: None,
            ..tide.clone()
        };
        assert_eq!(tide.depth(7.0 * HOUR), full.depth(7.0 * HOUR));
    }
}

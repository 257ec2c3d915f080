use core::fmt;

use faer_core::MatMut;
use reborrow::*;

use crate::state::{DEPTH, DISCHARGE};

pub type StageDischargeFn = Box<dyn Fn(f64) -> (f64, f64) + Send + Sync>;
pub type SeriesFn = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Treatment of one end of the reach.
///
/// Extrapolation is zero-gradient: the edge node copies its interior
/// neighbour, taken from the buffer being built so both sit at the same
/// time level.
pub enum BoundaryEndpoint {
    /// Both depth and discharge given as functions of time.
    Prescribed(StageDischargeFn),
    /// Depth given, discharge extrapolated.
    Stage(SeriesFn),
    /// Discharge given, depth extrapolated.
    Discharge(SeriesFn),
    Extrapolated,
}

impl BoundaryEndpoint {
    pub fn prescribed(f: impl Fn(f64) -> (f64, f64) + Send + Sync + 'static) -> Self {
        Self::Prescribed(Box::new(f))
    }

    pub fn stage(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self::Stage(Box::new(f))
    }

    pub fn discharge(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self::Discharge(Box::new(f))
    }

    fn apply(&self, t: f64, mut v: MatMut<'_, f64>, edge: usize, inner: usize) {
        let (h, q) = match self {
            Self::Prescribed(f) => f(t),
            Self::Stage(f) => (f(t), v.read(inner, DISCHARGE)),
            Self::Discharge(f) => (v.read(inner, DEPTH), f(t)),
            Self::Extrapolated => (v.read(inner, DEPTH), v.read(inner, DISCHARGE)),
        };
        v.write(edge, DEPTH, h);
        v.write(edge, DISCHARGE, q);
    }
}

impl fmt::Debug for BoundaryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prescribed(_) => "Prescribed(<fn>)",
            Self::Stage(_) => "Stage(<fn>)",
            Self::Discharge(_) => "Discharge(<fn>)",
            Self::Extrapolated => "Extrapolated",
        })
    }
}

#[derive(Debug)]
pub struct Boundaries {
    pub upstream: BoundaryEndpoint,
    pub downstream: BoundaryEndpoint,
}

impl Boundaries {
    pub fn new(upstream: BoundaryEndpoint, downstream: BoundaryEndpoint) -> Self {
        Self {
            upstream,
            downstream,
        }
    }

    /// Overwrites the two edge nodes of `v`, whose interior already holds
    /// the solution at time `t`.
    pub(crate) fn apply(&self, t: f64, mut v: MatMut<'_, f64>) {
        let last = v.nrows() - 1;
        self.upstream.apply(t, v.rb_mut(), 0, 1);
        self.downstream.apply(t, v.rb_mut(), last, last - 1);
    }
}

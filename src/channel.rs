//! Rectangular channel cross-section and the hydraulic relations built on it.
//!
//! Everything here is a pure function of the channel parameters and the local
//! depth/discharge pair. Quantities derived from the velocity are defined as
//! zero on a dry node (`h <= 0`) so that the step kernel never divides by zero.

use crate::error::{ConfigError, SimError};

pub const GRAVITY: f64 = 9.81;

const NORMAL_DEPTH_MAX_ITER: usize = 100;
const NORMAL_DEPTH_TOL: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub(crate) width: f64,
    pub(crate) slope: f64,
    pub(crate) manning: f64,
    pub(crate) gravity: f64,
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

impl Channel {
    /// Rectangular channel under standard gravity.
    ///
    /// `width` and `manning` must be positive. `slope` may be zero for a
    /// horizontal reach (tidal or still-water runs), which then has no
    /// [normal depth](Self::normal_depth); a negative slope is rejected.
    pub fn new(width: f64, slope: f64, manning: f64) -> Result<Self, ConfigError> {
        Self::with_gravity(width, slope, manning, GRAVITY)
    }

    pub fn with_gravity(
        width: f64,
        slope: f64,
        manning: f64,
        gravity: f64,
    ) -> Result<Self, ConfigError> {
        if !slope.is_finite() || slope < 0.0 {
            return Err(ConfigError::InvalidSlope(slope));
        }

        Ok(Self {
            width: positive("width", width)?,
            slope,
            manning: positive("manning", manning)?,
            gravity: positive("gravity", gravity)?,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn manning(&self) -> f64 {
        self.manning
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn area(&self, h: f64) -> f64 {
        self.width * h
    }

    pub fn wetted_perimeter(&self, h: f64) -> f64 {
        self.width + 2.0 * h
    }

    pub fn hydraulic_radius(&self, h: f64) -> f64 {
        self.area(h) / self.wetted_perimeter(h)
    }

    /// Mean velocity `Q / A`, zero on a dry node.
    pub fn velocity(&self, h: f64, q: f64) -> f64 {
        if h > 0.0 {
            q / self.area(h)
        } else {
            0.0
        }
    }

    pub fn celerity(&self, h: f64) -> f64 {
        (self.gravity * h.max(0.0)).sqrt()
    }

    /// Fastest characteristic speed `|v| + sqrt(g h)`.
    pub fn wave_speed(&self, h: f64, q: f64) -> f64 {
        self.velocity(h, q).abs() + self.celerity(h)
    }

    pub fn froude_number(&self, h: f64, q: f64) -> f64 {
        if h > 0.0 {
            self.velocity(h, q) / self.celerity(h)
        } else {
            0.0
        }
    }

    /// Manning friction slope `(n v)^2 / R^(4/3)`.
    pub fn friction_slope(&self, h: f64, q: f64) -> f64 {
        if h <= 0.0 {
            return 0.0;
        }
        let nv = self.manning * self.velocity(h, q);
        nv * nv / self.hydraulic_radius(h).powf(4.0 / 3.0)
    }

    /// Uniform-flow discharge carried at depth `h` (Manning's equation).
    pub fn manning_discharge(&self, h: f64) -> f64 {
        if h <= 0.0 {
            return 0.0;
        }
        self.conveyance(h) * self.slope.sqrt()
    }

    fn conveyance(&self, h: f64) -> f64 {
        self.area(h) * self.hydraulic_radius(h).powf(2.0 / 3.0) / self.manning
    }

    /// Depth at which the channel carries `|q|` in uniform flow.
    ///
    /// Newton iteration on the conveyance `K(h) = A R^(2/3) / n`, started from
    /// the wide-channel approximation. A horizontal reach has no normal depth.
    pub fn normal_depth(&self, q: f64) -> Result<f64, SimError> {
        let q = q.abs();
        if !q.is_finite() || self.slope <= 0.0 {
            return Err(SimError::Convergence {
                discharge: q,
                iterations: 0,
            });
        }
        if q == 0.0 {
            return Ok(0.0);
        }

        let target = q / self.slope.sqrt();
        let b = self.width;
        let mut h = (target * self.manning / b).powf(0.6);

        for _ in 0..NORMAL_DEPTH_MAX_ITER {
            let k = self.conveyance(h);
            let dk = k * (5.0 / 3.0 / h - 4.0 / 3.0 / (b + 2.0 * h));
            let mut next = h - (k - target) / dk;
            if next <= 0.0 {
                next = 0.5 * h;
            }
            if !next.is_finite() {
                break;
            }
            if (next - h).abs() <= NORMAL_DEPTH_TOL * (1.0 + h) {
                return Ok(next);
            }
            h = next;
        }

        Err(SimError::Convergence {
            discharge: q,
            iterations: NORMAL_DEPTH_MAX_ITER,
        })
    }

    pub fn critical_depth(&self, q: f64) -> f64 {
        (q * q / (self.gravity * self.width * self.width)).cbrt()
    }

    /// Conservative flux `(Q, Q^2/A + g b h^2 / 2)`.
    pub fn flux(&self, h: f64, q: f64) -> [f64; 2] {
        let advective = if h > 0.0 { q * q / self.area(h) } else { 0.0 };
        [q, advective + 0.5 * self.gravity * self.width * h * h]
    }

    /// Momentum source `g A (S0 - Sf)`, friction opposing the flow.
    pub fn momentum_source(&self, h: f64, q: f64) -> f64 {
        let sf = self.friction_slope(h, q).copysign(q);
        self.gravity * self.area(h) * (self.slope - sf)
    }
}

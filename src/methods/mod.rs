//! Explicit schemes on the conservative variables `U = (A, Q)`, with flux
//! `F = (Q, Q^2/A + g b h^2 / 2)` and source `S = (0, g A (S0 - Sf))`.
//!
//! Both are stable for a Courant number up to one and keep a uniform flow at
//! normal depth exactly steady.

use faer_core::{MatMut, MatRef};

use crate::{
    method::{Buffers, Method},
    state::{DEPTH, DISCHARGE},
    Ctx,
};

const MASS: usize = 0;
const MOMENTUM: usize = 1;

/// Local Lax-Friedrichs: central interface flux plus dissipation scaled by
/// the faster of the two neighbouring wave speeds.
///
/// `F(i+1/2) = (F(i) + F(i+1)) / 2 - a(i+1/2) (U(i+1) - U(i)) / 2`
#[derive(Default)]
pub struct Rusanov {
    // interface i holds F(i+1/2)
    flux: Buffers<2>,
}

impl Method for Rusanov {
    fn init(&mut self, ctx: Ctx<'_>) {
        self.flux.resize(ctx.grid.nodes() - 1);
    }

    fn apply(&mut self, ctx: Ctx<'_>, u: MatRef<'_, f64>, mut v: MatMut<'_, f64>) {
        let c = ctx.channel;
        let nx = u.nrows();
        let r = ctx.dt / ctx.grid.delta();

        for k in 0..nx - 1 {
            let (hl, ql) = (u.read(k, DEPTH), u.read(k, DISCHARGE));
            let (hr, qr) = (u.read(k + 1, DEPTH), u.read(k + 1, DISCHARGE));
            let (fl, fr) = (c.flux(hl, ql), c.flux(hr, qr));
            let alpha = c.wave_speed(hl, ql).max(c.wave_speed(hr, qr));

            self.flux.write(
                k,
                MASS,
                0.5 * (fl[MASS] + fr[MASS]) - 0.5 * alpha * (c.area(hr) - c.area(hl)),
            );
            self.flux.write(
                k,
                MOMENTUM,
                0.5 * (fl[MOMENTUM] + fr[MOMENTUM]) - 0.5 * alpha * (qr - ql),
            );
        }

        for i in 1..nx - 1 {
            let (h, q) = (u.read(i, DEPTH), u.read(i, DISCHARGE));
            let dm = self.flux.read(i, MASS) - self.flux.read(i - 1, MASS);
            let dp = self.flux.read(i, MOMENTUM) - self.flux.read(i - 1, MOMENTUM);

            v.write(i, DEPTH, h - r * dm / c.width());
            v.write(i, DISCHARGE, q - r * dp + ctx.dt * c.momentum_source(h, q));
        }
    }

    fn name(&self) -> &'static str {
        "Rusanov"
    }
}

/// Classic Lax-Friedrichs: neighbour average with a centred flux difference.
#[derive(Default)]
pub struct LaxFriedrichs {
    // nodal fluxes F(i)
    flux: Buffers<2>,
}

impl Method for LaxFriedrichs {
    fn init(&mut self, ctx: Ctx<'_>) {
        self.flux.resize(ctx.grid.nodes());
    }

    fn apply(&mut self, ctx: Ctx<'_>, u: MatRef<'_, f64>, mut v: MatMut<'_, f64>) {
        let c = ctx.channel;
        let nx = u.nrows();
        let r = 0.5 * ctx.dt / ctx.grid.delta();

        for i in 0..nx {
            let f = c.flux(u.read(i, DEPTH), u.read(i, DISCHARGE));
            self.flux.write(i, MASS, f[MASS]);
            self.flux.write(i, MOMENTUM, f[MOMENTUM]);
        }

        for i in 1..nx - 1 {
            let h_avg = 0.5 * (u.read(i - 1, DEPTH) + u.read(i + 1, DEPTH));
            let q_avg = 0.5 * (u.read(i - 1, DISCHARGE) + u.read(i + 1, DISCHARGE));
            let dm = self.flux.read(i + 1, MASS) - self.flux.read(i - 1, MASS);
            let dp = self.flux.read(i + 1, MOMENTUM) - self.flux.read(i - 1, MOMENTUM);

            v.write(i, DEPTH, h_avg - r * dm / c.width());
            // source taken on the averaged state, like the conservative part
            v.write(
                i,
                DISCHARGE,
                q_avg - r * dp + ctx.dt * c.momentum_source(h_avg, q_avg),
            );
        }
    }

    fn name(&self) -> &'static str {
        "Lax-Friedrichs"
    }
}

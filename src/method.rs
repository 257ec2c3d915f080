use faer_core::{Mat, MatMut, MatRef};

use crate::Ctx;

/// An explicit two-level scheme for the Saint-Venant system.
///
/// `apply` reads the state at `ctx.t` from `u` and writes the interior nodes
/// of `v` at `ctx.t + ctx.dt`. The edge rows of `v` are left to the
/// boundary conditions.
pub trait Method {
    fn init(&mut self, ctx: Ctx<'_>);
    fn apply(&mut self, ctx: Ctx<'_>, u: MatRef<'_, f64>, v: MatMut<'_, f64>);
    fn name(&self) -> &'static str;
}

/// `N` scratch columns of a common length.
pub struct Buffers<const N: usize> {
    inner: Mat<f64>,
}

impl<const N: usize> Default for Buffers<N> {
    fn default() -> Self {
        Self {
            inner: Mat::zeros(0, N),
        }
    }
}

impl<const N: usize> Buffers<N> {
    pub fn resize(&mut self, size: usize) {
        self.inner.resize_with(size, N, |_, _| 0.0)
    }

    pub fn read(&self, i: usize, n: usize) -> f64 {
        self.inner.read(i, n)
    }

    pub fn write(&mut self, i: usize, n: usize, value: f64) {
        self.inner.write(i, n, value)
    }
}

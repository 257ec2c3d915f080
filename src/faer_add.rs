use faer_core::{Mat, MatRef};

/// Element-wise `f(a, b)` over two matrices of equal shape.
pub fn zip_map(a: MatRef<'_, f64>, b: MatRef<'_, f64>, f: impl Fn(f64, f64) -> f64) -> Mat<f64> {
    assert!(a.nrows() == b.nrows() && a.ncols() == b.ncols());
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| f(a.read(i, j), b.read(i, j)))
}

pub fn row_to_vec(m: MatRef<'_, f64>, i: usize) -> Vec<f64> {
    (0..m.ncols()).map(|j| m.read(i, j)).collect()
}

pub fn col_to_vec(m: MatRef<'_, f64>, j: usize) -> Vec<f64> {
    (0..m.nrows()).map(|i| m.read(i, j)).collect()
}

/// Trapezoidal integral of equally spaced samples.
pub fn trapezoid(values: &[f64], h: f64) -> f64 {
    match values {
        [] | [_] => 0.0,
        [first, inner @ .., last] => h * (0.5 * (first + last) + inner.iter().sum::<f64>()),
    }
}

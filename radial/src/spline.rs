use psperror::{PspError, Result};

use std::sync::atomic::{AtomicUsize, Ordering};

/// Natural cubic spline through (x_i, y_i).
///
/// Outside `[x_0, x_{n-1}]` the cubic of the first or last interval is
/// extrapolated. Nothing is clamped: a query slightly past the last knot gets
/// the smooth continuation of the boundary piece.
#[derive(Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    // second derivatives at the knots
    m: Vec<f64>,
    // interval of the previous query
    hint: AtomicUsize,
}

impl Clone for CubicSpline {
    fn clone(&self) -> Self {
        CubicSpline {
            x: self.x.clone(),
            y: self.y.clone(),
            m: self.m.clone(),
            hint: AtomicUsize::new(self.hint.load(Ordering::Relaxed)),
        }
    }
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<CubicSpline> {
        let n = x.len();

        if n < 2 {
            return Err(PspError::invalid(format!(
                "a spline needs at least 2 knots, got {}",
                n
            )));
        }

        if y.len() != n {
            return Err(PspError::invalid(format!(
                "{} knots but {} values",
                n,
                y.len()
            )));
        }

        let m = natural_second_derivatives(x, y);

        Ok(CubicSpline {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
            hint: AtomicUsize::new(0),
        })
    }

    pub fn eval(&self, r: f64) -> f64 {
        let k = self.interval(r);
        let (h, a, b) = self.local(k, r);

        let m0 = self.m[k];
        let m1 = self.m[k + 1];

        a * self.y[k] + b * self.y[k + 1] + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * h * h / 6.0
    }

    pub fn eval_deriv(&self, r: f64) -> f64 {
        let k = self.interval(r);
        let (h, a, b) = self.local(k, r);

        let m0 = self.m[k];
        let m1 = self.m[k + 1];

        (self.y[k + 1] - self.y[k]) / h - (3.0 * a * a - 1.0) * h * m0 / 6.0
            + (3.0 * b * b - 1.0) * h * m1 / 6.0
    }

    pub fn eval_deriv2(&self, r: f64) -> f64 {
        let k = self.interval(r);
        let (_, a, b) = self.local(k, r);

        a * self.m[k] + b * self.m[k + 1]
    }

    // weights of the linear part in interval k; b = 1 - a, both may leave
    // [0, 1] when extrapolating
    fn local(&self, k: usize, r: f64) -> (f64, f64, f64) {
        let h = self.x[k + 1] - self.x[k];
        let b = (r - self.x[k]) / h;

        (h, 1.0 - b, b)
    }

    fn interval(&self, r: f64) -> usize {
        let n = self.x.len();
        let last = n - 2;

        let k = self.hint.load(Ordering::Relaxed).min(last);

        let inside = |k: usize| {
            (k == 0 || r >= self.x[k]) && (k == last || r < self.x[k + 1])
        };

        if inside(k) {
            return k;
        }

        // sweeps usually move to the neighbouring interval
        if k < last && inside(k + 1) {
            self.hint.store(k + 1, Ordering::Relaxed);
            return k + 1;
        }

        let k = self.x.partition_point(|&xi| xi <= r).saturating_sub(1).min(last);

        self.hint.store(k, Ordering::Relaxed);

        k
    }
}

// tridiagonal system with M_0 = M_{n-1} = 0, solved by forward elimination
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();

    let mut m = vec![0.0; n];

    if n < 3 {
        return m;
    }

    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];

    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];

        diag[i] = 2.0 * (h0 + h1);
        rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
    }

    for i in 2..n - 1 {
        let h0 = x[i] - x[i - 1];
        let w = h0 / diag[i - 1];

        diag[i] -= w * h0;
        rhs[i] -= w * rhs[i - 1];
    }

    for i in (1..n - 1).rev() {
        let h1 = x[i + 1] - x[i];

        m[i] = (rhs[i] - h1 * m[i + 1]) / diag[i];
    }

    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spline_hits_knots() {
        let x: Vec<f64> = (0..20).map(|i| 0.1 * (i as f64).powf(1.3)).collect();
        let y: Vec<f64> = x.iter().map(|v| (2.0 * v).sin()).collect();

        let s = CubicSpline::new(&x, &y).unwrap();

        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((s.eval(*xi) - yi).abs() < 1.0e-10);
        }
    }

    #[test]
    fn test_spline_reproduces_linear_function() {
        let x = vec![0.0, 0.5, 1.5, 2.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();

        let s = CubicSpline::new(&x, &y).unwrap();

        assert_relative_eq!(s.eval(1.0), 2.0, epsilon = 1.0e-12);
        assert_relative_eq!(s.eval_deriv(3.3), 3.0, epsilon = 1.0e-12);
        assert_relative_eq!(s.eval_deriv2(0.7), 0.0, epsilon = 1.0e-12);
    }

    #[test]
    fn test_spline_is_natural() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();

        let s = CubicSpline::new(&x, &y).unwrap();

        assert_relative_eq!(s.eval_deriv2(0.0), 0.0, epsilon = 1.0e-12);
        assert_relative_eq!(s.eval_deriv2(9.0), 0.0, epsilon = 1.0e-12);
        // away from the ends the curvature approaches the true one
        assert_relative_eq!(s.eval_deriv2(4.5), 2.0, max_relative = 0.05);
    }

    #[test]
    fn test_spline_extrapolates_boundary_cubic() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![0.0, 1.0, 0.0, 1.0];

        let s = CubicSpline::new(&x, &y).unwrap();

        // continuation of the last piece is smooth at the knot
        let eps = 1.0e-7;
        let inside = s.eval_deriv(3.0 - eps);
        let outside = s.eval_deriv(3.0 + eps);
        assert!((inside - outside).abs() < 1.0e-5);

        // and is not a clamp to the end value
        assert!((s.eval(3.2) - 1.0).abs() > 1.0e-3);
        assert!((s.eval(-0.2) - 0.0).abs() > 1.0e-3);
    }

    #[test]
    fn test_spline_random_access_after_sweep() {
        let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| v.cos()).collect();

        let s = CubicSpline::new(&x, &y).unwrap();

        let sweep: Vec<f64> = (0..990).map(|i| s.eval(i as f64 * 0.01)).collect();
        assert!((sweep[500] - 5.0f64.cos()).abs() < 1.0e-5);

        assert!((s.eval(0.55) - 0.55f64.cos()).abs() < 1.0e-5);
        assert!((s.eval(9.05) - 9.05f64.cos()).abs() < 1.0e-5);
    }

    #[test]
    fn test_two_knots_is_a_line() {
        let s = CubicSpline::new(&[1.0, 3.0], &[2.0, 6.0]).unwrap();

        assert_relative_eq!(s.eval(2.0), 4.0);
        assert_relative_eq!(s.eval(5.0), 10.0);
        assert_relative_eq!(s.eval_deriv(0.0), 2.0);
    }

    #[test]
    fn test_spline_rejects_bad_input() {
        assert!(CubicSpline::new(&[1.0], &[1.0]).is_err());
        assert!(CubicSpline::new(&[1.0, 2.0], &[1.0]).is_err());
    }
}

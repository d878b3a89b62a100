//! Quadrature of functions tabulated on a radial mesh, with the mesh
//! derivative `rab = dr/di` supplied next to the samples.

/// Simpson rule in the mesh index, with a 3/8 tail when the point count is
/// even. Two points fall back to the trapezoid rule.
pub fn simpson_rab(y: &[f64], rab: &[f64]) -> f64 {
    assert_eq!(y.len(), rab.len());

    let n = y.len();

    match n {
        0 | 1 => return 0.0,
        2 => return 0.5 * (y[0] * rab[0] + y[1] * rab[1]),
        _ => {}
    }

    // odd number of points handled by the 1/3 rule
    let n13 = if n % 2 == 0 { n - 3 } else { n };

    let r13 = 1.0 / 3.0;

    let mut s = 0.0;

    if n13 >= 3 {
        for i in (0..n13 - 1).step_by(2) {
            s += (y[i] * rab[i] + 4.0 * y[i + 1] * rab[i + 1] + y[i + 2] * rab[i + 2]) * r13;
        }
    }

    if n % 2 == 0 {
        let r38 = 3.0 / 8.0;

        s += (y[n - 4] * rab[n - 4]
            + 3.0 * y[n - 3] * rab[n - 3]
            + 3.0 * y[n - 2] * rab[n - 2]
            + y[n - 1] * rab[n - 1])
            * r38;
    }

    s
}

//! Arc length of parametric curves by adaptive Gauss-Kronrod quadrature

use libm::{pow, sqrt};
use serde::{Deserialize, Serialize};

use crate::poly::Cubic;
use crate::tolerance::{Tolerances, QUAD_EPSABS, QUAD_EPSREL, QUAD_LIMIT};

// 21 point Kronrod abscissae on [-1, 1], odd indices are the 10 point Gauss nodes
#[allow(clippy::excessive_precision)]
const XGK: [f64; 11] = [
    0.995657163025808080735527280689003,
    0.973906528517171720077964012084452,
    0.930157491355708226001207180059508,
    0.865063366688984510732096688423493,
    0.780817726586416897063717578345042,
    0.679409568299024406234327365114874,
    0.562757134668604683339000099272694,
    0.433395394129247190799265943165784,
    0.294392862701460198131126603103866,
    0.148874338981631210884826001129720,
    0.000000000000000000000000000000000,
];

#[allow(clippy::excessive_precision)]
const WGK: [f64; 11] = [
    0.011694638867371874278064396062192,
    0.032558162307964727478818972459390,
    0.054755896574351996031381300244580,
    0.075039674810919952767043140916190,
    0.093125454583697605535065465083366,
    0.109387158802297641899210590325805,
    0.123491976262065851077208980134232,
    0.134709217311473325928054001771707,
    0.142775938577060080797094273138717,
    0.147739104901338491374841515972068,
    0.149445554002916905664936468389821,
];

#[allow(clippy::excessive_precision)]
const WG: [f64; 5] = [
    0.066671344308688137593568809893332,
    0.149451349150580593145776339657697,
    0.219086362515982043995534934228163,
    0.269266719309996355091226921569469,
    0.295524224714752870173892994651338,
];

/// Integral estimate with its absolute error estimate
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadratureResult {
    pub value: f64,
    pub abs_error: f64,
    /// number of subintervals the range ended up split into
    pub intervals: usize,
    /// false if the subinterval limit was hit before the error target
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

/// Single 21 point Gauss-Kronrod rule on [a, b], returns (integral, error estimate)
fn gauss_kronrod_21<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> (f64, f64) {
    let center = 0.5 * (a + b);
    let half_length = 0.5 * (b - a);

    let mut fv1 = [0.0; 10];
    let mut fv2 = [0.0; 10];

    let fc = f(center);
    let mut res_gauss = 0.0;
    let mut res_kronrod = WGK[10] * fc;
    let mut res_abs = res_kronrod.abs();

    for j in 0..10 {
        let dx = half_length * XGK[j];
        let f1 = f(center - dx);
        let f2 = f(center + dx);
        fv1[j] = f1;
        fv2[j] = f2;
        res_kronrod += WGK[j] * (f1 + f2);
        res_abs += WGK[j] * (f1.abs() + f2.abs());
        if j % 2 == 1 {
            res_gauss += WG[j / 2] * (f1 + f2);
        }
    }

    let mean = 0.5 * res_kronrod;
    let mut res_asc = WGK[10] * (fc - mean).abs();
    for j in 0..10 {
        res_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
    }

    let value = res_kronrod * half_length;
    let res_abs = res_abs * half_length.abs();
    let res_asc = res_asc * half_length.abs();

    let mut error = ((res_kronrod - res_gauss) * half_length).abs();
    if res_asc != 0.0 && error != 0.0 {
        error = res_asc * pow(200.0 * error / res_asc, 1.5).min(1.0);
    }
    let roundoff = 50.0 * f64::EPSILON * res_abs;
    if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = error.max(roundoff);
    }

    (value, error)
}

/// Adaptive quadrature: keep bisecting the subinterval with the largest error until
/// the total error drops under max(epsabs, epsrel * |integral|) or `limit` subintervals exist
pub fn integrate<F: Fn(f64) -> f64>(
    f: F,
    lower: f64,
    upper: f64,
    epsabs: f64,
    epsrel: f64,
    limit: usize,
) -> QuadratureResult {
    let (value, error) = gauss_kronrod_21(&f, lower, upper);
    let mut intervals = vec![Interval {
        a: lower,
        b: upper,
        value,
        error,
    }];

    let limit = limit.max(1);
    loop {
        let total: f64 = intervals.iter().map(|i| i.value).sum();
        let total_error: f64 = intervals.iter().map(|i| i.error).sum();
        let target = epsabs.max(epsrel * total.abs());

        if total_error <= target || intervals.len() >= limit {
            return QuadratureResult {
                value: total,
                abs_error: total_error,
                intervals: intervals.len(),
                converged: total_error <= target,
            };
        }

        let worst = intervals
            .iter()
            .enumerate()
            .max_by(|(_, l), (_, r)| l.error.total_cmp(&r.error))
            .map(|(index, _)| index)
            .unwrap_or(0);
        let Interval { a, b, .. } = intervals.swap_remove(worst);
        let mid = 0.5 * (a + b);
        for (a, b) in [(a, mid), (mid, b)] {
            let (value, error) = gauss_kronrod_21(&f, a, b);
            intervals.push(Interval { a, b, value, error });
        }
    }
}

/// sqrt(u'(p)^2 + v'(p)^2)
pub fn arc_length_integrand(p: f64, du: &Cubic, dv: &Cubic) -> f64 {
    let dx = du.evaluate(p);
    let dy = dv.evaluate(p);
    sqrt(dx * dx + dy * dy)
}

/// Length of the curve (u(p), v(p)) for p in [lower, upper] given the derivative cubics
///
/// returns (length, estimated absolute error)
pub fn curve_length(du: &Cubic, dv: &Cubic, lower: f64, upper: f64) -> (f64, f64) {
    let result = curve_length_with(du, dv, lower, upper, &Tolerances::default());
    (result.value, result.abs_error)
}

pub fn curve_length_with(
    du: &Cubic,
    dv: &Cubic,
    lower: f64,
    upper: f64,
    tolerances: &Tolerances,
) -> QuadratureResult {
    integrate(
        |p| arc_length_integrand(p, du, dv),
        lower,
        upper,
        tolerances.quad_epsabs,
        tolerances.quad_epsrel,
        tolerances.quad_limit,
    )
}

/// default tolerances, for callers that only have a closure
pub fn integrate_default<F: Fn(f64) -> f64>(f: F, lower: f64, upper: f64) -> QuadratureResult {
    integrate(f, lower, upper, QUAD_EPSABS, QUAD_EPSREL, QUAD_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::tolerance::LENGTH_MATCH_THRESHOLD;

    #[test]
    fn weights_sum_to_interval_length() {
        let kronrod: f64 = 2.0 * WGK[..10].iter().sum::<f64>() + WGK[10];
        let gauss: f64 = 2.0 * WG.iter().sum::<f64>();
        assert_abs_diff_eq!(kronrod, 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(gauss, 2.0, epsilon = 1e-14);
    }

    #[test]
    fn polynomials_are_exact() {
        // a single 21 point rule already integrates these exactly
        for degree in 0..12 {
            let result = integrate_default(|x: f64| x.powi(degree), 0.0, 2.0);
            let exact = 2.0f64.powi(degree + 1) / (degree + 1) as f64;
            assert_abs_diff_eq!(result.value, exact, epsilon = 1e-10 * exact.max(1.0));
            assert!(result.converged);
        }
    }

    #[test]
    fn adaptive_splits() {
        // sqrt has an unbounded derivative at 0, a single rule isn't good enough
        let result = integrate_default(|x: f64| x.sqrt(), 0.0, 1.0);
        assert_abs_diff_eq!(result.value, 2.0 / 3.0, epsilon = 1e-8);
        assert!(result.intervals > 1);
        assert!(result.abs_error < 1e-7);
    }

    #[test]
    fn limit_stops_refinement() {
        let result = integrate(|x: f64| (1.0 / x).sin(), 1e-6, 1.0, 1e-14, 1e-14, 3);
        assert_eq!(result.intervals, 3);
        assert!(!result.converged);
    }

    #[test]
    fn straight_line_length() {
        // u(p) = p, v(p) = 0
        let length = 37.5;
        let du = Cubic::new(1.0, 0.0, 0.0, 0.0);
        let dv = Cubic::ZERO;
        let (value, error) = curve_length(&du, &dv, 0.0, length);
        assert!((value - length).abs() < LENGTH_MATCH_THRESHOLD);
        assert!(error < 1e-9);
    }

    #[test]
    fn quarter_circle_like_curve() {
        // u = 10 p, v = 10 p^2 over [0, 1]: length = integral of 10 sqrt(1 + 4 p^2)
        let du = Cubic::new(10.0, 0.0, 0.0, 0.0);
        let dv = Cubic::new(0.0, 20.0, 0.0, 0.0);
        let (value, _) = curve_length(&du, &dv, 0.0, 1.0);
        let exact = 10.0 * (0.5 * 5.0f64.sqrt() + 0.25 * (2.0 + 5.0f64.sqrt()).ln());
        assert_abs_diff_eq!(value, exact, epsilon = 1e-9);
    }

    #[test]
    fn reversed_bounds_negate() {
        let du = Cubic::new(1.0, 1.0, 0.0, 0.0);
        let dv = Cubic::new(0.5, 0.0, 0.0, 0.0);
        let (forward, _) = curve_length(&du, &dv, 0.0, 2.0);
        let (backward, _) = curve_length(&du, &dv, 2.0, 0.0);
        assert_abs_diff_eq!(forward, -backward, epsilon = 1e-12);
    }
}

//! Spiral evaluation as an initial value problem
//!
//! Slower than the closed form but independent of it, so it's kept around to check the
//! Fresnel solution against.

use libm::{cos, pow, sin, sqrt};

use crate::clothoid::{SpiralParams, SpiralPose};
use crate::error::GeometryError;
use crate::tolerance::{ODE_ATOL, ODE_RTOL};

/// hard stop for the adaptive loop, valid inputs use a few hundred steps at most
pub const MAX_STEPS: usize = 100_000;

const N: usize = 4;
type State = [f64; N];

// Dormand-Prince 5(4) tableau
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
/// 5th order weights
const B: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];
/// difference between the 5th and embedded 4th order weights
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

/// Adaptive Dormand-Prince integration of y' = f(t, y) from t0 to t1
///
/// The workspace lives on the stack of this call, nothing is shared between calls.
pub fn integrate<F>(
    f: F,
    t0: f64,
    t1: f64,
    y0: State,
    atol: f64,
    rtol: f64,
) -> Result<State, GeometryError>
where
    F: Fn(f64, &State) -> State,
{
    let mut t = t0;
    let mut y = y0;
    let span = t1 - t0;
    if span <= 0.0 {
        return Ok(y);
    }

    let mut h = 0.01 * span;
    let mut k = [[0.0; N]; 7];
    k[0] = f(t, &y);

    let mut steps = 0;
    while t < t1 {
        steps += 1;
        if steps > MAX_STEPS {
            return Err(GeometryError::StepLimit { steps: MAX_STEPS });
        }
        if t + h > t1 {
            h = t1 - t;
        }

        for stage in 1..7 {
            let mut yi = y;
            for (j, yi_j) in yi.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (m, k_m) in k.iter().enumerate().take(stage) {
                    acc += A[stage][m] * k_m[j];
                }
                *yi_j += h * acc;
            }
            k[stage] = f(t + C[stage] * h, &yi);
        }

        let mut y_new = y;
        let mut err_sq = 0.0;
        for j in 0..N {
            let mut acc = 0.0;
            let mut err = 0.0;
            for m in 0..7 {
                acc += B[m] * k[m][j];
                err += E[m] * k[m][j];
            }
            y_new[j] = y[j] + h * acc;
            let scale = atol + rtol * y[j].abs().max(y_new[j].abs());
            let ratio = h * err / scale;
            err_sq += ratio * ratio;
        }
        let err_norm = sqrt(err_sq / N as f64);

        if err_norm <= 1.0 {
            t += h;
            y = y_new;
            // first same as last
            k[0] = k[6];
            let factor = if err_norm == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * pow(err_norm, -0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            h *= factor;
        } else {
            h *= (SAFETY * pow(err_norm, -0.2)).max(MIN_FACTOR);
        }
    }

    Ok(y)
}

/// ODE spiral solver with the default tolerances
pub fn spiral_ode(s: f64, params: &SpiralParams) -> Result<SpiralPose, GeometryError> {
    spiral_ode_with(s, params, ODE_ATOL, ODE_RTOL)
}

/// Integrate x' = cos(theta), y' = sin(theta), theta' = k, k' = sigma up to `s`
///
/// The independent variable is scaled to [0, 1] by the segment length, `s` is clamped to
/// [0, length] first.
pub fn spiral_ode_with(
    s: f64,
    params: &SpiralParams,
    atol: f64,
    rtol: f64,
) -> Result<SpiralPose, GeometryError> {
    GeometryError::check_length(params.length)?;

    let length = params.length;
    let delta_curvature = params.curvature_end - params.curvature_start;
    let end = params.clamp_s(s) / length;

    let rhs = |_tau: f64, state: &State| -> State {
        [
            cos(state[2]) * length,
            sin(state[2]) * length,
            state[3] * length,
            delta_curvature,
        ]
    };

    let start = [params.x0, params.y0, params.theta0, params.curvature_start];
    let [x, y, theta, _] = integrate(rhs, 0.0, end, start, atol, rtol)?;
    Ok(SpiralPose { x, y, theta })
}

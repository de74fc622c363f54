use core::f64::consts::{FRAC_PI_2, PI};

use libm::{cos, floor, sin, sqrt};
use serde::{Deserialize, Serialize};
use uom::si::f64::{Angle, Curvature, Length};
use uom::si::{angle::radian, curvature::radian_per_meter, length::meter};

use crate::clothoid_ode::spiral_ode_with;
use crate::error::GeometryError;
use crate::frame::Pose2D;
use crate::tolerance::{is_effectively_zero, Tolerances, CURVATURE_EPSILON};

/// Position and heading at some arc length along a spiral
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpiralPose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl SpiralPose {
    pub fn to_pose2d(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.theta)
    }
}

/// Start pose and boundary curvatures of a spiral, curvature changes linearly over `length`
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpiralParams {
    pub x0: f64,
    pub y0: f64,
    pub theta0: f64,
    /// 1/m at s = 0
    pub curvature_start: f64,
    /// 1/m at s = length
    pub curvature_end: f64,
    pub length: f64,
}

impl SpiralParams {
    /// curvature rate sigma, 1/m^2
    pub fn curvature_rate(&self) -> f64 {
        (self.curvature_end - self.curvature_start) / self.length
    }

    /// theta(s) = theta0 + k0 * s + 1/2 * sigma * s^2
    pub fn heading_at(&self, s: f64) -> f64 {
        self.theta0 + self.curvature_start * s + 0.5 * self.curvature_rate() * s * s
    }

    pub fn clamp_s(&self, s: f64) -> f64 {
        if s <= 0.0 {
            0.0
        } else if s > self.length {
            self.length
        } else {
            s
        }
    }
}

/// Which spiral solver to use, the closed form is the production one
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiralMethod {
    #[default]
    Fresnel,
    Ode,
}

impl SpiralMethod {
    pub const ALL: [SpiralMethod; 2] = [SpiralMethod::Fresnel, SpiralMethod::Ode];

    pub fn evaluate(
        self,
        s: f64,
        params: &SpiralParams,
        tolerances: &Tolerances,
    ) -> Result<SpiralPose, GeometryError> {
        match self {
            Self::Fresnel => spiral_fresnel_with(s, params, tolerances.curvature),
            Self::Ode => spiral_ode_with(s, params, tolerances.ode_atol, tolerances.ode_rtol),
        }
    }
}

// Rational approximation coefficients for 1 <= x < 6, from
// Thompson, Atlas for computing mathematical functions, Wiley 1997
#[allow(clippy::excessive_precision)]
const FRN: [f64; 11] = [
    0.49999988085884732562,
    1.3511177791210715095,
    1.3175407836168659241,
    1.1861149300293854992,
    0.7709627298888346769,
    0.4173874338787963957,
    0.19044202705272903923,
    0.06655998896627697537,
    0.022789258616785717418,
    0.0040116689358507943804,
    0.0012192036851249883877,
];

#[allow(clippy::excessive_precision)]
const FRD: [f64; 12] = [
    1.0,
    2.7022305772400260215,
    4.2059268151438492767,
    4.5221882840107715516,
    3.7240352281630359588,
    2.4589286254678152943,
    1.3125491629443702962,
    0.5997685720120932908,
    0.20907680750378849485,
    0.07159621634657901433,
    0.012602969513793714191,
    0.0038302423512931250065,
];

#[allow(clippy::excessive_precision)]
const GN: [f64; 11] = [
    0.50000014392706344801,
    0.032346434925349128728,
    0.17619325157863254363,
    0.038606273170706486252,
    0.023693692309257725361,
    0.007092018516845033662,
    0.0012492123212412087428,
    0.00044023040894778468486,
    -8.80266827476172521e-6,
    -1.4033554916580018648e-8,
    2.3509221782155474353e-10,
];

#[allow(clippy::excessive_precision)]
const GD: [f64; 12] = [
    1.0,
    2.0646987497019598937,
    2.9109311766948031235,
    2.6561936751333032911,
    2.0195563983177268073,
    1.1167891129189363902,
    0.57267874755973172715,
    0.19408481169593070798,
    0.07634808341431248904,
    0.011573247407207865977,
    0.0044099273693067311209,
    -0.00009070958410429993314,
];

const FRESNEL_EPS: f64 = 1e-15;
/// every series below converges in a few dozen terms for finite arguments
const FRESNEL_MAX_TERMS: usize = 100;

fn rational(num: &[f64; 11], den: &[f64; 12], x: f64) -> f64 {
    let mut sumn = 0.0;
    let mut sumd = den[11];
    for k in (0..=10).rev() {
        sumn = num[k] + x * sumn;
        sumd = den[k] + x * sumd;
    }
    sumn / sumd
}

/// Normalized Fresnel integrals
///
/// C(y) = integral 0..y of cos(pi/2 t^2) dt, S(y) = integral 0..y of sin(pi/2 t^2) dt
///
/// returns (C, S), both odd functions of y
pub fn fresnel_cs(y: f64) -> (f64, f64) {
    if y.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    if y.is_infinite() {
        return (0.5 * y.signum(), 0.5 * y.signum());
    }
    let x = y.abs();

    let (c_value, s_value) = if x < 1.0 {
        // power series
        let t = -(FRAC_PI_2 * x * x) * (FRAC_PI_2 * x * x);

        let mut twofn = 0.0;
        let mut fact = 1.0;
        let mut denterm = 1.0;
        let mut numterm = 1.0;
        let mut sum = 1.0;
        for _ in 0..FRESNEL_MAX_TERMS {
            twofn += 2.0;
            fact *= twofn * (twofn - 1.0);
            denterm += 4.0;
            numterm *= t;
            let term = numterm / (fact * denterm);
            sum += term;
            if term.abs() <= FRESNEL_EPS * sum.abs() {
                break;
            }
        }
        let c = x * sum;

        let mut twofn = 1.0;
        let mut fact = 1.0;
        let mut denterm = 3.0;
        let mut numterm = 1.0;
        let mut sum = numterm / denterm;
        for _ in 0..FRESNEL_MAX_TERMS {
            twofn += 2.0;
            fact *= twofn * (twofn - 1.0);
            denterm += 4.0;
            numterm *= t;
            let term = numterm / (fact * denterm);
            sum += term;
            if term.abs() <= FRESNEL_EPS * sum.abs() {
                break;
            }
        }
        let s = FRAC_PI_2 * sum * (x * x * x);
        (c, s)
    } else {
        let (f, g) = if x < 6.0 {
            (rational(&FRN, &FRD, x), rational(&GN, &GD, x))
        } else {
            // asymptotic expansions
            let s = PI * x * x;
            let t = -1.0 / (s * s);
            let eps10 = 0.1 * FRESNEL_EPS;

            let mut numterm = -1.0;
            let mut term = 1.0;
            let mut sum = 1.0;
            for _ in 0..FRESNEL_MAX_TERMS {
                numterm += 4.0;
                term *= numterm * (numterm - 2.0) * t;
                sum += term;
                if term.abs() <= eps10 * sum.abs() {
                    break;
                }
            }
            let f = sum / (PI * x);

            numterm = -1.0;
            term = 1.0;
            sum = 1.0;
            for _ in 0..FRESNEL_MAX_TERMS {
                numterm += 4.0;
                term *= numterm * (numterm + 2.0) * t;
                sum += term;
                if term.abs() <= eps10 * sum.abs() {
                    break;
                }
            }
            let g0 = PI * x;
            let g = sum / (g0 * g0 * x);
            (f, g)
        };

        let u_value = FRAC_PI_2 * (x * x);
        let sin_u = sin(u_value);
        let cos_u = cos(u_value);
        (0.5 + f * sin_u - g * cos_u, 0.5 - f * cos_u - g * sin_u)
    };

    if y < 0.0 {
        (-c_value, -s_value)
    } else {
        (c_value, s_value)
    }
}

fn lommel_reduced(mu: f64, nu: f64, b: f64) -> f64 {
    let mut term = 1.0 / ((mu + nu + 1.0) * (mu - nu + 1.0));
    let mut sum = term;
    for n in 1..=100 {
        let n = n as f64;
        term *= (-b / (2.0 * n + mu - nu + 1.0)) * (b / (2.0 * n + mu + nu + 1.0));
        sum += term;
        if term.abs() < sum.abs() * 1e-50 {
            break;
        }
    }
    sum
}

// terms of the series in a, and the trig moments those terms need
const A_SERIES_TERMS: usize = 3;
const MOMENTS: usize = 4 * A_SERIES_TERMS + 3;
/// |a| below this uses the series in a, above it the Fresnel integrals
const SMALL_A: f64 = 0.01;

/// X_k = integral 0..1 of tau^k cos(b tau), Y_k = integral 0..1 of tau^k sin(b tau)
fn trig_moments(b: f64) -> ([f64; MOMENTS], [f64; MOMENTS]) {
    let mut x = [0.0; MOMENTS];
    let mut y = [0.0; MOMENTS];
    let sb = sin(b);
    let cb = cos(b);
    let b2 = b * b;
    if b.abs() < 1e-3 {
        x[0] = 1.0 - (b2 / 6.0) * (1.0 - (b2 / 20.0) * (1.0 - (b2 / 42.0)));
        y[0] = (b / 2.0) * (1.0 - (b2 / 12.0) * (1.0 - (b2 / 30.0)));
    } else {
        x[0] = sb / b;
        y[0] = (1.0 - cb) / b;
    }

    // the upward recurrence is stable while k < |b|
    let m = (floor(2.0 * b.abs()) as usize).clamp(1, MOMENTS);
    for k in 1..m {
        let kf = k as f64;
        x[k] = (sb - kf * y[k - 1]) / b;
        y[k] = (kf * x[k - 1] - cb) / b;
    }

    // Lommel functions for the rest
    if m < MOMENTS {
        let la = b * sb;
        let ld = sb - b * cb;
        let lb = b * ld;
        let lc = -b2 * sb;
        let mut r_la = lommel_reduced(m as f64 + 0.5, 1.5, b);
        let mut r_ld = lommel_reduced(m as f64 + 0.5, 0.5, b);
        for k in m..MOMENTS {
            let kf = k as f64;
            let r_lb = lommel_reduced(kf + 1.5, 0.5, b);
            let r_lc = lommel_reduced(kf + 1.5, 1.5, b);
            x[k] = (kf * la * r_la + lb * r_lb + cb) / (1.0 + kf);
            y[k] = (lc * r_lc + sb) / (2.0 + kf) + ld * r_ld;
            r_la = r_lc;
            r_ld = r_lb;
        }
    }
    (x, y)
}

/// (X, Y) = integral 0..1 of (cos, sin)(a/2 tau^2 + b tau) for small |a|
///
/// exp(i a/2 tau^2) is expanded in powers of a, so nothing large has to cancel
/// when the curvature rate is tiny next to the start curvature
fn generalized_fresnel_small_a(a: f64, b: f64) -> (f64, f64) {
    let (x0, y0) = trig_moments(b);

    let mut x = x0[0] - (a / 2.0) * y0[2];
    let mut y = y0[0] + (a / 2.0) * x0[2];

    let mut t = 1.0;
    let aa = -a * a / 4.0;
    for n in 1..=A_SERIES_TERMS {
        t *= aa / ((2 * n * (2 * n - 1)) as f64);
        let bf = a / ((4 * n + 2) as f64);
        let j = 4 * n;
        x += t * (x0[j] - bf * y0[j + 2]);
        y += t * (y0[j] + bf * x0[j + 2]);
    }
    (x, y)
}

/// Closed form spiral evaluation with the default degenerate-curvature tolerance
pub fn spiral_fresnel(s: f64, params: &SpiralParams) -> Result<SpiralPose, GeometryError> {
    spiral_fresnel_with(s, params, CURVATURE_EPSILON)
}

/// Evaluate a spiral at arc length `s` (clamped to [0, length]) in closed form
///
/// theta(s) = theta0 + k0 s + 1/2 sigma s^2 is rewritten as alpha + 1/2 sigma (s + k0/sigma)^2
/// which turns the position integral of exp(i theta) into a difference of Fresnel integrals
/// evaluated at t = sqrt(|sigma| / pi) (z + k0 / sigma) for z = 0 and z = s.
/// When sigma s^2 is small those arguments get huge and cancel badly, so a series in
/// sigma s^2 is used instead.
///
/// Zero curvature and constant curvature are solved directly as a line and a circle,
/// "zero" meaning the curvature times the segment length is within `curvature_epsilon`.
pub fn spiral_fresnel_with(
    s: f64,
    params: &SpiralParams,
    curvature_epsilon: f64,
) -> Result<SpiralPose, GeometryError> {
    GeometryError::check_length(params.length)?;

    let s = params.clamp_s(s);
    let SpiralParams {
        x0,
        y0,
        theta0,
        curvature_start: k0,
        curvature_end: k1,
        length,
    } = *params;

    let delta_curvature = k1 - k0;
    let constant_curvature = is_effectively_zero(delta_curvature * length, curvature_epsilon);

    if constant_curvature && is_effectively_zero(k0 * length, curvature_epsilon) {
        return Ok(SpiralPose {
            x: x0 + s * cos(theta0),
            y: y0 + s * sin(theta0),
            theta: theta0,
        });
    }

    if constant_curvature {
        let theta1 = theta0 + k0 * s;
        return Ok(SpiralPose {
            x: x0 + (sin(theta1) - sin(theta0)) / k0,
            y: y0 - (cos(theta1) - cos(theta0)) / k0,
            theta: theta1,
        });
    }

    let sigma = delta_curvature / length;
    let theta = theta0 + k0 * s + 0.5 * sigma * s * s;

    let a = sigma * s * s;
    if a.abs() < SMALL_A {
        let (xx, yy) = generalized_fresnel_small_a(a, k0 * s);
        let cos_theta0 = cos(theta0);
        let sin_theta0 = sin(theta0);
        return Ok(SpiralPose {
            x: x0 + s * (xx * cos_theta0 - yy * sin_theta0),
            y: y0 + s * (xx * sin_theta0 + yy * cos_theta0),
            theta,
        });
    }

    let sign_sigma = if sigma >= 0.0 { 1.0 } else { -1.0 };

    let alpha = theta0 - 0.5 * k0 * k0 / sigma;
    let beta = sqrt(sigma.abs() / PI);
    let t0 = k0 * beta / sigma;
    let ts = (k0 + sigma * s) * beta / sigma;

    let (c_t0, s_t0) = fresnel_cs(t0);
    let (c_ts, s_ts) = fresnel_cs(ts);
    let delta_c = c_ts - c_t0;
    let delta_s = s_ts - s_t0;

    let cos_alpha = cos(alpha);
    let sin_alpha = sin(alpha);

    let delta_x = (cos_alpha * delta_c - sin_alpha * sign_sigma * delta_s) / beta;
    let delta_y = (sin_alpha * delta_c + cos_alpha * sign_sigma * delta_s) / beta;

    Ok(SpiralPose {
        x: x0 + delta_x,
        y: y0 + delta_y,
        theta,
    })
}

/// A spiral segment in SI units
#[derive(Debug, Clone, PartialEq)]
pub struct Clothoid {
    pub x0: Length,
    pub y0: Length,
    /// start heading
    pub theta0: Angle,
    pub curvature_start: Curvature,
    pub curvature_end: Curvature,
    pub length: Length,
}

impl Clothoid {
    pub fn create(
        x0: Length,
        y0: Length,
        theta0: Angle,
        curvature_start: Curvature,
        curvature_end: Curvature,
        length: Length,
    ) -> Result<Self, GeometryError> {
        GeometryError::check_length(length.get::<meter>())?;
        Ok(Self {
            x0,
            y0,
            theta0,
            curvature_start,
            curvature_end,
            length,
        })
    }

    /// same as create but in plain meters, radians and 1/m
    pub fn from_params(params: &SpiralParams) -> Result<Self, GeometryError> {
        Self::create(
            Length::new::<meter>(params.x0),
            Length::new::<meter>(params.y0),
            Angle::new::<radian>(params.theta0),
            Curvature::new::<radian_per_meter>(params.curvature_start),
            Curvature::new::<radian_per_meter>(params.curvature_end),
            Length::new::<meter>(params.length),
        )
    }

    pub fn params(&self) -> SpiralParams {
        SpiralParams {
            x0: self.x0.get::<meter>(),
            y0: self.y0.get::<meter>(),
            theta0: self.theta0.get::<radian>(),
            curvature_start: self.curvature_start.get::<radian_per_meter>(),
            curvature_end: self.curvature_end.get::<radian_per_meter>(),
            length: self.length.get::<meter>(),
        }
    }

    /// 1/m^2
    pub fn curvature_rate(&self) -> f64 {
        self.params().curvature_rate()
    }

    pub fn curvature_at(&self, s: Length) -> Curvature {
        let params = self.params();
        let s = params.clamp_s(s.get::<meter>());
        Curvature::new::<radian_per_meter>(params.curvature_start + params.curvature_rate() * s)
    }

    /// s is length along the curve, clamped to the segment
    pub fn pose_at(&self, s: Length) -> Result<SpiralPose, GeometryError> {
        spiral_fresnel(s.get::<meter>(), &self.params())
    }

    pub fn pose_at_with(
        &self,
        method: SpiralMethod,
        s: Length,
        tolerances: &Tolerances,
    ) -> Result<SpiralPose, GeometryError> {
        method.evaluate(s.get::<meter>(), &self.params(), tolerances)
    }

    pub fn end_pose(&self) -> Result<SpiralPose, GeometryError> {
        self.pose_at(self.length)
    }
}

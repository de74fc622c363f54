use approx::assert_abs_diff_eq;
use core::f64::consts::PI;

use road_geometry::clothoid::SpiralParams;
use road_geometry::{GeometryError, SpiralMethod, Tolerances};

fn params(k0: f64, k1: f64, length: f64) -> SpiralParams {
    SpiralParams {
        x0: 12.0,
        y0: -7.5,
        theta0: 0.8,
        curvature_start: k0,
        curvature_end: k1,
        length,
    }
}

#[test]
fn closed_form_matches_ode() {
    let tolerances = Tolerances::default();
    let curvatures = [
        (0.0, 0.0),
        (0.0, 0.01),
        (0.01, 0.0),
        (-0.05, 0.05),
        (0.2, 0.2),
        (0.1, 0.1 + 1e-7),
        (0.1, 0.1 + 2e-9),
        (0.01, 0.01 + 2e-9),
        (-0.3, -0.3 - 5e-10),
        (1e-6, -1e-6),
        (0.5, 2.0),
        (-1.5, -0.25),
    ];
    for (k0, k1) in curvatures {
        for length in [0.5, 10.0, 120.0] {
            let p = params(k0, k1, length);
            for fraction in [0.0, 0.1, 0.25, 0.5, 0.9, 1.0] {
                let s = fraction * length;
                let mut poses = SpiralMethod::ALL
                    .iter()
                    .map(|method| method.evaluate(s, &p, &tolerances).unwrap());
                let fresnel = poses.next().unwrap();
                let ode = poses.next().unwrap();
                assert_abs_diff_eq!(fresnel.x, ode.x, epsilon = 1e-6);
                assert_abs_diff_eq!(fresnel.y, ode.y, epsilon = 1e-6);
                assert_abs_diff_eq!(fresnel.theta, ode.theta, epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn long_nearly_constant_curvature() {
    let tolerances = Tolerances::default();
    for (k0, dk, length) in [(0.01, 2e-9, 1000.0), (0.2, 5e-9, 500.0)] {
        let p = params(k0, k0 + dk, length);
        for fraction in [0.1, 0.5, 0.9, 1.0] {
            let s = fraction * length;
            let fresnel = SpiralMethod::Fresnel.evaluate(s, &p, &tolerances).unwrap();
            let ode = SpiralMethod::Ode.evaluate(s, &p, &tolerances).unwrap();
            assert_abs_diff_eq!(fresnel.x, ode.x, epsilon = 1e-6);
            assert_abs_diff_eq!(fresnel.y, ode.y, epsilon = 1e-6);
            assert_abs_diff_eq!(fresnel.theta, ode.theta, epsilon = 1e-6);
        }
    }
}

#[test]
fn straight_line_and_circle() {
    let tolerances = Tolerances::default();
    for method in SpiralMethod::ALL {
        let line = params(0.0, 0.0, 40.0);
        for s in [0.0, 3.0, 39.0, 40.0] {
            let pose = method.evaluate(s, &line, &tolerances).unwrap();
            assert_abs_diff_eq!(pose.x, line.x0 + s * line.theta0.cos(), epsilon = 1e-9);
            assert_abs_diff_eq!(pose.y, line.y0 + s * line.theta0.sin(), epsilon = 1e-9);
            assert_abs_diff_eq!(pose.theta, line.theta0, epsilon = 1e-9);
        }
    }

    // a full turn of a radius 4 circle comes back to the start
    let k = 0.25;
    let circle = params(k, k, 2.0 * PI / k);
    let end = SpiralMethod::Fresnel
        .evaluate(circle.length, &circle, &tolerances)
        .unwrap();
    assert_abs_diff_eq!(end.x, circle.x0, epsilon = 1e-9);
    assert_abs_diff_eq!(end.y, circle.y0, epsilon = 1e-9);
    assert_abs_diff_eq!(end.theta, circle.theta0 + 2.0 * PI, epsilon = 1e-9);
}

#[test]
fn boundaries() {
    let tolerances = Tolerances::default();
    let p = params(0.03, -0.02, 75.0);
    let sigma = (p.curvature_end - p.curvature_start) / p.length;
    for method in SpiralMethod::ALL {
        let start = method.evaluate(0.0, &p, &tolerances).unwrap();
        assert_eq!((start.x, start.y, start.theta), (p.x0, p.y0, p.theta0));

        let end = method.evaluate(p.length, &p, &tolerances).unwrap();
        let expected = p.theta0 + p.curvature_start * p.length + 0.5 * sigma * p.length * p.length;
        assert_abs_diff_eq!(end.theta, expected, epsilon = 1e-9);
    }
}

#[test]
fn invalid_length_for_every_method() {
    let tolerances = Tolerances::default();
    for length in [0.0, -1.0] {
        for method in SpiralMethod::ALL {
            assert!(matches!(
                method.evaluate(1.0, &params(0.0, 0.1, length), &tolerances),
                Err(GeometryError::InvalidGeometry { .. })
            ));
        }
    }
}

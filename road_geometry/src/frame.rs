use core::ops::Add;

use glam::{DMat3, DVec3, EulerRot};
use libm::{cos, sin, sqrt};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        sqrt(dx * dx + dy * dy)
    }
}

impl Add for Point2D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        sqrt(dx * dx + dy * dy + dz * dz)
    }

    /// horizontal distance, ignoring z
    pub fn distance_xy(&self, other: &Self) -> f64 {
        self.xy().distance(&other.xy())
    }

    pub fn xy(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl Add for Point3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// position plus heading (radians from +x, counter clockwise) in the inertial frame
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl Pose2D {
    pub const fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Rotate a point given in a segment's local frame by `heading`, then move it to `origin`
pub fn rotate_translate(local: Point2D, origin: Point2D, heading: f64) -> Point2D {
    let (sin_h, cos_h) = (sin(heading), cos(heading));
    Point2D {
        x: cos_h * local.x - sin_h * local.y + origin.x,
        y: sin_h * local.x + cos_h * local.y + origin.y,
    }
}

/// R = Rz(yaw) * Ry(pitch) * Rx(roll), rotating axes applied z, then y, then x
pub fn rotation_zyx(yaw: f64, pitch: f64, roll: f64) -> DMat3 {
    DMat3::from_euler(EulerRot::ZYX, yaw, pitch, roll)
}

impl From<DVec3> for Point3D {
    fn from(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// inertial displacement of the lateral/vertical offset (0, t, h) from a reference point
pub fn lateral_offset(yaw: f64, pitch: f64, roll: f64, t: f64, h: f64) -> Point3D {
    (rotation_zyx(yaw, pitch, roll) * DVec3::new(0.0, t, h)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use core::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn rotate_translate_quarter_turn() {
        let p = rotate_translate(Point2D::new(1.0, 0.0), Point2D::new(10.0, 20.0), FRAC_PI_2);
        assert_abs_diff_eq!(p.x, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 21.0, epsilon = 1e-12);

        let p = rotate_translate(Point2D::new(2.0, 1.0), Point2D::default(), PI);
        assert_abs_diff_eq!(p.x, -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn rotation_is_orthonormal() {
        let r = rotation_zyx(0.3, -0.2, 0.7);
        assert!((r.transpose() * r).abs_diff_eq(DMat3::IDENTITY, 1e-12));
        assert_abs_diff_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rotation_order() {
        let (yaw, pitch, roll) = (0.3, -0.2, 0.7);
        let composed = DMat3::from_rotation_z(yaw)
            * DMat3::from_rotation_y(pitch)
            * DMat3::from_rotation_x(roll);
        assert!(rotation_zyx(yaw, pitch, roll).abs_diff_eq(composed, 1e-12));

        // pitch alone tips +x down
        let v = rotation_zyx(0.0, 0.3, 0.0) * DVec3::X;
        assert_abs_diff_eq!(v.x, 0.3f64.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(v.z, -(0.3f64.sin()), epsilon = 1e-12);
    }

    #[test]
    fn lateral_offset_yaw_only() {
        // heading north, positive t is to the left which is -x
        let d = lateral_offset(FRAC_PI_2, 0.0, 0.0, 2.0, 1.0);
        assert_abs_diff_eq!(d.x, -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn lateral_offset_roll() {
        let roll = 0.1;
        let d = lateral_offset(0.0, 0.0, roll, 3.0, 0.0);
        assert_abs_diff_eq!(d.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.y, 3.0 * roll.cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(d.z, 3.0 * roll.sin(), epsilon = 1e-12);
    }

    #[test]
    fn distances() {
        let a = Point3D::new(0.0, 0.0, 0.0);
        let b = Point3D::new(3.0, 4.0, 12.0);
        assert_abs_diff_eq!(a.distance(&b), 13.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.distance_xy(&b), 5.0, epsilon = 1e-12);
    }
}

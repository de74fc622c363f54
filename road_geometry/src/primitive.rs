use libm::{atan2, cos, sin};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;
use uom::si::length::meter;

use crate::arc_length::{curve_length_with, QuadratureResult};
use crate::clothoid::{Clothoid, SpiralMethod, SpiralParams, SpiralPose};
use crate::error::GeometryError;
use crate::frame::{rotate_translate, Point2D, Pose2D};
use crate::poly::Cubic;
use crate::tolerance::{is_effectively_zero, Tolerances};
use crate::GeometryResult;

/// How the parameter of a paramPoly3 relates to arc length
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamPoly3Range {
    /// p runs over [0, length]
    ArcLength,
    /// p runs over [0, 1]
    #[default]
    Normalized,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Line,
    Arc {
        curvature: Option<f64>,
    },
    Spiral {
        curv_start: Option<f64>,
        curv_end: Option<f64>,
    },
    ParamPoly3 {
        u: Cubic,
        v: Cubic,
        range: ParamPoly3Range,
    },
}

/// One plan view segment of a road reference line
///
/// Fields are optional because documents in the wild leave them out, an evaluation
/// that needs a missing field comes back as None.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryPrimitive {
    pub s0: Option<f64>,
    pub x0: Option<f64>,
    pub y0: Option<f64>,
    pub heading0: Option<f64>,
    pub length: Option<f64>,
    /// None if the geometry element has no recognised child
    pub kind: Option<PrimitiveKind>,
}

/// the start pose fields, all present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveStart {
    pub s0: f64,
    pub x0: f64,
    pub y0: f64,
    pub heading0: f64,
    pub length: f64,
}

impl PrimitiveStart {
    fn origin(&self) -> Point2D {
        Point2D::new(self.x0, self.y0)
    }
}

impl GeometryPrimitive {
    pub fn new(s0: f64, x0: f64, y0: f64, heading0: f64, length: f64, kind: PrimitiveKind) -> Self {
        Self {
            s0: Some(s0),
            x0: Some(x0),
            y0: Some(y0),
            heading0: Some(heading0),
            length: Some(length),
            kind: Some(kind),
        }
    }

    pub fn line(s0: f64, x0: f64, y0: f64, heading0: f64, length: f64) -> Self {
        Self::new(s0, x0, y0, heading0, length, PrimitiveKind::Line)
    }

    pub fn arc(s0: f64, x0: f64, y0: f64, heading0: f64, length: f64, curvature: f64) -> Self {
        Self::new(
            s0,
            x0,
            y0,
            heading0,
            length,
            PrimitiveKind::Arc {
                curvature: Some(curvature),
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn spiral(
        s0: f64,
        x0: f64,
        y0: f64,
        heading0: f64,
        length: f64,
        curv_start: f64,
        curv_end: f64,
    ) -> Self {
        Self::new(
            s0,
            x0,
            y0,
            heading0,
            length,
            PrimitiveKind::Spiral {
                curv_start: Some(curv_start),
                curv_end: Some(curv_end),
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn param_poly3(
        s0: f64,
        x0: f64,
        y0: f64,
        heading0: f64,
        length: f64,
        u: Cubic,
        v: Cubic,
        range: ParamPoly3Range,
    ) -> Self {
        Self::new(s0, x0, y0, heading0, length, PrimitiveKind::ParamPoly3 { u, v, range })
    }

    pub fn start(&self) -> Option<PrimitiveStart> {
        Some(PrimitiveStart {
            s0: self.s0?,
            x0: self.x0?,
            y0: self.y0?,
            heading0: self.heading0?,
            length: self.length?,
        })
    }

    /// s0 + length
    pub fn end_s(&self) -> Option<f64> {
        Some(self.s0? + self.length?)
    }

    pub fn point_at(&self, s: f64) -> GeometryResult<Point2D> {
        Ok(self.pose_at(s)?.map(|pose| pose.point()))
    }

    pub fn heading_at(&self, s: f64) -> GeometryResult<f64> {
        Ok(self.pose_at(s)?.map(|pose| pose.heading))
    }

    pub fn pose_at(&self, s: f64) -> GeometryResult<Pose2D> {
        self.pose_at_with(s, SpiralMethod::default(), &Tolerances::default())
    }

    /// Point and heading at global arc length `s`, the local offset is s - s0
    pub fn pose_at_with(
        &self,
        s: f64,
        method: SpiralMethod,
        tolerances: &Tolerances,
    ) -> GeometryResult<Pose2D> {
        let (Some(start), Some(kind)) = (self.start(), self.kind.as_ref()) else {
            return Ok(None);
        };
        let ds = s - start.s0;

        let pose = match kind {
            PrimitiveKind::Line => line_pose(ds, &start),
            PrimitiveKind::Arc { curvature } => {
                GeometryError::check_length(start.length)?;
                let Some(curvature) = *curvature else {
                    return Ok(None);
                };
                if is_effectively_zero(curvature, tolerances.curvature) {
                    line_pose(ds, &start)
                } else {
                    arc_pose(ds, &start, curvature)
                }
            }
            PrimitiveKind::Spiral {
                curv_start,
                curv_end,
            } => {
                GeometryError::check_length(start.length)?;
                let (Some(curv_start), Some(curv_end)) = (*curv_start, *curv_end) else {
                    return Ok(None);
                };
                spiral_pose(ds, &start, curv_start, curv_end, method, tolerances)?.to_pose2d()
            }
            PrimitiveKind::ParamPoly3 { u, v, range } => {
                GeometryError::check_length(start.length)?;
                let p = match range {
                    ParamPoly3Range::ArcLength => ds,
                    ParamPoly3Range::Normalized => ds / start.length,
                };
                param_poly3_pose(p, &start, u, v)
            }
        };
        Ok(Some(pose))
    }

    /// Integrated length of a paramPoly3 over its whole parameter range
    ///
    /// None for other kinds or when the declared length is missing
    pub fn param_poly3_curve_length(&self, tolerances: &Tolerances) -> Option<QuadratureResult> {
        let Some(PrimitiveKind::ParamPoly3 { u, v, range }) = &self.kind else {
            return None;
        };
        let upper = match range {
            ParamPoly3Range::Normalized => 1.0,
            ParamPoly3Range::ArcLength => self.length?,
        };
        Some(curve_length_with(
            &u.derivative(),
            &v.derivative(),
            0.0,
            upper,
            tolerances,
        ))
    }
}

fn line_pose(ds: f64, start: &PrimitiveStart) -> Pose2D {
    Pose2D {
        x: start.x0 + ds * cos(start.heading0),
        y: start.y0 + ds * sin(start.heading0),
        heading: start.heading0,
    }
}

/// circle of radius 1 / curvature tangent to the start heading
fn arc_pose(ds: f64, start: &PrimitiveStart, curvature: f64) -> Pose2D {
    let angle = curvature * ds;
    let local = Point2D::new(sin(angle) / curvature, (1.0 - cos(angle)) / curvature);
    let p = rotate_translate(local, start.origin(), start.heading0);
    Pose2D {
        x: p.x,
        y: p.y,
        heading: start.heading0 + angle,
    }
}

fn spiral_pose(
    ds: f64,
    start: &PrimitiveStart,
    curv_start: f64,
    curv_end: f64,
    method: SpiralMethod,
    tolerances: &Tolerances,
) -> Result<SpiralPose, GeometryError> {
    let clothoid = Clothoid::from_params(&SpiralParams {
        x0: start.x0,
        y0: start.y0,
        theta0: start.heading0,
        curvature_start: curv_start,
        curvature_end: curv_end,
        length: start.length,
    })?;
    clothoid.pose_at_with(method, Length::new::<meter>(ds), tolerances)
}

/// (u(p), v(p)) is in the segment frame, heading is the tangent direction in that frame
fn param_poly3_pose(p: f64, start: &PrimitiveStart, u: &Cubic, v: &Cubic) -> Pose2D {
    let local = Point2D::new(u.evaluate(p), v.evaluate(p));
    let point = rotate_translate(local, start.origin(), start.heading0);
    let tangent = atan2(v.evaluate_derivative(p), u.evaluate_derivative(p));
    Pose2D {
        x: point.x,
        y: point.y,
        heading: start.heading0 + tangent,
    }
}

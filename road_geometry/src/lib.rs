/*!
Reference line geometry for OpenDRIVE roads

Evaluate points, headings, elevation and superelevation along a road's plan view,
built from line, arc, spiral (clothoid) and parametric cubic segments.
*/

pub mod arc_length;
pub mod clothoid;
pub mod clothoid_ode;
pub mod error;
pub mod frame;
pub mod lane;
pub mod poly;
pub mod primitive;
pub mod road;
pub mod tolerance;
pub mod xodr;

// export common types at crate root
pub use arc_length::{curve_length, QuadratureResult};
pub use clothoid::{spiral_fresnel, Clothoid, SpiralMethod, SpiralPose};
pub use clothoid_ode::spiral_ode;
pub use error::{GeometryError, XodrError};
pub use frame::{Point2D, Point3D, Pose2D};
pub use lane::{Lane, LaneSection};
pub use poly::{Cubic, OffsetCubic};
pub use primitive::{GeometryPrimitive, ParamPoly3Range, PrimitiveKind};
pub use road::Road;
pub use tolerance::Tolerances;

/// Shorthand used throughout: hard errors on the outside, "cannot evaluate" on the inside
pub type GeometryResult<T> = Result<Option<T>, GeometryError>;

//! Composition of plan view primitives and lateral/vertical profiles into a road
//!
//! Every query takes the arc length `s` along the reference line. Anything outside
//! [0, road length] or missing from the document comes back as None, only an
//! invalid primitive length is an error.

use libm::atan;
use serde::{Deserialize, Serialize};

use crate::clothoid::SpiralMethod;
use crate::frame::{lateral_offset, Point2D, Point3D, Pose2D};
use crate::lane::{LaneSection, LaneSectionWithLength};
use crate::poly::{active_offset_cubic, last_at_or_before, OffsetCubic};
use crate::primitive::GeometryPrimitive;
use crate::tolerance::Tolerances;
use crate::GeometryResult;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: Option<String>,
    pub length: Option<f64>,
    /// sorted by s0
    pub primitives: Vec<GeometryPrimitive>,
    pub elevations: Vec<OffsetCubic>,
    pub superelevations: Vec<OffsetCubic>,
    pub lane_offsets: Vec<OffsetCubic>,
    pub lane_sections: Vec<LaneSection>,
}

impl Road {
    pub fn new(length: f64, primitives: Vec<GeometryPrimitive>) -> Self {
        Self {
            length: Some(length),
            primitives,
            ..Default::default()
        }
    }

    pub fn plan_view_primitives(&self) -> &[GeometryPrimitive] {
        &self.primitives
    }

    pub fn elevation_profile(&self) -> &[OffsetCubic] {
        &self.elevations
    }

    pub fn superelevation_profile(&self) -> &[OffsetCubic] {
        &self.superelevations
    }

    pub fn road_length(&self) -> Option<f64> {
        self.length
    }

    /// s is within [0, length], false if the length is missing
    pub fn contains(&self, s: f64) -> bool {
        self.length.is_some_and(|length| (0.0..=length).contains(&s))
    }

    /// The primitive with the last s0 <= s, or the first primitive if s comes before
    /// every s0
    pub fn locate_primitive(&self, s: f64) -> Option<&GeometryPrimitive> {
        if !self.contains(s) {
            return None;
        }
        let index = locate_by_start(&self.primitives, s, |g| g.s0)?;
        self.primitives.get(index)
    }

    pub fn pose_at_with(
        &self,
        s: f64,
        method: SpiralMethod,
        tolerances: &Tolerances,
    ) -> GeometryResult<Pose2D> {
        match self.locate_primitive(s) {
            Some(primitive) => primitive.pose_at_with(s, method, tolerances),
            None => Ok(None),
        }
    }

    pub fn pose_at(&self, s: f64) -> GeometryResult<Pose2D> {
        self.pose_at_with(s, SpiralMethod::default(), &Tolerances::default())
    }

    /// reference line point
    pub fn point_at(&self, s: f64) -> GeometryResult<Point2D> {
        Ok(self.pose_at(s)?.map(|pose| pose.point()))
    }

    pub fn heading_at(&self, s: f64) -> GeometryResult<f64> {
        Ok(self.pose_at(s)?.map(|pose| pose.heading))
    }

    fn profile_at(&self, profile: &[OffsetCubic], s: f64) -> Option<OffsetCubic> {
        self.contains(s).then(|| active_offset_cubic(profile, s))
    }

    pub fn elevation_at(&self, s: f64) -> Option<f64> {
        Some(self.profile_at(&self.elevations, s)?.evaluate(s))
    }

    /// Pitch of the reference line, positive nose down so a climbing road is negative
    pub fn pitch_at(&self, s: f64) -> Option<f64> {
        let slope = self.profile_at(&self.elevations, s)?.evaluate_derivative(s);
        Some(-atan(slope))
    }

    /// the superelevation cubic gives the roll angle in radians directly
    pub fn superelevation_at(&self, s: f64) -> Option<f64> {
        Some(self.profile_at(&self.superelevations, s)?.evaluate(s))
    }

    pub fn roll_at(&self, s: f64) -> Option<f64> {
        self.superelevation_at(s)
    }

    /// t of the lane offset line, zero where nothing is declared
    pub fn lane_offset_at(&self, s: f64) -> Option<f64> {
        Some(self.profile_at(&self.lane_offsets, s)?.evaluate(s))
    }

    pub fn reference_point_3d_at(&self, s: f64) -> GeometryResult<Point3D> {
        let Some(point) = self.point_at(s)? else {
            return Ok(None);
        };
        Ok(self
            .elevation_at(s)
            .map(|z| Point3D::new(point.x, point.y, z)))
    }

    /// Inertial position of the point offset by `t` to the left and `h` up from the
    /// reference line at `s`
    ///
    /// The offset is rotated by heading and superelevation only, elevation is added as
    /// the reference point's z and does not tilt the offset.
    pub fn pose_3d_at(&self, s: f64, t: f64, h: f64) -> GeometryResult<Point3D> {
        let Some(yaw) = self.heading_at(s)? else {
            return Ok(None);
        };
        let Some(roll) = self.roll_at(s) else {
            return Ok(None);
        };
        let Some(reference) = self.reference_point_3d_at(s)? else {
            return Ok(None);
        };
        Ok(Some(reference + lateral_offset(yaw, 0.0, roll, t, h)))
    }

    pub fn start_point(&self) -> GeometryResult<Point3D> {
        self.pose_3d_at(0.0, 0.0, 0.0)
    }

    pub fn end_point(&self) -> GeometryResult<Point3D> {
        match self.length {
            Some(length) => self.pose_3d_at(length, 0.0, 0.0),
            None => Ok(None),
        }
    }

    pub fn middle_point(&self) -> GeometryResult<Point3D> {
        match self.length {
            Some(length) => self.pose_3d_at(0.5 * length, 0.0, 0.0),
            None => Ok(None),
        }
    }

    /// The lane section with the last start <= s, the first section if none starts
    /// before s
    pub fn lane_section_at(&self, s: f64) -> Option<&LaneSection> {
        if !self.contains(s) {
            return None;
        }
        let index = locate_by_start(&self.lane_sections, s, |section| section.s)?;
        self.lane_sections.get(index)
    }

    /// Lane sections in order of s, each with the distance to the next one or to the
    /// end of the road
    ///
    /// Empty if any section start or the road length is missing.
    pub fn sorted_lane_sections_with_length(&self) -> Vec<LaneSectionWithLength<'_>> {
        let Some(road_length) = self.length else {
            return Vec::new();
        };
        let Some(mut sections) = self
            .lane_sections
            .iter()
            .map(|section| section.s.map(|s| (s, section)))
            .collect::<Option<Vec<_>>>()
        else {
            return Vec::new();
        };
        sections.sort_by(|(a, _), (b, _)| a.total_cmp(b));

        let ends = sections
            .iter()
            .skip(1)
            .map(|(s, _)| *s)
            .chain(core::iter::once(road_length));
        sections
            .iter()
            .zip(ends)
            .map(|(&(start, section), end)| LaneSectionWithLength {
                section,
                length: end - start,
            })
            .collect()
    }
}

/// Index of the last item starting at or before `s`, the first item if `s` comes before
/// all of them
///
/// None for an empty list or if any start is missing
fn locate_by_start<T>(items: &[T], s: f64, start: impl Fn(&T) -> Option<f64>) -> Option<usize> {
    if items.is_empty() || items.iter().any(|item| start(item).is_none()) {
        return None;
    }
    let index = last_at_or_before(items, s, |item| start(item).unwrap_or_default());
    Some(index.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::lane::Lane;
    use approx::assert_abs_diff_eq;
    use core::f64::consts::FRAC_PI_2;

    fn three_lines() -> Road {
        Road::new(
            40.0,
            vec![
                GeometryPrimitive::line(0.0, 0.0, 0.0, 0.0, 10.0),
                GeometryPrimitive::line(10.0, 10.0, 0.0, FRAC_PI_2, 15.0),
                GeometryPrimitive::line(25.0, 10.0, 15.0, 0.0, 15.0),
            ],
        )
    }

    #[test]
    fn locate_last_start_at_or_before() {
        let road = three_lines();
        let s0 = |s| road.locate_primitive(s).and_then(|g| g.s0);
        assert_eq!(s0(0.0), Some(0.0));
        assert_eq!(s0(9.999), Some(0.0));
        assert_eq!(s0(10.0), Some(10.0));
        assert_eq!(s0(24.999), Some(10.0));
        assert_eq!(s0(25.0), Some(25.0));
        assert_eq!(s0(40.0), Some(25.0));
        assert_eq!(s0(-0.1), None);
        assert_eq!(s0(40.1), None);
    }

    #[test]
    fn locate_before_first_start() {
        let road = Road::new(20.0, vec![GeometryPrimitive::line(5.0, 0.0, 0.0, 0.0, 15.0)]);
        assert_eq!(road.locate_primitive(1.0).and_then(|g| g.s0), Some(5.0));
    }

    #[test]
    fn locate_unavailable() {
        assert!(Road::new(10.0, vec![]).locate_primitive(5.0).is_none());

        let mut road = three_lines();
        road.length = None;
        assert!(road.locate_primitive(5.0).is_none());

        let mut road = three_lines();
        road.primitives[1].s0 = None;
        assert!(road.locate_primitive(5.0).is_none());
    }

    #[test]
    fn single_line_road() {
        let road = Road::new(100.0, vec![GeometryPrimitive::line(0.0, 0.0, 0.0, 0.0, 100.0)]);
        assert_eq!(road.point_at(50.0), Ok(Some(Point2D::new(50.0, 0.0))));
        assert_eq!(road.heading_at(50.0), Ok(Some(0.0)));
        assert_eq!(road.point_at(100.5), Ok(None));
    }

    #[test]
    fn single_arc_road() {
        let road = Road::new(
            100.0,
            vec![GeometryPrimitive::arc(0.0, 0.0, 0.0, 0.0, 100.0, 0.01)],
        );
        assert_abs_diff_eq!(road.heading_at(100.0).unwrap().unwrap(), 1.0, epsilon = 1e-12);
        let p = road.point_at(100.0).unwrap().unwrap();
        assert_abs_diff_eq!(p.x, 100.0 * 1.0f64.sin(), epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 100.0 * (1.0 - 1.0f64.cos()), epsilon = 1e-9);
    }

    #[test]
    fn invalid_primitive_propagates() {
        let road = Road::new(10.0, vec![GeometryPrimitive::arc(0.0, 0.0, 0.0, 0.0, 0.0, 0.1)]);
        assert!(matches!(
            road.point_at(5.0),
            Err(GeometryError::InvalidGeometry { .. })
        ));
        assert!(matches!(
            road.pose_3d_at(5.0, 1.0, 0.0),
            Err(GeometryError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn profiles() {
        let mut road = three_lines();
        road.elevations = vec![
            OffsetCubic::new(5.0, 1.0, 0.1, 0.0, 0.0),
            OffsetCubic::new(20.0, 2.5, 0.0, 0.0, 0.0),
        ];
        road.superelevations = vec![OffsetCubic::new(0.0, 0.05, 0.0, 0.0, 0.0)];

        // nothing declared before the first entry
        assert_eq!(road.elevation_at(2.0), Some(0.0));
        assert_abs_diff_eq!(road.elevation_at(10.0).unwrap(), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(road.pitch_at(10.0).unwrap(), -(0.1f64.atan()), epsilon = 1e-12);
        assert_eq!(road.pitch_at(30.0), Some(0.0));
        assert_eq!(road.elevation_at(30.0), Some(2.5));
        assert_eq!(road.roll_at(30.0), Some(0.05));
        assert_eq!(road.lane_offset_at(30.0), Some(0.0));
        assert_eq!(road.elevation_at(41.0), None);
        assert_eq!(road.roll_at(-1.0), None);
    }

    #[test]
    fn pose_3d() {
        let mut road = three_lines();
        road.elevations = vec![OffsetCubic::new(0.0, 2.0, 0.0, 0.0, 0.0)];
        let roll: f64 = 0.2;
        road.superelevations = vec![OffsetCubic::new(0.0, roll, 0.0, 0.0, 0.0)];

        // heading north on the second line, left is -x
        let p = road.pose_3d_at(15.0, 3.0, 1.0).unwrap().unwrap();
        assert_abs_diff_eq!(p.x, 10.0 - 3.0 * roll.cos() + 1.0 * roll.sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.z, 2.0 + 3.0 * roll.sin() + 1.0 * roll.cos(), epsilon = 1e-12);

        let reference = road.reference_point_3d_at(15.0).unwrap().unwrap();
        assert_eq!(road.pose_3d_at(15.0, 0.0, 0.0).unwrap().unwrap(), reference);
    }

    #[test]
    fn start_middle_end() {
        let road = three_lines();
        let start = road.start_point().unwrap().unwrap();
        let middle = road.middle_point().unwrap().unwrap();
        let end = road.end_point().unwrap().unwrap();
        assert_abs_diff_eq!(start.distance(&Point3D::new(0.0, 0.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(middle.distance(&Point3D::new(10.0, 10.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(end.distance(&Point3D::new(25.0, 15.0, 0.0)), 0.0, epsilon = 1e-12);

        let mut no_length = road.clone();
        no_length.length = None;
        assert_eq!(no_length.end_point(), Ok(None));
        assert_eq!(no_length.start_point(), Ok(None));
    }

    #[test]
    fn lane_sections() {
        let section = |s: f64| LaneSection {
            s: Some(s),
            center: vec![Lane::new(0)],
            ..Default::default()
        };
        let mut road = three_lines();
        road.lane_sections = vec![section(12.0), section(0.0), section(30.0)];

        let with_length = road.sorted_lane_sections_with_length();
        let summary = with_length
            .iter()
            .map(|l| (l.section.s.unwrap(), l.length))
            .collect::<Vec<_>>();
        assert_eq!(summary, vec![(0.0, 12.0), (12.0, 18.0), (30.0, 10.0)]);

        road.lane_sections = vec![section(0.0), section(12.0), section(30.0)];
        assert_eq!(road.lane_section_at(11.0).and_then(|l| l.s), Some(0.0));
        assert_eq!(road.lane_section_at(12.0).and_then(|l| l.s), Some(12.0));
        assert_eq!(road.lane_section_at(40.0).and_then(|l| l.s), Some(30.0));
        assert!(road.lane_section_at(40.5).is_none());

        road.lane_sections[1].s = None;
        assert!(road.sorted_lane_sections_with_length().is_empty());
        assert!(road.lane_section_at(5.0).is_none());

        road.lane_sections.clear();
        assert!(road.lane_section_at(5.0).is_none());
    }
}

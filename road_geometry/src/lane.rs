use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::frame::Point3D;
use crate::poly::{last_at_or_before, OffsetCubic};
use crate::road::Road;
use crate::GeometryResult;

/// A single lane, widths and borders are offset from the start of the lane section
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    /// positive to the left of the reference line, negative to the right, 0 is the center
    pub id: Option<i64>,
    pub widths: Vec<OffsetCubic>,
    pub borders: Vec<OffsetCubic>,
}

impl Lane {
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn with_widths(mut self, widths: Vec<OffsetCubic>) -> Self {
        self.widths = widths;
        self
    }

    pub fn with_borders(mut self, borders: Vec<OffsetCubic>) -> Self {
        self.borders = borders;
        self
    }

    /// `ds` is measured from the start of the lane section
    pub fn width_at(&self, ds: f64) -> Option<f64> {
        evaluate_record(self.id, &self.widths, ds)
    }

    /// t of the outer border, taken as is
    pub fn border_at(&self, ds: f64) -> Option<f64> {
        evaluate_record(self.id, &self.borders, ds)
    }
}

/// the center lane has no extent, otherwise the last record starting at or before ds
fn evaluate_record(id: Option<i64>, records: &[OffsetCubic], ds: f64) -> Option<f64> {
    if id == Some(0) {
        return Some(0.0);
    }
    let index = last_at_or_before(records, ds, |r| r.s_offset)?;
    Some(records[index].evaluate(ds))
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSection {
    pub s: Option<f64>,
    pub left: Vec<Lane>,
    pub center: Vec<Lane>,
    pub right: Vec<Lane>,
}

impl LaneSection {
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.left.iter().chain(self.center.iter()).chain(self.right.iter())
    }

    pub fn lane(&self, id: i64) -> Option<&Lane> {
        self.lanes().find(|lane| lane.id == Some(id))
    }

    /// the lanes on the same side of the reference line as `id`
    pub fn side_of(&self, id: i64) -> &[Lane] {
        match id.signum() {
            1 => &self.left,
            -1 => &self.right,
            _ => &self.center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneSectionWithLength<'a> {
    pub section: &'a LaneSection,
    pub length: f64,
}

/// Lateral position of the outer border of every lane in a group on one side of the road
///
/// If any lane has a width at `s` the borders come from accumulating widths outward from
/// `lane_offset`, lanes without a width are skipped in the sum. Only if no lane has a width
/// are the border records used directly.
pub fn outer_border_t(
    lanes: &[Lane],
    lane_offset: f64,
    s_section: f64,
    s: f64,
) -> BTreeMap<i64, f64> {
    let ds = s - s_section;
    let mut widths = BTreeMap::new();
    let mut borders = BTreeMap::new();

    for lane in lanes {
        let Some(id) = lane.id else {
            continue;
        };
        match lane.width_at(ds) {
            Some(width) => {
                widths.insert(id, width);
            }
            None => {
                if let Some(border) = lane.border_at(ds) {
                    borders.insert(id, border);
                }
            }
        }
    }

    if widths.is_empty() {
        return borders;
    }

    widths
        .keys()
        .map(|&id| {
            let inner: f64 = if id > 0 {
                (1..=id).filter_map(|i| widths.get(&i)).sum()
            } else {
                -(id..=-1).filter_map(|i| widths.get(&i)).sum::<f64>()
            };
            (id, lane_offset + inner)
        })
        .collect()
}

/// t midway between the inner and outer border of `lane` at `s`
pub fn lane_middle_t(road: &Road, section: &LaneSection, lane: &Lane, s: f64) -> Option<f64> {
    let id = lane.id?;
    let lane_offset = road.lane_offset_at(s)?;
    let s_section = section.s?;

    if id == 0 {
        return Some(0.0);
    }

    let borders = outer_border_t(section.side_of(id), lane_offset, s_section, s);
    let t_outer = *borders.get(&id)?;
    let t_inner = if id.abs() > 1 {
        *borders.get(&(id - id.signum()))?
    } else {
        lane_offset
    };
    Some(0.5 * (t_outer + t_inner))
}

/// the lane middle on the road surface, h = 0
pub fn lane_middle_point_3d(
    road: &Road,
    section: &LaneSection,
    lane: &Lane,
    s: f64,
) -> GeometryResult<Point3D> {
    match lane_middle_t(road, section, lane, s) {
        Some(t) => road.pose_3d_at(s, t, 0.0),
        None => Ok(None),
    }
}

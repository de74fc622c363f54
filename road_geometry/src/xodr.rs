//! Read the road geometry parts of an OpenDRIVE document
//!
//! Only what the geometry queries need is kept: plan view, elevation and
//! superelevation profiles, lane offsets and lane sections with widths and borders.
//! Numeric attributes that are absent or don't parse end up as None on the model,
//! offset cubics and paramPoly3 coefficients that are incomplete are dropped.

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::XodrError;
use crate::lane::{Lane, LaneSection};
use crate::poly::{Cubic, OffsetCubic};
use crate::primitive::{GeometryPrimitive, ParamPoly3Range, PrimitiveKind};
use crate::road::Road;

/// All roads of the document in document order
pub fn parse_roads(xml: &str) -> Result<Vec<Road>, XodrError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buffer = Vec::new();
    let mut builder = DocumentBuilder::default();

    loop {
        match reader.read_event_into(&mut buffer)? {
            Event::Start(ref e) => {
                builder.open(e.local_name().as_ref(), &Attributes::read(e)?)?;
            }
            Event::Empty(ref e) => {
                builder.open(e.local_name().as_ref(), &Attributes::read(e)?)?;
                builder.close();
            }
            Event::End(_) => builder.close(),
            Event::Eof => break,
            _ => {}
        }
        buffer.clear();
    }

    builder.finish()
}

/// attribute values of one element, keyed by local name
struct Attributes(Vec<(Vec<u8>, String)>);

impl Attributes {
    fn read(element: &BytesStart) -> Result<Self, XodrError> {
        let mut values = Vec::new();
        for attr in element.attributes().with_checks(false) {
            let attr = attr?;
            let key = attr.key.local_name().as_ref().to_vec();
            match attr.unescape_value() {
                Ok(value) => values.push((key, value.into_owned())),
                Err(err) => warn!(
                    "skipping attribute {}: {err}",
                    String::from_utf8_lossy(&key)
                ),
            }
        }
        Ok(Self(values))
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.as_slice() == key.as_bytes())
            .map(|(_, v)| v.as_str())
    }

    /// "NaN" and "inf" parse as f64 but are treated like a missing attribute
    fn float(&self, key: &str) -> Option<f64> {
        let value: f64 = self.text(key)?.trim().parse().ok()?;
        if value.is_finite() {
            Some(value)
        } else {
            warn!("ignoring non-finite {key}=\"{value}\"");
            None
        }
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.text(key)?.trim().parse().ok()
    }

    fn cubic(&self, suffix: &str) -> Option<Cubic> {
        let coefficient = |name: &str| self.float(&format!("{name}{suffix}"));
        Some(Cubic::new(
            coefficient("a")?,
            coefficient("b")?,
            coefficient("c")?,
            coefficient("d")?,
        ))
    }

    /// offset cubic with the start coordinate in `offset_key`
    fn offset_cubic(&self, element: &str, offset_key: &str) -> Option<OffsetCubic> {
        let parsed = self.float(offset_key).zip(self.cubic(""));
        if parsed.is_none() {
            warn!("dropping <{element}> with missing or invalid {offset_key}/a/b/c/d");
        }
        parsed.map(|(s_offset, cubic)| OffsetCubic { cubic, s_offset })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Center,
    Right,
}

#[derive(Default)]
struct DocumentBuilder {
    /// names of the currently open elements
    stack: Vec<Vec<u8>>,
    saw_root: bool,
    roads: Vec<Road>,
    road: Option<Road>,
    geometry: Option<GeometryPrimitive>,
    section: Option<LaneSection>,
    side: Option<Side>,
    lane: Option<Lane>,
}

impl DocumentBuilder {
    fn open(&mut self, name: &[u8], attrs: &Attributes) -> Result<(), XodrError> {
        if !self.saw_root {
            if name != b"OpenDRIVE" {
                return Err(XodrError::UnexpectedRoot(
                    String::from_utf8_lossy(name).into_owned(),
                ));
            }
            self.saw_root = true;
        }

        let parent = self.stack.last().cloned();
        match (parent.as_deref(), name) {
            (Some(b"OpenDRIVE"), b"road") => {
                self.road = Some(Road {
                    id: attrs.text("id").map(str::to_string),
                    length: attrs.float("length"),
                    ..Default::default()
                });
            }
            (Some(b"planView"), b"geometry") => {
                self.geometry = Some(GeometryPrimitive {
                    s0: attrs.float("s"),
                    x0: attrs.float("x"),
                    y0: attrs.float("y"),
                    heading0: attrs.float("hdg"),
                    length: attrs.float("length"),
                    kind: None,
                });
            }
            (Some(b"geometry"), b"line") => self.set_kind(Some(PrimitiveKind::Line)),
            (Some(b"geometry"), b"arc") => self.set_kind(Some(PrimitiveKind::Arc {
                curvature: attrs.float("curvature"),
            })),
            (Some(b"geometry"), b"spiral") => self.set_kind(Some(PrimitiveKind::Spiral {
                curv_start: attrs.float("curvStart"),
                curv_end: attrs.float("curvEnd"),
            })),
            (Some(b"geometry"), b"paramPoly3") => self.set_kind(param_poly3(attrs)),
            (Some(b"elevationProfile"), b"elevation") => {
                if let (Some(road), Some(cubic)) =
                    (self.road.as_mut(), attrs.offset_cubic("elevation", "s"))
                {
                    road.elevations.push(cubic);
                }
            }
            (Some(b"lateralProfile"), b"superelevation") => {
                if let (Some(road), Some(cubic)) =
                    (self.road.as_mut(), attrs.offset_cubic("superelevation", "s"))
                {
                    road.superelevations.push(cubic);
                }
            }
            (Some(b"lanes"), b"laneOffset") => {
                if let (Some(road), Some(cubic)) =
                    (self.road.as_mut(), attrs.offset_cubic("laneOffset", "s"))
                {
                    road.lane_offsets.push(cubic);
                }
            }
            (Some(b"lanes"), b"laneSection") => {
                self.section = Some(LaneSection {
                    s: attrs.float("s"),
                    ..Default::default()
                });
            }
            (Some(b"laneSection"), b"left") => self.side = Some(Side::Left),
            (Some(b"laneSection"), b"center") => self.side = Some(Side::Center),
            (Some(b"laneSection"), b"right") => self.side = Some(Side::Right),
            (Some(b"left" | b"center" | b"right"), b"lane") => {
                self.lane = Some(Lane {
                    id: attrs.int("id"),
                    ..Default::default()
                });
            }
            (Some(b"lane"), b"width") => {
                if let (Some(lane), Some(cubic)) =
                    (self.lane.as_mut(), attrs.offset_cubic("width", "sOffset"))
                {
                    lane.widths.push(cubic);
                }
            }
            (Some(b"lane"), b"border") => {
                if let (Some(lane), Some(cubic)) =
                    (self.lane.as_mut(), attrs.offset_cubic("border", "sOffset"))
                {
                    lane.borders.push(cubic);
                }
            }
            _ => {}
        }

        self.stack.push(name.to_vec());
        Ok(())
    }

    fn set_kind(&mut self, kind: Option<PrimitiveKind>) {
        if let Some(geometry) = self.geometry.as_mut() {
            geometry.kind = kind;
        }
    }

    fn close(&mut self) {
        let Some(name) = self.stack.pop() else {
            return;
        };
        match name.as_slice() {
            b"road" => {
                if let Some(road) = self.road.take() {
                    debug!(
                        "road {:?}: length {:?}, {} geometries, {} lane sections",
                        road.id,
                        road.length,
                        road.primitives.len(),
                        road.lane_sections.len()
                    );
                    self.roads.push(road);
                }
            }
            b"geometry" => {
                if let (Some(road), Some(geometry)) = (self.road.as_mut(), self.geometry.take()) {
                    road.primitives.push(geometry);
                }
            }
            b"lane" => {
                if let (Some(section), Some(side), Some(lane)) =
                    (self.section.as_mut(), self.side, self.lane.take())
                {
                    match side {
                        Side::Left => section.left.push(lane),
                        Side::Center => section.center.push(lane),
                        Side::Right => section.right.push(lane),
                    }
                }
            }
            b"left" | b"center" | b"right" => self.side = None,
            b"laneSection" => {
                if let (Some(road), Some(section)) = (self.road.as_mut(), self.section.take()) {
                    road.lane_sections.push(section);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<Vec<Road>, XodrError> {
        if !self.saw_root {
            return Err(XodrError::EmptyDocument);
        }
        Ok(self.roads)
    }
}

/// None if the range is unknown or any coefficient is missing, a missing range is normalized
fn param_poly3(attrs: &Attributes) -> Option<PrimitiveKind> {
    let range = match attrs.text("pRange") {
        None | Some("normalized") => ParamPoly3Range::Normalized,
        Some("arcLength") => ParamPoly3Range::ArcLength,
        Some(other) => {
            warn!("unknown paramPoly3 pRange {other:?}");
            return None;
        }
    };
    let Some((u, v)) = attrs.cubic("U").zip(attrs.cubic("V")) else {
        warn!("paramPoly3 with missing or invalid coefficients");
        return None;
    };
    Some(PrimitiveKind::ParamPoly3 { u, v, range })
}

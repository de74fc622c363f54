//! Print reference line geometry for the roads of an OpenDRIVE file, one JSON object per road
//!
//! RUST_LOG=debug road_geometry map.xodr --road 7 --s 12.5 --t -1.75

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;

use road_geometry::poly::same_equation;
use road_geometry::xodr::parse_roads;
use road_geometry::{
    GeometryPrimitive, GeometryResult, OffsetCubic, Point3D, Road, SpiralMethod, Tolerances,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// OpenDRIVE file
    xodr: PathBuf,

    /// TOML file overriding tolerances
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// only this road id
    #[arg(short, long)]
    road: Option<String>,

    /// arc length to evaluate a pose at
    #[arg(short, long, allow_negative_numbers = true)]
    s: Option<f64>,

    /// lateral offset, positive to the left
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    t: f64,

    /// height above the road surface
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    h: f64,
}

#[derive(Serialize)]
struct PoseReport {
    s: f64,
    t: f64,
    h: f64,
    heading: Option<f64>,
    pitch: Option<f64>,
    roll: Option<f64>,
    point: Option<Point3D>,
}

#[derive(Serialize)]
struct LengthReport {
    s0: Option<f64>,
    declared: f64,
    integrated: f64,
    abs_error: f64,
    converged: bool,
    mismatch: bool,
}

#[derive(Serialize)]
struct RoadReport<'a> {
    id: Option<&'a str>,
    length: Option<f64>,
    start: Option<Point3D>,
    middle: Option<Point3D>,
    end: Option<Point3D>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pose: Option<PoseReport>,
    param_poly3: Vec<LengthReport>,
    /// consecutive elevation/superelevation/lane offset entries with the same equation
    redundant_profile_entries: usize,
}

/// an invalid geometry is reported and treated like missing data so the other roads still print
fn available<T>(road: &Road, what: &str, result: GeometryResult<T>) -> Option<T> {
    result.unwrap_or_else(|err| {
        warn!("road {:?} {what}: {err}", road.id);
        None
    })
}

/// None for anything but a paramPoly3 with a declared length
fn length_report(geometry: &GeometryPrimitive, tolerances: &Tolerances) -> Option<LengthReport> {
    let declared = geometry.length?;
    let result = geometry.param_poly3_curve_length(tolerances)?;
    Some(LengthReport {
        s0: geometry.s0,
        declared,
        integrated: result.value,
        abs_error: result.abs_error,
        converged: result.converged,
        mismatch: (result.value - declared).abs() > tolerances.length_match,
    })
}

fn redundant_entries(profile: &[OffsetCubic], tolerances: &Tolerances) -> usize {
    profile
        .windows(2)
        .filter(|pair| same_equation(&pair[0], &pair[1], tolerances.coefficient))
        .count()
}

fn pose_report(road: &Road, s: f64, t: f64, h: f64, tolerances: &Tolerances) -> PoseReport {
    let heading = available(
        road,
        "heading",
        road.pose_at_with(s, SpiralMethod::default(), tolerances),
    )
    .map(|pose| pose.heading);
    PoseReport {
        s,
        t,
        h,
        heading,
        pitch: road.pitch_at(s),
        roll: road.roll_at(s),
        point: available(road, "pose", road.pose_3d_at(s, t, h)),
    }
}

fn report<'a>(road: &'a Road, args: &Args, tolerances: &Tolerances) -> RoadReport<'a> {
    RoadReport {
        id: road.id.as_deref(),
        length: road.road_length(),
        start: available(road, "start", road.start_point()),
        middle: available(road, "middle", road.middle_point()),
        end: available(road, "end", road.end_point()),
        pose: args
            .s
            .map(|s| pose_report(road, s, args.t, args.h, tolerances)),
        param_poly3: road
            .plan_view_primitives()
            .iter()
            .filter_map(|geometry| length_report(geometry, tolerances))
            .collect(),
        redundant_profile_entries: [
            road.elevation_profile(),
            road.superelevation_profile(),
            road.lane_offsets.as_slice(),
        ]
        .iter()
        .map(|profile| redundant_entries(profile, tolerances))
        .sum(),
    }
}

fn main() -> Result<()> {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).
    let args = Args::parse();

    let tolerances = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Tolerances::from_toml_str(&text)
                .with_context(|| format!("loading {}", path.display()))?
        }
        None => Tolerances::default(),
    };

    let xml = std::fs::read_to_string(&args.xodr)
        .with_context(|| format!("reading {}", args.xodr.display()))?;
    let roads = parse_roads(&xml).with_context(|| format!("parsing {}", args.xodr.display()))?;
    info!("{} roads in {}", roads.len(), args.xodr.display());

    let selected = roads
        .iter()
        .filter(|road| match &args.road {
            Some(id) => road.id.as_deref() == Some(id.as_str()),
            None => true,
        })
        .collect::<Vec<_>>();
    if selected.is_empty() {
        warn!("no matching roads");
    }

    for road in selected {
        println!("{}", serde_json::to_string(&report(road, &args, &tolerances))?);
    }
    Ok(())
}

use clap::{Parser, ValueEnum};
use geo::{Coord, Rect};
use view_stripes_lib::{PartitionConfig, SplittingMode, ViewPointParams, ViewRequest};

/// How the view is split into requests
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splitter {
    /// Resolution stripes merged into quadtree request quads
    Quad,
    /// A single request for the bounding box
    Bbox,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// View Stripes - Partition a perspective terrain view into resolution-tagged request regions
pub struct Settings {
    /// Observer easting in the working CRS
    #[clap(short = 'x', long, default_value = "0.0", allow_hyphen_values = true)]
    pub observer_x: f64,

    /// Observer northing in the working CRS
    #[clap(short = 'y', long, default_value = "0.0", allow_hyphen_values = true)]
    pub observer_y: f64,

    /// Observer height above sea level
    #[clap(short = 'z', long, default_value = "100.0", allow_hyphen_values = true)]
    pub observer_z: f64,

    /// View direction in degrees, counter-clockwise from north
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    pub heading: f64,

    /// Downward pitch in degrees (0 = horizon, 90 = straight down)
    #[clap(short, long, default_value = "45.0")]
    pub pitch: f64,

    /// Horizontal angle of view in degrees
    #[clap(long, default_value = "60.0")]
    pub angle_of_view: f64,

    /// Image height divided by image width
    #[clap(long, default_value = "0.75")]
    pub aspect: f64,

    /// Far clipping distance in working CRS units
    #[clap(long, default_value = "10000.0")]
    pub far_clipping_distance: f64,

    /// Height of the terrain below the observer
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    pub terrain_height: f64,

    /// Width of the requested image in pixels
    #[clap(short, long, default_value = "800")]
    pub width: u32,

    /// Elevation exaggeration (1.0 = none)
    #[clap(long, default_value = "1.0")]
    pub scale: f64,

    /// Largest request width or height in pixels
    #[clap(long, default_value = "1024")]
    pub max_request_size: u32,

    /// Widest view the service renders, in pixels
    #[clap(long, default_value = "1000")]
    pub max_view_width: u32,

    /// Only merge quadtree leaves if there are more than this many
    #[clap(long, default_value = "10")]
    pub quad_merge_count: usize,

    /// Percentage each request quad is enlarged by on every side (0-100)
    #[clap(long, default_value = "0.0")]
    pub extend_request_percentage: f64,

    /// Prefer fewer, coarser requests over finer data
    #[clap(long, default_value = "false")]
    pub fast: bool,

    /// Splitting strategy
    #[clap(short, long, value_enum, default_value = "quad")]
    pub splitter: Splitter,

    /// Request area for the bbox splitter, as minx,miny,maxx,maxy
    #[clap(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<Rect<f64>>,

    /// Print the resolution stripes instead of the merged request quads
    #[clap(long, default_value = "false")]
    pub stripes_only: bool,
}

impl Settings {
    /// Parse the command line, exiting with a usage message on errors
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn view_point_params(&self) -> ViewPointParams {
        ViewPointParams {
            observer_position: [self.observer_x, self.observer_y, self.observer_z].into(),
            heading: self.heading.to_radians(),
            pitch: self.pitch.to_radians(),
            angle_of_view: self.angle_of_view.to_radians(),
            aspect: self.aspect,
            far_clipping_distance: self.far_clipping_distance,
            terrain_height: self.terrain_height,
        }
    }

    pub fn view_request(&self) -> ViewRequest {
        ViewRequest {
            image_width: self.width,
            minimal_height: self.terrain_height,
            scale: self.scale,
            bounding_box: self.bbox,
        }
    }

    pub fn partition_config(&self) -> PartitionConfig {
        let mut config = PartitionConfig {
            max_request_size: self.max_request_size,
            max_view_width: self.max_view_width,
            quad_merge_count: self.quad_merge_count,
            request_quality_preferred: !self.fast,
            splitting_mode: match self.splitter {
                Splitter::Quad => SplittingMode::Quadtree,
                Splitter::Bbox => SplittingMode::BoundingBox,
            },
            ..PartitionConfig::default()
        };
        config.set_extend_request_percentage(self.extend_request_percentage);
        config
    }
}

fn parse_bbox(value: &str) -> Result<Rect<f64>, String> {
    let values = value
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in bounding box: {e}"))?;
    let [min_x, min_y, max_x, max_y] = values[..] else {
        return Err(format!(
            "expected 4 comma separated values, got {}",
            values.len()
        ));
    };
    if min_x >= max_x || min_y >= max_y {
        return Err("bounding box minimum must be below its maximum".to_string());
    }
    Ok(Rect::new(
        Coord { x: min_x, y: min_y },
        Coord { x: max_x, y: max_y },
    ))
}

use geo_types::Point;
use tracing::{debug, info, warn};

use crate::{
    config::{ElevationPolicy, IngestConfig},
    error::{IngestError, ValidationError},
    import::gpx::{GpxDocument, RawPoint},
};

/// A single validated sample. `point` is `(x = lon, y = lat)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub point: Point<f64>,
    pub elevation: Option<f64>,
}

impl TrackPoint {
    pub fn new(lon: f64, lat: f64, elevation: Option<f64>) -> Self {
        Self {
            point: Point::new(lon, lat),
            elevation,
        }
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }
}

/// At least two points with finite, in-range coordinates.
#[derive(Debug, Clone)]
pub struct TrackPoints {
    points: Vec<TrackPoint>,
    has_elevation: bool,
}

impl TrackPoints {
    pub fn new(
        points: Vec<TrackPoint>,
        policy: ElevationPolicy,
    ) -> Result<Self, ValidationError> {
        if points.len() < 2 {
            return Err(ValidationError::NotEnoughPoints {
                found: points.len(),
            });
        }
        let with = points.iter().filter(|p| p.elevation.is_some()).count();
        let without = points.len() - with;
        let has_elevation = match policy {
            ElevationPolicy::Uniform if with > 0 && without > 0 => {
                return Err(ValidationError::MixedElevation { with, without })
            }
            ElevationPolicy::Uniform => without == 0,
            ElevationPolicy::Require if without > 0 => {
                return Err(ValidationError::MissingElevation { without })
            }
            ElevationPolicy::Require => true,
            ElevationPolicy::ZeroFill => {
                if with > 0 && without > 0 {
                    warn!(with, without, "filling missing elevation with 0");
                }
                points[0].elevation.is_some()
            }
        };
        Ok(Self {
            points,
            has_elevation,
        })
    }

    /// Flattens every track segment, or failing that every route, and keeps the
    /// points that survive numeric validation.
    pub fn from_document(
        document: &GpxDocument,
        config: &IngestConfig,
    ) -> Result<Self, IngestError> {
        match document.root.as_deref() {
            Some("gpx") => {}
            Some(other) => {
                return Err(IngestError::Schema(format!(
                    "Not a GPX document: root element is <{other}>"
                )))
            }
            None => return Err(IngestError::Schema("Empty GPX document".into())),
        }

        let raw: Vec<&RawPoint> = if !document.tracks.is_empty() {
            info!(
                "Found {} track(s). Combining segments...",
                document.tracks.len()
            );
            document
                .tracks
                .iter()
                .flat_map(|t| t.segments.iter().flatten())
                .collect()
        } else if !document.routes.is_empty() {
            info!(
                "Found {} route(s). Combining points...",
                document.routes.len()
            );
            document.routes.iter().flat_map(|r| r.points.iter()).collect()
        } else {
            return Err(IngestError::Schema(
                "No <trk> (track) or <rte> (route) data found in the GPX file".into(),
            ));
        };

        let total = raw.len();
        let points: Vec<TrackPoint> = raw
            .into_iter()
            .filter_map(parse_point)
            .filter(|p| {
                !(config.drop_negative_elevation && p.elevation.is_some_and(|e| e < 0.0))
            })
            .collect();
        if points.len() < total {
            debug!(dropped = total - points.len(), "discarded invalid points");
        }

        Ok(Self::new(points, config.elevation_policy)?)
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn has_elevation(&self) -> bool {
        self.has_elevation
    }
}

fn parse_point(raw: &RawPoint) -> Option<TrackPoint> {
    let lat = parse_finite(raw.lat.as_deref())?;
    let lon = parse_finite(raw.lon.as_deref())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(TrackPoint::new(lon, lat, parse_finite(raw.ele.as_deref())))
}

fn parse_finite(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

use color_eyre::eyre::Result;
use geo::BoundingRect;
use geo_types::{CoordNum, LineString, Point};
use geojson::{Feature, Geometry};

use crate::{import::points::TrackPoints, types::feature::FeatureProperties};

/// Mean earth radius used for every trail distance
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in km between two `(x = lon, y = lat)` points, haversine formula.
pub fn geo_distance_km(from: &Point<f64>, to: &Point<f64>) -> f64 {
    let d_lat = (to.y() - from.y()).to_radians();
    let d_lon = (to.x() - from.x()).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.y().to_radians().cos() * to.y().to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub trait ToWkt {
    fn to_wkt(&self) -> String;
}

/// Full resolution `LINESTRING`, with a Z ordinate when the trail has elevation.
/// Missing elevations on a Z trail are written as 0.
impl ToWkt for TrackPoints {
    fn to_wkt(&self) -> String {
        let with_z = self.has_elevation();
        let coords = self
            .points()
            .iter()
            .map(|p| {
                if with_z {
                    format!("{} {} {}", p.lon(), p.lat(), p.elevation.unwrap_or(0.0))
                } else {
                    format!("{} {}", p.lon(), p.lat())
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        format!("LINESTRING{} ({coords})", if with_z { " Z" } else { "" })
    }
}

//Get the bounding box for a geometry as a vector
pub trait BoundingBox<N> {
    fn bounding_box(&self) -> Option<Vec<N>>;
}

impl<T, N> BoundingBox<N> for T
where
    T: BoundingRect<N>,
    N: CoordNum,
{
    fn bounding_box(&self) -> Option<Vec<N>> {
        self.bounding_rect()
            .into()
            .map(|r| vec![r.min().x, r.min().y, r.max().x, r.max().y])
    }
}

pub trait IntoTrailFeature {
    fn into_trail_feature(&self, properties: FeatureProperties) -> Result<Feature>;
}

impl IntoTrailFeature for TrackPoints {
    fn into_trail_feature(&self, properties: FeatureProperties) -> Result<Feature> {
        let line: LineString<f64> = self.points().iter().map(|p| p.point).collect();
        let bounding_box = line.bounding_box();
        let positions = self
            .points()
            .iter()
            .map(|p| match (self.has_elevation(), p.elevation) {
                (true, ele) => vec![p.lon(), p.lat(), ele.unwrap_or(0.0)],
                (false, _) => vec![p.lon(), p.lat()],
            })
            .collect();
        Ok(Feature {
            bbox: bounding_box.to_owned(),
            geometry: Some(Geometry {
                bbox: bounding_box,
                value: geojson::Value::LineString(positions),
                foreign_members: None,
            }),
            properties: Some(properties.try_into()?),
            ..Default::default()
        })
    }
}

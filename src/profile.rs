use geo_types::{coord, Coord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{import::points::TrackPoints, simplify::simplify_indices, trail_geo::geo_distance_km};

/// Cumulative distance along the trail paired with the elevation there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSample {
    pub distance_km: f64,
    pub elevation_m: f64,
}

impl From<ProfileSample> for Coord<f64> {
    fn from(sample: ProfileSample) -> Self {
        coord! { x: sample.distance_km, y: sample.elevation_m }
    }
}

/// Elevation profile of a whole trail plus the totals gathered on the way.
#[derive(Debug, Clone)]
pub struct Profile {
    pub samples: Vec<ProfileSample>,
    pub ascent_m: f64,
}

impl Profile {
    /// One sample per point. Absent elevation profiles as 0 and never counts
    /// towards ascent.
    pub fn build(points: &TrackPoints) -> Self {
        let mut cumulative = 0.0;
        let mut ascent = 0.0;
        let mut samples = Vec::with_capacity(points.len());
        for (i, p) in points.points().iter().enumerate() {
            if let Some(prev) = i.checked_sub(1).map(|j| &points.points()[j]) {
                cumulative += geo_distance_km(&prev.point, &p.point);
                if let (Some(from), Some(to)) = (prev.elevation, p.elevation) {
                    if to > from {
                        ascent += to - from;
                    }
                }
            }
            samples.push(ProfileSample {
                distance_km: cumulative,
                elevation_m: p.elevation.unwrap_or(0.0),
            });
        }
        Self {
            samples,
            ascent_m: ascent,
        }
    }

    pub fn distance_km(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.distance_km)
    }

    pub fn simplify(&self, tolerance: f64, high_quality: bool) -> Vec<ProfileSample> {
        let coords: Vec<Coord<f64>> = self.samples.iter().map(|&s| s.into()).collect();
        let kept: Vec<ProfileSample> = simplify_indices(&coords, tolerance, high_quality)
            .into_iter()
            .map(|i| self.samples[i])
            .collect();
        debug!(
            from = self.samples.len(),
            to = kept.len(),
            tolerance,
            "simplified profile"
        );
        kept
    }
}

/// `[[distance_km, elevation_m], ...]` rounded to 2 and 1 decimals, as stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct SimplifiedProfile(pub Vec<[f64; 2]>);

impl From<&[ProfileSample]> for SimplifiedProfile {
    fn from(samples: &[ProfileSample]) -> Self {
        Self(
            samples
                .iter()
                .map(|s| [round_to(s.distance_km, 2), round_to(s.elevation_m, 1)])
                .collect(),
        )
    }
}

impl SimplifiedProfile {
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

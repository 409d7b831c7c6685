use tracing::{info, instrument};

use crate::{
    config::IngestConfig,
    error::IngestError,
    import::{gpx::read_document, points::TrackPoints},
    profile::{round_to, Profile, SimplifiedProfile},
    trail_geo::ToWkt,
    types::model::trail::{TrailRecord, TrailTrack},
};

/// A parsed trail ready to be handed to a store.
#[derive(Debug, Clone)]
pub struct PreparedTrail {
    pub points: TrackPoints,
    pub record: TrailRecord,
}

/// A caller supplied name, unless it is blank.
pub fn explicit_name(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

/// Runs the whole GPX pipeline on `content`.
///
/// The trail is named `name` when given, else after the GPX metadata or first
/// track/route name, else `fallback_name`.
#[instrument(skip(content, config))]
pub fn prepare_trail(
    content: &str,
    name: Option<&str>,
    fallback_name: &str,
    config: &IngestConfig,
) -> Result<PreparedTrail, IngestError> {
    let document = read_document(content)?;
    let points = TrackPoints::from_document(&document, config)?;
    info!("Processing {} GPS points...", points.len());

    let profile = Profile::build(&points);
    let simplified = profile.simplify(config.tolerance, config.high_quality);
    let simplified_profile = SimplifiedProfile::from(simplified.as_slice());
    info!(
        "Simplified elevation profile from {} to {} points",
        points.len(),
        simplified_profile.len()
    );

    let name = explicit_name(name)
        .or(document.name())
        .unwrap_or(fallback_name)
        .trim()
        .to_owned();
    let record = TrailRecord {
        name,
        track: TrailTrack {
            geometry_wkt: points.to_wkt(),
            simplified_profile,
            distance_km: round_to(profile.distance_km(), 2),
            ascent_m: profile.ascent_m.round() as i32,
        },
    };
    Ok(PreparedTrail { points, record })
}

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::profile::SimplifiedProfile;

//Everything a pipeline run derives from one GPX file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrailTrack {
    // LINESTRING or LINESTRING Z, lon lat [ele]
    pub geometry_wkt: String,
    pub simplified_profile: SimplifiedProfile,
    pub distance_km: f64,
    pub ascent_m: i32,
}

//Whats actually written to the db
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrailRecord {
    pub name: String,
    #[serde(flatten)]
    pub track: TrailTrack,
}

//Returned from every write
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredTrail {
    pub id: i32,
    pub name: String,
}

//Used when listing from db
#[derive(Serialize, Deserialize, Debug, sqlx::FromRow)]
pub struct TrailSummary {
    pub id: i32,
    pub name: String,
    pub distance_km: Option<BigDecimal>,
    pub ascent_m: Option<i32>,
}

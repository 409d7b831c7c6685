use bigdecimal::BigDecimal;
use color_eyre::eyre::Result;
use geojson::{feature::Id, Feature};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::{profile::SimplifiedProfile, types::feature::FeatureProperties};

//Used when retrieving a single trail from db
#[derive(Serialize, Deserialize, Debug, sqlx::FromRow)]
pub struct QueryTrail {
    pub id: i32,
    pub name: String,
    pub distance_km: Option<BigDecimal>,
    pub ascent_m: Option<i32>,
    pub geometry: Option<Json<geojson::Geometry>>,
    pub simplified_profile: Option<Json<SimplifiedProfile>>,
}

impl QueryTrail {
    pub fn into_feature(self) -> Result<Feature> {
        let properties = FeatureProperties {
            id: Some(self.id),
            name: self.name,
            distance_km: self
                .distance_km
                .as_ref()
                .and_then(ToPrimitive::to_f64)
                .unwrap_or_default(),
            ascent_m: self.ascent_m,
            simplified_profile: self.simplified_profile.map(|p| p.0).unwrap_or_default(),
        };
        Ok(Feature {
            id: Some(Id::Number(self.id.into())),
            geometry: self.geometry.map(|g| g.0),
            properties: Some(properties.try_into()?),
            ..Default::default()
        })
    }
}

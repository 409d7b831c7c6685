use std::fmt;

use sqlx::postgres::PgConnectOptions;

use crate::error::ConfigError;

pub const DEFAULT_TOLERANCE: f64 = 10.0;
pub const DEFAULT_TABLE: &str = "trails";

/// How points without `<ele>` are handled.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ElevationPolicy {
    /// Every point has elevation or none does; absent elevation profiles as 0
    #[default]
    Uniform,
    /// Mixed data allowed; absent elevation becomes 0 everywhere
    ZeroFill,
    /// Every point must carry elevation
    Require,
}

/// A Postgres identifier safe to splice into SQL text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid_start && valid_rest && name.len() <= 63 {
            Ok(Self(name.to_owned()))
        } else {
            Err(ConfigError::Table(name.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_owned())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Knobs that used to drift between the individual ingestion scripts.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Douglas–Peucker tolerance in profile units (km on x, m on y)
    pub tolerance: f64,
    /// Full recursive simplification; `false` adds a radial-distance pre-pass
    pub high_quality: bool,
    pub elevation_policy: ElevationPolicy,
    pub drop_negative_elevation: bool,
    pub table: TableName,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            high_quality: true,
            elevation_policy: ElevationPolicy::default(),
            drop_negative_elevation: false,
            table: TableName::default(),
        }
    }
}

impl IngestConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self, ConfigError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Tolerance(tolerance));
        }
        self.tolerance = tolerance;
        Ok(self)
    }
}

/// Where the trail database lives. A full URL wins over the individual parts.
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub max_connections: u32,
}

impl DbConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        if let Some(url) = &self.url {
            return url.parse();
        }
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database);
        Ok(match &self.password {
            Some(password) => options.password(password),
            None => options,
        })
    }
}

use std::path::PathBuf;

use thiserror::Error;

use crate::import::gpx::GpxParseError;

/// Everything that can abort an ingestion run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("GPX file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read GPX file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] GpxParseError),

    #[error("{0}")]
    Schema(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Not enough valid points found ({found}, need at least 2)")]
    NotEnoughPoints { found: usize },

    #[error("Inconsistent elevation data: {with} points have <ele>, {without} do not")]
    MixedElevation { with: usize, without: usize },

    #[error("GPX lacks elevation data ({without} points without <ele>)")]
    MissingElevation { without: usize },
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("No trail with id {id} in table {table}")]
    NotFound { table: String, id: i32 },

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Tolerance must be a finite number >= 0, got {0}")]
    Tolerance(f64),

    #[error("Invalid table name {0:?}: use lowercase letters, digits and underscores")]
    Table(String),
}

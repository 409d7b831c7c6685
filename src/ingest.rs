use std::{io::ErrorKind, path::PathBuf};

use tracing::{info, instrument, warn};

use crate::{
    config::IngestConfig,
    error::{IngestError, PersistenceError},
    store::{TrailStore, TrailTransaction},
    trail::{explicit_name, prepare_trail, PreparedTrail},
    types::model::trail::{StoredTrail, TrailRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Upsert keyed on the trail name
    ByName,
    /// Upsert keyed on a caller supplied id
    ById(i32),
    /// Overwrite geometry and profile of an existing id
    Replace(i32),
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub path: PathBuf,
    pub name: Option<String>,
    pub mode: WriteMode,
}

/// Reads and processes the GPX file without touching any store.
pub async fn load_trail(
    request: &IngestRequest,
    config: &IngestConfig,
) -> Result<PreparedTrail, IngestError> {
    let path = &request.path;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => IngestError::FileNotFound { path: path.clone() },
            _ => IngestError::Read {
                path: path.clone(),
                source,
            },
        })?;
    info!("Parsing GPX file: {}...", path.display());

    let fallback_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Unnamed Trail".to_owned());
    prepare_trail(
        &content,
        request.name.as_deref(),
        &fallback_name,
        config,
    )
}

/// Runs one GPX file end to end and writes it in a single transaction.
///
/// Nothing is written unless every step succeeds; any failure after the
/// transaction began rolls it back before the error is returned.
#[instrument(skip(store, config), fields(table = %config.table))]
pub async fn ingest<S: TrailStore>(
    store: &S,
    config: &IngestConfig,
    request: &IngestRequest,
) -> Result<StoredTrail, IngestError> {
    let trail = load_trail(request, config).await?;

    let mut tx = store.begin().await?;
    match write(&mut tx, config, request, &trail.record).await {
        Ok(stored) => {
            tx.commit().await?;
            info!(id = stored.id, name = %stored.name, "trail written");
            Ok(stored)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("rollback failed: {rollback_err}");
            }
            Err(err.into())
        }
    }
}

async fn write<T: TrailTransaction>(
    tx: &mut T,
    config: &IngestConfig,
    request: &IngestRequest,
    record: &TrailRecord,
) -> Result<StoredTrail, PersistenceError> {
    tx.ensure_schema(&config.table).await?;
    match request.mode {
        WriteMode::ByName => tx.upsert_by_name(&config.table, record).await,
        WriteMode::ById(id) => tx.upsert_by_id(&config.table, id, record).await,
        WriteMode::Replace(id) => {
            // only an explicitly given name replaces the stored one
            let name = explicit_name(request.name.as_deref());
            tx.replace_track(&config.table, id, name, &record.track)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ElevationPolicy, TableName},
        error::ValidationError,
        store::memory::MemoryStore,
    };

    fn fixture(name: &str) -> PathBuf {
        [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
            .iter()
            .collect()
    }

    fn request(file: &str, name: Option<&str>, mode: WriteMode) -> IngestRequest {
        IngestRequest {
            path: fixture(file),
            name: name.map(str::to_owned),
            mode,
        }
    }

    #[tokio::test]
    async fn straight_line_profile_collapses_to_endpoints() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();
        let stored = ingest(&store, &config, &request("straight_climb.gpx", None, WriteMode::ByName))
            .await
            .unwrap();

        assert_eq!(stored, StoredTrail { id: 1, name: "Equator Ramp".into() });
        let rows = store.rows(&config.table).await;
        let track = &rows[0].1.track;
        assert_eq!(track.simplified_profile.0, vec![[0.0, 100.0], [4.45, 140.0]]);
        assert!(track.geometry_wkt.starts_with("LINESTRING Z (0 0 100,0.01 0 110,"));
        assert_eq!(track.ascent_m, 40);
    }

    #[tokio::test]
    async fn upsert_by_name_updates_in_place() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();
        let req = request("salkantay_day1.gpx", None, WriteMode::ByName);

        let first = ingest(&store, &config, &req).await.unwrap();
        let second = ingest(&store, &config, &req).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name, "Salkantay Trek");
        assert_eq!(store.rows(&config.table).await.len(), 1);
    }

    #[tokio::test]
    async fn explicit_id_is_used_and_later_ids_follow_it() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();

        let by_id = ingest(
            &store,
            &config,
            &request("salkantay_day1.gpx", Some("Salkantay Trek"), WriteMode::ById(25)),
        )
        .await
        .unwrap();
        assert_eq!(by_id.id, 25);

        let next = ingest(&store, &config, &request("camino_route.gpx", None, WriteMode::ByName))
            .await
            .unwrap();
        assert_eq!(next.id, 26);
        assert_eq!(next.name, "Camino Finisterre Stage 1");
    }

    #[tokio::test]
    async fn route_without_elevation_is_stored_two_dimensional() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();
        ingest(&store, &config, &request("camino_route.gpx", None, WriteMode::ByName))
            .await
            .unwrap();

        let rows = store.rows(&config.table).await;
        let track = &rows[0].1.track;
        assert!(track.geometry_wkt.starts_with("LINESTRING (-8.5457 42.8805,"));
        assert!(track.simplified_profile.0.iter().all(|p| p[1] == 0.0));
        assert_eq!(track.ascent_m, 0);
    }

    #[tokio::test]
    async fn replace_keeps_the_stored_name_unless_given_one() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();
        ingest(&store, &config, &request("salkantay_day1.gpx", None, WriteMode::ByName))
            .await
            .unwrap();

        let replaced = ingest(&store, &config, &request("camino_route.gpx", None, WriteMode::Replace(1)))
            .await
            .unwrap();
        assert_eq!(replaced, StoredTrail { id: 1, name: "Salkantay Trek".into() });
        let rows = store.rows(&config.table).await;
        assert!(rows[0].1.track.geometry_wkt.starts_with("LINESTRING (-8.5457"));

        let renamed = ingest(
            &store,
            &config,
            &request("salkantay_day1.gpx", Some("Salkantay Day 1"), WriteMode::Replace(1)),
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Salkantay Day 1");
    }

    #[tokio::test]
    async fn blank_names_never_reach_the_store() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();
        let added = ingest(&store, &config, &request("salkantay_day1.gpx", Some(""), WriteMode::ById(3)))
            .await
            .unwrap();
        assert_eq!(added, StoredTrail { id: 3, name: "Salkantay Trek".into() });

        let replaced = ingest(&store, &config, &request("camino_route.gpx", Some("   "), WriteMode::Replace(3)))
            .await
            .unwrap();
        assert_eq!(replaced.name, "Salkantay Trek");
        let rows = store.rows(&config.table).await;
        assert_eq!(rows[0].1.name, "Salkantay Trek");
        assert!(rows[0].1.track.geometry_wkt.starts_with("LINESTRING (-8.5457"));
    }

    #[tokio::test]
    async fn replace_of_unknown_id_writes_nothing() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();
        let err = ingest(&store, &config, &request("salkantay_day1.gpx", None, WriteMode::Replace(7)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::Persistence(PersistenceError::NotFound { id: 7, .. })
        ));
        // the schema step was rolled back along with everything else
        assert!(!store.has_table(&config.table).await);
    }

    #[tokio::test]
    async fn rejected_write_leaves_no_trace() {
        let store = MemoryStore::rejecting_writes();
        let config = IngestConfig::default();
        let err = ingest(&store, &config, &request("salkantay_day1.gpx", None, WriteMode::ByName))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Persistence(PersistenceError::Rejected(_))));
        assert_eq!(store.transactions_begun(), 1);
        assert!(!store.has_table(&config.table).await);
        assert!(store.rows(&config.table).await.is_empty());
    }

    #[tokio::test]
    async fn name_conflict_on_explicit_id_rolls_back() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();
        ingest(&store, &config, &request("salkantay_day1.gpx", None, WriteMode::ByName))
            .await
            .unwrap();

        let err = ingest(
            &store,
            &config,
            &request("camino_route.gpx", Some("Salkantay Trek"), WriteMode::ById(9)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::Persistence(PersistenceError::Rejected(_))));
        let rows = store.rows(&config.table).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 1);
    }

    #[tokio::test]
    async fn missing_file_fails_before_any_transaction() {
        let store = MemoryStore::default();
        let err = ingest(
            &store,
            &IngestConfig::default(),
            &request("does_not_exist.gpx", None, WriteMode::ByName),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::FileNotFound { .. }));
        assert_eq!(store.transactions_begun(), 0);
    }

    #[tokio::test]
    async fn pipeline_errors_never_reach_the_store() {
        let store = MemoryStore::default();
        let config = IngestConfig::default();

        let err = ingest(&store, &config, &request("malformed.gpx", None, WriteMode::ByName))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));

        let err = ingest(&store, &config, &request("single_point.gpx", None, WriteMode::ByName))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Validation(ValidationError::NotEnoughPoints { found: 1 })
        ));
        assert_eq!(store.transactions_begun(), 0);
    }

    #[tokio::test]
    async fn table_and_policy_come_from_config() {
        let store = MemoryStore::default();
        let config = IngestConfig {
            elevation_policy: ElevationPolicy::Require,
            table: TableName::new("hikes").unwrap(),
            ..Default::default()
        };

        ingest(&store, &config, &request("salkantay_day1.gpx", None, WriteMode::ByName))
            .await
            .unwrap();
        assert_eq!(store.rows(&config.table).await.len(), 1);
        assert!(!store.has_table(&TableName::default()).await);

        let err = ingest(&store, &config, &request("camino_route.gpx", None, WriteMode::ByName))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Validation(ValidationError::MissingElevation { without: 4 })
        ));
    }
}

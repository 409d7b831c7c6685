use bigdecimal::BigDecimal;
use num_traits::FromPrimitive;
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument};

use crate::{
    config::TableName,
    error::PersistenceError,
    store::{TrailStore, TrailTransaction},
    types::{
        dto::trail::QueryTrail,
        model::trail::{StoredTrail, TrailRecord, TrailSummary, TrailTrack},
    },
};

/// PostGIS trail table behind an injected pool.
#[derive(Clone, Debug)]
pub struct PgTrailStore {
    pool: PgPool,
}

pub struct PgTrailTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgTrailStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enables PostGIS and creates the trail table.
    #[instrument(skip(self))]
    pub async fn init(&self, table: &TableName) -> Result<(), PersistenceError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(&self.pool)
            .await?;
        info!("PostGIS extension enabled (or already exists)");
        let mut tx = self.begin().await?;
        tx.ensure_schema(table).await?;
        tx.commit().await
    }

    pub async fn list(&self, table: &TableName) -> Result<Vec<TrailSummary>, PersistenceError> {
        let sql = format!("SELECT id, name, distance_km, ascent_m FROM {table} ORDER BY id");
        Ok(sqlx::query_as::<_, TrailSummary>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn find(
        &self,
        table: &TableName,
        id: i32,
    ) -> Result<Option<QueryTrail>, PersistenceError> {
        let sql = format!(
            r#"SELECT id, name, distance_km, ascent_m,
                ST_AsGeoJSON(track)::jsonb AS geometry,
                simplified_profile
            FROM {table}
            WHERE id = $1"#
        );
        Ok(sqlx::query_as::<_, QueryTrail>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Returns whether a row was deleted.
    #[instrument(skip(self))]
    pub async fn remove(&self, table: &TableName, id: i32) -> Result<bool, PersistenceError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

impl TrailStore for PgTrailStore {
    type Transaction = PgTrailTransaction;

    async fn begin(&self) -> Result<PgTrailTransaction, PersistenceError> {
        Ok(PgTrailTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

fn distance_decimal(track: &TrailTrack) -> Result<BigDecimal, PersistenceError> {
    BigDecimal::from_f64(track.distance_km)
        .map(|d| d.round(2))
        .ok_or_else(|| PersistenceError::Rejected(format!("distance {}", track.distance_km)))
}

impl TrailTransaction for PgTrailTransaction {
    async fn ensure_schema(&mut self, table: &TableName) -> Result<(), PersistenceError> {
        let create_table = format!(
            r#"CREATE TABLE IF NOT EXISTS {table} (
                id SERIAL PRIMARY KEY,
                name VARCHAR(255) UNIQUE NOT NULL,
                track GEOGRAPHY(GEOMETRY, 4326),
                simplified_profile JSONB,
                distance_km NUMERIC(8, 2),
                ascent_m INTEGER,
                created_at TIMESTAMPTZ DEFAULT NOW(),
                updated_at TIMESTAMPTZ DEFAULT NOW()
            )"#
        );
        sqlx::query(&create_table).execute(&mut *self.tx).await?;
        let create_index =
            format!("CREATE INDEX IF NOT EXISTS idx_{table}_track ON {table} USING GIST (track)");
        sqlx::query(&create_index).execute(&mut *self.tx).await?;
        debug!(%table, "schema ready");
        Ok(())
    }

    async fn upsert_by_name(
        &mut self,
        table: &TableName,
        record: &TrailRecord,
    ) -> Result<StoredTrail, PersistenceError> {
        let sql = format!(
            r#"INSERT INTO {table} (name, track, simplified_profile, distance_km, ascent_m)
            VALUES ($1, ST_GeogFromText($2), $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET
                track = EXCLUDED.track,
                simplified_profile = EXCLUDED.simplified_profile,
                distance_km = EXCLUDED.distance_km,
                ascent_m = EXCLUDED.ascent_m,
                updated_at = NOW()
            RETURNING id, name"#
        );
        Ok(sqlx::query_as::<_, StoredTrail>(&sql)
            .bind(&record.name)
            .bind(&record.track.geometry_wkt)
            .bind(Json(&record.track.simplified_profile))
            .bind(distance_decimal(&record.track)?)
            .bind(record.track.ascent_m)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn upsert_by_id(
        &mut self,
        table: &TableName,
        id: i32,
        record: &TrailRecord,
    ) -> Result<StoredTrail, PersistenceError> {
        let sql = format!(
            r#"INSERT INTO {table} (id, name, track, simplified_profile, distance_km, ascent_m)
            VALUES ($1, $2, ST_GeogFromText($3), $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                track = EXCLUDED.track,
                simplified_profile = EXCLUDED.simplified_profile,
                distance_km = EXCLUDED.distance_km,
                ascent_m = EXCLUDED.ascent_m,
                updated_at = NOW()
            RETURNING id, name"#
        );
        let stored = sqlx::query_as::<_, StoredTrail>(&sql)
            .bind(id)
            .bind(&record.name)
            .bind(&record.track.geometry_wkt)
            .bind(Json(&record.track.simplified_profile))
            .bind(distance_decimal(&record.track)?)
            .bind(record.track.ascent_m)
            .fetch_one(&mut *self.tx)
            .await?;

        // Explicit ids bypass the serial sequence; move it past them
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), (SELECT MAX(id) FROM {table}))"
        );
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(stored)
    }

    async fn replace_track(
        &mut self,
        table: &TableName,
        id: i32,
        name: Option<&str>,
        track: &TrailTrack,
    ) -> Result<StoredTrail, PersistenceError> {
        let sql = format!(
            r#"UPDATE {table} SET
                name = COALESCE($2, name),
                track = ST_GeogFromText($3),
                simplified_profile = $4,
                distance_km = $5,
                ascent_m = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name"#
        );
        sqlx::query_as::<_, StoredTrail>(&sql)
            .bind(id)
            .bind(name)
            .bind(&track.geometry_wkt)
            .bind(Json(&track.simplified_profile))
            .bind(distance_decimal(track)?)
            .bind(track.ascent_m)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| PersistenceError::NotFound {
                table: table.to_string(),
                id,
            })
    }

    async fn commit(self) -> Result<(), PersistenceError> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self) -> Result<(), PersistenceError> {
        Ok(self.tx.rollback().await?)
    }
}

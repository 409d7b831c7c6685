mod clients;
mod config;
mod error;
mod import;
mod ingest;
mod profile;
mod simplify;
mod store;
mod trail;
mod trail_geo;
mod types;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueHint};
use color_eyre::eyre::eyre;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    clients::connect_db,
    config::{DbConfig, ElevationPolicy, IngestConfig, TableName, DEFAULT_TABLE, DEFAULT_TOLERANCE},
    ingest::{ingest, load_trail, IngestRequest, WriteMode},
    store::postgres::PgTrailStore,
    trail_geo::IntoTrailFeature,
    types::{feature::FeatureProperties, model::trail::StoredTrail},
};

#[derive(Parser, Debug)]
#[command(name = "trail-ingest", author, version, about = "Load GPX trails into PostGIS")]
struct Cli {
    #[command(flatten)]
    db: DbArgs,

    #[command(flatten)]
    ingest: IngestArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enable PostGIS and create the trail table
    Init,
    /// Create or update a trail from a GPX file (keyed on id when given, else on name)
    Add {
        #[arg(value_hint = ValueHint::FilePath)]
        gpx: PathBuf,
        id: Option<i32>,
        name: Option<String>,
        /// Print the trail as GeoJSON instead of writing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Replace geometry and profile of an existing trail
    Replace {
        id: i32,
        #[arg(value_hint = ValueHint::FilePath)]
        gpx: PathBuf,
        name: Option<String>,
    },
    /// List stored trails
    List,
    /// Delete a trail
    Remove { id: i32 },
    /// Print a stored trail as a GeoJSON feature
    Show { id: i32 },
}

#[derive(Args, Debug)]
struct DbArgs {
    /// Full connection URL; overrides the DB_* parts
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[arg(long, env = "DB_HOST", default_value = "127.0.0.1", global = true)]
    db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5433, global = true)]
    db_port: u16,

    #[arg(long, env = "DB_USER", default_value = "hike_admin", global = true)]
    db_user: String,

    #[arg(long, env = "DB_PASSWORD", global = true, hide_env_values = true)]
    db_password: Option<String>,

    #[arg(long, env = "DB_NAME", default_value = "hikes_db", global = true)]
    db_name: String,

    #[arg(long, env = "TRAIL_DB_MAX_CONNECTIONS", default_value_t = 2, global = true)]
    max_connections: u32,
}

impl DbArgs {
    fn config(&self) -> DbConfig {
        DbConfig {
            url: self.database_url.clone(),
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Trail table
    #[arg(long, env = "TRAIL_TABLE", default_value = DEFAULT_TABLE, global = true)]
    table: String,

    /// Elevation profile simplification tolerance
    #[arg(long, env = "TRAIL_TOLERANCE", default_value_t = DEFAULT_TOLERANCE, global = true)]
    tolerance: f64,

    #[arg(long, env = "TRAIL_ELEVATION_POLICY", value_enum, default_value_t = ElevationPolicy::Uniform, global = true)]
    elevation_policy: ElevationPolicy,

    /// Radial-distance pre-pass before simplifying
    #[arg(long, global = true)]
    fast: bool,

    /// Discard points with negative elevation
    #[arg(long, global = true)]
    drop_negative_elevation: bool,
}

impl IngestArgs {
    fn config(&self) -> color_eyre::Result<IngestConfig> {
        let config = IngestConfig {
            high_quality: !self.fast,
            elevation_policy: self.elevation_policy,
            drop_negative_elevation: self.drop_negative_elevation,
            table: TableName::new(&self.table)?,
            ..Default::default()
        }
        .with_tolerance(self.tolerance)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.ingest.config()?;

    if let Command::Add {
        gpx,
        id,
        name,
        dry_run: true,
    } = &cli.command
    {
        return dry_run(&config, request(gpx, *id, name.clone())).await;
    }

    let pool = connect_db(&cli.db.config()).await?;
    let result = run(&pool, &config, cli.command).await;
    pool.close().await;
    result
}

fn request(gpx: &Path, id: Option<i32>, name: Option<String>) -> IngestRequest {
    IngestRequest {
        path: gpx.to_path_buf(),
        name,
        mode: id.map_or(WriteMode::ByName, WriteMode::ById),
    }
}

async fn run(pool: &PgPool, config: &IngestConfig, command: Command) -> color_eyre::Result<()> {
    let store = PgTrailStore::new(pool.clone());
    let table = &config.table;
    match command {
        Command::Init => {
            store.init(table).await?;
            println!("Table {table} is ready");
        }
        Command::Add { gpx, id, name, .. } => {
            let stored = ingest(&store, config, &request(&gpx, id, name)).await?;
            report(&stored, "added/updated");
            list(&store, config).await?;
        }
        Command::Replace { id, gpx, name } => {
            let request = IngestRequest {
                path: gpx,
                name,
                mode: WriteMode::Replace(id),
            };
            let stored = ingest(&store, config, &request).await?;
            report(&stored, "replaced track of");
        }
        Command::List => list(&store, config).await?,
        Command::Remove { id } => {
            if store.remove(table, id).await? {
                println!("Successfully deleted trail with ID: {id}");
            } else {
                println!("No trail found with ID: {id}. Nothing deleted.");
            }
        }
        Command::Show { id } => {
            let trail = store
                .find(table, id)
                .await?
                .ok_or(eyre!("No trail with id {id}"))?;
            println!("{}", serde_json::to_string_pretty(&trail.into_feature()?)?);
        }
    }
    Ok(())
}

fn report(stored: &StoredTrail, action: &str) {
    println!(
        "Successfully {action} \"{}\" with ID: {}",
        stored.name, stored.id
    );
}

async fn list(store: &PgTrailStore, config: &IngestConfig) -> color_eyre::Result<()> {
    let trails = store.list(&config.table).await?;
    println!("--- Trails in {} ---", config.table);
    for trail in trails {
        println!(
            "ID: {}, Name: {}, Distance: {}km, Ascent: {}m",
            trail.id,
            trail.name,
            trail
                .distance_km
                .map_or_else(|| "-".to_owned(), |d| d.to_string()),
            trail
                .ascent_m
                .map_or_else(|| "-".to_owned(), |a| a.to_string()),
        );
    }
    Ok(())
}

async fn dry_run(config: &IngestConfig, request: IngestRequest) -> color_eyre::Result<()> {
    let trail = load_trail(&request, config).await?;
    let record = &trail.record;
    info!(
        distance_km = record.track.distance_km,
        ascent_m = record.track.ascent_m,
        "Dry run, nothing written"
    );
    let feature = trail.points.into_trail_feature(FeatureProperties {
        id: None,
        name: record.name.clone(),
        distance_km: record.track.distance_km,
        ascent_m: Some(record.track.ascent_m),
        simplified_profile: record.track.simplified_profile.clone(),
    })?;
    println!("{}", serde_json::to_string_pretty(&feature)?);
    Ok(())
}

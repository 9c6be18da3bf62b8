//! Schema migrations
//!
//! SQL files live in `handover-shared/migrations/` and are embedded into the
//! binary at compile time, so the server never reads them from disk.
//!
//! # Example
//!
//! ```no_run
//! use handover_shared::db::migrations::{migration_status, run_migrations};
//! use handover_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
//! run_migrations(&pool).await?;
//!
//! let status = migration_status(&pool).await?;
//! assert!(status.is_up_to_date());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;

use sqlx::{
    migrate::{MigrateDatabase, MigrateError, Migrator},
    postgres::PgPool,
    Postgres,
};
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applied versus embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,
    pub pending_migrations: usize,
    pub latest_version: Option<i64>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending_migrations == 0
    }
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!("Running database migrations");

    if let Err(e) = MIGRATOR.run(pool).await {
        warn!(error = %e, "Migration failed");
        return Err(e);
    }

    info!("Database schema is up to date");
    Ok(())
}

/// Compares `_sqlx_migrations` with the embedded migration set
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    let applied: Vec<i64> = if table_exists {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = true")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let status = status_from_versions(&applied, embedded_versions());
    debug!(
        applied = status.applied_migrations,
        pending = status.pending_migrations,
        latest_version = ?status.latest_version,
        "Migration status"
    );

    Ok(status)
}

/// Creates the database named in the URL when it is missing
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await?;
    Ok(())
}

fn embedded_versions() -> impl Iterator<Item = i64> {
    MIGRATOR
        .iter()
        .filter(|migration| !migration.migration_type.is_down_migration())
        .map(|migration| migration.version)
}

fn status_from_versions(
    applied: &[i64],
    embedded: impl Iterator<Item = i64>,
) -> MigrationStatus {
    let applied_set: HashSet<i64> = applied.iter().copied().collect();

    MigrationStatus {
        applied_migrations: applied_set.len(),
        pending_migrations: embedded.filter(|v| !applied_set.contains(v)).count(),
        latest_version: applied.iter().copied().max(),
    }
}

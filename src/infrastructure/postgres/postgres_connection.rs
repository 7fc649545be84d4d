use std::time::Duration;

use diesel::{
    Connection, PgConnection,
    connection::{CacheSize, SimpleConnection},
    r2d2::{ConnectionManager, CustomizeConnection, Error as R2d2Error, Pool},
};
use tracing::info;

use crate::domain::value_objects::storage_errors::{StorageError, StorageResult};

const SCHEMA_SQL: &str = include_str!("../../../migrations/2024-11-20-000000_create_chat_and_users/up.sql");

/// Needed behind PgBouncer in transaction pooling mode, where server-side prepared
/// statements do not survive across transactions.
#[derive(Debug, Default)]
struct DisablePreparedStatements;

impl CustomizeConnection<PgConnection, R2d2Error> for DisablePreparedStatements {
    fn on_acquire(&self, conn: &mut PgConnection) -> std::result::Result<(), R2d2Error> {
        conn.set_prepared_statement_cache_size(CacheSize::Disabled);
        Ok(())
    }
}

pub type PgPoolSquad = Pool<ConnectionManager<PgConnection>>;

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_size: u32,
    pub connection_timeout: Duration,
    pub disable_prepared_statements: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(30),
            disable_prepared_statements: false,
        }
    }
}

/// Builds the process-wide pool. r2d2 opens the initial connections eagerly, so an
/// unreachable store fails here instead of on the first request.
pub fn establish_connection(database_url: &str, settings: &PoolSettings) -> StorageResult<PgPoolSquad> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let mut builder = Pool::builder()
        .max_size(settings.max_size)
        .connection_timeout(settings.connection_timeout);

    if settings.disable_prepared_statements {
        builder = builder.connection_customizer(Box::new(DisablePreparedStatements));
    }

    let pool = builder
        .build(manager)
        .map_err(|err| StorageError::ConnectionFailure(err.to_string()))?;

    info!(
        max_size = settings.max_size,
        connection_timeout_secs = settings.connection_timeout.as_secs(),
        "postgres: connection pool ready"
    );

    Ok(pool)
}

/// Creates the `chat` and `users` tables when they do not exist yet.
pub fn apply_schema(pool: &PgPoolSquad) -> StorageResult<()> {
    let mut conn = pool
        .get()
        .map_err(|err| StorageError::ConnectionFailure(err.to_string()))?;

    conn.batch_execute(SCHEMA_SQL).map_err(StorageError::storage)?;

    info!("postgres: schema applied");
    Ok(())
}

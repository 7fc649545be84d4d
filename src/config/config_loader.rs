use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};

use super::config_model::{Database, DatabaseParts, DotEnvyConfig, Server};
use crate::infrastructure::postgres::postgres_connection::PoolSettings;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        host: parse_or("SERVER_HOST", "0.0.0.0".parse()?)?,
        port: parse_required("SERVER_PORT")?,
        body_limit: parse_or("SERVER_BODY_LIMIT", 1)?,
        timeout: parse_or("SERVER_TIMEOUT", 30)?,
    };

    let defaults = PoolSettings::default();
    let database = Database {
        url: database_url()?,
        pool: PoolSettings {
            max_size: parse_or("DATABASE_MAX_CONNECTIONS", defaults.max_size)?,
            connection_timeout: Duration::from_secs(parse_or(
                "DATABASE_CONNECTION_TIMEOUT",
                defaults.connection_timeout.as_secs(),
            )?),
            disable_prepared_statements: env_bool("DATABASE_DISABLE_PREPARED_STATEMENTS")?
                .unwrap_or(defaults.disable_prepared_statements),
        },
        apply_schema: env_bool("DATABASE_APPLY_SCHEMA")?.unwrap_or(false),
    };

    Ok(DotEnvyConfig { server, database })
}

fn database_url() -> Result<String> {
    if let Some(url) = env_string("DATABASE_URL") {
        return Ok(url);
    }

    let parts = DatabaseParts {
        user: env_string("DB_USER").context("DATABASE_URL or DB_USER must be set")?,
        password: env_string("DB_PASSWORD").unwrap_or_default(),
        host: env_string("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
        port: parse_or("DB_PORT", 5432)?,
        name: env_string("DB_NAME").context("DATABASE_URL or DB_NAME must be set")?,
        ssl_mode: env_string("DB_SSLMODE").unwrap_or_else(|| "disable".to_string()),
    };

    Ok(parts.to_url())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_required<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_string(key)
        .with_context(|| format!("{key} is missing"))?
        .trim()
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    let Some(raw) = env_string(key) else {
        return Ok(None);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(Some(true)),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(Some(false)),
        _ => Err(anyhow!("{key} is invalid (value: {raw})")),
    }
}

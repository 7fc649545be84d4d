use std::net::IpAddr;

use crate::infrastructure::postgres::postgres_connection::PoolSettings;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub host: IpAddr,
    pub port: u16,
    /// MiB.
    pub body_limit: u64,
    /// Seconds. Also the deadline of every storage operation.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub pool: PoolSettings,
    /// Create the tables on startup when missing.
    pub apply_schema: bool,
}

/// Discrete connection settings, used when `DATABASE_URL` is not set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseParts {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub ssl_mode: String,
}

impl DatabaseParts {
    pub fn to_url(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, host, self.port, self.name, self.ssl_mode
        )
    }
}

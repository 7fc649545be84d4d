pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod observability;

use std::sync::Arc;

use anyhow::Result;
use application::usecases::paywall::PaywallUseCase;
use infrastructure::postgres::{postgres_connection, repositories::paywall::PaywallPostgres};
use tracing::{error, info};

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("chat-paywall")?;

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let database = dotenvy_env.database.clone();
    let postgres_pool = tokio::task::spawn_blocking(move || {
        let pool = postgres_connection::establish_connection(&database.url, &database.pool)?;
        if database.apply_schema {
            postgres_connection::apply_schema(&pool)?;
        }
        Ok::<_, anyhow::Error>(pool)
    })
    .await??;
    info!("Postgres connection has been established");

    let paywall_repository = PaywallPostgres::new(Arc::new(postgres_pool));
    let paywall_usecase = Arc::new(PaywallUseCase::new(Arc::new(paywall_repository)));

    let served =
        infrastructure::axum_http::http_serve::start(&dotenvy_env.server, Arc::clone(&paywall_usecase))
            .await;

    if let Err(err) = paywall_usecase.close().await {
        error!(error = %err, "Failed to close storage engine");
    }

    served
}

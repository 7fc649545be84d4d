use crate::{
    application::usecases::paywall::PaywallUseCase,
    config::config_model::Server,
    domain::repositories::paywall::PaywallRepository,
    infrastructure::axum_http::{default_routers, operation_scope::RequestTimeout, routers},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::StatusCode,
    routing::get,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

/// Slack between the operation deadline and the hard request timeout, so a storage
/// deadline surfaces as the usual error body rather than a bare timeout response.
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

pub fn app<T>(server: &Server, paywall_usecase: Arc<PaywallUseCase<T>>) -> Result<Router>
where
    T: PaywallRepository + Send + Sync + 'static,
{
    let operation_timeout = Duration::from_secs(server.timeout);

    let app = Router::new()
        .merge(routers::chats::routes(Arc::clone(&paywall_usecase)))
        .merge(routers::subscriptions::routes(Arc::clone(&paywall_usecase)))
        .route("/health-check", get(default_routers::health_check))
        .fallback(default_routers::not_found)
        .layer(Extension(RequestTimeout(operation_timeout)))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            operation_timeout + TIMEOUT_GRACE,
        ))
        .layer(RequestBodyLimitLayer::new(
            (server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start<T>(server: &Server, paywall_usecase: Arc<PaywallUseCase<T>>) -> Result<()>
where
    T: PaywallRepository + Send + Sync + 'static,
{
    let app = app(server, paywall_usecase)?;

    let addr = SocketAddr::from((server.host, server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Server is running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

//! HTTP server facade for lpt-event with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{routing::get, Router};

use lpt_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod router;
pub mod spa;

pub use error::{ApiJson, AppError};
use router::RouterBuilder;

/// Build the application router: every module under the API prefix, the
/// OpenAPI document, `/healthz`, and the static frontend when it exists.
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let mut router_builder = RouterBuilder::new(&settings.api_prefix)
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .route("/healthz", get(health_check))
        .mount_modules(registry)
        .with_openapi(registry, &settings.app_name);

    let assets = settings.static_assets_path.as_path();
    if assets.is_dir() {
        tracing::info!(path = %assets.display(), "serving static frontend assets");
        router_builder = router_builder.with_static_assets(assets);
    } else {
        tracing::warn!(
            path = %assets.display(),
            "static assets directory not found; serving the API only"
        );
    }

    router_builder.build()
}

/// Serve `app` until Ctrl-C or SIGTERM.
pub async fn start_server(app: Router, settings: &Settings) -> anyhow::Result<()> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
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
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

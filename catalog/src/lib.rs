use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::{middleware, Router};
use blob_store::FsBlobStore;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Level};

use crate::config::Config;
use crate::route::AppState;
use crate::service::coordinator::RecordingCoordinator;
use crate::service::database::DatabaseService;
use crate::service::recordings::RecordingsService;

pub mod config;
pub mod dto;
pub mod entity;
pub mod error;
pub mod path;
pub mod result;
pub mod service;

mod migration;
mod route;

pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Server listening on {}", listener.local_addr()?);

    let database = DatabaseService::new(&cfg.database).await?;
    let blobs = Arc::new(FsBlobStore::new(&cfg.blob).await?);
    let metadata = Arc::new(RecordingsService::new(database.get_connection().clone()));

    let app_state = AppState {
        recordings: Arc::new(RecordingCoordinator::new(blobs.clone(), metadata)),
    };
    let app = app(&cfg, app_state, blobs.root())?;

    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));

    if let Err(e) = database.connection.close().await {
        error!("Failed to close database: {e}");
    }
    Ok(())
}

fn app(cfg: &Config, app_state: AppState, blob_root: &Path) -> anyhow::Result<Router> {
    let mut app = Router::new()
        .merge(route::recordings::route())
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(cfg.http.body_limit));

    if cfg.blob.serve {
        info!(
            "Serving {} under {}",
            blob_root.display(),
            cfg.blob.public_path
        );
        app = app.nest_service(&cfg.blob.public_path, ServeDir::new(blob_root));
    }

    Ok(app
        .layer(cors_layer(cfg)?)
        .layer(middleware::from_fn(http_log::print_request_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::DEBUG))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        ))
}

fn cors_layer(cfg: &Config) -> anyhow::Result<CorsLayer> {
    if !cfg.http.cors {
        return Ok(CorsLayer::new());
    }
    let origins = cfg.http.allowed_origins()?;
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }
    info!("CORS allowed origins: {:?}", cfg.http.cors_origins);
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

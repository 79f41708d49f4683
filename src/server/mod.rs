//! HTTP surface. Routing lives in [routes::route_request]; axum only carries requests to it.

use std::io;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;

pub mod api;
pub mod routes;

pub use api::ApiContext;

/// Builds the application router. With `config.static_dir` set, unmatched paths are served
/// from that directory.
pub fn router(config: &ServerConfig) -> Router {
    let context = Arc::new(ApiContext::from(config));
    let app = Router::new()
        .route("/", get(dispatch))
        .route("/api/*rest", any(dispatch));
    let app = match &config.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.fallback(dispatch),
    };
    app.layer(TraceLayer::new_for_http()).with_state(context)
}

async fn dispatch(
    State(context): State<Arc<ApiContext>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    // Batches are CPU-bound; keep them off the async workers.
    let handled = tokio::task::spawn_blocking(move || {
        routes::route_request(method.as_str(), &path, &body, &context)
    })
    .await;

    match handled {
        Ok(response) => into_axum(response),
        Err(err) => {
            error!(%err, "request handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

fn into_axum(response: routes::HttpResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}

pub async fn serve(config: ServerConfig) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        workers = config.workers,
        max_actors = config.max_actors,
        "reliquary server listening"
    );
    axum::serve(listener, router(&config))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Blocking entry point for the CLI.
pub fn run_server(config: ServerConfig) -> io::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(config))
}

//! HTTP interface of OpenCDN.
//!
//! Routes map one to one onto store operations. Every handler takes its
//! inputs from the path and a form body, and failures render as the JSON
//! error shape produced by [`ApiError`].

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::{middleware, Router};
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

pub mod error;
pub mod form;
pub mod logging;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorBody};
pub use form::{RequestForm, UploadedFile};
pub use routes::index::VERSION_TEXT;
pub use state::{AppState, HttpSettings};

/// Build the application router.
pub fn app(state: AppState) -> Router {
    // The span carries no URI: object paths contain capability keys
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::debug_span!("http", method = %request.method())
        })
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(Level::DEBUG)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    routes::router()
        .layer(DefaultBodyLimit::max(state.settings.body_limit()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            logging::log_request,
        ))
        .with_state(state)
        .layer(trace_layer)
}

/// Serve the application until the shutdown future resolves.
pub async fn serve<F>(
    addr: SocketAddr,
    state: AppState,
    shutdown: F,
) -> Result<(), HttpServerError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "OpenCDN listening");

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}

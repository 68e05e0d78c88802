pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod progress;
pub mod routes;
pub mod store;
pub mod workflow;

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use notify::Notifier;
use store::Store;
use workflow::Workflow;

/// Full HTTP surface with the middleware stack used in production.
pub fn app<S: Store, N: Notifier>(wf: Arc<Workflow<S, N>>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(wf))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

pub(crate) mod health;
pub(crate) mod import;
pub(crate) mod metrics;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::app::AppState;
use crate::auth;

pub(crate) fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/recipe", post(import::import_recipe))
        .route("/api/recipe-status", get(import::job_status))
        .route("/api/user-import-status", get(import::user_import_status))
        .route("/api/generate-embedding", post(import::generate_embedding))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::exporter))
        .merge(protected)
        .layer(auth::cors_layer())
        .with_state(state)
}

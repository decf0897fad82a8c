//! Route modules for the translation service

pub mod extract;
mod form;
pub mod health;
pub mod translate;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Room for multipart framing around the file itself
const BODY_SLACK: usize = 1024 * 1024;

/// Build the application router with its middleware
pub fn app(state: AppState) -> Router {
    let upload = &state.config().upload;
    let single_limit = (upload.max_file_size as usize).saturating_add(BODY_SLACK);
    let batch_limit = (upload.max_file_size as usize)
        .saturating_mul(upload.max_batch_size)
        .saturating_add(BODY_SLACK);
    let cors = cors_layer(&state.config().server);

    let uploads = Router::new()
        .route("/translate-image", post(translate::translate_image))
        .route("/extract-pdf", post(extract::extract_pdf))
        .route("/extract-archive", post(extract::extract_archive))
        .layer(DefaultBodyLimit::max(single_limit));

    let batch = Router::new()
        .route("/translate-multiple", post(translate::translate_multiple))
        .layer(DefaultBodyLimit::max(batch_limit));

    Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::health_check))
        .route("/translate-text", post(translate::translate_text))
        .merge(uploads)
        .merge(batch)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

//! Health check endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

const SERVICE_NAME: &str = "arabic-image-translator";

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub supported_formats: Vec<String>,
    pub max_file_size_mb: u64,
    pub max_batch_size: usize,
    pub features: Features,
}

#[derive(Serialize)]
pub struct Features {
    pub ocr_engine: &'static str,
    pub translation_providers: Vec<&'static str>,
    pub pdf: bool,
    pub rar: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub ocr_available: bool,
    pub translation_providers: Vec<&'static str>,
    pub page_concurrency: usize,
    pub max_pages: usize,
}

/// Service banner
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    let config = state.config();
    let pipeline = state.pipeline();

    Json(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: "Translates the text in images, PDFs and comic archives to Arabic",
        supported_formats: state.validator().supported_formats().to_vec(),
        max_file_size_mb: config.max_file_size_mb(),
        max_batch_size: config.upload.max_batch_size,
        features: Features {
            ocr_engine: pipeline.extractor().detector_name(),
            translation_providers: pipeline.translator().provider_names(),
            pdf: true,
            rar: cfg!(feature = "rar"),
        },
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ocr_available = state.pipeline().extractor().is_available().await;

    Json(HealthResponse {
        status: if ocr_available { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        service: SERVICE_NAME,
        ocr_available,
        translation_providers: state.translator().provider_names(),
        page_concurrency: state.config().pipeline.page_concurrency,
        max_pages: state.config().upload.max_pages,
    })
}

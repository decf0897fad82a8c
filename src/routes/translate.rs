//! Translation routes
//!
//! Endpoints:
//! - POST /translate-image - Translate one image, PDF or archive, returns a ZIP
//! - POST /translate-multiple - Translate several uploads into one ZIP
//! - POST /translate-text - Translate a text snippet

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Multipart, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::form::{read_files, read_single_file};
use crate::error::{AppError, Result};
use crate::pipeline::{
    archive_file_name, PipelineError, PipelineOutput, RequestStage, ResultArchive, BATCH_ARCHIVE_NAME,
};
use crate::state::AppState;
use crate::translate::TranslationOutcome;
use crate::upload::{RequestWorkspace, ValidatedUpload};

/// Header carrying the number of pages in the archive
pub const PAGES_TOTAL_HEADER: &str = "x-pages-total";
/// Header carrying the number of pages passed through unprocessed
pub const PAGES_FAILED_HEADER: &str = "x-pages-failed";

/// Translate a single upload
pub async fn translate_image(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    tracing::info!(stage = %RequestStage::Received, "Translation request");

    let file = read_single_file(multipart, &["file"], state.config().upload.max_file_size).await?;
    let upload = state.validator().validate(file)?;
    tracing::info!(
        file_name = %upload.file.file_name,
        size = upload.file.size(),
        stage = %RequestStage::Validated,
        "Request stage reached"
    );

    let stem = upload.file.stem();
    let multi_page = upload.kind.is_multi_page();
    let output = run_pipeline(&state, upload).await?;

    let packaged_stem = stem.clone();
    let archive = tokio::task::spawn_blocking(move || -> std::result::Result<_, PipelineError> {
        let mut archive = ResultArchive::new();
        archive.add_output(&packaged_stem, &output, multi_page, false)?;
        Ok(archive)
    })
    .await
    .map_err(PipelineError::from)??;

    zip_response(&archive_file_name(&stem), archive).await
}

/// Translate several uploads into one archive
///
/// Invalid or unprocessable files are skipped with a warning. Fails only when
/// nothing at all could be processed.
pub async fn translate_multiple(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    tracing::info!(stage = %RequestStage::Received, "Batch translation request");

    let upload_config = &state.config().upload;
    let files = read_files(
        multipart,
        &["files", "file"],
        upload_config.max_batch_size,
        upload_config.max_file_size,
    )
    .await?;

    if files.is_empty() {
        return Err(crate::upload::UploadError::MissingFile.into());
    }

    let mut archive = ResultArchive::new();
    let mut first_error: Option<AppError> = None;

    for file in files {
        let file_name = file.file_name.clone();
        let upload = match state.validator().validate(file) {
            Ok(upload) => upload,
            Err(e) => {
                tracing::warn!(file_name = %file_name, "Skipping invalid file: {}", e);
                first_error.get_or_insert(e.into());
                continue;
            }
        };

        let stem = upload.file.stem();
        let multi_page = upload.kind.is_multi_page();
        match run_pipeline(&state, upload).await {
            Ok(output) => {
                archive = tokio::task::spawn_blocking(move || -> std::result::Result<_, PipelineError> {
                    archive.add_output(&stem, &output, multi_page, true)?;
                    Ok(archive)
                })
                .await
                .map_err(PipelineError::from)??;
            }
            Err(e) => {
                tracing::warn!(file_name = %file_name, "Skipping file that could not be processed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }

    if archive.pages_total() == 0 {
        return Err(first_error.unwrap_or_else(|| {
            PipelineError::NoContentProcessed {
                pages: 0,
                upstream_only: false,
            }
            .into()
        }));
    }

    zip_response(BATCH_ARCHIVE_NAME, archive).await
}

async fn run_pipeline(state: &AppState, upload: ValidatedUpload) -> Result<PipelineOutput> {
    let workspace = Arc::new(RequestWorkspace::create(state.config().upload.temp_dir.as_deref())?);

    // Fires when the handler future is dropped, e.g. on client disconnect
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let output = state.pipeline().process(upload, workspace, cancel).await?;
    Ok(output)
}

async fn zip_response(file_name: &str, archive: ResultArchive) -> Result<Response> {
    let pages_total = archive.pages_total();
    let pages_failed = archive.pages_failed();

    let data = tokio::task::spawn_blocking(move || archive.finish())
        .await
        .map_err(PipelineError::from)??;
    tracing::info!(
        pages_total,
        pages_failed,
        bytes = data.len(),
        stage = %RequestStage::Packaged,
        "Request stage reached"
    );

    let file_name = file_name.replace('"', "");
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .header(PAGES_TOTAL_HEADER, pages_total)
        .header(PAGES_FAILED_HEADER, pages_failed)
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(stage = %RequestStage::Delivered, "Request stage reached");
    Ok(response)
}

// ============================================================================
// Text
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TranslateTextRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateTextResponse {
    pub original_text: String,
    pub translated_text: String,
    pub language: &'static str,
    pub outcome: TranslationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

/// Translate a text snippet
pub async fn translate_text(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TranslateTextRequest>, JsonRejection>,
) -> Result<Json<TranslateTextResponse>> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    if request.text.trim().is_empty() {
        return Err(AppError::InvalidRequest("No text provided".to_string()));
    }

    let translation = state.translator().translate(&request.text).await?;

    Ok(Json(TranslateTextResponse {
        original_text: request.text,
        translated_text: translation.text,
        language: "Arabic",
        outcome: translation.outcome,
        source_language: translation.source_language,
    }))
}

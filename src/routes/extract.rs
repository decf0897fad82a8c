//! Extraction routes
//!
//! Endpoints that only unpack an upload, reporting what it contains:
//! - POST /extract-pdf - Rasterize the pages of a PDF
//! - POST /extract-archive - List the images of a ZIP/CBZ or RAR/CBR archive

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use super::form::read_single_file;
use crate::error::Result;
use crate::state::AppState;
use crate::upload::{RequestWorkspace, UploadError, UploadKind, ValidatedUpload};

#[derive(Debug, Serialize)]
pub struct ExtractPdfResponse {
    pub pdf_name: String,
    pub extracted_pages: usize,
    pub page_files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractArchiveResponse {
    pub archive_name: String,
    pub extracted_images: usize,
    pub image_files: Vec<String>,
}

/// Rasterize every page of a PDF
pub async fn extract_pdf(State(state): State<AppState>, multipart: Multipart) -> Result<Json<ExtractPdfResponse>> {
    let upload = read_upload(&state, multipart, |kind| matches!(kind, UploadKind::Pdf), "PDF").await?;
    let pdf_name = upload.file.file_name.clone();

    let pages = unpack(&state, upload).await?;
    let page_files: Vec<String> = pages
        .iter()
        .map(|(index, _)| format!("page_{:03}.png", index + 1))
        .collect();

    tracing::info!(file_name = %pdf_name, pages = page_files.len(), "Extracted PDF pages");

    Ok(Json(ExtractPdfResponse {
        pdf_name,
        extracted_pages: page_files.len(),
        page_files,
    }))
}

/// List the readable images of an archive
pub async fn extract_archive(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractArchiveResponse>> {
    let upload = read_upload(&state, multipart, |kind| matches!(kind, UploadKind::Archive(_)), "archive").await?;
    let archive_name = upload.file.file_name.clone();

    let image_files: Vec<String> = unpack(&state, upload).await?.into_iter().map(|(_, name)| name).collect();

    tracing::info!(file_name = %archive_name, images = image_files.len(), "Extracted archive images");

    Ok(Json(ExtractArchiveResponse {
        archive_name,
        extracted_images: image_files.len(),
        image_files,
    }))
}

async fn read_upload(
    state: &AppState,
    multipart: Multipart,
    accepts: impl Fn(&UploadKind) -> bool,
    expected: &str,
) -> Result<ValidatedUpload> {
    let file = read_single_file(multipart, &["file"], state.config().upload.max_file_size).await?;
    let upload = state.validator().validate(file)?;
    if !accepts(&upload.kind) {
        return Err(UploadError::UnsupportedFormat(format!(
            "{} is not a {}",
            upload.file.file_name, expected
        ))
        .into());
    }
    Ok(upload)
}

/// Index and name of every page
async fn unpack(state: &AppState, upload: ValidatedUpload) -> Result<Vec<(usize, String)>> {
    let workspace = Arc::new(RequestWorkspace::create(state.config().upload.temp_dir.as_deref())?);
    let pages = state.pipeline().unpack_all(upload, workspace).await?;
    Ok(pages.into_iter().map(|page| (page.index, page.name)).collect())
}

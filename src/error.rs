//! Error types for the translation service

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::translate::TranslationError;
use crate::unpack::UnpackError;
use crate::upload::UploadError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Unpack(#[from] UnpackError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("Request body exceeds the {max_mb}MB limit")]
    BodyTooLarge { max_mb: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Map a multipart failure, recognising the body size limit
    pub fn from_multipart(error: MultipartError, max_file_size: u64) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::BodyTooLarge {
                max_mb: max_file_size / (1024 * 1024),
            }
        } else {
            AppError::InvalidRequest(error.body_text())
        }
    }

    /// Stable name of the error, returned as `kind`
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Upload(e) => match e {
                UploadError::MissingFile => "MissingFile",
                UploadError::FileTooLarge { .. } => "FileTooLarge",
                UploadError::UnsupportedFormat(_) => "UnsupportedFormat",
                UploadError::TooManyFiles { .. } => "TooManyFiles",
            },
            AppError::Unpack(e) | AppError::Pipeline(PipelineError::Unpack(e)) => match e {
                UnpackError::CorruptArchive(_) => "CorruptArchive",
                UnpackError::UnsupportedEntry(_) => "UnsupportedEntry",
                UnpackError::UnsupportedFormat(_) => "UnsupportedFormat",
                UnpackError::Io(_) => "Internal",
            },
            AppError::Pipeline(e) => match e {
                PipelineError::NoContentProcessed { .. } => "NoContentProcessed",
                _ => "Internal",
            },
            AppError::Translation(e) => match e {
                TranslationError::Timeout(_) => "UpstreamTimeout",
                TranslationError::UnknownProvider(_) => "InvalidRequest",
                _ => "TranslationUnavailable",
            },
            AppError::BodyTooLarge { .. } => "FileTooLarge",
            AppError::InvalidRequest(_) => "InvalidRequest",
            AppError::Internal(_) | AppError::Io(_) => "Internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Upload(e) => e.status_code(),
            AppError::Unpack(e) => e.status_code(),
            AppError::Pipeline(e) => e.status_code(),
            AppError::Translation(e) => e.status_code(),
            AppError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        let message = if status.is_server_error() {
            tracing::error!(kind, "{}", self);
            match &self {
                AppError::Internal(_) | AppError::Io(_) => "An internal error occurred".to_string(),
                _ => self.to_string(),
            }
        } else {
            tracing::debug!(kind, "Request rejected: {}", self);
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: message,
            kind,
        });

        (status, body).into_response()
    }
}

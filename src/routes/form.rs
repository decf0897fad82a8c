//! Multipart form reading shared by the upload endpoints

use axum::extract::Multipart;

use crate::error::{AppError, Result};
use crate::upload::{UploadError, UploadedFile};

/// Read every file field whose name is in `field_names`
///
/// Reading stops with [`UploadError::TooManyFiles`] once more than
/// `max_files` files have been seen.
pub async fn read_files(
    mut multipart: Multipart,
    field_names: &[&str],
    max_files: usize,
    max_file_size: u64,
) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_multipart(e, max_file_size))?
    {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());

        tracing::debug!(
            "Received field: name='{}', filename={:?}, content_type={:?}",
            name,
            filename,
            content_type
        );

        if !field_names.contains(&name.as_str()) {
            continue;
        }

        if files.len() == max_files {
            return Err(UploadError::TooManyFiles {
                count: files.len() + 1,
                max: max_files,
            }
            .into());
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::from_multipart(e, max_file_size))?;

        tracing::debug!("Read {} bytes of file data", data.len());

        files.push(UploadedFile::new(filename.unwrap_or_default(), content_type, data));
    }

    Ok(files)
}

/// Read the single file of an upload form
pub async fn read_single_file(
    multipart: Multipart,
    field_names: &[&str],
    max_file_size: u64,
) -> Result<UploadedFile> {
    read_files(multipart, field_names, 1, max_file_size)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| UploadError::MissingFile.into())
}

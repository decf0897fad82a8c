//! Image extraction from ZIP/CBZ and RAR/CBR archives
//!
//! Entries are visited in archive-listing order. Directories and non-image
//! entries are skipped silently, unreadable image entries with a warning.

use std::io::{Cursor, Read};

use axum::body::Bytes;
use image::DynamicImage;
use zip::ZipArchive;

use super::types::{is_image_entry, PageImage, UnpackError};

/// Entries larger than this when uncompressed are skipped
pub const MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

fn decode_entry(name: &str, data: &[u8]) -> Option<DynamicImage> {
    match image::load_from_memory(data) {
        Ok(image) => Some(image),
        Err(e) => {
            tracing::warn!(entry = %name, "Skipping undecodable archive entry: {}", e);
            None
        }
    }
}

// ============================================================================
// ZIP / CBZ
// ============================================================================

/// Lazy sequence of images stored in a ZIP archive
pub struct ZipPages {
    archive: ZipArchive<Cursor<Bytes>>,
    next_entry: usize,
    next_page: usize,
}

impl ZipPages {
    pub fn open(data: Bytes) -> Result<Self, UnpackError> {
        let archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| UnpackError::CorruptArchive(format!("Failed to open ZIP: {}", e)))?;

        tracing::debug!(entries = archive.len(), "Opened ZIP archive");

        Ok(Self {
            archive,
            next_entry: 0,
            next_page: 0,
        })
    }

    fn read_entry(&mut self, index: usize) -> Option<(String, Vec<u8>)> {
        let mut entry = match self.archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(entry = index, "Skipping unreadable ZIP entry: {}", e);
                return None;
            }
        };

        let name = entry.name().to_string();
        if entry.is_dir() || !is_image_entry(&name) {
            tracing::debug!(entry = %name, "Skipping non-image ZIP entry");
            return None;
        }
        if entry.size() > MAX_ENTRY_SIZE {
            tracing::warn!(entry = %name, size = entry.size(), "Skipping oversized ZIP entry");
            return None;
        }

        let mut data = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut data) {
            tracing::warn!(entry = %name, "Skipping unreadable ZIP entry: {}", e);
            return None;
        }

        Some((name, data))
    }
}

impl Iterator for ZipPages {
    type Item = PageImage;

    fn next(&mut self) -> Option<PageImage> {
        while self.next_entry < self.archive.len() {
            let index = self.next_entry;
            self.next_entry += 1;

            let Some((name, data)) = self.read_entry(index) else {
                continue;
            };
            let Some(image) = decode_entry(&name, &data) else {
                continue;
            };

            let page = PageImage {
                index: self.next_page,
                name,
                image,
            };
            self.next_page += 1;
            return Some(page);
        }
        None
    }
}

// ============================================================================
// RAR / CBR
// ============================================================================

#[cfg(feature = "rar")]
pub use rar::RarPages;

#[cfg(feature = "rar")]
mod rar {
    use std::path::Path;

    use unrar::{Archive, CursorBeforeHeader, OpenArchive, Process};

    use super::{decode_entry, is_image_entry, PageImage, UnpackError, MAX_ENTRY_SIZE};

    /// Lazy sequence of images stored in a RAR archive
    ///
    /// unrar reads from disk, so the archive must first be written into the
    /// request workspace.
    pub struct RarPages {
        archive: Option<OpenArchive<Process, CursorBeforeHeader>>,
        next_page: usize,
    }

    impl RarPages {
        pub fn open(path: &Path) -> Result<Self, UnpackError> {
            let archive = Archive::new(path)
                .open_for_processing()
                .map_err(|e| UnpackError::CorruptArchive(format!("Failed to open RAR: {}", e)))?;

            Ok(Self {
                archive: Some(archive),
                next_page: 0,
            })
        }
    }

    impl Iterator for RarPages {
        type Item = PageImage;

        fn next(&mut self) -> Option<PageImage> {
            loop {
                let archive = self.archive.take()?;
                let header = match archive.read_header() {
                    Ok(Some(header)) => header,
                    Ok(None) => return None,
                    Err(e) => {
                        tracing::warn!("Stopping at unreadable RAR header: {}", e);
                        return None;
                    }
                };

                let entry = header.entry();
                let name = entry.filename.to_string_lossy().to_string();
                let wanted = entry.is_file()
                    && is_image_entry(&name)
                    && (entry.unpacked_size as u64) <= MAX_ENTRY_SIZE;

                if !wanted {
                    tracing::debug!(entry = %name, "Skipping RAR entry");
                    match header.skip() {
                        Ok(rest) => self.archive = Some(rest),
                        Err(e) => {
                            tracing::warn!(entry = %name, "Stopping at unskippable RAR entry: {}", e);
                            return None;
                        }
                    }
                    continue;
                }

                let data = match header.read() {
                    Ok((data, rest)) => {
                        self.archive = Some(rest);
                        data
                    }
                    Err(e) => {
                        // The cursor is lost once a read fails
                        tracing::warn!(entry = %name, "Stopping at unreadable RAR entry: {}", e);
                        return None;
                    }
                };

                if let Some(image) = decode_entry(&name, &data) {
                    let page = PageImage {
                        index: self.next_page,
                        name,
                        image,
                    };
                    self.next_page += 1;
                    return Some(page);
                }
            }
        }
    }
}

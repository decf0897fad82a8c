//! Result packaging
//!
//! Processed pages are stored as PNG entries of a deflated ZIP. Entry names
//! sort lexically in page order.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::types::{PipelineError, PipelineOutput};

/// Entry name for a single-image upload
pub fn single_entry_name(stem: &str) -> String {
    format!("{}_translated.png", stem)
}

/// Entry name for page `index` (0-based) of a multi-page upload
pub fn page_entry_name(index: usize) -> String {
    format!("page_{:03}_translated.png", index + 1)
}

/// Download name of a multi-file archive
pub const BATCH_ARCHIVE_NAME: &str = "translated_images.zip";

/// Download name of a single upload's archive
pub fn archive_file_name(stem: &str) -> String {
    format!("{}_translated.zip", stem)
}

/// ZIP archive of processed pages, built in memory
pub struct ResultArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    pages_total: usize,
    pages_failed: usize,
}

impl ResultArchive {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            pages_total: 0,
            pages_failed: 0,
        }
    }

    pub fn pages_total(&self) -> usize {
        self.pages_total
    }

    pub fn pages_failed(&self) -> usize {
        self.pages_failed
    }

    /// Add every page of one upload
    ///
    /// With `prefix` set, entry names start with the upload stem so several
    /// uploads can share one archive.
    pub fn add_output(
        &mut self,
        stem: &str,
        output: &PipelineOutput,
        multi_page: bool,
        prefix: bool,
    ) -> Result<(), PipelineError> {
        for page in &output.pages {
            let name = if multi_page {
                let name = page_entry_name(page.index);
                if prefix {
                    format!("{}_{}", stem, name)
                } else {
                    name
                }
            } else {
                single_entry_name(stem)
            };

            if page.png.is_empty() {
                tracing::error!(entry = %name, "Page has no encoded image, leaving it out");
                continue;
            }

            self.add_entry(&name, &page.png)?;
            self.pages_total += 1;
            if page.state.is_failed() {
                self.pages_failed += 1;
            }
        }
        Ok(())
    }

    /// Add one entry, renaming it when the name is taken
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<String, PipelineError> {
        let name = self.unique_name(name);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        self.writer.start_file(name.as_str(), options)?;
        self.writer
            .write_all(data)
            .map_err(|e| PipelineError::Packaging(e.to_string()))?;

        self.names.insert(name.clone());
        Ok(name)
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.names.contains(name) {
            return name.to_string();
        }
        let (base, ext) = match name.rsplit_once('.') {
            Some((base, ext)) => (base, format!(".{}", ext)),
            None => (name, String::new()),
        };
        (2..)
            .map(|n| format!("{}_{}{}", base, n, ext))
            .find(|candidate| !self.names.contains(candidate))
            .unwrap_or_else(|| name.to_string())
    }

    pub fn finish(self) -> Result<Vec<u8>, PipelineError> {
        Ok(self.writer.finish()?.into_inner())
    }
}

impl Default for ResultArchive {
    fn default() -> Self {
        Self::new()
    }
}

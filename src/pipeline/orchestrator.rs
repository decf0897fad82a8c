//! Per-upload orchestration
//!
//! Unpacking runs on a blocking thread and feeds pages through a bounded
//! channel. Pages are processed a few at a time and collected in upload
//! order, whatever order they finish in.

use std::io::Cursor;
use std::sync::Arc;

use futures::{stream, StreamExt};
use image::DynamicImage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::{
    FailureKind, PageState, PipelineError, PipelineOutput, ProcessedPage, RequestStage,
    TranslatedDetection,
};
use crate::config::Config;
use crate::imaging::{Inpainter, TextPlacement, TextRenderer};
use crate::ocr::TextExtractor;
use crate::translate::{TranslationOutcome, Translator};
use crate::unpack::{ArchiveUnpacker, PageImage};
use crate::upload::{RequestWorkspace, ValidatedUpload};

/// Tuning knobs of the orchestrator
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub page_concurrency: usize,
    pub translation_concurrency: usize,
    pub bbox_expansion_ratio: f32,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_concurrency: config.pipeline.page_concurrency.max(1),
            translation_concurrency: config.translation.concurrency.max(1),
            bbox_expansion_ratio: config.ocr.bbox_expansion_ratio,
        }
    }
}

/// Composes unpacking, OCR, translation, inpainting and rendering
pub struct Pipeline {
    settings: PipelineSettings,
    unpacker: ArchiveUnpacker,
    extractor: Arc<TextExtractor>,
    translator: Arc<Translator>,
    inpainter: Arc<dyn Inpainter>,
    renderer: Arc<dyn TextRenderer>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        unpacker: ArchiveUnpacker,
        extractor: Arc<TextExtractor>,
        translator: Arc<Translator>,
        inpainter: Arc<dyn Inpainter>,
        renderer: Arc<dyn TextRenderer>,
    ) -> Self {
        Self {
            settings,
            unpacker,
            extractor,
            translator,
            inpainter,
            renderer,
        }
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Decode every page of an upload without processing it
    pub async fn unpack_all(
        &self,
        upload: ValidatedUpload,
        workspace: Arc<RequestWorkspace>,
    ) -> Result<Vec<PageImage>, PipelineError> {
        let unpacker = self.unpacker.clone();
        let pages = tokio::task::spawn_blocking(move || {
            unpacker.open(&upload, &workspace)?.collect_all()
        })
        .await??;
        Ok(pages)
    }

    /// Run every page of an upload through the pipeline
    ///
    /// Pages that fail are passed through unmodified. Fails when the upload
    /// cannot be unpacked, when no page could be processed, or when `cancel`
    /// fires.
    pub async fn process(
        &self,
        upload: ValidatedUpload,
        workspace: Arc<RequestWorkspace>,
        cancel: CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let file_name = upload.file.file_name.clone();
        let (tx, mut rx) = mpsc::channel::<PageImage>(self.settings.page_concurrency * 2);

        let unpacker = self.unpacker.clone();
        let producer_cancel = cancel.clone();
        let producer = tokio::task::spawn_blocking(move || {
            let mut pages = unpacker.open(&upload, &workspace)?;
            for page in pages.by_ref() {
                if producer_cancel.is_cancelled() {
                    tracing::debug!("Unpacking stopped by cancellation");
                    break;
                }
                if tx.blocking_send(page).is_err() {
                    break;
                }
            }
            pages.finish()
        });

        let pages = stream::poll_fn(move |cx| rx.poll_recv(cx))
            .map(|page| self.process_page(page))
            .buffered(self.settings.page_concurrency)
            .collect::<Vec<ProcessedPage>>();

        let pages = tokio::select! {
            pages = pages => pages,
            _ = cancel.cancelled() => {
                tracing::info!(file_name = %file_name, "Request cancelled");
                return Err(PipelineError::Cancelled);
            }
        };

        let page_count = producer.await??;
        tracing::info!(
            file_name = %file_name,
            pages = page_count,
            stage = %RequestStage::Unpacked,
            "Request stage reached"
        );

        let output = PipelineOutput { pages };
        let failed = output.failed();
        if failed == output.total() {
            let upstream_only = output
                .pages
                .iter()
                .all(|p| p.state == PageState::Failed(FailureKind::Ocr));
            return Err(PipelineError::NoContentProcessed {
                pages: failed,
                upstream_only,
            });
        }
        if failed > 0 {
            tracing::warn!(file_name = %file_name, failed, total = output.total(), "Some pages failed");
        }
        let fallbacks: usize = output.pages.iter().map(|p| p.fallbacks).sum();
        if fallbacks > 0 {
            tracing::warn!(file_name = %file_name, fallbacks, "Some text was drawn untranslated");
        }

        Ok(output)
    }

    /// Process one page; never fails, failures pass the page through
    pub async fn process_page(&self, page: PageImage) -> ProcessedPage {
        let PageImage { index, name, image } = page;
        let image = Arc::new(image);
        let (width, height) = (image.width(), image.height());
        let mut state = PageState::Pending;

        let detections = match self.extractor.extract(&image).await {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!(page = index + 1, state = %state, "OCR failed: {}", e);
                return finish_page(index, name, image, PageState::Failed(FailureKind::Ocr)).await;
            }
        };
        state = PageState::Extracted;
        tracing::debug!(page = index + 1, detections = detections.len(), state = %state, "Page progressed");

        if detections.is_empty() {
            return finish_page(index, name, image, PageState::Rendered).await;
        }

        let ratio = self.settings.bbox_expansion_ratio;
        let translated: Vec<TranslatedDetection> = stream::iter(detections)
            .map(|detection| async move {
                let translation = self.translator.translate_or_original(&detection.text).await;
                TranslatedDetection {
                    bbox: detection.bbox.expand(ratio, width, height),
                    detection,
                    translated_text: translation.text,
                    outcome: translation.outcome,
                }
            })
            .buffered(self.settings.translation_concurrency)
            .collect()
            .await;
        let fallbacks = translated
            .iter()
            .filter(|t| t.outcome == TranslationOutcome::Fallback)
            .count();
        state = PageState::Translated;
        tracing::debug!(
            page = index + 1,
            detections = translated.len(),
            fallbacks,
            state = %state,
            "Page progressed"
        );

        log_overlaps(index, &translated);

        let boxes: Vec<_> = translated.iter().map(|t| t.bbox).collect();
        let placements: Vec<TextPlacement> = translated.iter().map(|t| t.placement()).collect();

        let inpainter = self.inpainter.clone();
        let source = image.clone();
        let inpainted = match tokio::task::spawn_blocking(move || inpainter.inpaint(&source, &boxes)).await {
            Ok(Ok(inpainted)) => inpainted,
            Ok(Err(e)) => {
                tracing::warn!(page = index + 1, state = %state, "Inpainting failed: {}", e);
                return finish_page(index, name, image, PageState::Failed(FailureKind::Inpainting)).await;
            }
            Err(e) => {
                tracing::error!(page = index + 1, state = %state, "Inpainting task failed: {}", e);
                return finish_page(index, name, image, PageState::Failed(FailureKind::Inpainting)).await;
            }
        };
        state = PageState::Inpainted;
        tracing::debug!(page = index + 1, state = %state, "Page progressed");

        let renderer = self.renderer.clone();
        let rendered = match tokio::task::spawn_blocking(move || renderer.render(&inpainted, &placements)).await {
            Ok(Ok(rendered)) => rendered,
            Ok(Err(e)) => {
                tracing::warn!(page = index + 1, state = %state, "Rendering failed: {}", e);
                return finish_page(index, name, image, PageState::Failed(FailureKind::Rendering)).await;
            }
            Err(e) => {
                tracing::error!(page = index + 1, state = %state, "Rendering task failed: {}", e);
                return finish_page(index, name, image, PageState::Failed(FailureKind::Rendering)).await;
            }
        };

        match encode_png(Arc::new(rendered)).await {
            Ok(png) => {
                state = PageState::Rendered;
                tracing::debug!(page = index + 1, state = %state, "Page progressed");
                ProcessedPage {
                    index,
                    name,
                    state,
                    png,
                    detections: translated.len(),
                    fallbacks,
                    width,
                    height,
                }
            }
            Err(e) => {
                tracing::warn!(page = index + 1, state = %state, "Encoding failed: {}", e);
                finish_page(index, name, image, PageState::Failed(FailureKind::Encoding)).await
            }
        }
    }
}

/// Encode `image` unchanged as the page result
async fn finish_page(index: usize, name: String, image: Arc<DynamicImage>, state: PageState) -> ProcessedPage {
    let (width, height) = (image.width(), image.height());
    let png = match encode_png(image).await {
        Ok(png) => png,
        Err(e) => {
            tracing::error!(page = index + 1, "Failed to encode page: {}", e);
            Vec::new()
        }
    };

    ProcessedPage {
        index,
        name,
        state,
        png,
        detections: 0,
        fallbacks: 0,
        width,
        height,
    }
}

async fn encode_png(image: Arc<DynamicImage>) -> Result<Vec<u8>, PipelineError> {
    tokio::task::spawn_blocking(move || {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .map_err(|e| PipelineError::Packaging(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    })
    .await?
}

/// Overlapping boxes are drawn in detection order, later over earlier
fn log_overlaps(index: usize, translated: &[TranslatedDetection]) {
    let mut overlaps = 0usize;
    for (i, a) in translated.iter().enumerate() {
        overlaps += translated[i + 1..]
            .iter()
            .filter(|b| a.bbox.intersects(&b.bbox))
            .count();
    }
    if overlaps > 0 {
        tracing::debug!(page = index + 1, overlaps, "Overlapping text boxes");
    }
}

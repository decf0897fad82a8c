//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::imaging::{ArabicRenderer, FastMarchingInpainter, ImagingError, Inpainter, TextRenderer};
use crate::ocr::{TesseractProvider, TextDetector, TextExtractor, TextExtractorConfig};
use crate::pipeline::{Pipeline, PipelineSettings};
use crate::translate::{build_providers, TranslationProvider, Translator, TranslatorConfig};
use crate::unpack::ArchiveUnpacker;
use crate::upload::FileValidator;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize renderer: {0}")]
    Renderer(#[from] ImagingError),
}

/// Backends the pipeline is built from
///
/// Production code uses [`Services::from_config`]; tests swap in fakes.
pub struct Services {
    pub detector: Arc<dyn TextDetector>,
    pub providers: Vec<Arc<dyn TranslationProvider>>,
    pub inpainter: Arc<dyn Inpainter>,
    pub renderer: Arc<dyn TextRenderer>,
}

impl Services {
    /// Tesseract, the configured translation providers, and the font from
    /// `font_path`
    ///
    /// Fails when the font cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let renderer = ArabicRenderer::from_file(
            &config.render.font_path,
            config.render.min_font_size,
            config.render.max_font_size,
        )?;

        Ok(Self {
            detector: Arc::new(TesseractProvider::new(
                &config.ocr.tesseract_path,
                &config.ocr.languages,
            )),
            providers: build_providers(&config.translation),
            inpainter: Arc::new(FastMarchingInpainter::new(config.render.inpaint_radius)),
            renderer: Arc::new(renderer),
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    validator: FileValidator,
    pipeline: Pipeline,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, services: Services) -> Self {
        let extractor = Arc::new(TextExtractor::new(
            TextExtractorConfig::from(&config.ocr),
            services.detector,
        ));
        let translator = Arc::new(Translator::new(
            TranslatorConfig::new(&config.translation, &config.ocr.languages),
            services.providers,
        ));

        let pipeline = Pipeline::new(
            PipelineSettings::from(&config),
            ArchiveUnpacker::new(&config.upload),
            extractor,
            translator,
            services.inpainter,
            services.renderer,
        );

        Self {
            inner: Arc::new(AppStateInner {
                validator: FileValidator::new(&config.upload),
                config,
                pipeline,
            }),
        }
    }

    /// Build the production state from configuration
    pub fn from_config(config: Config) -> Result<Self, StateError> {
        let services = Services::from_config(&config)?;
        Ok(Self::new(config, services))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn validator(&self) -> &FileValidator {
        &self.inner.validator
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn translator(&self) -> &Translator {
        self.inner.pipeline.translator()
    }
}

//! Configuration management for the translation service
//!
//! Every option is read once from the environment in [`Config::from_env`]
//! and handed to components at construction time.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::translate::ProviderKind;

/// Environment variables recognized by [`Config::from_env`]
pub const ENV_VARS: &[&str] = &[
    "SERVER_HOST",
    "SERVER_PORT",
    "CORS_ORIGINS",
    "MAX_FILE_SIZE",
    "MAX_BATCH_SIZE",
    "MAX_PAGES",
    "SUPPORTED_FORMATS",
    "TEMP_DIR",
    "PDF_DPI",
    "OCR_CONFIDENCE_THRESHOLD",
    "OCR_LANGUAGES",
    "OCR_TIMEOUT_SECS",
    "TESSERACT_PATH",
    "MAX_IMAGE_DIMENSION",
    "MIN_TEXT_LENGTH",
    "BBOX_EXPANSION_RATIO",
    "TRANSLATION_TARGET_LANG",
    "TRANSLATION_PROVIDERS",
    "TRANSLATION_TIMEOUT_SECS",
    "TRANSLATION_CONCURRENCY",
    "GOOGLE_TRANSLATE_URL",
    "OLLAMA_URL",
    "OLLAMA_MODEL",
    "FONT_PATH",
    "MIN_FONT_SIZE",
    "MAX_FONT_SIZE",
    "INPAINT_RADIUS",
    "PAGE_CONCURRENCY",
    "DEBUG",
];

/// Maximum upload size: 200MB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Extensions accepted when `SUPPORTED_FORMATS` is not set
pub const DEFAULT_SUPPORTED_FORMATS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "tiff", "tif", "gif", "pdf", "zip", "cbz", "rar", "cbr",
];

/// OCR languages (ISO 639-1) used when `OCR_LANGUAGES` is not set
pub const DEFAULT_OCR_LANGUAGES: &[&str] =
    &["en", "ar", "fr", "es", "de", "it", "pt", "ru", "ja", "ko", "zh"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub ocr: OcrConfig,
    pub translation: TranslationConfig,
    pub render: RenderConfig,
    pub pipeline: PipelineConfig,
    /// Verbose logging requested through `DEBUG`
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes (inclusive)
    pub max_file_size: u64,
    /// Maximum number of files in one batch request
    pub max_batch_size: usize,
    /// Maximum number of pages taken from one PDF or archive
    pub max_pages: usize,
    /// Lowercase file extensions accepted by the validator
    pub supported_formats: Vec<String>,
    /// Root for per-request workspaces (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    /// Resolution used to rasterize PDF pages
    pub pdf_dpi: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Detections below this confidence are dropped
    pub confidence_threshold: f32,
    /// ISO 639-1 codes of the languages to recognize
    pub languages: Vec<String>,
    pub timeout_secs: u64,
    /// Path or name of the tesseract binary
    pub tesseract_path: String,
    /// Images are downscaled so neither side exceeds this before OCR
    pub max_image_dimension: u32,
    /// Detections with fewer characters are dropped
    pub min_text_length: usize,
    /// Fraction by which detection boxes grow before erasing and drawing
    pub bbox_expansion_ratio: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    pub target_language: String,
    /// Providers tried in order
    pub providers: Vec<ProviderKind>,
    pub timeout_secs: u64,
    /// Concurrent translation calls per page
    pub concurrency: usize,
    pub google_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub font_path: PathBuf,
    pub min_font_size: f32,
    pub max_font_size: f32,
    /// Neighbourhood radius of the inpainting fill, in pixels
    pub inpaint_radius: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pages of one upload processed at the same time
    pub page_concurrency: usize,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                cors_origins: vec!["*".to_string()],
            },
            upload: UploadConfig {
                max_file_size: DEFAULT_MAX_FILE_SIZE,
                max_batch_size: 10,
                max_pages: 500,
                supported_formats: DEFAULT_SUPPORTED_FORMATS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                temp_dir: None,
                pdf_dpi: 150.0,
            },
            ocr: OcrConfig {
                confidence_threshold: 0.3,
                languages: DEFAULT_OCR_LANGUAGES.iter().map(|s| s.to_string()).collect(),
                timeout_secs: 60,
                tesseract_path: "tesseract".to_string(),
                max_image_dimension: 2048,
                min_text_length: 2,
                bbox_expansion_ratio: 0.15,
            },
            translation: TranslationConfig {
                target_language: "ar".to_string(),
                providers: vec![ProviderKind::Google, ProviderKind::Ollama],
                timeout_secs: 10,
                concurrency: 4,
                google_url: "https://translate.googleapis.com".to_string(),
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llama3".to_string(),
            },
            render: RenderConfig {
                font_path: PathBuf::from("fonts/Amiri-Regular.ttf"),
                min_font_size: 8.0,
                max_font_size: 100.0,
                inpaint_radius: 3,
            },
            pipeline: PipelineConfig {
                page_concurrency: 2,
            },
            debug: false,
        }
    }
}

impl Config {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset, then validate it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let config = Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env_parse("SERVER_PORT", defaults.server.port),
                cors_origins: env_list("CORS_ORIGINS").unwrap_or(defaults.server.cors_origins),
            },
            upload: UploadConfig {
                max_file_size: env_parse("MAX_FILE_SIZE", defaults.upload.max_file_size),
                max_batch_size: env_parse("MAX_BATCH_SIZE", defaults.upload.max_batch_size),
                max_pages: env_parse("MAX_PAGES", defaults.upload.max_pages),
                supported_formats: env_list("SUPPORTED_FORMATS")
                    .map(|formats| formats.into_iter().map(|f| f.to_lowercase()).collect())
                    .unwrap_or(defaults.upload.supported_formats),
                temp_dir: env::var("TEMP_DIR").ok().map(PathBuf::from),
                pdf_dpi: env_parse("PDF_DPI", defaults.upload.pdf_dpi),
            },
            ocr: OcrConfig {
                confidence_threshold: env_parse(
                    "OCR_CONFIDENCE_THRESHOLD",
                    defaults.ocr.confidence_threshold,
                ),
                languages: env_list("OCR_LANGUAGES").unwrap_or(defaults.ocr.languages),
                timeout_secs: env_parse("OCR_TIMEOUT_SECS", defaults.ocr.timeout_secs),
                tesseract_path: env::var("TESSERACT_PATH").unwrap_or(defaults.ocr.tesseract_path),
                max_image_dimension: env_parse(
                    "MAX_IMAGE_DIMENSION",
                    defaults.ocr.max_image_dimension,
                ),
                min_text_length: env_parse("MIN_TEXT_LENGTH", defaults.ocr.min_text_length),
                bbox_expansion_ratio: env_parse(
                    "BBOX_EXPANSION_RATIO",
                    defaults.ocr.bbox_expansion_ratio,
                ),
            },
            translation: TranslationConfig {
                target_language: env::var("TRANSLATION_TARGET_LANG")
                    .unwrap_or(defaults.translation.target_language),
                providers: match env_list("TRANSLATION_PROVIDERS") {
                    Some(names) => parse_providers(&names)?,
                    None => defaults.translation.providers,
                },
                timeout_secs: env_parse("TRANSLATION_TIMEOUT_SECS", defaults.translation.timeout_secs),
                concurrency: env_parse("TRANSLATION_CONCURRENCY", defaults.translation.concurrency),
                google_url: env::var("GOOGLE_TRANSLATE_URL")
                    .unwrap_or(defaults.translation.google_url),
                ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.translation.ollama_url),
                ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.translation.ollama_model),
            },
            render: RenderConfig {
                font_path: env::var("FONT_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.render.font_path),
                min_font_size: env_parse("MIN_FONT_SIZE", defaults.render.min_font_size),
                max_font_size: env_parse("MAX_FONT_SIZE", defaults.render.max_font_size),
                inpaint_radius: env_parse("INPAINT_RADIUS", defaults.render.inpaint_radius),
            },
            pipeline: PipelineConfig {
                page_concurrency: env_parse("PAGE_CONCURRENCY", defaults.pipeline.page_concurrency),
            },
            debug: env::var("DEBUG").is_ok(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants between settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn ensure(condition: bool, message: &str) -> Result<(), ConfigError> {
            if condition {
                Ok(())
            } else {
                Err(ConfigError::Invalid(message.to_string()))
            }
        }

        ensure(self.upload.max_file_size > 0, "MAX_FILE_SIZE must be positive")?;
        ensure(self.upload.max_batch_size > 0, "MAX_BATCH_SIZE must be positive")?;
        ensure(self.upload.max_pages > 0, "MAX_PAGES must be positive")?;
        ensure(!self.upload.supported_formats.is_empty(), "SUPPORTED_FORMATS must not be empty")?;
        ensure(self.upload.pdf_dpi > 0.0, "PDF_DPI must be positive")?;
        ensure(
            (0.0..=1.0).contains(&self.ocr.confidence_threshold),
            "OCR_CONFIDENCE_THRESHOLD must be between 0 and 1",
        )?;
        ensure(!self.ocr.languages.is_empty(), "OCR_LANGUAGES must not be empty")?;
        ensure(self.ocr.max_image_dimension > 0, "MAX_IMAGE_DIMENSION must be positive")?;
        ensure(
            self.ocr.bbox_expansion_ratio >= 0.0,
            "BBOX_EXPANSION_RATIO must not be negative",
        )?;
        ensure(
            self.translation.target_language == "ar",
            "TRANSLATION_TARGET_LANG must be 'ar': rendering is Arabic-specific",
        )?;
        ensure(!self.translation.providers.is_empty(), "TRANSLATION_PROVIDERS must not be empty")?;
        ensure(self.translation.concurrency > 0, "TRANSLATION_CONCURRENCY must be positive")?;
        ensure(self.render.min_font_size > 0.0, "MIN_FONT_SIZE must be positive")?;
        ensure(
            self.render.max_font_size > self.render.min_font_size,
            "MAX_FONT_SIZE must be greater than MIN_FONT_SIZE",
        )?;
        ensure(self.pipeline.page_concurrency > 0, "PAGE_CONCURRENCY must be positive")?;
        Ok(())
    }

    /// Maximum upload size in whole megabytes, for display
    pub fn max_file_size_mb(&self) -> u64 {
        self.upload.max_file_size / (1024 * 1024)
    }
}

/// Default tracing filter when `RUST_LOG` is not set
///
/// Needed before the configuration is parsed, so parse warnings are logged.
pub fn log_filter(debug: bool) -> &'static str {
    if debug {
        "arabic_image_translator=debug,tower_http=debug"
    } else {
        "arabic_image_translator=info,tower_http=info"
    }
}

/// Parse an environment variable, keeping the default when unset or invalid
fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a comma-separated list, `None` when unset or empty
fn env_list(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn parse_providers(names: &[String]) -> Result<Vec<ProviderKind>, ConfigError> {
    names
        .iter()
        .map(|name| {
            name.parse::<ProviderKind>()
                .map_err(|_| ConfigError::Invalid(format!("Unknown translation provider: {}", name)))
        })
        .collect()
}

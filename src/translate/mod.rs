//! Translation Module
//!
//! Translates OCR text to Arabic.
//!
//! Supports multiple backends, tried in the configured order:
//! - Google Translate web endpoint
//! - Ollama (local LLM)
//!
//! Text already in Arabic is never sent to a provider.

mod provider;
mod service;
mod types;

pub use provider::{build_providers, parse_google_response, GoogleProvider, OllamaProvider, TranslationProvider};
pub use service::{clean_text, Translator, TranslatorConfig};
pub use types::{ProviderKind, ProviderTranslation, Translation, TranslationError, TranslationOutcome};

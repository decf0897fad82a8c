//! Translation types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Translation backends that can be enabled through configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Translate web endpoint
    Google,
    /// Local Ollama model
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "ollama" => Ok(Self::Ollama),
            other => Err(TranslationError::UnknownProvider(other.to_string())),
        }
    }
}

/// How a translated text came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationOutcome {
    /// A provider translated the text
    Translated,
    /// Already Arabic, or nothing left to translate
    PassedThrough,
    /// Every provider failed; the cleaned original is used instead
    Fallback,
}

/// Result of translating one text
#[derive(Debug, Clone, Serialize)]
pub struct Translation {
    pub original: String,
    pub text: String,
    /// ISO 639-1 code of the detected source language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    pub outcome: TranslationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'static str>,
}

impl Translation {
    pub fn passthrough(original: &str, text: String, source_language: Option<String>) -> Self {
        Self {
            original: original.to_string(),
            text,
            source_language,
            outcome: TranslationOutcome::PassedThrough,
            provider: None,
        }
    }
}

/// What a provider returns
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTranslation {
    pub text: String,
    /// Source language as reported by the provider
    pub detected_language: Option<String>,
}

/// Translation errors
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Unknown translation provider: {0}")]
    UnknownProvider(String),

    #[error("Translation request failed: {0}")]
    ApiError(String),

    #[error("Unexpected translation response: {0}")]
    InvalidResponse(String),

    #[error("Translation timed out after {0}s")]
    Timeout(u64),

    #[error("Translation unavailable: {0}")]
    Unavailable(String),
}

impl TranslationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::UnknownProvider(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!(" ollama ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!("deepl".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&TranslationOutcome::PassedThrough).unwrap();
        assert_eq!(json, "\"passed_through\"");
    }
}

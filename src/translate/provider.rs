//! Translation Providers
//!
//! Defines the provider trait and the HTTP backends behind it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{ProviderKind, ProviderTranslation, TranslationError};
use crate::config::TranslationConfig;

/// Translation provider trait
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Short provider name for logs and responses
    fn name(&self) -> &'static str;

    /// Translate `text` into `target`; `source` of `None` means auto-detect
    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<ProviderTranslation, TranslationError>;
}

/// Build the configured providers, in order
pub fn build_providers(config: &TranslationConfig) -> Vec<Arc<dyn TranslationProvider>> {
    // The per-call timeout is enforced by the translator; this one only
    // guards against connections that never finish
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.saturating_mul(2).max(1)))
        .build()
        .unwrap_or_default();

    config
        .providers
        .iter()
        .map(|kind| -> Arc<dyn TranslationProvider> {
            match kind {
                ProviderKind::Google => {
                    Arc::new(GoogleProvider::new(client.clone(), &config.google_url))
                }
                ProviderKind::Ollama => Arc::new(OllamaProvider::new(
                    client.clone(),
                    &config.ollama_url,
                    &config.ollama_model,
                )),
            }
        })
        .collect()
}

// ============================================================================
// Google
// ============================================================================

/// Google Translate web endpoint (`translate_a/single`, no API key)
pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_url(&self, text: &str, source: Option<&str>, target: &str) -> String {
        format!(
            "{}/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.base_url,
            source.unwrap_or("auto"),
            target,
            urlencoding::encode(text)
        )
    }
}

#[async_trait]
impl TranslationProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<ProviderTranslation, TranslationError> {
        let url = self.request_url(text, source, target);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TranslationError::ApiError(format!("Failed to call Google: {}", e)))?;

        if !response.status().is_success() {
            return Err(TranslationError::ApiError(format!(
                "Google returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parse_google_response(&body)
    }
}

/// Extract the translation from a `translate_a/single` response
///
/// The text is split into segments at `[0][i][0]`; the detected source
/// language sits at `[2]`.
pub fn parse_google_response(body: &serde_json::Value) -> Result<ProviderTranslation, TranslationError> {
    let segments = body
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| TranslationError::InvalidResponse("missing segment list".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(TranslationError::InvalidResponse("empty translation".to_string()));
    }

    Ok(ProviderTranslation {
        text: text.trim().to_string(),
        detected_language: body.get(2).and_then(|l| l.as_str()).map(|l| l.to_string()),
    })
}

// ============================================================================
// Ollama
// ============================================================================

/// Translation through a local Ollama model
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llama3")
    model: String,
}

impl OllamaProvider {
    pub fn new(client: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

fn language_name(code: &str) -> &str {
    match code {
        "ar" => "Arabic",
        "en" => "English",
        "fr" => "French",
        "es" => "Spanish",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        other => other,
    }
}

#[async_trait]
impl TranslationProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn translate(
        &self,
        text: &str,
        source: Option<&str>,
        target: &str,
    ) -> Result<ProviderTranslation, TranslationError> {
        let url = format!("{}/api/generate", self.base_url);

        let source_hint = source
            .map(|s| format!(" from {}", language_name(s)))
            .unwrap_or_default();
        let prompt = format!(
            "Translate the following text{} to {}. Return only the translation, nothing else.\n\n{}",
            source_hint,
            language_name(target),
            text
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text = result["response"].as_str().unwrap_or("").trim().to_string();
        if text.is_empty() {
            return Err(TranslationError::InvalidResponse("empty translation".to_string()));
        }

        Ok(ProviderTranslation {
            text,
            detected_language: None,
        })
    }
}

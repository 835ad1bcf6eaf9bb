//! Speech synthesis backends.
//!
//! `ApiSynth` calls any OpenAI-compatible `/v1/audio/speech` endpoint and
//! returns encoded audio bytes for the playback layer to decode.  All
//! connection details come from [`SynthConfig`]; nothing is hardcoded.

use async_trait::async_trait;

use crate::config::SynthConfig;

use super::port::{select_voice, SpeechError};

// ---------------------------------------------------------------------------
// SynthBackend trait
// ---------------------------------------------------------------------------

/// Async trait for turning text into encoded audio bytes (WAV/MP3).
///
/// Implementors must be `Send + Sync` so they can be shared across tasks.
/// Returning an empty byte vector means "nothing to play" and is not an
/// error.
#[async_trait]
pub trait SynthBackend: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, SpeechError>;
}

// ---------------------------------------------------------------------------
// ApiSynth
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint.
///
/// The `Authorization: Bearer …` header is attached **only** when
/// `config.api_key` is `Some(key)` and `key` is non-empty — safe for local
/// providers that require no authentication.
pub struct ApiSynth {
    client: reqwest::Client,
    config: SynthConfig,
}

impl ApiSynth {
    /// Build an `ApiSynth` from application config.
    pub fn from_config(config: &SynthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SynthBackend for ApiSynth {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/audio/speech",
            self.config.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": select_voice(voice),
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SpeechError::Synthesis(format!(
                "synthesis API error {status}: {detail}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

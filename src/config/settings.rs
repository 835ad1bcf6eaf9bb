//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// CaptureMode
// ---------------------------------------------------------------------------

/// Selects how a spoken answer is committed for submission.
///
/// | Variant    | Trigger                                              |
/// |------------|------------------------------------------------------|
/// | PushToTalk | First final transcript submits immediately           |
/// | Continuous | Accumulate finals; submit on stop / end-of-speech    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    /// One utterance per turn; the final transcript itself triggers submission.
    PushToTalk,
    /// Keep listening across pauses; submission happens when the user stops
    /// the microphone or the engine detects end of speech.
    Continuous,
}

impl Default for CaptureMode {
    fn default() -> Self {
        Self::Continuous
    }
}

// ---------------------------------------------------------------------------
// BackendConfig
// ---------------------------------------------------------------------------

/// Settings for the remote interview backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the interview API, without a trailing slash.
    pub base_url: String,
    /// Bearer token attached to every request — `None` until the user has
    /// authenticated through the external session-management flow.
    pub api_token: Option<String>,
    /// Maximum seconds to wait for any backend response before timing out.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".into(),
            api_token: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for speech capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// How a spoken answer is committed (see [`CaptureMode`]).
    pub mode: CaptureMode,
    /// Recognition language as a BCP-47 tag (e.g. `"en-US"`).
    pub language: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            language: "en-US".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SynthConfig
// ---------------------------------------------------------------------------

/// Settings for on-device speech synthesis (used when the backend response
/// carries no audio payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Whether synthesis is active at all; when `false` prompts with no
    /// server audio are displayed silently.
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible `/v1/audio/speech` endpoint.
    pub base_url: String,
    /// API key — `None` for local providers that need no authentication.
    pub api_key: Option<String>,
    /// Synthesis model identifier (e.g. `"tts-1"`).
    pub model: String,
    /// Preferred voice name; unknown names fall back to the engine default.
    pub voice: Option<String>,
    /// Maximum seconds to wait for a synthesis response.
    pub timeout_secs: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "tts-1".into(),
            voice: None,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// TranscriptConfig
// ---------------------------------------------------------------------------

/// Settings for local transcript export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Write the conversation history to a JSON file when the interview ends.
    pub export: bool,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self { export: true }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use interview_voice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote interview backend settings.
    pub backend: BackendConfig,
    /// Speech capture settings.
    pub capture: CaptureConfig,
    /// On-device synthesis settings.
    pub synth: SynthConfig,
    /// Transcript export settings.
    pub transcript: TranscriptConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            capture: CaptureConfig::default(),
            synth: SynthConfig::default(),
            transcript: TranscriptConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.backend.base_url, loaded.backend.base_url);
        assert_eq!(original.backend.api_token, loaded.backend.api_token);
        assert_eq!(original.backend.timeout_secs, loaded.backend.timeout_secs);

        assert_eq!(original.capture.mode, loaded.capture.mode);
        assert_eq!(original.capture.language, loaded.capture.language);

        assert_eq!(original.synth.enabled, loaded.synth.enabled);
        assert_eq!(original.synth.base_url, loaded.synth.base_url);
        assert_eq!(original.synth.model, loaded.synth.model);
        assert_eq!(original.synth.voice, loaded.synth.voice);

        assert_eq!(original.transcript.export, loaded.transcript.export);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.backend.base_url, default.backend.base_url);
        assert_eq!(config.capture.mode, default.capture.mode);
        assert_eq!(config.synth.model, default.synth.model);
    }

    /// Verify default values.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.backend.base_url, "http://localhost:8000/api/v1");
        assert!(cfg.backend.api_token.is_none());
        assert_eq!(cfg.backend.timeout_secs, 30);
        assert_eq!(cfg.capture.mode, CaptureMode::Continuous);
        assert_eq!(cfg.capture.language, "en-US");
        assert!(cfg.synth.enabled);
        assert_eq!(cfg.synth.model, "tts-1");
        assert!(cfg.transcript.export);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.backend.base_url = "https://interviews.example.com/api/v1".into();
        cfg.backend.api_token = Some("token-123".into());
        cfg.backend.timeout_secs = 60;
        cfg.capture.mode = CaptureMode::PushToTalk;
        cfg.capture.language = "en-GB".into();
        cfg.synth.enabled = false;
        cfg.synth.voice = Some("nova".into());
        cfg.transcript.export = false;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(
            loaded.backend.base_url,
            "https://interviews.example.com/api/v1"
        );
        assert_eq!(loaded.backend.api_token, Some("token-123".into()));
        assert_eq!(loaded.backend.timeout_secs, 60);
        assert_eq!(loaded.capture.mode, CaptureMode::PushToTalk);
        assert_eq!(loaded.capture.language, "en-GB");
        assert!(!loaded.synth.enabled);
        assert_eq!(loaded.synth.voice, Some("nova".into()));
        assert!(!loaded.transcript.export);
    }
}

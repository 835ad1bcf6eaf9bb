//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + exported transcripts):
//!   Windows: %APPDATA%\interview-voice\
//!   macOS:   ~/Library/Application Support/interview-voice/
//!   Linux:   ~/.config/interview-voice/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and the transcript folder.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory where interview transcripts are exported as JSON.
    pub transcripts_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "interview-voice";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let transcripts_dir = config_dir.join("transcripts");

        Self {
            config_dir,
            settings_file,
            transcripts_dir,
        }
    }

    /// File path for an exported transcript of the given interview.
    pub fn transcript_file(&self, interview_id: i64) -> PathBuf {
        self.transcripts_dir
            .join(format!("interview-{interview_id}.json"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

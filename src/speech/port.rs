//! Core speech-output port contract.
//!
//! [`SpeechOutputPort`] is the capability boundary for making the
//! interviewer audible: either by playing a server-rendered audio clip or by
//! synthesizing the question text on-device.  At most one utterance is in
//! flight at any time — the port rejects a second `speak` rather than
//! queueing it.  The turn controller's state machine is the primary guard;
//! the port's `Busy` error is a defensive backstop.

use thiserror::Error;

use crate::controller::PlaybackSink;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// All errors that can arise from the speech-output subsystem.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpeechError {
    /// No output device / synthesis backend is available.  The caller
    /// continues silently.
    #[error("speech output is not available in this environment")]
    Unsupported,

    /// `speak`/`play_clip` was called while an utterance is in flight.
    #[error("an utterance is already being spoken")]
    Busy,

    /// The synthesis backend failed to produce audio.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// Decoding or playing the audio failed.
    #[error("audio playback failed: {0}")]
    Playback(String),
}

// ---------------------------------------------------------------------------
// SpeechOutputPort trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech output.
///
/// # Contract
///
/// - `speak` and `play_clip` fail fast with [`SpeechError::Busy`] while a
///   prior utterance is still active — there is no queue.
/// - On accepted calls, `sink.ended()` fires exactly once on natural
///   completion, or `sink.failed(..)` fires instead; the caller treats a
///   failure as immediate completion so the conversation is never stuck.
/// - Text passed to `speak` is sanitized (markup punctuation stripped)
///   before synthesis.
/// - `stop` cuts the current utterance; no-op when nothing is playing.
pub trait SpeechOutputPort: Send + Sync {
    /// Synthesize `text` and play it.
    fn speak(&self, text: &str, sink: PlaybackSink) -> Result<(), SpeechError>;

    /// Play a server-provided compressed audio clip.
    fn play_clip(&self, clip: Vec<u8>, sink: PlaybackSink) -> Result<(), SpeechError>;

    /// Stop the current utterance, if any.
    fn stop(&self);

    /// Whether an utterance is currently in flight.
    fn is_speaking(&self) -> bool;
}

// Compile-time assertion: Box<dyn SpeechOutputPort> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechOutputPort>) {}
};

// ---------------------------------------------------------------------------
// Text sanitation / voice selection
// ---------------------------------------------------------------------------

/// Strip markup-style punctuation so the engine does not vocalize
/// formatting characters ("asterisk", "underscore", …).
pub fn sanitize_for_speech(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '#'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Voices the synthesis engine is known to offer.
const KNOWN_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Engine default used when no usable preference is configured.
pub const DEFAULT_VOICE: &str = "alloy";

/// Best-effort voice preference matching.
///
/// Returns the preferred voice when the engine offers it (case-insensitive),
/// otherwise the engine default.  Selection failure is never an error.
pub fn select_voice(preferred: Option<&str>) -> &str {
    match preferred {
        Some(name) => KNOWN_VOICES
            .iter()
            .find(|v| v.eq_ignore_ascii_case(name))
            .copied()
            .unwrap_or(DEFAULT_VOICE),
        None => DEFAULT_VOICE,
    }
}

// ---------------------------------------------------------------------------
// MockSpeechOutput  (test-only)
// ---------------------------------------------------------------------------

/// Test double that records what was spoken or played.  Completion events
/// are driven by the test, not the mock.
#[cfg(test)]
pub struct MockSpeechOutput {
    available: bool,
    spoken: std::sync::Mutex<Vec<String>>,
    clips: std::sync::Mutex<Vec<Vec<u8>>>,
    stops: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockSpeechOutput {
    /// A port that accepts every utterance.
    pub fn ok() -> Self {
        Self {
            available: true,
            spoken: std::sync::Mutex::new(Vec::new()),
            clips: std::sync::Mutex::new(Vec::new()),
            stops: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A port with no usable output (silent mode).
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::ok()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn clips(&self) -> Vec<Vec<u8>> {
        self.clips.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl SpeechOutputPort for MockSpeechOutput {
    fn speak(&self, text: &str, _sink: PlaybackSink) -> Result<(), SpeechError> {
        if !self.available {
            return Err(SpeechError::Unsupported);
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn play_clip(&self, clip: Vec<u8>, _sink: PlaybackSink) -> Result<(), SpeechError> {
        if !self.available {
            return Err(SpeechError::Unsupported);
        }
        self.clips.lock().unwrap().push(clip);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- sanitize_for_speech ---

    #[test]
    fn sanitize_strips_markup_characters() {
        assert_eq!(
            sanitize_for_speech("Tell me about **ownership** in _Rust_ #1"),
            "Tell me about ownership in Rust 1"
        );
    }

    #[test]
    fn sanitize_trims_whitespace() {
        assert_eq!(sanitize_for_speech("  hello  "), "hello");
    }

    #[test]
    fn sanitize_of_pure_markup_is_empty() {
        assert_eq!(sanitize_for_speech("***"), "");
    }

    #[test]
    fn sanitize_keeps_normal_punctuation() {
        assert_eq!(
            sanitize_for_speech("What's next? Tell me, briefly."),
            "What's next? Tell me, briefly."
        );
    }

    // --- select_voice ---

    #[test]
    fn select_voice_matches_case_insensitively() {
        assert_eq!(select_voice(Some("Nova")), "nova");
        assert_eq!(select_voice(Some("SHIMMER")), "shimmer");
    }

    #[test]
    fn select_voice_falls_back_to_default() {
        assert_eq!(select_voice(Some("Samantha")), DEFAULT_VOICE);
        assert_eq!(select_voice(None), DEFAULT_VOICE);
    }

    // --- SpeechError display ---

    #[test]
    fn error_display() {
        assert!(SpeechError::Busy.to_string().contains("already"));
        assert!(SpeechError::Unsupported.to_string().contains("not available"));
        assert!(SpeechError::Playback("decode failed".into())
            .to_string()
            .contains("decode failed"));
    }

    // --- MockSpeechOutput ---

    #[test]
    fn mock_records_utterances() {
        use tokio::sync::mpsc;

        let port = MockSpeechOutput::ok();
        let (tx, _rx) = mpsc::unbounded_channel();

        port.speak("hello", crate::controller::PlaybackSink::new(1, tx.clone()))
            .unwrap();
        port.play_clip(vec![1, 2, 3], crate::controller::PlaybackSink::new(2, tx))
            .unwrap();

        assert_eq!(port.spoken(), vec!["hello"]);
        assert_eq!(port.clips(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn unavailable_mock_rejects_everything() {
        use tokio::sync::mpsc;

        let port = MockSpeechOutput::unavailable();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = port
            .speak("hello", crate::controller::PlaybackSink::new(1, tx))
            .unwrap_err();
        assert_eq!(err, SpeechError::Unsupported);
    }
}

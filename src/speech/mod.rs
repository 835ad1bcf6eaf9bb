//! Speech output module.
//!
//! This module provides:
//! * [`SpeechOutputPort`] — the capability boundary the turn controller
//!   talks to: speak text, play a server clip, stop, busy state.
//! * [`PlaybackSpeech`] — production port over a rodio output device, with
//!   synthesis delegated to a [`SynthBackend`].
//! * [`ApiSynth`] — OpenAI-compatible `/v1/audio/speech` synthesis backend.
//! * [`MutedSpeech`] — silent-mode port for headless hosts.
//! * [`sanitize_for_speech`] / [`select_voice`] — text cleanup and
//!   best-effort voice preference matching.
//!
//! At most one utterance is ever in flight; the port rejects overlap with
//! [`SpeechError::Busy`] instead of queueing.

pub mod playback;
pub mod port;
pub mod synth;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use playback::{MutedSpeech, PlaybackSpeech};
pub use port::{sanitize_for_speech, select_voice, SpeechError, SpeechOutputPort, DEFAULT_VOICE};
pub use synth::{ApiSynth, SynthBackend};

// test-only re-export so the controller test module can import the mock
// without `use interview_voice::speech::port::MockSpeechOutput`.
#[cfg(test)]
pub use port::MockSpeechOutput;

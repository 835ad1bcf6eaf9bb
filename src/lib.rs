//! Voice-enabled mock-interview client.
//!
//! The crate orchestrates a spoken mock interview: it alternates between
//! listening for the user's answer, sending it to the remote interview
//! backend, and speaking the backend's next question aloud, with a manual
//! text path alongside the microphone at all times.
//!
//! # Architecture
//!
//! ```text
//! user action (mic toggle / typed answer)
//!        │
//!        ▼
//! TurnController::run()  ← async tokio task, single TurnEvent inbox
//!        │
//!        ├─ SpeechInputPort   (capture)  — start/stop, transcripts, ended
//!        ├─ BackendSession    (backend)  — start / submit answer / end
//!        └─ SpeechOutputPort  (speech)   — server clip or synthesized voice
//!
//! UiEvent channel ──▶ rendered by the embedding UI (terminal in the binary)
//! ```
//!
//! [`controller::TurnController`] owns the conversational state machine —
//! `Idle → Listening → AwaitingBackend → Speaking → Idle`, with `Ended`
//! reachable from everywhere — and is the only writer of
//! [`controller::ConversationState`].  The ports are capability boundaries:
//! swap in a real recognition engine via [`capture::RecognitionEngine`], or
//! run text-only with [`capture::UnsupportedCapture`].

pub mod backend;
pub mod capture;
pub mod config;
pub mod controller;
pub mod speech;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use backend::{ApiSession, BackendError, BackendSession, PerformanceReport};
pub use capture::{CaptureError, SpeechInputPort};
pub use config::AppConfig;
pub use controller::{Phase, TurnController, TurnEvent, UiEvent};
pub use speech::{SpeechError, SpeechOutputPort};

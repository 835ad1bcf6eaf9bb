//! Speech capture module.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │               SpeechInputPort (trait)                    │
//! │                                                         │
//! │   ┌───────────────────┐      ┌────────────────────┐    │
//! │   │ RecognitionEngine  │─────▶│   EngineCapture    │    │
//! │   │ (raw primitive)    │      │ exactly-once ended │    │
//! │   └───────────────────┘      │ idempotent stop    │    │
//! │                              └─────────┬──────────┘    │
//! │   ┌────────────────────┐               │               │
//! │   │ UnsupportedCapture │               ▼               │
//! │   │ (text-only mode)   │     CaptureSink → TurnEvent   │
//! │   └────────────────────┘                               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The port buffers nothing: transcript accumulation is the turn
//! controller's job, so one capture session always feeds exactly one turn.

pub mod adapter;
pub mod port;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use adapter::{EngineCapture, EngineHandle, RecognitionEngine, UnsupportedCapture};
pub use port::{CaptureError, SpeechInputPort};

// test-only re-export so the controller test module can import the mock
// without `use interview_voice::capture::port::MockCapturePort`.
#[cfg(test)]
pub use port::MockCapturePort;

//! Turn orchestration module — the core of the interview client.
//!
//! This module wires speech capture, speech output, and the backend session
//! into one conversational state machine and exposes the event protocol the
//! UI talks to.
//!
//! # Architecture
//!
//! ```text
//! TurnEvent (mpsc, single inbox)
//!        │
//!        ▼
//! TurnController::run()  ← async tokio task, sole owner of
//!        │                 ConversationState
//!        ├─ ToggleCapture  → SpeechInputPort start/stop   [Listening]
//!        ├─ SubmitText     → BackendSession::submit_answer [AwaitingBackend]
//!        ├─ port callbacks → generation-checked, stale ones discarded
//!        └─ EndInterview   → BackendSession::end           [Ended]
//!
//! UiEvent (mpsc) ──▶ rendered by the embedding front-end
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use interview_voice::backend::ApiSession;
//! use interview_voice::capture::UnsupportedCapture;
//! use interview_voice::config::AppConfig;
//! use interview_voice::controller::{TurnController, TurnEvent};
//! use interview_voice::speech::MutedSpeech;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
//!
//!     let (mut controller, events, inbox) = TurnController::new(
//!         Arc::new(UnsupportedCapture),
//!         Arc::new(MutedSpeech),
//!         Arc::new(ApiSession::from_config(&config.backend)),
//!         config.capture.mode,
//!         ui_tx,
//!     );
//!
//!     tokio::spawn(async move { controller.run(inbox).await });
//!
//!     events.send(TurnEvent::BeginInterview { interview_id: 1 }).unwrap();
//!     // while let Some(event) = ui_rx.recv().await { ... }
//! }
//! ```

pub mod events;
pub mod state;
pub mod turn;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use events::{CaptureSink, Notice, PlaybackSink, TurnEvent, UiEvent};
pub use state::{ConversationState, HistoryEntry, InterviewSession, Phase, TurnRole};
pub use turn::TurnController;

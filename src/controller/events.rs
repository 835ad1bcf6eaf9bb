//! Event protocol between the ports, the UI, and the turn controller.
//!
//! The controller consumes a single [`TurnEvent`] inbox so that microphone
//! callbacks, playback completions, and user actions are all processed in
//! arrival order by one task.  Port callbacks are stamped with the
//! generation of the `start`/`speak` call that created them; the controller
//! uses the stamp to discard stale callbacks from superseded operations.
//!
//! [`UiEvent`] flows the other way: state-change notifications for whatever
//! front-end is attached (the shipped binary renders them to the terminal).

use tokio::sync::mpsc;

use crate::backend::PerformanceReport;
use crate::capture::CaptureError;
use crate::speech::SpeechError;

use super::state::{Phase, TurnRole};

// ---------------------------------------------------------------------------
// TurnEvent
// ---------------------------------------------------------------------------

/// Everything that can wake the turn controller.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    // ── User actions ─────────────────────────────────────────────────────
    /// Start the interview identified by `interview_id`.
    BeginInterview { interview_id: i64 },
    /// Toggle the microphone (start capture when idle, stop when listening).
    ToggleCapture,
    /// Submit a typed answer (the manual text fallback).
    SubmitText { text: String },
    /// End the interview now.
    EndInterview,

    // ── Capture callbacks ────────────────────────────────────────────────
    /// A partial recognition result, for live display only.
    TranscriptInterim { generation: u64, text: String },
    /// A final recognition result to accumulate.
    TranscriptFinal { generation: u64, text: String },
    /// The capture engine terminated (explicit stop, error, or its own
    /// end-of-speech detection).  Fires exactly once per capture start.
    CaptureEnded { generation: u64 },
    /// The capture engine reported a mid-stream error.  Always followed by
    /// `CaptureEnded` for the same generation.
    CaptureFailed { generation: u64, error: CaptureError },

    // ── Playback callbacks ───────────────────────────────────────────────
    /// The current utterance finished playing.
    PlaybackEnded { generation: u64 },
    /// Playback or synthesis failed; treated as immediate completion so the
    /// conversation is never stuck waiting on audio that will not finish.
    PlaybackFailed { generation: u64, error: SpeechError },
}

// ---------------------------------------------------------------------------
// CaptureSink
// ---------------------------------------------------------------------------

/// Callback handle given to a [`SpeechInputPort`](crate::capture::SpeechInputPort)
/// for the duration of one capture session.
///
/// Every event it emits carries the generation of the `start` call that
/// created it, so the controller can tell a live capture session from a
/// superseded one.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TurnEvent>,
}

impl CaptureSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TurnEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver a partial recognition result.
    pub fn interim(&self, text: impl Into<String>) {
        let _ = self.tx.send(TurnEvent::TranscriptInterim {
            generation: self.generation,
            text: text.into(),
        });
    }

    /// Deliver a final recognition result.
    pub fn finalized(&self, text: impl Into<String>) {
        let _ = self.tx.send(TurnEvent::TranscriptFinal {
            generation: self.generation,
            text: text.into(),
        });
    }

    /// Report a mid-stream recognition error.
    pub fn error(&self, error: CaptureError) {
        let _ = self.tx.send(TurnEvent::CaptureFailed {
            generation: self.generation,
            error,
        });
    }

    /// Signal that capture has terminated.
    pub fn ended(&self) {
        let _ = self.tx.send(TurnEvent::CaptureEnded {
            generation: self.generation,
        });
    }
}

// ---------------------------------------------------------------------------
// PlaybackSink
// ---------------------------------------------------------------------------

/// Callback handle given to a [`SpeechOutputPort`](crate::speech::SpeechOutputPort)
/// for the duration of one utterance.
#[derive(Debug, Clone)]
pub struct PlaybackSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TurnEvent>,
}

impl PlaybackSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TurnEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signal natural completion of the utterance.
    pub fn ended(&self) {
        let _ = self.tx.send(TurnEvent::PlaybackEnded {
            generation: self.generation,
        });
    }

    /// Signal that playback failed.
    pub fn failed(&self, error: SpeechError) {
        let _ = self.tx.send(TurnEvent::PlaybackFailed {
            generation: self.generation,
            error,
        });
    }
}

// ---------------------------------------------------------------------------
// UiEvent / Notice
// ---------------------------------------------------------------------------

/// Recoverable conditions surfaced to the user.
///
/// Every notice re-enables the relevant input affordance — no failure leaves
/// the microphone or the submit control permanently disabled.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The interview could not be started; no session was created.
    StartFailed { detail: String },
    /// A second start was attempted on an already-active session.
    AlreadyStarted,
    /// Answer submission failed; the user may resubmit the same or edited
    /// text.
    SubmissionFailed { detail: String },
    /// The capture engine reported an error mid-stream.
    RecognitionError { detail: String },
    /// Synthesis or playback failed; the turn continues silently.
    PlaybackFailed { detail: String },
    /// The interview ended but the report could not be fetched.
    ReportUnavailable { detail: String },
    /// The backend rejected the credential; re-authentication is required.
    Unauthorized,
    /// Speech capture is unavailable; the client runs in text-only mode.
    CaptureUnavailable,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::StartFailed { detail } => write!(f, "Could not start interview: {detail}"),
            Notice::AlreadyStarted => write!(f, "Interview already started"),
            Notice::SubmissionFailed { detail } => {
                write!(f, "Error submitting answer ({detail}). Please try again.")
            }
            Notice::RecognitionError { detail } => write!(f, "Speech recognition error: {detail}"),
            Notice::PlaybackFailed { detail } => write!(f, "Audio playback failed: {detail}"),
            Notice::ReportUnavailable { detail } => {
                write!(f, "Report unavailable ({detail}) — retry the fetch later")
            }
            Notice::Unauthorized => write!(f, "Session expired — please sign in again"),
            Notice::CaptureUnavailable => {
                write!(f, "Microphone unavailable — type your answers instead")
            }
        }
    }
}

/// State-change notifications for the attached front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A message was appended to the conversation.
    Message { role: TurnRole, text: String },
    /// A partial transcript for live "Recognizing: …" feedback.
    Interim { text: String },
    /// The controller changed phase (mic/submit affordances follow this).
    Phase { phase: Phase },
    /// Human-readable status line.
    Status { text: String },
    /// The question counter advanced.
    TurnAdvanced { turn_index: u32 },
    /// Whether speech capture is usable in this environment.
    MicAvailable { available: bool },
    /// A recoverable condition the user should see.
    Notice { notice: Notice },
    /// The interview is over; the report is `None` when the fetch failed.
    Ended { report: Option<PerformanceReport> },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

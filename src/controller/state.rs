//! Conversational state owned by the turn controller.
//!
//! [`Phase`] drives the orchestrator's state machine.  [`ConversationState`]
//! is the single source of truth for one interview attempt: current phase,
//! the transcript buffer being dictated, the append-only message history,
//! and the session/report handles.  It has exactly one writer — the
//! [`TurnController`](super::TurnController) — and is never shared.

use std::path::Path;
use std::time::SystemTime;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::PerformanceReport;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// States of the interview turn cycle.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──mic toggle──────▶ Listening
///      ◀─empty transcript─
/// Listening ──final transcript / stop──▶ AwaitingBackend
/// AwaitingBackend ──next question + audio──▶ Speaking
///                 ──next question, silent──▶ Idle
///                 ──is_complete────────────▶ Ended
/// Speaking ──playback ended──▶ Idle
/// any state ──end interview──▶ Ended
/// ```
///
/// At most one of `Listening`, `AwaitingBackend`, `Speaking` is ever
/// active; the microphone and the speaker are never live at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to speak, type, or end the interview.
    Idle,

    /// The capture port is live; transcripts accumulate in
    /// `pending_transcript`.
    Listening,

    /// An answer submission is in flight; no other submission may start.
    AwaitingBackend,

    /// The output port is playing the interviewer's question.
    Speaking,

    /// The interview is over.  No further capture, playback, or submissions
    /// are accepted.
    Ended,
}

impl Phase {
    /// Returns `true` while the controller is mid-turn and must reject new
    /// capture or submission attempts.
    ///
    /// ```
    /// use interview_voice::controller::Phase;
    ///
    /// assert!(!Phase::Idle.is_busy());
    /// assert!(Phase::Listening.is_busy());
    /// assert!(Phase::AwaitingBackend.is_busy());
    /// assert!(Phase::Speaking.is_busy());
    /// assert!(!Phase::Ended.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Phase::Listening | Phase::AwaitingBackend | Phase::Speaking
        )
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Listening => "Listening",
            Phase::AwaitingBackend => "Thinking",
            Phase::Speaking => "Speaking",
            Phase::Ended => "Ended",
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

// ---------------------------------------------------------------------------
// TurnRole / HistoryEntry
// ---------------------------------------------------------------------------

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

/// One message in conversational order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: TurnRole,
    pub text: String,
}

// ---------------------------------------------------------------------------
// InterviewSession
// ---------------------------------------------------------------------------

/// Identifies one interview attempt.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    /// Backend-assigned identifier; immutable after start.
    pub id: i64,
    /// One-based question counter; increments once per accepted answer.
    pub turn_index: u32,
    /// Wall-clock time the interview started; set once.
    pub started_at: SystemTime,
}

// ---------------------------------------------------------------------------
// ConversationState
// ---------------------------------------------------------------------------

/// The orchestrator's single source of truth.
#[derive(Debug, Default)]
pub struct ConversationState {
    /// Current phase of the turn cycle.
    pub phase: Phase,

    /// Recognized speech accumulated since the last submission.
    ///
    /// Non-empty only while `Listening` (or immediately after capture stops,
    /// before submission); cleared synchronously on every submit or abort.
    pub pending_transcript: String,

    /// Append-only message history in conversational order.
    ///
    /// Used only for local persistence/export — each backend request carries
    /// only the latest answer, never the whole history.
    pub history: Vec<HistoryEntry>,

    /// The active session, present from a successful start until the state
    /// is dropped.  Remains readable after `Ended` for export.
    pub session: Option<InterviewSession>,

    /// The performance report, stored once `end` succeeds.
    pub report: Option<PerformanceReport>,
}

/// Serialized shape of an exported transcript file.
#[derive(Serialize)]
struct TranscriptExport<'a> {
    interview_id: Option<i64>,
    history: &'a [HistoryEntry],
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry to the history.
    pub fn push(&mut self, role: TurnRole, text: impl Into<String>) {
        self.history.push(HistoryEntry {
            role,
            text: text.into(),
        });
    }

    /// Write the conversation history as pretty-printed JSON, creating
    /// parent directories as needed.
    pub fn export_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let export = TranscriptExport {
            interview_id: self.session.as_ref().map(|s| s.id),
            history: &self.history,
        };
        let content = serde_json::to_string_pretty(&export)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

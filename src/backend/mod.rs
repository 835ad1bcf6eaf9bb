//! Remote interview backend module.
//!
//! This module provides:
//! * [`BackendSession`] — async trait covering the three interview
//!   operations: start, submit answer, end.
//! * [`ApiSession`] — JSON-over-HTTPS implementation with bearer
//!   authorization and per-request timeouts.
//! * [`PerformanceReport`] / [`ScoreComparison`] — the scored evaluation
//!   returned when an interview ends.
//! * [`BackendError`] — error variants; everything except `Unauthorized` is
//!   recoverable by user retry.
//!
//! The backend itself (question generation, scoring) is an external
//! collaborator — this module only encodes its request/response contract.

pub mod report;
pub mod session;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use report::{PerformanceReport, ScoreComparison};
pub use session::{AnswerResponse, ApiSession, BackendError, BackendSession, StartResponse};

// test-only re-export so the controller test module can import MockBackend
// without `use interview_voice::backend::session::MockBackend`.
#[cfg(test)]
pub use session::MockBackend;

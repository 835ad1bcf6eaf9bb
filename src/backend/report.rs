//! Performance report data model.
//!
//! The backend produces one [`PerformanceReport`] per interview when the
//! session ends.  All fields default so that sparse reports from older
//! server versions still parse.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ScoreComparison
// ---------------------------------------------------------------------------

/// Comparison of the current interview against the user's previous attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComparison {
    pub previous_score: f32,
    pub current_score: f32,
    /// `current_score - previous_score`; negative when the user regressed.
    pub improvement: f32,
    /// ISO-8601 end timestamp of the previous attempt, when known.
    #[serde(default)]
    pub previous_date: Option<String>,
}

// ---------------------------------------------------------------------------
// PerformanceReport
// ---------------------------------------------------------------------------

/// Scored evaluation of a completed interview.
///
/// `overall_score` is on a 0–100 scale; the per-dimension scores are 0–10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    #[serde(default)]
    pub overall_score: f32,
    #[serde(default)]
    pub accuracy_score: f32,
    #[serde(default)]
    pub clarity_score: f32,
    #[serde(default)]
    pub confidence_score: f32,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub summary: String,
    /// Present only when the user has a prior completed interview.
    #[serde(default)]
    pub comparison: Option<ScoreComparison>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

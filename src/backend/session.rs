//! Core `BackendSession` trait and `ApiSession` implementation.
//!
//! `ApiSession` speaks the interview API's JSON-over-HTTPS contract: three
//! operations (`start`, `submit_answer`, `end`), each a single
//! request/response with no intermediate state.  All connection details come
//! from [`BackendConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::report::PerformanceReport;
use crate::config::BackendConfig;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur on any backend operation.
///
/// Every variant except [`Unauthorized`](Self::Unauthorized) is recoverable:
/// the user may retry the action.  `Unauthorized` invalidates the client
/// credential and ends the session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("backend request timed out")]
    Timeout,

    /// The backend rejected the bearer token (HTTP 401).
    #[error("authorization rejected — please sign in again")]
    Unauthorized,

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {detail}")]
    Server { status: u16, detail: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse backend response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Response to `start`: the opening question plus optional TTS audio.
///
/// The `response` alias accepts the alternate field spelling used by older
/// deployments of the same API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartResponse {
    #[serde(alias = "response")]
    pub first_question: String,
    /// Base64-encoded compressed audio clip of the question, when the server
    /// rendered one.  Empty strings are treated as absent by the caller.
    #[serde(default)]
    pub audio_base64: Option<String>,
}

/// Response to `submit_answer`: the next question, or completion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnswerResponse {
    #[serde(alias = "response", default)]
    pub next_question: Option<String>,
    #[serde(default)]
    pub audio_base64: Option<String>,
    /// `true` when the backend decided the interview is over; the caller must
    /// fetch the performance report instead of playing the prompt.
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Debug, Serialize)]
struct AnswerRequest<'a> {
    interview_id: i64,
    answer: &'a str,
}

#[derive(Debug, Deserialize)]
struct EndResponse {
    performance_report: PerformanceReport,
}

// ---------------------------------------------------------------------------
// BackendSession trait
// ---------------------------------------------------------------------------

/// Async interface to the remote interview API.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn BackendSession>`).  Each call is one round
/// trip; the caller is responsible for never having two `submit_answer`
/// calls outstanding for the same interview.
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Start the interview and fetch the first question.
    async fn start(&self, interview_id: i64) -> Result<StartResponse, BackendError>;

    /// Submit the user's answer and fetch the next question.
    async fn submit_answer(
        &self,
        interview_id: i64,
        answer: &str,
    ) -> Result<AnswerResponse, BackendError>;

    /// End the interview and fetch the performance report.
    async fn end(&self, interview_id: i64) -> Result<PerformanceReport, BackendError>;
}

// ---------------------------------------------------------------------------
// ApiSession
// ---------------------------------------------------------------------------

/// Production [`BackendSession`] over HTTP.
///
/// The `Authorization: Bearer …` header is attached **only** when
/// `config.api_token` is `Some(token)` and `token` is non-empty, so the
/// client also works against unauthenticated development servers.
pub struct ApiSession {
    client: reqwest::Client,
    config: BackendConfig,
}

impl ApiSession {
    /// Build an `ApiSession` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request and map the HTTP status onto [`BackendError`].
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let mut req = req;

        let token = self.config.api_token.as_deref().unwrap_or("");
        if !token.is_empty() {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }

        if !status.is_success() {
            // FastAPI-style error bodies carry a "detail" field.
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["detail"].as_str().map(String::from))
                .unwrap_or_else(|| status.to_string());
            return Err(BackendError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl BackendSession for ApiSession {
    async fn start(&self, interview_id: i64) -> Result<StartResponse, BackendError> {
        let req = self
            .client
            .post(self.url("/interview/start"))
            .query(&[("interview_id", interview_id)]);

        let response = self.send(req).await?;
        response
            .json::<StartResponse>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn submit_answer(
        &self,
        interview_id: i64,
        answer: &str,
    ) -> Result<AnswerResponse, BackendError> {
        let req = self
            .client
            .post(self.url("/interview/answer"))
            .json(&AnswerRequest {
                interview_id,
                answer,
            });

        let response = self.send(req).await?;
        response
            .json::<AnswerResponse>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn end(&self, interview_id: i64) -> Result<PerformanceReport, BackendError> {
        let req = self
            .client
            .post(self.url("/interview/end"))
            .query(&[("interview_id", interview_id)]);

        let response = self.send(req).await?;
        response
            .json::<EndResponse>()
            .await
            .map(|r| r.performance_report)
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockBackend  (test-only)
// ---------------------------------------------------------------------------

/// Scripted test double for [`BackendSession`].
///
/// Responses are queued per operation; calls are recorded so tests can
/// assert on how many round trips happened and with which payloads.
#[cfg(test)]
pub struct MockBackend {
    start_response: std::sync::Mutex<Option<Result<StartResponse, BackendError>>>,
    answer_responses: std::sync::Mutex<std::collections::VecDeque<Result<AnswerResponse, BackendError>>>,
    end_response: std::sync::Mutex<Option<Result<PerformanceReport, BackendError>>>,
    /// Recorded calls: `"start"`, `"answer:<text>"` or `"end"`.
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockBackend {
    pub fn new() -> Self {
        Self {
            start_response: std::sync::Mutex::new(None),
            answer_responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            end_response: std::sync::Mutex::new(None),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_start(self, response: Result<StartResponse, BackendError>) -> Self {
        *self.start_response.lock().unwrap() = Some(response);
        self
    }

    pub fn with_answer(self, response: Result<AnswerResponse, BackendError>) -> Self {
        self.answer_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_end(self, response: Result<PerformanceReport, BackendError>) -> Self {
        *self.end_response.lock().unwrap() = Some(response);
        self
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(op))
            .count()
    }
}

#[cfg(test)]
#[async_trait]
impl BackendSession for MockBackend {
    async fn start(&self, _interview_id: i64) -> Result<StartResponse, BackendError> {
        self.calls.lock().unwrap().push("start".into());
        self.start_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(BackendError::Request("no start scripted".into())))
    }

    async fn submit_answer(
        &self,
        _interview_id: i64,
        answer: &str,
    ) -> Result<AnswerResponse, BackendError> {
        self.calls.lock().unwrap().push(format!("answer:{answer}"));
        self.answer_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Request("no answer scripted".into())))
    }

    async fn end(&self, _interview_id: i64) -> Result<PerformanceReport, BackendError> {
        self.calls.lock().unwrap().push("end".into());
        self.end_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(BackendError::Request("no end scripted".into())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

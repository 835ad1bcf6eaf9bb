//! Core speech-capture port contract.
//!
//! [`SpeechInputPort`] is the capability boundary the turn controller talks
//! to.  It is object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SpeechInputPort>`.
//!
//! [`MockCapturePort`] (available under `#[cfg(test)]`) records calls and
//! hands the controller-created sink back to the test, which then plays the
//! engine's part.

use thiserror::Error;

use crate::controller::CaptureSink;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// All errors that can arise from the capture subsystem.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    /// Speech capture is not available in this environment.  Reported
    /// synchronously from `start`; the caller must fall back to manual text
    /// input rather than crash.
    #[error("speech capture is not supported in this environment")]
    Unsupported,

    /// `start` was called while a capture session is already live.
    #[error("capture is already active")]
    Busy,

    /// The recognition engine reported an error mid-stream.
    #[error("recognition error: {0}")]
    Recognition(String),
}

// ---------------------------------------------------------------------------
// SpeechInputPort trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech capture.
///
/// # Contract
///
/// - `start` begins one capture session and delivers all recognition
///   callbacks through `sink`.  The session's termination signal
///   (`sink.ended()`) fires **exactly once** per successful `start`,
///   whether capture ends by explicit [`stop`](Self::stop), a recognition
///   error, or the engine's own end-of-speech detection.
/// - `start` fails synchronously with [`CaptureError::Unsupported`] when no
///   engine is available, and [`CaptureError::Busy`] when a session is
///   already live.
/// - `stop` is idempotent — calling it when not capturing is a no-op.
/// - The port buffers nothing; transcript accumulation belongs to the
///   caller.
pub trait SpeechInputPort: Send + Sync {
    /// Begin capturing; recognition results flow through `sink`.
    fn start(&self, sink: CaptureSink) -> Result<(), CaptureError>;

    /// Request capture stop.  No-op when not capturing.
    fn stop(&self);
}

// Compile-time assertion: Box<dyn SpeechInputPort> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechInputPort>) {}
};

// ---------------------------------------------------------------------------
// MockCapturePort  (test-only)
// ---------------------------------------------------------------------------

/// Test double that records `start`/`stop` calls and exposes the sink so
/// tests can emit transcripts and termination themselves.
#[cfg(test)]
pub struct MockCapturePort {
    fail_start: Option<CaptureError>,
    starts: std::sync::atomic::AtomicUsize,
    stops: std::sync::atomic::AtomicUsize,
    last_sink: std::sync::Mutex<Option<CaptureSink>>,
}

#[cfg(test)]
impl MockCapturePort {
    /// A port whose `start` always succeeds.
    pub fn ok() -> Self {
        Self {
            fail_start: None,
            starts: std::sync::atomic::AtomicUsize::new(0),
            stops: std::sync::atomic::AtomicUsize::new(0),
            last_sink: std::sync::Mutex::new(None),
        }
    }

    /// A port whose `start` always fails with `Unsupported`.
    pub fn unsupported() -> Self {
        Self {
            fail_start: Some(CaptureError::Unsupported),
            ..Self::ok()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// The sink handed over by the most recent `start` call.
    pub fn sink(&self) -> Option<CaptureSink> {
        self.last_sink.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl SpeechInputPort for MockCapturePort {
    fn start(&self, sink: CaptureSink) -> Result<(), CaptureError> {
        self.starts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(err) = &self.fail_start {
            return Err(err.clone());
        }
        *self.last_sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Adapters that turn raw recognition primitives into well-behaved
//! [`SpeechInputPort`]s.
//!
//! Real recognition engines are sloppy about callback ordering: end can fire
//! before the last result, errors may or may not be followed by an end
//! signal, and stop is frequently racy.  [`EngineCapture`] normalizes all of
//! that behind the port contract — termination is delivered exactly once
//! per start, an error always produces a termination, and `stop` is
//! idempotent.
//!
//! [`UnsupportedCapture`] is the degraded-mode port used when no engine is
//! linked at all; `start` fails synchronously so the controller can fall
//! back to manual text input.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::controller::CaptureSink;

use super::port::{CaptureError, SpeechInputPort};

// ---------------------------------------------------------------------------
// RecognitionEngine
// ---------------------------------------------------------------------------

/// The raw start/stop primitive wrapped by [`EngineCapture`].
///
/// Implementations deliver callbacks through the [`EngineHandle`] they were
/// given and must eventually call [`EngineHandle::end`] after
/// [`abort`](Self::abort) — the handle deduplicates, so firing it more than
/// once is harmless.
pub trait RecognitionEngine: Send + Sync {
    /// Begin one recognition session.
    fn begin(&self, events: EngineHandle) -> Result<(), CaptureError>;

    /// Ask the engine to terminate the current session, if any.
    fn abort(&self);
}

impl<E: RecognitionEngine + ?Sized> RecognitionEngine for Arc<E> {
    fn begin(&self, events: EngineHandle) -> Result<(), CaptureError> {
        (**self).begin(events)
    }

    fn abort(&self) {
        (**self).abort()
    }
}

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

/// Per-session callback handle handed to a [`RecognitionEngine`].
///
/// Normalizes the engine's callbacks onto the port contract: events after
/// termination are dropped, an error is always followed by exactly one
/// termination, and termination itself is latched so duplicate `end` calls
/// collapse into one.
#[derive(Clone)]
pub struct EngineHandle {
    sink: CaptureSink,
    ended: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

impl EngineHandle {
    fn new(sink: CaptureSink, active: Arc<AtomicBool>) -> Self {
        Self {
            sink,
            ended: Arc::new(AtomicBool::new(false)),
            active,
        }
    }

    /// Deliver a partial recognition result.
    pub fn interim(&self, text: &str) {
        if !self.ended.load(Ordering::SeqCst) {
            self.sink.interim(text);
        }
    }

    /// Deliver a final recognition result.
    pub fn finalized(&self, text: &str) {
        if !self.ended.load(Ordering::SeqCst) {
            self.sink.finalized(text);
        }
    }

    /// Report a mid-stream error and terminate the session.
    pub fn error(&self, error: CaptureError) {
        if self.ended.load(Ordering::SeqCst) {
            return;
        }
        self.sink.error(error);
        self.end();
    }

    /// Terminate the session.  Only the first call per session has any
    /// effect.
    pub fn end(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            self.active.store(false, Ordering::SeqCst);
            self.sink.ended();
        }
    }
}

// ---------------------------------------------------------------------------
// EngineCapture
// ---------------------------------------------------------------------------

/// [`SpeechInputPort`] implementation over any [`RecognitionEngine`].
pub struct EngineCapture<E: RecognitionEngine> {
    engine: E,
    active: Arc<AtomicBool>,
}

impl<E: RecognitionEngine> EngineCapture<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            active: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<E: RecognitionEngine> SpeechInputPort for EngineCapture<E> {
    fn start(&self, sink: CaptureSink) -> Result<(), CaptureError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(CaptureError::Busy);
        }

        let handle = EngineHandle::new(sink, Arc::clone(&self.active));
        match self.engine.begin(handle) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.active.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn stop(&self) {
        // Idempotent: only forward the abort while a session is live.
        if self.active.load(Ordering::SeqCst) {
            self.engine.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// UnsupportedCapture
// ---------------------------------------------------------------------------

/// Port for environments with no speech engine at all.
///
/// `start` fails synchronously with [`CaptureError::Unsupported`]; the
/// controller then disables the microphone affordance and continues in
/// text-only mode.
#[derive(Debug, Default)]
pub struct UnsupportedCapture;

impl SpeechInputPort for UnsupportedCapture {
    fn start(&self, _sink: CaptureSink) -> Result<(), CaptureError> {
        Err(CaptureError::Unsupported)
    }

    fn stop(&self) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

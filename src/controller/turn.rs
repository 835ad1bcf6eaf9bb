//! Turn controller — the conversational state machine.
//!
//! [`TurnController`] owns the [`ConversationState`] and mediates between
//! the capture port, the speech-output port, the backend session, and the
//! UI sink.  It is driven entirely by [`TurnEvent`]s from a single inbox,
//! so microphone callbacks, playback completions, and user actions are
//! processed one at a time in arrival order.
//!
//! # Turn flow
//!
//! ```text
//! ToggleCapture (Idle)
//!   └─▶ SpeechInputPort::start, phase = Listening
//!
//! TranscriptFinal
//!   ├─ push-to-talk: stop capture, submit immediately
//!   └─ continuous:   accumulate; submit on stop / CaptureEnded
//!
//! submit (phase = AwaitingBackend)
//!   └─▶ BackendSession::submit_answer
//!         ├─ is_complete → BackendSession::end          [Ended]
//!         ├─ server audio → SpeechOutputPort::play_clip [Speaking]
//!         ├─ no audio     → SpeechOutputPort::speak     [Speaking]
//!         └─ silent mode  →                             [Idle]
//! ```
//!
//! Every port callback carries the generation of the `start`/`speak` call
//! that created it.  A callback whose generation or phase no longer matches
//! is stale — it is logged and discarded, never applied.  Browser-grade
//! speech engines fire callbacks out of expected order; this guard is what
//! keeps the state machine consistent anyway.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::backend::{BackendError, BackendSession};
use crate::capture::{CaptureError, SpeechInputPort};
use crate::config::CaptureMode;
use crate::speech::{SpeechError, SpeechOutputPort};

use super::events::{CaptureSink, Notice, PlaybackSink, TurnEvent, UiEvent};
use super::state::{ConversationState, InterviewSession, Phase, TurnRole};

// ---------------------------------------------------------------------------
// Status lines
// ---------------------------------------------------------------------------

const STATUS_LISTENING: &str = "Listening... Speak your answer";
const STATUS_PROCESSING: &str = "Processing your answer...";
const STATUS_SPEAKING: &str = "Speaking...";
const STATUS_YOUR_TURN: &str = "Click the microphone to answer";
const STATUS_ENDED: &str = "Interview complete";

// ---------------------------------------------------------------------------
// TurnController
// ---------------------------------------------------------------------------

/// Drives the interview turn cycle.
///
/// Create with [`TurnController::new`], send it user actions through the
/// sender that `new` returns, and call [`run`](Self::run) inside a tokio
/// task.
pub struct TurnController {
    state: ConversationState,

    capture: Arc<dyn SpeechInputPort>,
    speech: Arc<dyn SpeechOutputPort>,
    backend: Arc<dyn BackendSession>,

    ui: mpsc::UnboundedSender<UiEvent>,

    /// Weak handle to the inbox, used to mint per-operation sinks.  Weak so
    /// that the controller itself never keeps its own [`run`](Self::run)
    /// loop alive — the loop ends once every external sender and live sink
    /// is gone.
    events: mpsc::WeakUnboundedSender<TurnEvent>,

    mode: CaptureMode,

    /// Generation stamps for stale-callback detection.  Incremented on every
    /// capture start / utterance start; port callbacks carrying an older
    /// stamp are discarded.
    capture_gen: u64,
    playback_gen: u64,

    /// Cleared the first time `start` reports `Unsupported`; the client then
    /// runs in manual-text-only mode for the rest of the session.
    capture_available: bool,

    /// When set, the conversation history is exported here once the
    /// interview ends.
    transcript_path: Option<std::path::PathBuf>,
}

impl TurnController {
    /// Create a new controller and its event inbox.
    ///
    /// # Arguments
    ///
    /// * `capture` — speech capture port (e.g. `EngineCapture`).
    /// * `speech`  — speech output port (e.g. `PlaybackSpeech`).
    /// * `backend` — interview API session (e.g. `ApiSession`).
    /// * `mode`    — capture-trigger policy (push-to-talk vs continuous).
    /// * `ui`      — sink for state-change notifications.
    pub fn new(
        capture: Arc<dyn SpeechInputPort>,
        speech: Arc<dyn SpeechOutputPort>,
        backend: Arc<dyn BackendSession>,
        mode: CaptureMode,
        ui: mpsc::UnboundedSender<UiEvent>,
    ) -> (
        Self,
        mpsc::UnboundedSender<TurnEvent>,
        mpsc::UnboundedReceiver<TurnEvent>,
    ) {
        let (events, inbox) = mpsc::unbounded_channel();

        let controller = Self {
            state: ConversationState::new(),
            capture,
            speech,
            backend,
            ui,
            events: events.downgrade(),
            mode,
            capture_gen: 0,
            playback_gen: 0,
            capture_available: true,
            transcript_path: None,
        };

        (controller, events, inbox)
    }

    /// Export the conversation history to `path` when the interview ends.
    pub fn with_transcript_export(mut self, path: std::path::PathBuf) -> Self {
        self.transcript_path = Some(path);
        self
    }

    /// Mint a strong sender for a port sink.  When every external sender is
    /// already gone the inbox is closing anyway, so deliveries fall into a
    /// detached channel and are dropped.
    fn event_sender(&self) -> mpsc::UnboundedSender<TurnEvent> {
        self.events.upgrade().unwrap_or_else(|| {
            let (tx, _rx) = mpsc::unbounded_channel();
            tx
        })
    }

    // ── Read access (UI / tests / export) ────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn turn_index(&self) -> Option<u32> {
        self.state.session.as_ref().map(|s| s.turn_index)
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the controller until the event channel is closed.
    ///
    /// This is an `async fn` and should be spawned as a tokio task.  It
    /// keeps running after `Ended` — late events must be absorbed, not
    /// crash — and returns once every sender is dropped.
    pub async fn run(&mut self, mut inbox: mpsc::UnboundedReceiver<TurnEvent>) {
        while let Some(event) = inbox.recv().await {
            self.handle_event(event).await;
        }
        log::info!("controller: event channel closed, shutting down");
    }

    /// Process one event.  Public so embedders (and tests) can drive the
    /// controller without the channel.
    pub async fn handle_event(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::BeginInterview { interview_id } => {
                self.begin_interview(interview_id).await;
            }
            TurnEvent::ToggleCapture => self.toggle_capture().await,
            TurnEvent::SubmitText { text } => self.submit_answer(&text).await,
            TurnEvent::EndInterview => self.end_interview().await,

            TurnEvent::TranscriptInterim { generation, text } => {
                self.on_transcript_interim(generation, text);
            }
            TurnEvent::TranscriptFinal { generation, text } => {
                self.on_transcript_final(generation, text).await;
            }
            TurnEvent::CaptureEnded { generation } => {
                self.on_capture_ended(generation).await;
            }
            TurnEvent::CaptureFailed { generation, error } => {
                self.on_capture_failed(generation, error);
            }

            TurnEvent::PlaybackEnded { generation } => self.on_playback_ended(generation),
            TurnEvent::PlaybackFailed { generation, error } => {
                self.on_playback_failed(generation, error);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Interview lifecycle
    // -----------------------------------------------------------------------

    /// Start the interview and deliver the first question.
    ///
    /// A second start on an active session is rejected without touching the
    /// timer or the turn counter; a failed start leaves no partial session.
    pub async fn begin_interview(&mut self, interview_id: i64) {
        if self.state.session.is_some() || self.state.phase != Phase::Idle {
            log::warn!("controller: duplicate begin_interview rejected");
            self.notify(Notice::AlreadyStarted);
            return;
        }

        match self.backend.start(interview_id).await {
            Ok(resp) => {
                self.state.session = Some(InterviewSession {
                    id: interview_id,
                    turn_index: 1,
                    started_at: SystemTime::now(),
                });
                self.state.push(TurnRole::System, "Interview started.");
                self.push_message(TurnRole::Assistant, resp.first_question.clone());
                self.emit(UiEvent::TurnAdvanced { turn_index: 1 });

                self.deliver_prompt(&resp.first_question, resp.audio_base64.as_deref());
            }
            Err(BackendError::Unauthorized) => self.force_unauthorized(),
            Err(e) => {
                log::error!("controller: start failed: {e}");
                self.notify(Notice::StartFailed {
                    detail: e.to_string(),
                });
            }
        }
    }

    /// End the interview from any non-terminal state.
    ///
    /// The phase flips to `Ended` before the report round trip resolves, so
    /// the UI is never stuck waiting on a network call the user no longer
    /// cares about.  Ending is not retractable.
    pub async fn end_interview(&mut self) {
        if self.state.phase == Phase::Ended {
            return;
        }

        // Best-effort stop of whichever port is live; completion is not
        // awaited — the resulting callbacks arrive stale and are discarded.
        match self.state.phase {
            Phase::Listening => self.capture.stop(),
            Phase::Speaking => self.speech.stop(),
            _ => {}
        }
        self.state.pending_transcript.clear();

        self.finish_interview().await;
    }

    /// Transition to `Ended` and fetch the performance report.
    async fn finish_interview(&mut self) {
        self.set_phase(Phase::Ended);
        self.set_status(STATUS_ENDED);
        self.export_transcript();

        let Some(session_id) = self.state.session.as_ref().map(|s| s.id) else {
            self.emit(UiEvent::Ended { report: None });
            return;
        };

        match self.backend.end(session_id).await {
            Ok(report) => {
                self.state.report = Some(report.clone());
                self.emit(UiEvent::Ended {
                    report: Some(report),
                });
            }
            Err(BackendError::Unauthorized) => {
                self.notify(Notice::Unauthorized);
                self.emit(UiEvent::Ended { report: None });
            }
            Err(e) => {
                log::warn!("controller: end-of-interview report fetch failed: {e}");
                self.notify(Notice::ReportUnavailable {
                    detail: e.to_string(),
                });
                self.emit(UiEvent::Ended { report: None });
            }
        }
    }

    /// An `Unauthorized` backend response invalidates the credential: the
    /// session is over and the external session manager must re-authenticate.
    fn force_unauthorized(&mut self) {
        log::error!("controller: backend rejected the credential");
        self.set_phase(Phase::Ended);
        self.notify(Notice::Unauthorized);
        self.emit(UiEvent::Ended { report: None });
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// Toggle the microphone.
    ///
    /// Idle → start capture; Listening → stop capture (submission follows
    /// once the engine delivers its final transcript and termination).  In
    /// every other phase the toggle is a no-op — the processing guard that
    /// prevents overlapping capture sessions.
    pub async fn toggle_capture(&mut self) {
        match self.state.phase {
            Phase::Idle => self.start_capture(),
            Phase::Listening => {
                log::debug!("controller: manual capture stop");
                self.capture.stop();
                // Transition out of Listening happens on CaptureEnded (or on
                // TranscriptFinal in push-to-talk mode).
            }
            _ => {
                log::debug!(
                    "controller: mic toggle ignored while {}",
                    self.state.phase.label()
                );
            }
        }
    }

    fn start_capture(&mut self) {
        if !self.capture_available {
            self.notify(Notice::CaptureUnavailable);
            return;
        }

        self.capture_gen += 1;
        let sink = CaptureSink::new(self.capture_gen, self.event_sender());

        match self.capture.start(sink) {
            Ok(()) => {
                self.set_phase(Phase::Listening);
                self.set_status(STATUS_LISTENING);
            }
            Err(CaptureError::Unsupported) => {
                log::warn!("controller: capture unsupported, switching to text-only mode");
                self.capture_available = false;
                self.emit(UiEvent::MicAvailable { available: false });
                self.notify(Notice::CaptureUnavailable);
            }
            Err(e) => {
                log::error!("controller: capture start failed: {e}");
                self.notify(Notice::RecognitionError {
                    detail: e.to_string(),
                });
            }
        }
    }

    fn on_transcript_interim(&mut self, generation: u64, text: String) {
        if self.stale_capture(generation) {
            return;
        }
        self.emit(UiEvent::Interim { text });
    }

    /// Accumulate a final transcript.  In push-to-talk mode receipt is
    /// itself the submission trigger; in continuous mode submission waits
    /// for stop or engine self-termination.
    async fn on_transcript_final(&mut self, generation: u64, text: String) {
        if self.stale_capture(generation) {
            return;
        }

        if !self.state.pending_transcript.is_empty() {
            self.state.pending_transcript.push(' ');
        }
        self.state.pending_transcript.push_str(text.trim());

        if self.mode == CaptureMode::PushToTalk {
            self.capture.stop();
            self.commit_pending().await;
        }
    }

    /// The capture engine terminated — by stop, silence detection, or error.
    /// An empty transcript aborts to `Idle` without contacting the backend.
    async fn on_capture_ended(&mut self, generation: u64) {
        if self.stale_capture(generation) {
            return;
        }
        self.commit_pending().await;
    }

    fn on_capture_failed(&mut self, generation: u64, error: CaptureError) {
        if self.stale_capture(generation) {
            return;
        }
        // Treated as a capture-ended event with whatever partial transcript
        // accumulated; the adapter delivers the matching CaptureEnded next.
        log::warn!("controller: recognition error: {error}");
        self.notify(Notice::RecognitionError {
            detail: error.to_string(),
        });
    }

    /// A capture callback is stale when its originating session was
    /// superseded or the controller already left `Listening`.
    fn stale_capture(&self, generation: u64) -> bool {
        if generation != self.capture_gen || self.state.phase != Phase::Listening {
            log::debug!(
                "controller: discarding stale capture callback (gen {generation}, phase {})",
                self.state.phase.label()
            );
            return true;
        }
        false
    }

    /// Submit the accumulated transcript, or abort back to idle when the
    /// user said nothing.
    async fn commit_pending(&mut self) {
        let pending = std::mem::take(&mut self.state.pending_transcript);
        let answer = pending.trim().to_string();

        if answer.is_empty() {
            log::debug!("controller: empty transcript, returning to idle");
            self.set_phase(Phase::Idle);
            self.set_status(STATUS_YOUR_TURN);
            return;
        }

        self.submit_answer(&answer).await;
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Submit an answer — the shared path for spoken and typed input.
    ///
    /// Preconditions: phase is `Idle` or `Listening` and the text is
    /// non-blank.  While a submission is in flight no second one can start
    /// (`AwaitingBackend` rejects), and a manual submission during live
    /// capture stops the microphone first so both paths cannot feed the
    /// same turn.
    pub async fn submit_answer(&mut self, text: &str) {
        let answer = text.trim();
        if answer.is_empty() {
            log::debug!("controller: blank submission ignored");
            return;
        }

        match self.state.phase {
            Phase::Idle => {}
            Phase::Listening => {
                self.capture.stop();
                self.state.pending_transcript.clear();
            }
            _ => {
                log::warn!(
                    "controller: submission rejected while {}",
                    self.state.phase.label()
                );
                return;
            }
        }

        let Some(session_id) = self.state.session.as_ref().map(|s| s.id) else {
            log::warn!("controller: submission before interview start ignored");
            return;
        };

        // Optimistic history entry, retained even if the request fails.
        self.push_message(TurnRole::User, answer.to_string());
        self.set_phase(Phase::AwaitingBackend);
        self.set_status(STATUS_PROCESSING);

        match self.backend.submit_answer(session_id, answer).await {
            Ok(resp) => {
                if let Some(session) = self.state.session.as_mut() {
                    session.turn_index += 1;
                }

                if resp.is_complete {
                    // The backend closed the interview; fetch the report
                    // instead of playing a next question.
                    if let Some(prompt) = resp.next_question.filter(|q| !q.is_empty()) {
                        self.push_message(TurnRole::Assistant, prompt);
                    }
                    self.finish_interview().await;
                    return;
                }

                let Some(prompt) = resp.next_question.filter(|q| !q.is_empty()) else {
                    log::warn!("controller: backend sent neither question nor completion");
                    self.set_phase(Phase::Idle);
                    self.set_status(STATUS_YOUR_TURN);
                    return;
                };

                self.push_message(TurnRole::Assistant, prompt.clone());
                if let Some(turn_index) = self.turn_index() {
                    self.emit(UiEvent::TurnAdvanced { turn_index });
                }

                self.deliver_prompt(&prompt, resp.audio_base64.as_deref());
            }
            Err(BackendError::Unauthorized) => self.force_unauthorized(),
            Err(e) => {
                log::error!("controller: submission failed: {e}");
                self.set_phase(Phase::Idle);
                self.notify(Notice::SubmissionFailed {
                    detail: e.to_string(),
                });
                self.set_status(STATUS_YOUR_TURN);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    /// Make a prompt audible: server audio when present, on-device
    /// synthesis otherwise, silence when neither is available.
    fn deliver_prompt(&mut self, prompt: &str, audio_base64: Option<&str>) {
        if let Some(clip) = decode_clip(audio_base64) {
            if self.start_playback(|speech, sink| speech.play_clip(clip, sink)) {
                return;
            }
        }

        let text = prompt.to_string();
        if self.start_playback(|speech, sink| speech.speak(&text, sink)) {
            return;
        }

        // Silent mode — the prompt is on screen, go straight back to idle.
        self.set_phase(Phase::Idle);
        self.set_status(STATUS_YOUR_TURN);
    }

    /// Start one utterance; returns `false` when the port declined and the
    /// caller should fall through to the next delivery strategy.
    fn start_playback(
        &mut self,
        begin: impl FnOnce(
            &dyn SpeechOutputPort,
            PlaybackSink,
        ) -> Result<(), SpeechError>,
    ) -> bool {
        self.playback_gen += 1;
        let sink = PlaybackSink::new(self.playback_gen, self.event_sender());

        match begin(self.speech.as_ref(), sink) {
            Ok(()) => {
                self.set_phase(Phase::Speaking);
                self.set_status(STATUS_SPEAKING);
                true
            }
            Err(SpeechError::Unsupported) => false,
            Err(e) => {
                log::warn!("controller: speech output declined: {e}");
                false
            }
        }
    }

    /// Valid only from `Speaking` with a current generation; anything else
    /// is a duplicate or stale engine callback and is ignored.
    fn on_playback_ended(&mut self, generation: u64) {
        if self.state.phase != Phase::Speaking || generation != self.playback_gen {
            log::debug!("controller: ignoring stray playback-ended (gen {generation})");
            return;
        }
        self.set_phase(Phase::Idle);
        self.set_status(STATUS_YOUR_TURN);
    }

    /// Playback failure is absorbed as immediate completion so the
    /// conversation never waits on audio that will not finish.
    fn on_playback_failed(&mut self, generation: u64, error: SpeechError) {
        if self.state.phase != Phase::Speaking || generation != self.playback_gen {
            return;
        }
        log::warn!("controller: playback failed: {error}");
        self.notify(Notice::PlaybackFailed {
            detail: error.to_string(),
        });
        self.on_playback_ended(generation);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase != phase {
            log::debug!(
                "controller: {} → {}",
                self.state.phase.label(),
                phase.label()
            );
            self.state.phase = phase;
            self.emit(UiEvent::Phase { phase });
        }
    }

    fn push_message(&mut self, role: TurnRole, text: String) {
        self.state.push(role, text.clone());
        self.emit(UiEvent::Message { role, text });
    }

    fn set_status(&mut self, text: &str) {
        self.emit(UiEvent::Status { text: text.into() });
    }

    fn notify(&mut self, notice: Notice) {
        self.emit(UiEvent::Notice { notice });
    }

    fn emit(&mut self, event: UiEvent) {
        let _ = self.ui.send(event);
    }

    /// Best-effort transcript export; failure is logged, never fatal.
    fn export_transcript(&self) {
        let Some(path) = &self.transcript_path else {
            return;
        };
        match self.state.export_json(path) {
            Ok(()) => log::info!("controller: transcript exported to {}", path.display()),
            Err(e) => log::warn!("controller: transcript export failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Audio payload decoding
// ---------------------------------------------------------------------------

/// Decode a base64 audio payload.  Absent, empty, or undecodable payloads
/// all yield `None` so the caller falls back to on-device synthesis.
fn decode_clip(audio_base64: Option<&str>) -> Option<Vec<u8>> {
    let encoded = audio_base64?.trim();
    if encoded.is_empty() {
        return None;
    }
    match BASE64.decode(encoded) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => None,
        Err(e) => {
            log::warn!("controller: discarding undecodable audio payload: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AnswerResponse, MockBackend, PerformanceReport, StartResponse};
    use crate::capture::MockCapturePort;
    use crate::speech::MockSpeechOutput;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    struct Harness {
        controller: TurnController,
        backend: Arc<MockBackend>,
        capture: Arc<MockCapturePort>,
        speech: Arc<MockSpeechOutput>,
        ui_rx: mpsc::UnboundedReceiver<UiEvent>,
        // Kept alive so the sinks the controller mints stay deliverable.
        _events_tx: mpsc::UnboundedSender<TurnEvent>,
        _inbox: mpsc::UnboundedReceiver<TurnEvent>,
    }

    fn harness(mode: CaptureMode, backend: MockBackend, speech: MockSpeechOutput) -> Harness {
        let backend = Arc::new(backend);
        let capture = Arc::new(MockCapturePort::ok());
        let speech = Arc::new(speech);
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();

        let (controller, events_tx, inbox) = TurnController::new(
            Arc::clone(&capture) as Arc<dyn SpeechInputPort>,
            Arc::clone(&speech) as Arc<dyn SpeechOutputPort>,
            Arc::clone(&backend) as Arc<dyn BackendSession>,
            mode,
            ui_tx,
        );

        Harness {
            controller,
            backend,
            capture,
            speech,
            ui_rx,
            _events_tx: events_tx,
            _inbox: inbox,
        }
    }

    fn start_response(question: &str, audio: Option<&str>) -> StartResponse {
        StartResponse {
            first_question: question.into(),
            audio_base64: audio.map(|s| s.to_string()),
        }
    }

    fn answer_response(question: Option<&str>, audio: Option<&str>, complete: bool) -> AnswerResponse {
        AnswerResponse {
            next_question: question.map(|s| s.to_string()),
            audio_base64: audio.map(|s| s.to_string()),
            is_complete: complete,
        }
    }

    fn sample_report() -> PerformanceReport {
        PerformanceReport {
            overall_score: 75.0,
            accuracy_score: 7.0,
            clarity_score: 8.0,
            confidence_score: 7.0,
            strengths: vec!["structure".into()],
            weaknesses: vec![],
            improvements: vec![],
            summary: "good".into(),
            comparison: None,
        }
    }

    fn drain_ui(rx: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn count_notices(events: &[UiEvent], pred: impl Fn(&Notice) -> bool) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, UiEvent::Notice { notice } if pred(notice)))
            .count()
    }

    /// "QUJD" is base64 for "ABC" — a stand-in compressed audio clip.
    const CLIP_B64: &str = "QUJD";

    // -----------------------------------------------------------------------
    // Happy path / begin
    // -----------------------------------------------------------------------

    /// Begin with server audio: Speaking, then playback ends back to Idle
    /// with turn_index = 1.
    #[tokio::test]
    async fn happy_path_start_speaks_then_returns_to_idle() {
        let backend = MockBackend::new().with_start(Ok(start_response(
            "Tell me about a challenge...",
            Some(CLIP_B64),
        )));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(17).await;

        assert_eq!(h.controller.phase(), Phase::Speaking);
        assert_eq!(h.controller.turn_index(), Some(1));
        // Server audio must reach play_clip, decoded from base64.
        assert_eq!(h.speech.clips(), vec![b"ABC".to_vec()]);
        assert!(h.speech.spoken().is_empty());

        h.controller
            .handle_event(TurnEvent::PlaybackEnded { generation: 1 })
            .await;

        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.controller.turn_index(), Some(1));
    }

    #[tokio::test]
    async fn begin_without_audio_synthesizes_the_question() {
        let backend =
            MockBackend::new().with_start(Ok(start_response("First question", None)));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(1).await;

        assert_eq!(h.controller.phase(), Phase::Speaking);
        assert_eq!(h.speech.spoken(), vec!["First question"]);
    }

    #[tokio::test]
    async fn begin_in_silent_mode_goes_straight_to_idle() {
        let backend =
            MockBackend::new().with_start(Ok(start_response("First question", None)));
        let mut h = harness(
            CaptureMode::PushToTalk,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;

        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.controller.turn_index(), Some(1));
    }

    #[tokio::test]
    async fn failed_begin_leaves_no_partial_session() {
        let backend =
            MockBackend::new().with_start(Err(BackendError::Request("refused".into())));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(1).await;

        assert_eq!(h.controller.phase(), Phase::Idle);
        assert!(h.controller.state().session.is_none());
        assert!(h.controller.state().history.is_empty());

        let events = drain_ui(&mut h.ui_rx);
        assert_eq!(
            count_notices(&events, |n| matches!(n, Notice::StartFailed { .. })),
            1
        );
    }

    /// Tie-break: a second begin is rejected with AlreadyStarted and does
    /// not restart the timer or the turn counter.
    #[tokio::test]
    async fn duplicate_begin_is_rejected() {
        let backend = MockBackend::new().with_start(Ok(start_response("Q1", None)));
        let mut h = harness(
            CaptureMode::PushToTalk,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        let started_at = h.controller.state().session.as_ref().unwrap().started_at;

        h.controller.begin_interview(1).await;

        assert_eq!(h.backend.call_count("start"), 1);
        assert_eq!(h.controller.turn_index(), Some(1));
        assert_eq!(
            h.controller.state().session.as_ref().unwrap().started_at,
            started_at
        );

        let events = drain_ui(&mut h.ui_rx);
        assert_eq!(
            count_notices(&events, |n| matches!(n, Notice::AlreadyStarted)),
            1
        );
    }

    // -----------------------------------------------------------------------
    // Push-to-talk turn
    // -----------------------------------------------------------------------

    /// Full push-to-talk turn: toggle, final transcript, submit; the next
    /// question carries no audio (silent output) so the phase lands on
    /// Idle with turn_index = 2.
    #[tokio::test]
    async fn push_to_talk_full_turn() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Ok(answer_response(
                Some("What was the outcome?"),
                None,
                false,
            )));
        let mut h = harness(
            CaptureMode::PushToTalk,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        assert_eq!(h.controller.phase(), Phase::Idle);

        h.controller.toggle_capture().await;
        assert_eq!(h.controller.phase(), Phase::Listening);
        assert_eq!(h.capture.starts(), 1);

        h.controller
            .handle_event(TurnEvent::TranscriptFinal {
                generation: 1,
                text: "I led a migration project".into(),
            })
            .await;

        // Final transcript triggered stop + submit in push-to-talk mode.
        assert!(h.capture.stops() >= 1);
        assert_eq!(h.backend.call_count("answer"), 1);
        assert_eq!(
            h.backend.calls.lock().unwrap()[1],
            "answer:I led a migration project"
        );
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.controller.turn_index(), Some(2));

        let history = &h.controller.state().history;
        let texts: Vec<_> = history.iter().map(|e| e.text.as_str()).collect();
        assert!(texts.contains(&"I led a migration project"));
        assert!(texts.contains(&"What was the outcome?"));
    }

    /// A delayed capture-ended from an already-submitted turn must be
    /// discarded with no state change.
    #[tokio::test]
    async fn stale_capture_ended_after_submission_is_discarded() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Ok(answer_response(Some("Q2"), None, false)));
        let mut h = harness(
            CaptureMode::PushToTalk,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.toggle_capture().await;
        h.controller
            .handle_event(TurnEvent::TranscriptFinal {
                generation: 1,
                text: "answer one".into(),
            })
            .await;
        assert_eq!(h.controller.phase(), Phase::Idle);

        // The engine's onend arrives late, after the turn already advanced.
        h.controller
            .handle_event(TurnEvent::CaptureEnded { generation: 1 })
            .await;

        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.backend.call_count("answer"), 1);
        assert_eq!(h.controller.turn_index(), Some(2));
    }

    /// Boundary: capture that ends with nothing recognized returns to Idle
    /// and never contacts the backend.
    #[tokio::test]
    async fn empty_capture_aborts_without_backend_call() {
        let backend = MockBackend::new().with_start(Ok(start_response("Q1", None)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.toggle_capture().await;
        assert_eq!(h.controller.phase(), Phase::Listening);

        // Engine self-terminated (silence timeout) with no transcript.
        h.controller
            .handle_event(TurnEvent::CaptureEnded { generation: 1 })
            .await;

        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.backend.call_count("answer"), 0);
        assert!(h.controller.state().pending_transcript.is_empty());
    }

    /// Toggling while a submission is in flight (or audio is playing) is a
    /// no-op; no second capture session can start.
    #[tokio::test]
    async fn toggle_is_ignored_while_speaking() {
        let backend =
            MockBackend::new().with_start(Ok(start_response("Q1", Some(CLIP_B64))));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(1).await;
        assert_eq!(h.controller.phase(), Phase::Speaking);

        h.controller.toggle_capture().await;

        assert_eq!(h.controller.phase(), Phase::Speaking);
        assert_eq!(h.capture.starts(), 0);
    }

    // -----------------------------------------------------------------------
    // Continuous mode
    // -----------------------------------------------------------------------

    /// Continuous mode accumulates finals across pauses and submits only on
    /// termination.
    #[tokio::test]
    async fn continuous_mode_accumulates_until_capture_ends() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Ok(answer_response(Some("Q2"), None, false)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.toggle_capture().await;

        h.controller
            .handle_event(TurnEvent::TranscriptFinal {
                generation: 1,
                text: "I optimized the query".into(),
            })
            .await;
        h.controller
            .handle_event(TurnEvent::TranscriptFinal {
                generation: 1,
                text: "by adding an index".into(),
            })
            .await;

        // Still listening — finals do not trigger submission on their own.
        assert_eq!(h.controller.phase(), Phase::Listening);
        assert_eq!(h.backend.call_count("answer"), 0);

        h.controller
            .handle_event(TurnEvent::CaptureEnded { generation: 1 })
            .await;

        assert_eq!(
            h.backend.calls.lock().unwrap()[1],
            "answer:I optimized the query by adding an index"
        );
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn interim_results_are_forwarded_to_the_ui_only() {
        let backend = MockBackend::new().with_start(Ok(start_response("Q1", None)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.toggle_capture().await;
        drain_ui(&mut h.ui_rx);

        h.controller
            .handle_event(TurnEvent::TranscriptInterim {
                generation: 1,
                text: "i opti".into(),
            })
            .await;

        let events = drain_ui(&mut h.ui_rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::Interim { text } if text == "i opti")));
        assert!(h.controller.state().pending_transcript.is_empty());
    }

    // -----------------------------------------------------------------------
    // Manual text submission
    // -----------------------------------------------------------------------

    /// One submission produces exactly one optimistic User entry with the
    /// exact text, and exactly one success-or-failure transition.
    #[tokio::test]
    async fn manual_submission_records_one_optimistic_entry() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Ok(answer_response(Some("Q2"), None, false)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller
            .submit_answer("I optimized the query by adding an index")
            .await;

        let user_entries: Vec<_> = h
            .controller
            .state()
            .history
            .iter()
            .filter(|e| e.role == TurnRole::User)
            .collect();
        assert_eq!(user_entries.len(), 1);
        assert_eq!(
            user_entries[0].text,
            "I optimized the query by adding an index"
        );
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    /// Boundary: blank submissions never trigger a backend call.
    #[tokio::test]
    async fn blank_submission_never_reaches_the_backend() {
        let backend = MockBackend::new().with_start(Ok(start_response("Q1", None)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.submit_answer("   ").await;
        h.controller.submit_answer("").await;

        assert_eq!(h.backend.call_count("answer"), 0);
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    /// Manual submission while listening stops capture first — capture and
    /// the manual path cannot both feed the same turn.
    #[tokio::test]
    async fn manual_submission_while_listening_stops_capture() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Ok(answer_response(Some("Q2"), None, false)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.toggle_capture().await;
        h.controller
            .handle_event(TurnEvent::TranscriptFinal {
                generation: 1,
                text: "half dictated".into(),
            })
            .await;

        h.controller.submit_answer("typed answer instead").await;

        assert_eq!(h.capture.stops(), 1);
        assert!(h.controller.state().pending_transcript.is_empty());
        assert_eq!(
            h.backend.calls.lock().unwrap()[1],
            "answer:typed answer instead"
        );

        // The stale capture-ended from the stopped session changes nothing.
        h.controller
            .handle_event(TurnEvent::CaptureEnded { generation: 1 })
            .await;
        assert_eq!(h.backend.call_count("answer"), 1);
    }

    /// At-most-one-in-flight: submissions while AwaitingBackend would be
    /// rejected — here exercised via the phase guard directly.
    #[tokio::test]
    async fn submission_before_start_is_ignored() {
        let backend = MockBackend::new();
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.submit_answer("anything").await;

        assert_eq!(h.backend.call_count("answer"), 0);
        assert!(h.controller.state().history.is_empty());
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    /// On network failure the phase returns to Idle, the optimistic entry
    /// remains, and exactly one SubmissionFailed notice is emitted.
    #[tokio::test]
    async fn submission_failure_keeps_optimistic_entry() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Err(BackendError::Request("connection reset".into())));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        drain_ui(&mut h.ui_rx);

        h.controller.submit_answer("my answer").await;

        assert_eq!(h.controller.phase(), Phase::Idle);
        assert!(h
            .controller
            .state()
            .history
            .iter()
            .any(|e| e.role == TurnRole::User && e.text == "my answer"));
        // Not retried automatically.
        assert_eq!(h.backend.call_count("answer"), 1);
        // turn_index unchanged on failure.
        assert_eq!(h.controller.turn_index(), Some(1));

        let events = drain_ui(&mut h.ui_rx);
        assert_eq!(
            count_notices(&events, |n| matches!(n, Notice::SubmissionFailed { .. })),
            1
        );
    }

    /// The user may resubmit after a failure; the retry is a fresh request.
    #[tokio::test]
    async fn user_can_resubmit_after_failure() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Err(BackendError::Timeout))
            .with_answer(Ok(answer_response(Some("Q2"), None, false)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.submit_answer("first try").await;
        assert_eq!(h.controller.phase(), Phase::Idle);

        h.controller.submit_answer("first try").await;
        assert_eq!(h.controller.phase(), Phase::Idle);
        assert_eq!(h.controller.turn_index(), Some(2));
        assert_eq!(h.backend.call_count("answer"), 2);
    }

    /// Unauthorized is terminal: forced Ended, never silently retried.
    #[tokio::test]
    async fn unauthorized_submission_forces_ended() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Err(BackendError::Unauthorized));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        drain_ui(&mut h.ui_rx);

        h.controller.submit_answer("answer").await;

        assert_eq!(h.controller.phase(), Phase::Ended);
        let events = drain_ui(&mut h.ui_rx);
        assert_eq!(count_notices(&events, |n| matches!(n, Notice::Unauthorized)), 1);
        assert_eq!(h.backend.call_count("answer"), 1);
    }

    /// Recognition errors surface a notice but never crash the controller;
    /// the partial transcript still submits on the ended signal.
    #[tokio::test]
    async fn recognition_error_submits_partial_transcript() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Ok(answer_response(Some("Q2"), None, false)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.toggle_capture().await;
        h.controller
            .handle_event(TurnEvent::TranscriptFinal {
                generation: 1,
                text: "partial answer".into(),
            })
            .await;
        h.controller
            .handle_event(TurnEvent::CaptureFailed {
                generation: 1,
                error: CaptureError::Recognition("network".into()),
            })
            .await;
        h.controller
            .handle_event(TurnEvent::CaptureEnded { generation: 1 })
            .await;

        assert_eq!(h.backend.calls.lock().unwrap()[1], "answer:partial answer");
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    // -----------------------------------------------------------------------
    // Playback edge cases
    // -----------------------------------------------------------------------

    /// Idempotence: playback-ended outside Speaking leaves state unchanged.
    #[tokio::test]
    async fn stray_playback_ended_is_ignored() {
        let backend = MockBackend::new().with_start(Ok(start_response("Q1", None)));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        assert_eq!(h.controller.phase(), Phase::Idle);

        h.controller
            .handle_event(TurnEvent::PlaybackEnded { generation: 1 })
            .await;
        h.controller
            .handle_event(TurnEvent::PlaybackEnded { generation: 99 })
            .await;

        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    /// Duplicate onend firing from the engine: only the first counts.
    #[tokio::test]
    async fn duplicate_playback_ended_is_ignored() {
        let backend =
            MockBackend::new().with_start(Ok(start_response("Q1", Some(CLIP_B64))));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(1).await;
        assert_eq!(h.controller.phase(), Phase::Speaking);

        h.controller
            .handle_event(TurnEvent::PlaybackEnded { generation: 1 })
            .await;
        assert_eq!(h.controller.phase(), Phase::Idle);

        h.controller
            .handle_event(TurnEvent::PlaybackEnded { generation: 1 })
            .await;
        assert_eq!(h.controller.phase(), Phase::Idle);
    }

    /// Playback failure behaves as immediate completion.
    #[tokio::test]
    async fn playback_failure_is_absorbed_as_completion() {
        let backend =
            MockBackend::new().with_start(Ok(start_response("Q1", Some(CLIP_B64))));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(1).await;
        drain_ui(&mut h.ui_rx);

        h.controller
            .handle_event(TurnEvent::PlaybackFailed {
                generation: 1,
                error: SpeechError::Playback("decoder".into()),
            })
            .await;

        assert_eq!(h.controller.phase(), Phase::Idle);
        let events = drain_ui(&mut h.ui_rx);
        assert_eq!(
            count_notices(&events, |n| matches!(n, Notice::PlaybackFailed { .. })),
            1
        );
    }

    /// An undecodable audio payload falls back to on-device synthesis.
    #[tokio::test]
    async fn invalid_audio_payload_falls_back_to_synthesis() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", Some("not-base64!!!"))));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(1).await;

        assert!(h.speech.clips().is_empty());
        assert_eq!(h.speech.spoken(), vec!["Q1"]);
        assert_eq!(h.controller.phase(), Phase::Speaking);
    }

    // -----------------------------------------------------------------------
    // Completion and ending
    // -----------------------------------------------------------------------

    /// is_complete triggers the end call, stores the report, and accepts
    /// no further actions.
    #[tokio::test]
    async fn completion_fetches_report_and_locks_the_session() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_answer(Ok(answer_response(None, None, true)))
            .with_end(Ok(sample_report()));
        let mut h = harness(
            CaptureMode::PushToTalk,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.submit_answer("final answer").await;

        assert_eq!(h.controller.phase(), Phase::Ended);
        assert_eq!(h.backend.call_count("end"), 1);
        assert_eq!(
            h.controller.state().report.as_ref().map(|r| r.overall_score),
            Some(75.0)
        );

        // No further capture or submissions are accepted.
        h.controller.toggle_capture().await;
        h.controller.submit_answer("too late").await;
        assert_eq!(h.capture.starts(), 0);
        assert_eq!(h.backend.call_count("answer"), 1);
    }

    /// Ending from Speaking force-stops the output port and never blocks on
    /// its acknowledgment.
    #[tokio::test]
    async fn end_while_speaking_stops_playback() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", Some(CLIP_B64))))
            .with_end(Ok(sample_report()));
        let mut h = harness(CaptureMode::PushToTalk, backend, MockSpeechOutput::ok());

        h.controller.begin_interview(1).await;
        assert_eq!(h.controller.phase(), Phase::Speaking);

        h.controller.end_interview().await;

        assert_eq!(h.controller.phase(), Phase::Ended);
        assert_eq!(h.speech.stops(), 1);

        // The playback-ended from the aborted clip arrives stale.
        h.controller
            .handle_event(TurnEvent::PlaybackEnded { generation: 1 })
            .await;
        assert_eq!(h.controller.phase(), Phase::Ended);
    }

    /// Ending from Listening force-stops capture and discards the pending
    /// transcript.
    #[tokio::test]
    async fn end_while_listening_stops_capture() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_end(Ok(sample_report()));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.toggle_capture().await;
        h.controller
            .handle_event(TurnEvent::TranscriptFinal {
                generation: 1,
                text: "unfinished thought".into(),
            })
            .await;

        h.controller.end_interview().await;

        assert_eq!(h.controller.phase(), Phase::Ended);
        assert_eq!(h.capture.stops(), 1);
        assert!(h.controller.state().pending_transcript.is_empty());
        // The pending transcript was never submitted.
        assert_eq!(h.backend.call_count("answer"), 0);
    }

    /// Ending still reaches `Ended` when the report fetch fails; the
    /// failure is surfaced as ReportUnavailable instead of blocking exit.
    #[tokio::test]
    async fn end_reaches_ended_even_when_report_fetch_fails() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_end(Err(BackendError::Timeout));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        drain_ui(&mut h.ui_rx);

        h.controller.end_interview().await;

        assert_eq!(h.controller.phase(), Phase::Ended);
        assert!(h.controller.state().report.is_none());

        let events = drain_ui(&mut h.ui_rx);
        assert_eq!(
            count_notices(&events, |n| matches!(n, Notice::ReportUnavailable { .. })),
            1
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::Ended { report: None })));
    }

    /// Ending twice is harmless.
    #[tokio::test]
    async fn end_is_idempotent() {
        let backend = MockBackend::new()
            .with_start(Ok(start_response("Q1", None)))
            .with_end(Ok(sample_report()));
        let mut h = harness(
            CaptureMode::Continuous,
            backend,
            MockSpeechOutput::unavailable(),
        );

        h.controller.begin_interview(1).await;
        h.controller.end_interview().await;
        h.controller.end_interview().await;

        assert_eq!(h.backend.call_count("end"), 1);
        assert_eq!(h.controller.phase(), Phase::Ended);
    }

    // -----------------------------------------------------------------------
    // Text-only fallback
    // -----------------------------------------------------------------------

    /// Unsupported capture disables the microphone for the session instead
    /// of crashing; typing still works.
    #[tokio::test]
    async fn unsupported_capture_switches_to_text_only_mode() {
        let backend = Arc::new(
            MockBackend::new()
                .with_start(Ok(start_response("Q1", None)))
                .with_answer(Ok(answer_response(Some("Q2"), None, false))),
        );
        let capture = Arc::new(MockCapturePort::unsupported());
        let speech = Arc::new(MockSpeechOutput::unavailable());
        let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();

        let (mut controller, _events_tx, _inbox) = TurnController::new(
            Arc::clone(&capture) as Arc<dyn SpeechInputPort>,
            Arc::clone(&speech) as Arc<dyn SpeechOutputPort>,
            Arc::clone(&backend) as Arc<dyn BackendSession>,
            CaptureMode::Continuous,
            ui_tx,
        );

        controller.begin_interview(1).await;
        drain_ui(&mut ui_rx);

        controller.toggle_capture().await;
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(capture.starts(), 1);

        let events = drain_ui(&mut ui_rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, UiEvent::MicAvailable { available: false })));
        assert_eq!(
            count_notices(&events, |n| matches!(n, Notice::CaptureUnavailable)),
            1
        );

        // Later toggles do not retry the engine.
        controller.toggle_capture().await;
        assert_eq!(capture.starts(), 1);

        // Manual text submission still works.
        controller.submit_answer("typed answer").await;
        assert_eq!(backend.call_count("answer"), 1);
        assert_eq!(controller.phase(), Phase::Idle);
    }

    // -----------------------------------------------------------------------
    // Event-loop driving
    // -----------------------------------------------------------------------

    /// The same flow through the channel-driven run loop.
    #[tokio::test]
    async fn run_loop_processes_events_in_arrival_order() {
        let backend = Arc::new(
            MockBackend::new()
                .with_start(Ok(start_response("Q1", None)))
                .with_answer(Ok(answer_response(Some("Q2"), None, false)))
                .with_end(Ok(sample_report())),
        );
        let capture = Arc::new(MockCapturePort::ok());
        let speech = Arc::new(MockSpeechOutput::unavailable());
        let (ui_tx, _ui_rx) = mpsc::unbounded_channel();

        let (mut controller, tx, inbox) = TurnController::new(
            capture as Arc<dyn SpeechInputPort>,
            speech as Arc<dyn SpeechOutputPort>,
            Arc::clone(&backend) as Arc<dyn BackendSession>,
            CaptureMode::Continuous,
            ui_tx,
        );

        tx.send(TurnEvent::BeginInterview { interview_id: 5 }).unwrap();
        tx.send(TurnEvent::SubmitText {
            text: "answer one".into(),
        })
        .unwrap();
        tx.send(TurnEvent::EndInterview).unwrap();
        drop(tx);

        controller.run(inbox).await;

        assert_eq!(controller.phase(), Phase::Ended);
        assert_eq!(controller.turn_index(), Some(2));
        assert!(controller.state().report.is_some());
        assert_eq!(
            *backend.calls.lock().unwrap(),
            ["start", "answer:answer one", "end"]
        );
    }

    // -----------------------------------------------------------------------
    // Transcript export
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn ending_exports_the_transcript_when_configured() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("interview-9.json");

        let backend = Arc::new(
            MockBackend::new()
                .with_start(Ok(start_response("Q1", None)))
                .with_answer(Ok(answer_response(Some("Q2"), None, false)))
                .with_end(Ok(sample_report())),
        );
        let (ui_tx, _ui_rx) = mpsc::unbounded_channel();
        let (controller, _tx, _rx) = TurnController::new(
            Arc::new(MockCapturePort::ok()) as Arc<dyn SpeechInputPort>,
            Arc::new(MockSpeechOutput::unavailable()) as Arc<dyn SpeechOutputPort>,
            Arc::clone(&backend) as Arc<dyn BackendSession>,
            CaptureMode::Continuous,
            ui_tx,
        );
        let mut controller = controller.with_transcript_export(path.clone());

        controller.begin_interview(9).await;
        controller.submit_answer("spoken answer").await;
        controller.end_interview().await;

        let content = std::fs::read_to_string(&path).expect("transcript written");
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["interview_id"], 9);
        let history = value["history"].as_array().unwrap();
        assert!(history
            .iter()
            .any(|e| e["role"] == "user" && e["text"] == "spoken answer"));
    }

    // -----------------------------------------------------------------------
    // decode_clip
    // -----------------------------------------------------------------------

    #[test]
    fn decode_clip_handles_all_payload_shapes() {
        assert_eq!(decode_clip(Some(CLIP_B64)), Some(b"ABC".to_vec()));
        assert_eq!(decode_clip(Some("")), None);
        assert_eq!(decode_clip(Some("   ")), None);
        assert_eq!(decode_clip(Some("!!!not base64")), None);
        assert_eq!(decode_clip(None), None);
    }
}

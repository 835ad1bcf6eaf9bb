//! Speech output over a rodio playback sink.
//!
//! [`PlaybackSpeech`] is the production [`SpeechOutputPort`]: server-provided
//! clips are decoded and played directly; plain text goes through a
//! [`SynthBackend`] first.  Audio I/O runs on a dedicated thread because the
//! platform output stream is not `Send`; completion is reported back through
//! the caller's [`PlaybackSink`] once the sink drains.
//!
//! [`MutedSpeech`] is the silent-mode port for environments with no audio
//! output at all.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::controller::PlaybackSink;

use super::port::{sanitize_for_speech, SpeechError, SpeechOutputPort};
use super::synth::SynthBackend;

// ---------------------------------------------------------------------------
// PlaybackSpeech
// ---------------------------------------------------------------------------

/// One decode-and-play request for the audio thread.
struct PlaybackJob {
    bytes: Vec<u8>,
    done: PlaybackSink,
}

/// Production [`SpeechOutputPort`] backed by a rodio output device.
///
/// Construct with [`PlaybackSpeech::new`] from inside a tokio runtime;
/// `speak` spawns the synthesis call as a task so the caller never blocks.
pub struct PlaybackSpeech {
    jobs: std::sync::mpsc::Sender<PlaybackJob>,
    sink: Arc<Sink>,
    speaking: Arc<AtomicBool>,
    synth: Arc<dyn SynthBackend>,
    voice: Option<String>,
}

impl PlaybackSpeech {
    /// Open the default output device and spawn the playback thread.
    ///
    /// # Errors
    ///
    /// [`SpeechError::Unsupported`] when no output device exists (headless
    /// hosts); the caller should degrade to [`MutedSpeech`].
    pub fn new(
        synth: Arc<dyn SynthBackend>,
        voice: Option<String>,
    ) -> Result<Self, SpeechError> {
        let (job_tx, job_rx) = std::sync::mpsc::channel::<PlaybackJob>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let speaking = Arc::new(AtomicBool::new(false));
        let speaking_thread = Arc::clone(&speaking);

        std::thread::Builder::new()
            .name("speech-playback".into())
            .spawn(move || {
                // The output stream must live on this thread; it is not Send.
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(SpeechError::Unsupported));
                        log::warn!("speech: no output device available: {e}");
                        return;
                    }
                };
                let sink = match Sink::try_new(&handle) {
                    Ok(s) => Arc::new(s),
                    Err(e) => {
                        let _ = ready_tx.send(Err(SpeechError::Playback(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(Arc::clone(&sink)));

                while let Ok(job) = job_rx.recv() {
                    match Decoder::new(Cursor::new(job.bytes)) {
                        Ok(source) => {
                            sink.append(source.convert_samples::<f32>());
                            sink.sleep_until_end();
                            speaking_thread.store(false, Ordering::SeqCst);
                            job.done.ended();
                        }
                        Err(e) => {
                            speaking_thread.store(false, Ordering::SeqCst);
                            job.done
                                .failed(SpeechError::Playback(format!("decode failed: {e}")));
                        }
                    }
                }
            })
            .map_err(|e| SpeechError::Playback(e.to_string()))?;

        let sink = ready_rx
            .recv()
            .map_err(|_| SpeechError::Unsupported)??;

        Ok(Self {
            jobs: job_tx,
            sink,
            speaking,
            synth,
            voice,
        })
    }

    /// Claim the single utterance slot, or fail with `Busy`.
    fn claim(&self) -> Result<(), SpeechError> {
        if self.speaking.swap(true, Ordering::SeqCst) {
            return Err(SpeechError::Busy);
        }
        Ok(())
    }

    fn release(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn enqueue(&self, bytes: Vec<u8>, done: PlaybackSink) -> Result<(), SpeechError> {
        self.jobs
            .send(PlaybackJob { bytes, done })
            .map_err(|_| SpeechError::Playback("playback thread is gone".into()))
    }
}

impl SpeechOutputPort for PlaybackSpeech {
    fn speak(&self, text: &str, sink: PlaybackSink) -> Result<(), SpeechError> {
        self.claim()?;

        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            self.release();
            return Err(SpeechError::Synthesis("nothing to say".into()));
        }

        let synth = Arc::clone(&self.synth);
        let voice = self.voice.clone();
        let jobs = self.jobs.clone();
        let speaking = Arc::clone(&self.speaking);

        tokio::spawn(async move {
            match synth.synthesize(&clean, voice.as_deref()).await {
                Ok(bytes) if !bytes.is_empty() => {
                    if jobs.send(PlaybackJob { bytes, done: sink }).is_err() {
                        speaking.store(false, Ordering::SeqCst);
                    }
                }
                Ok(_) => {
                    // Backend had nothing to play; complete immediately.
                    speaking.store(false, Ordering::SeqCst);
                    sink.ended();
                }
                Err(e) => {
                    speaking.store(false, Ordering::SeqCst);
                    sink.failed(e);
                }
            }
        });

        Ok(())
    }

    fn play_clip(&self, clip: Vec<u8>, sink: PlaybackSink) -> Result<(), SpeechError> {
        self.claim()?;

        if clip.is_empty() {
            self.release();
            return Err(SpeechError::Playback("empty audio clip".into()));
        }

        if let Err(e) = self.enqueue(clip, sink) {
            self.release();
            return Err(e);
        }
        Ok(())
    }

    fn stop(&self) {
        // Empties the rodio queue; sleep_until_end on the playback thread
        // returns promptly and reports completion through the job's sink.
        self.sink.stop();
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// MutedSpeech
// ---------------------------------------------------------------------------

/// Port for silent mode — no output device, synthesis disabled, or the user
/// opted out.  Every utterance is rejected with `Unsupported` so the
/// controller falls straight through to idle.
#[derive(Debug, Default)]
pub struct MutedSpeech;

impl SpeechOutputPort for MutedSpeech {
    fn speak(&self, _text: &str, _sink: PlaybackSink) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported)
    }

    fn play_clip(&self, _clip: Vec<u8>, _sink: PlaybackSink) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported)
    }

    fn stop(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Application entry point — terminal interview client.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the interview id from the command line.
//! 3. Load [`AppConfig`] from disk (returns default on first run).
//! 4. Build the speech output port — rodio playback with API synthesis, or
//!    silent mode when no output device exists.
//! 5. Build the backend session from config.
//! 6. Create the turn controller and spawn its event loop.
//! 7. Start the interview, then bridge stdin lines and UI events until the
//!    interview ends.
//!
//! This build links no speech-recognition engine, so the microphone toggle
//! reports unavailable and the client runs text-first; embedders plug a real
//! engine in through [`interview_voice::capture::RecognitionEngine`].

use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use interview_voice::{
    backend::{ApiSession, PerformanceReport},
    capture::UnsupportedCapture,
    config::{AppConfig, AppPaths},
    controller::{TurnController, TurnEvent, TurnRole, UiEvent},
    speech::{ApiSynth, MutedSpeech, PlaybackSpeech, SpeechOutputPort},
};

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("interview client starting up");

    // 2. Interview id
    let interview_id: i64 = std::env::args()
        .nth(1)
        .context("usage: interview-voice <interview-id>")?
        .parse()
        .context("interview id must be an integer")?;

    // 3. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 4. Speech output — degrade to silent mode rather than fail startup.
    let speech: Arc<dyn SpeechOutputPort> = if config.synth.enabled {
        let synth = Arc::new(ApiSynth::from_config(&config.synth));
        match PlaybackSpeech::new(synth, config.synth.voice.clone()) {
            Ok(port) => {
                log::info!("audio output ready");
                Arc::new(port)
            }
            Err(e) => {
                log::warn!("audio output unavailable ({e}); running silent");
                Arc::new(MutedSpeech)
            }
        }
    } else {
        Arc::new(MutedSpeech)
    };

    // 5. Backend session
    let backend = Arc::new(ApiSession::from_config(&config.backend));

    // 6. Controller
    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (controller, events, inbox) = TurnController::new(
        Arc::new(UnsupportedCapture),
        speech,
        backend,
        config.capture.mode,
        ui_tx,
    );

    let mut controller = if config.transcript.export {
        controller.with_transcript_export(AppPaths::new().transcript_file(interview_id))
    } else {
        controller
    };

    tokio::spawn(async move { controller.run(inbox).await });

    // 7. Start the interview and run the terminal loop.
    events.send(TurnEvent::BeginInterview { interview_id })?;

    println!("Interview {interview_id} — type your answer and press Enter.");
    println!("Commands: /mic toggles the microphone, /end finishes the interview.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = ui_rx.recv() => {
                match event {
                    Some(event) => {
                        if render(event) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        let input = line.trim();
                        if input.is_empty() {
                            continue;
                        }
                        let event = match input {
                            "/end" => TurnEvent::EndInterview,
                            "/mic" => TurnEvent::ToggleCapture,
                            text => TurnEvent::SubmitText {
                                text: text.to_string(),
                            },
                        };
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    // stdin closed — treat like pressing the end button.
                    None => {
                        stdin_open = false;
                        let _ = events.send(TurnEvent::EndInterview);
                    }
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Terminal rendering
// ---------------------------------------------------------------------------

/// Render one UI event; returns `true` once the interview has ended.
fn render(event: UiEvent) -> bool {
    match event {
        UiEvent::Message { role, text } => match role {
            TurnRole::Assistant => println!("\ninterviewer: {text}"),
            TurnRole::User => println!("you: {text}"),
            TurnRole::System => {}
        },
        UiEvent::Interim { text } => println!("  (recognizing: {text})"),
        UiEvent::Status { text } => println!("  [{text}]"),
        UiEvent::Phase { .. } => {}
        UiEvent::TurnAdvanced { turn_index } => {
            log::debug!("question #{turn_index}");
        }
        UiEvent::MicAvailable { available } => {
            if !available {
                println!("  [microphone unavailable — text input only]");
            }
        }
        UiEvent::Notice { notice } => println!("  !! {notice}"),
        UiEvent::Ended { report } => {
            print_report(report.as_ref());
            return true;
        }
    }
    false
}

fn print_report(report: Option<&PerformanceReport>) {
    let Some(report) = report else {
        println!("\nInterview ended. The performance report could not be fetched.");
        return;
    };

    println!("\n================ Performance Report ================");
    println!("Overall score:    {:.0}/100", report.overall_score);
    println!("Accuracy:         {:.1}/10", report.accuracy_score);
    println!("Clarity:          {:.1}/10", report.clarity_score);
    println!("Confidence:       {:.1}/10", report.confidence_score);

    let sections: [(&str, &Vec<String>); 3] = [
        ("Strengths", &report.strengths),
        ("Weaknesses", &report.weaknesses),
        ("Improvements", &report.improvements),
    ];
    for (title, items) in sections {
        if !items.is_empty() {
            println!("\n{title}:");
            for item in items {
                println!("  - {item}");
            }
        }
    }

    if !report.summary.is_empty() {
        println!("\n{}", report.summary);
    }

    if let Some(cmp) = &report.comparison {
        let direction = if cmp.improvement >= 0.0 { "up" } else { "down" };
        println!(
            "\nCompared to your previous interview ({:.0}): {direction} {:.0} points.",
            cmp.previous_score,
            cmp.improvement.abs()
        );
    }
}

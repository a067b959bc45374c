//! Runtime wiring: engine construction, the controller, and the
//! interactive control loop.

use crate::config::{EngineKind, PapervoxConfig};
use crate::playback::{PlaybackController, PlaybackState};
use crate::telemetry::PlaybackMetrics;
use anyhow::Context;
use papervox_document::{PlaceholderRenderer, PreviewRenderer};
use papervox_foundation::{AppState, HealthMonitor, ShutdownGuard, ShutdownHandler, StateManager};
use papervox_tts::{SharedEngine, TtsEngine};
use papervox_tts_espeak::EspeakEngine;
use papervox_tts_piper::PiperEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct RuntimeOptions {
    pub config: PapervoxConfig,
    pub document: Option<PathBuf>,
    /// Convert the document to the configured audio file and exit instead
    /// of entering the interactive loop.
    pub convert_and_exit: bool,
}

pub async fn run(options: RuntimeOptions) -> anyhow::Result<()> {
    let state = StateManager::new();
    let metrics = Arc::new(PlaybackMetrics::default());
    let engine = build_engine(&options.config)?;
    let renderer: Arc<dyn PreviewRenderer> = Arc::new(PlaceholderRenderer::new());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut controller = PlaybackController::new(
        engine,
        renderer,
        options.config.playback_settings(),
        events_tx,
        Arc::clone(&metrics),
    );

    let shutdown = ShutdownHandler::new().install().await;
    let monitor = HealthMonitor::new(Duration::from_secs(10));
    monitor.register(Box::new(controller.stuck_probe()));
    let _monitor = monitor.start();

    state.transition(AppState::Running)?;

    if let Some(path) = &options.document {
        match controller.load_document(path) {
            Ok(loaded) => println!(
                "Loaded {} ({} pages)",
                loaded.path.display(),
                loaded.page_count
            ),
            Err(err) if options.convert_and_exit => {
                state.transition(AppState::Stopping)?;
                state.transition(AppState::Stopped)?;
                anyhow::bail!("could not load {}: {err}", path.display());
            }
            Err(err) => eprintln!("could not load {}: {err}", path.display()),
        }
    }

    if options.convert_and_exit {
        let output = controller
            .convert_to_file()
            .map_err(|err| anyhow::anyhow!("conversion failed: {err}"))?;
        info!("Converting to {}", output.display());
        while controller.is_busy() {
            match events_rx.recv().await {
                Some(event) => {
                    if let Some(notice) = controller.handle_event(event) {
                        println!("{notice}");
                    }
                }
                None => break,
            }
        }
    } else {
        print_help();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stats = tokio::time::interval(Duration::from_secs(30));
        stats.tick().await; // skip the immediate first tick

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if handle_command(&mut controller, line.trim(), &shutdown) {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            warn!("stdin error: {err}");
                            break;
                        }
                    }
                }
                Some(event) = events_rx.recv() => {
                    if let Some(notice) = controller.handle_event(event) {
                        println!("{notice}");
                    }
                }
                _ = shutdown.wait() => {
                    println!("Shutting down.");
                    break;
                }
                _ = stats.tick() => {
                    metrics.log_summary();
                }
            }
        }
    }

    state.transition(AppState::Stopping)?;
    controller.shutdown();
    state.transition(AppState::Stopped)?;
    info!("Shutdown complete");
    Ok(())
}

fn build_engine(config: &PapervoxConfig) -> anyhow::Result<SharedEngine> {
    let mut engine: Box<dyn TtsEngine> = match config.engine {
        EngineKind::Espeak => Box::new(EspeakEngine::new()),
        EngineKind::Piper => Box::new(PiperEngine::new(
            config.piper.model_path.clone(),
            config.piper.player_command.clone(),
        )),
    };
    let name = engine.name().to_string();
    if !engine.is_available() {
        warn!("{name} engine reports unavailable; initialization may fail");
    }
    engine
        .initialize(config.tts_config())
        .with_context(|| format!("failed to initialize {name} engine"))?;
    if let Some(voice) = &config.voice {
        engine
            .set_voice(voice)
            .with_context(|| format!("failed to select voice {voice}"))?;
    }
    info!("Speech engine ready: {name}");
    Ok(Arc::new(parking_lot::Mutex::new(engine)))
}

/// Returns true when the loop should exit.
fn handle_command(
    controller: &mut PlaybackController,
    line: &str,
    shutdown: &ShutdownGuard,
) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return false;
    };
    match command {
        "open" | "o" => match parts.next() {
            Some(path) => match controller.load_document(Path::new(path)) {
                Ok(loaded) => println!(
                    "Loaded {} ({} pages)",
                    loaded.path.display(),
                    loaded.page_count
                ),
                Err(err) => println!("{err}"),
            },
            None => println!("usage: open <file.pdf>"),
        },
        "play" | "p" | "toggle" => match controller.toggle_playback() {
            Ok(PlaybackState::Playing) => println!("Playing."),
            Ok(PlaybackState::Paused) => println!("Paused."),
            Ok(PlaybackState::Idle) => println!("Idle."),
            Err(err) => println!("{err}"),
        },
        "stop" => {
            controller.stop();
            println!("Stopped.");
        }
        "next" | "n" => step_page(controller, parts.next(), 1),
        "prev" | "b" => step_page(controller, parts.next(), -1),
        "convert" => match controller.convert_to_file() {
            Ok(output) => println!("Converting to {} ...", output.display()),
            Err(err) => println!("{err}"),
        },
        "status" => println!("{}", controller.status()),
        "voices" => print_voices(controller),
        "help" | "?" => print_help(),
        "quit" | "exit" | "q" => {
            shutdown.request();
            return true;
        }
        other => println!("unknown command: {other} (try 'help')"),
    }
    false
}

fn step_page(controller: &mut PlaybackController, count: Option<&str>, sign: i64) {
    let count: i64 = count.and_then(|raw| raw.parse().ok()).unwrap_or(1);
    match controller.go_to_page(sign.saturating_mul(count)) {
        Ok(page) => {
            let total = controller
                .session()
                .document()
                .map(|d| d.page_count)
                .unwrap_or(0);
            println!("Page {}/{}", page + 1, total);
        }
        Err(err) => println!("{err}"),
    }
}

fn print_voices(controller: &PlaybackController) {
    let Some(engine) = controller.engine().try_lock() else {
        println!("engine is busy; try again after pausing");
        return;
    };
    match engine.list_voices() {
        Ok(voices) if voices.is_empty() => println!("no voices reported"),
        Ok(voices) => {
            for voice in voices {
                println!("{:20} {:8} {}", voice.id, voice.language, voice.name);
            }
        }
        Err(err) => println!("{err}"),
    }
}

fn print_help() {
    println!("commands:");
    println!("  open <file.pdf>   load a document");
    println!("  play              toggle play / pause / resume");
    println!("  stop              stop playback and reset the cursor");
    println!("  next [n], prev [n] step the page preview");
    println!("  convert           write the audio file for the configured scope");
    println!("  voices            list engine voices");
    println!("  status            show the session state");
    println!("  quit              exit");
}

//! Application entry point: ASL tutor.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the AI gateway, camera, speaker and recognizer from config.
//! 5. Load student progress and bump the day streak.
//! 6. Spawn the tutor orchestrator on the runtime.
//! 7. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use eframe::egui;
use tokio::sync::mpsc;

use asl_tutor::{
    ai::{FallbackTutor, GeminiClient, TutorAi},
    app::TutorApp,
    capture,
    config::AppConfig,
    lesson::{starter_lessons, LessonQueue},
    progress::ProgressStore,
    tutor::{new_shared_state, TutorCommand, TutorOrchestrator, TutorServices},
    voice::{CommandRecognizer, CommandSpeaker, SilentSpeaker, Speaker, SpeechRecognizer},
};

// ---------------------------------------------------------------------------
// Service construction
// ---------------------------------------------------------------------------

fn build_services(config: &AppConfig) -> TutorServices {
    let gemini = GeminiClient::from_config(&config.ai);
    if !gemini.has_credentials() {
        log::warn!("No API key configured; using the offline tutor");
    }
    let ai: Arc<dyn TutorAi> = Arc::new(FallbackTutor::from_config(gemini, &config.ai));

    let camera = capture::device_from_config(&config.camera);
    log::info!("Camera: {}", camera.name());

    let speaker: Arc<dyn Speaker> = match CommandSpeaker::new(config.voice.tts_command.clone()) {
        Some(speaker) if config.tutor.speak_feedback => Arc::new(speaker),
        _ => Arc::new(SilentSpeaker),
    };

    let recognizer = CommandRecognizer::new(config.voice.recognizer_command.clone())
        .map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>);
    if recognizer.is_none() {
        log::info!("No speech recognizer configured; voice commands disabled");
    }

    TutorServices {
        ai,
        camera,
        speaker,
        recognizer,
        image_client: Some(image_client()),
    }
}

fn image_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Image client: {e}; using defaults");
            reqwest::Client::new()
        })
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (w, h) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title("ASL Tutor")
        .with_inner_size([w, h])
        .with_min_inner_size([640.0, 480.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("ASL tutor starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Services
    let services = build_services(&config);

    // 5. Progress
    let mut progress = ProgressStore::load_or_default();
    progress.touch_streak(chrono::Local::now().date_naive());
    log::info!(
        "Progress: {} XP, {}, {} day streak",
        progress.progress().xp,
        progress.progress().level.label(),
        progress.progress().streak_days
    );

    // 6. Orchestrator
    let queue = LessonQueue::new(starter_lessons()).context("starter lesson catalog")?;
    let shared = new_shared_state(queue.current().clone());
    let (command_tx, command_rx) = mpsc::channel::<TutorCommand>(16);

    let orchestrator =
        TutorOrchestrator::new(&config, queue, services, progress, Arc::clone(&shared));
    rt.spawn(orchestrator.run(command_rx));

    // 7. Window (blocks until closed)
    let app = TutorApp::new(shared, command_tx);
    let result = eframe::run_native(
        "ASL Tutor",
        native_options(&config),
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    rt.shutdown_timeout(Duration::from_secs(2));
    result.map_err(|e| anyhow::anyhow!("window error: {e}"))
}

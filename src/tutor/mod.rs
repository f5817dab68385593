//! Lesson flow: the pure state machine and the async orchestrator around it.
//!
//! # Architecture
//!
//! ```text
//! TutorCommand (mpsc) ──▶ TutorOrchestrator::run()  ← async tokio task
//!                               │
//!                               ├─ TutorMachine (pure)  → Vec<Effect>
//!                               ├─ TutorAi requests     → spawned, report back
//!                               ├─ CameraSession        → live on the tutor tab only
//!                               ├─ Dictation            → live while listening
//!                               └─ auto-capture Interval → armed while auto-mode applies
//!
//! SharedState (Arc<Mutex<TutorView>>) ←─── read by egui update() each frame
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use asl_tutor::ai::{FallbackTutor, GeminiClient};
//! use asl_tutor::capture::NoCamera;
//! use asl_tutor::config::AppConfig;
//! use asl_tutor::lesson::{starter_lessons, LessonQueue};
//! use asl_tutor::progress::ProgressStore;
//! use asl_tutor::tutor::{new_shared_state, TutorCommand, TutorOrchestrator, TutorServices};
//! use asl_tutor::voice::SilentSpeaker;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::default();
//! let queue = LessonQueue::new(starter_lessons())?;
//! let shared = new_shared_state(queue.current().clone());
//! let services = TutorServices {
//!     ai: Arc::new(FallbackTutor::from_config(GeminiClient::from_config(&config.ai), &config.ai)),
//!     camera: Arc::new(NoCamera),
//!     speaker: Arc::new(SilentSpeaker),
//!     recognizer: None,
//!     image_client: None,
//! };
//!
//! let (tx, rx) = mpsc::channel(16);
//! let orchestrator =
//!     TutorOrchestrator::new(&config, queue, services, ProgressStore::load_or_default(), shared);
//! tokio::spawn(orchestrator.run(rx));
//! tx.send(TutorCommand::Capture).await?;
//! # Ok(())
//! # }
//! ```

pub mod machine;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use machine::{Effect, Navigation, TutorMachine};
pub use runner::{TutorCommand, TutorOrchestrator, TutorServices};
pub use state::{
    new_shared_state, ApplicationState, CameraStatus, SharedState, Tab, TutorMode, TutorView,
};

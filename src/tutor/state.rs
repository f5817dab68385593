//! Tutor modes and the snapshot the UI renders.
//!
//! [`ApplicationState`] is owned by the [`TutorMachine`](super::TutorMachine).
//! The orchestrator copies it, together with queue position, progress and
//! device status, into a [`TutorView`] behind [`SharedState`] after every
//! event; the egui update loop only ever reads that copy.

use std::sync::{Arc, Mutex};

use crate::ai::{FeedbackResponse, ImageData, ImageRef};
use crate::lesson::Lesson;
use crate::progress::StudentProgress;

// ---------------------------------------------------------------------------
// TutorMode
// ---------------------------------------------------------------------------

/// Lesson flow.
///
/// ```text
/// Idle ──load──▶ GeneratingReference ──image──▶ WaitingForUser
///                      │                           │ ▲
///                      └──failure──▶ Idle   submit │ │ failure / no frame
///                                                  ▼ │
///                                               Analyzing ──▶ Feedback ──submit──▶ Analyzing
///                                                        └──▶ Success  ──next────▶ GeneratingReference
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TutorMode {
    #[default]
    Idle,
    GeneratingReference,
    WaitingForUser,
    Analyzing,
    Feedback,
    Success,
}

impl TutorMode {
    /// Frames may only be submitted from these modes.
    ///
    /// ```
    /// use asl_tutor::tutor::TutorMode;
    ///
    /// assert!(TutorMode::WaitingForUser.accepts_submission());
    /// assert!(TutorMode::Feedback.accepts_submission());
    /// assert!(TutorMode::Success.accepts_submission());
    /// assert!(!TutorMode::Analyzing.accepts_submission());
    /// assert!(!TutorMode::GeneratingReference.accepts_submission());
    /// assert!(!TutorMode::Idle.accepts_submission());
    /// ```
    pub fn accepts_submission(&self) -> bool {
        matches!(
            self,
            TutorMode::WaitingForUser | TutorMode::Feedback | TutorMode::Success
        )
    }

    /// `true` while a gateway request is outstanding for the current lesson.
    pub fn is_busy(&self) -> bool {
        matches!(self, TutorMode::GeneratingReference | TutorMode::Analyzing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TutorMode::Idle => "Idle",
            TutorMode::GeneratingReference => "Preparing reference",
            TutorMode::WaitingForUser => "Your turn",
            TutorMode::Analyzing => "Checking your sign",
            TutorMode::Feedback => "Try again",
            TutorMode::Success => "Correct!",
        }
    }
}

// ---------------------------------------------------------------------------
// Tab / CameraStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Tutor,
    Sentence,
    Progress,
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::Tutor => "Tutor",
            Tab::Sentence => "Sentence",
            Tab::Progress => "Progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraStatus {
    /// Not needed on the current tab.
    #[default]
    Off,
    Active,
    /// Opening failed; stays this way for the rest of the session.
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// ApplicationState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationState {
    pub mode: TutorMode,
    /// Lesson at the queue's current index.
    pub lesson: Lesson,
    pub reference_image: Option<ImageRef>,
    /// Picture of the corrected hand shape, after a failed attempt.
    pub correction_image: Option<ImageRef>,
    pub feedback: Option<FeedbackResponse>,
    pub listening: bool,
    pub auto_mode: bool,
    pub tab: Tab,
}

impl ApplicationState {
    pub fn new(lesson: Lesson) -> Self {
        Self {
            mode: TutorMode::Idle,
            lesson,
            reference_image: None,
            correction_image: None,
            feedback: None,
            listening: false,
            auto_mode: false,
            tab: Tab::Tutor,
        }
    }
}

// ---------------------------------------------------------------------------
// TutorView / SharedState
// ---------------------------------------------------------------------------

/// Everything the window needs for one frame.
#[derive(Debug, Clone)]
pub struct TutorView {
    pub state: ApplicationState,
    /// Zero-based index of the current lesson.
    pub position: usize,
    /// Targets of every lesson in the queue, in order.
    pub queue: Vec<String>,
    pub progress: StudentProgress,
    pub camera: CameraStatus,
    /// Latest camera preview frame, while the camera is live.
    pub frame: Option<ImageData>,
    /// Bumped for every new preview frame.
    pub frame_seq: u64,
    /// A speech recognizer is configured.
    pub voice_available: bool,
    /// Most recent voice transcript, for display.
    pub last_transcript: Option<String>,
}

impl TutorView {
    pub fn new(lesson: Lesson) -> Self {
        Self {
            queue: vec![lesson.target.clone()],
            state: ApplicationState::new(lesson),
            position: 0,
            progress: StudentProgress::default(),
            camera: CameraStatus::Off,
            frame: None,
            frame_seq: 0,
            voice_available: false,
            last_transcript: None,
        }
    }
}

/// Thread-safe handle to the [`TutorView`].  Lock briefly; never hold the
/// guard across an `.await` or between egui frames.
pub type SharedState = Arc<Mutex<TutorView>>;

pub fn new_shared_state(lesson: Lesson) -> SharedState {
    Arc::new(Mutex::new(TutorView::new(lesson)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

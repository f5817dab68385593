//! Pure lesson-flow state machine.
//!
//! Every transition mutates the [`ApplicationState`] / [`LessonQueue`] pair
//! and returns the side effects the orchestrator has to perform.  Nothing in
//! here touches the network, the camera, the disk or the clock, so the whole
//! flow is testable without a runtime.
//!
//! Image results carry the id of the lesson they were started for; analysis
//! results and scheduled advances carry the attempt number they belong to.
//! Every submission starts a new attempt, and a result for a lesson that is
//! no longer current, for an older attempt, or that arrives in a mode that is
//! not waiting for it, is dropped.

use crate::ai::{AspectRatio, FeedbackResponse, ImageRef};
use crate::config::TutorConfig;
use crate::lesson::{decompose, Lesson, LessonQueue};
use crate::voice::{interpret, VoiceCommand};

use super::state::{ApplicationState, Tab, TutorMode};

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

/// Work the orchestrator performs on behalf of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Generate the reference picture for a freshly loaded lesson.
    RequestReference {
        lesson_id: String,
        prompt: String,
        aspect: AspectRatio,
    },
    /// Generate the corrected hand shape after a failed attempt.
    RequestCorrection { lesson_id: String, prompt: String },
    /// Capture a frame and grade it against `target`.
    Analyze {
        attempt: u64,
        target: String,
        question: Option<String>,
    },
    /// Call [`TutorMachine::advance_due`] with `attempt` once the success
    /// message has had time to be read.
    ScheduleAdvance { attempt: u64 },
    /// Turn free text into a new lesson.
    CreateLesson { text: String },
    AwardXp(u64),
    MarkLearned(String),
    Speak(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
}

// ---------------------------------------------------------------------------
// TutorMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TutorMachine {
    queue: LessonQueue,
    state: ApplicationState,
    xp_per_success: u64,
    aspect: AspectRatio,
    speak: bool,
    attempt: u64,
}

impl TutorMachine {
    /// A machine sitting `Idle` on the queue's current lesson.  Call
    /// [`load_current`](Self::load_current) to start.
    pub fn new(queue: LessonQueue, config: &TutorConfig) -> Self {
        let state = ApplicationState::new(queue.current().clone());
        Self {
            queue,
            state,
            xp_per_success: config.xp_per_success,
            aspect: config.reference_aspect,
            speak: config.speak_feedback,
            attempt: 0,
        }
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn queue(&self) -> &LessonQueue {
        &self.queue
    }

    /// Number of the latest submission.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    fn is_current(&self, lesson_id: &str) -> bool {
        self.state.lesson.id == lesson_id
    }

    fn say(&self, effects: &mut Vec<Effect>, text: &str) {
        if self.speak && !text.trim().is_empty() {
            effects.push(Effect::Speak(text.to_string()));
        }
    }

    // -----------------------------------------------------------------------
    // Reference image
    // -----------------------------------------------------------------------

    /// Show the queue's current lesson: clear feedback and request its
    /// reference picture.
    pub fn load_current(&mut self) -> Vec<Effect> {
        let lesson = self.queue.current().clone();
        log::debug!(
            "tutor: loading {} ({}/{}) → GeneratingReference",
            lesson.target,
            self.queue.current_index() + 1,
            self.queue.len()
        );

        self.state.mode = TutorMode::GeneratingReference;
        self.state.feedback = None;
        self.state.reference_image = None;
        self.state.correction_image = None;

        let mut effects = vec![Effect::RequestReference {
            lesson_id: lesson.id.clone(),
            prompt: lesson.image_prompt.clone(),
            aspect: self.aspect,
        }];
        self.say(&mut effects, &lesson.description);
        self.state.lesson = lesson;
        effects
    }

    pub fn reference_ready(&mut self, lesson_id: &str, image: ImageRef) -> Vec<Effect> {
        if self.state.mode != TutorMode::GeneratingReference || !self.is_current(lesson_id) {
            log::debug!("tutor: dropping stale reference for {lesson_id}");
            return Vec::new();
        }
        log::debug!("tutor: reference ready → WaitingForUser");
        self.state.reference_image = Some(image);
        self.state.mode = TutorMode::WaitingForUser;
        Vec::new()
    }

    pub fn reference_failed(&mut self, lesson_id: &str) -> Vec<Effect> {
        if self.state.mode != TutorMode::GeneratingReference || !self.is_current(lesson_id) {
            return Vec::new();
        }
        log::debug!("tutor: reference failed → Idle");
        self.state.mode = TutorMode::Idle;
        self.state.feedback = None;
        Vec::new()
    }

    // -----------------------------------------------------------------------
    // Attempts
    // -----------------------------------------------------------------------

    /// Submit the current camera frame, optionally with a spoken question.
    /// Ignored unless the mode accepts submissions.
    pub fn submit_capture(&mut self, question: Option<String>) -> Vec<Effect> {
        if !self.state.mode.accepts_submission() {
            log::debug!("tutor: submission ignored in {:?}", self.state.mode);
            return Vec::new();
        }
        self.attempt += 1;
        log::debug!("tutor: {:?} → Analyzing (attempt {})", self.state.mode, self.attempt);
        self.state.mode = TutorMode::Analyzing;
        self.state.feedback = None;
        self.state.correction_image = None;

        vec![Effect::Analyze {
            attempt: self.attempt,
            target: self.state.lesson.target.clone(),
            question: question.filter(|q| !q.trim().is_empty()),
        }]
    }

    fn is_pending(&self, attempt: u64) -> bool {
        self.state.mode == TutorMode::Analyzing && attempt == self.attempt
    }

    pub fn analysis_complete(&mut self, attempt: u64, response: FeedbackResponse) -> Vec<Effect> {
        if !self.is_pending(attempt) {
            log::debug!("tutor: dropping stale analysis for attempt {attempt}");
            return Vec::new();
        }

        let lesson_id = self.state.lesson.id.clone();
        let mut effects = Vec::new();
        if response.success {
            log::debug!("tutor: analysis passed → Success");
            self.state.mode = TutorMode::Success;
            effects.push(Effect::AwardXp(self.xp_per_success));
            effects.push(Effect::MarkLearned(self.state.lesson.sign_key()));
            effects.push(Effect::ScheduleAdvance { attempt });
        } else {
            log::debug!("tutor: analysis failed → Feedback");
            self.state.mode = TutorMode::Feedback;
            if let Some(prompt) = response
                .correction_prompt
                .as_deref()
                .filter(|p| !p.trim().is_empty())
            {
                effects.push(Effect::RequestCorrection {
                    lesson_id,
                    prompt: prompt.to_string(),
                });
            }
        }
        self.say(&mut effects, &response.message);
        self.state.feedback = Some(response);
        effects
    }

    /// The frame could not be captured or graded.
    pub fn analysis_failed(&mut self, attempt: u64) -> Vec<Effect> {
        if !self.is_pending(attempt) {
            return Vec::new();
        }
        log::debug!("tutor: analysis unavailable → WaitingForUser");
        self.state.mode = TutorMode::WaitingForUser;
        self.state.feedback = None;
        Vec::new()
    }

    pub fn correction_ready(&mut self, lesson_id: &str, image: ImageRef) -> Vec<Effect> {
        if self.state.mode == TutorMode::Feedback && self.is_current(lesson_id) {
            self.state.correction_image = Some(image);
        }
        Vec::new()
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Next wraps around; previous does nothing on the first lesson.
    pub fn navigate(&mut self, direction: Navigation) -> Vec<Effect> {
        match direction {
            Navigation::Next => {
                self.queue.advance();
            }
            Navigation::Previous => {
                if self.queue.retreat().is_none() {
                    return Vec::new();
                }
            }
        }
        self.load_current()
    }

    pub fn repeat(&mut self) -> Vec<Effect> {
        self.load_current()
    }

    /// Move on after a passed attempt, unless the student has already moved,
    /// reloaded or tried again since.
    pub fn advance_due(&mut self, attempt: u64) -> Vec<Effect> {
        if self.state.mode != TutorMode::Success || attempt != self.attempt {
            log::debug!("tutor: dropping stale advance for attempt {attempt}");
            return Vec::new();
        }
        log::debug!("tutor: Success → next lesson");
        self.navigate(Navigation::Next)
    }

    // -----------------------------------------------------------------------
    // Lesson sources
    // -----------------------------------------------------------------------

    pub fn voice_transcript(&mut self, transcript: &str) -> Vec<Effect> {
        let Some(command) = interpret(transcript) else {
            return Vec::new();
        };
        log::debug!("tutor: voice command {command:?}");
        match command {
            VoiceCommand::Next => self.navigate(Navigation::Next),
            VoiceCommand::Previous => self.navigate(Navigation::Previous),
            VoiceCommand::Repeat => self.repeat(),
            VoiceCommand::Teach(text) => vec![Effect::CreateLesson { text }],
            VoiceCommand::Answer(question) => self.submit_capture(Some(question)),
        }
    }

    /// Typed request for a custom lesson.  Blank text is ignored.
    pub fn submit_practice(&mut self, text: &str) -> Vec<Effect> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        vec![Effect::CreateLesson {
            text: text.to_string(),
        }]
    }

    /// Append a lesson built from free text and switch to it.
    pub fn lesson_created(&mut self, lesson: Lesson) -> Vec<Effect> {
        let index = match self.queue.push(lesson) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("tutor: created lesson rejected: {e}");
                return Vec::new();
            }
        };
        if let Err(e) = self.queue.select(index) {
            log::warn!("tutor: cannot select created lesson: {e}");
            return Vec::new();
        }
        self.load_current()
    }

    /// Replace the queue with the letters and words of `text` and show the
    /// first one on the tutor tab.  Text without any letters is ignored.
    pub fn submit_sentence(&mut self, text: &str) -> Vec<Effect> {
        let lessons = decompose(text);
        if lessons.is_empty() {
            return Vec::new();
        }
        if let Err(e) = self.queue.replace(lessons) {
            log::warn!("tutor: sentence rejected: {e}");
            return Vec::new();
        }
        self.state.tab = Tab::Tutor;
        self.load_current()
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    pub fn set_auto_mode(&mut self, on: bool) {
        self.state.auto_mode = on;
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.state.tab = tab;
    }

    pub fn set_listening(&mut self, on: bool) {
        self.state.listening = on;
    }

    /// The auto-capture timer runs only while this holds.  A passed attempt
    /// is not graded again while its advance is pending.
    pub fn auto_capture_armed(&self) -> bool {
        self.state.auto_mode
            && self.state.tab == Tab::Tutor
            && self.state.mode.accepts_submission()
            && self.state.mode != TutorMode::Success
    }

    pub fn auto_tick(&mut self) -> Vec<Effect> {
        if !self.auto_capture_armed() {
            return Vec::new();
        }
        self.submit_capture(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

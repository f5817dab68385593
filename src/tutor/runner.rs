//! Tutor orchestrator: feeds events into the [`TutorMachine`] and performs
//! the effects it returns.
//!
//! ```text
//! TutorCommand (mpsc from the UI) ─┐
//! voice transcript (Dictation)  ───┤
//! auto-capture tick             ───┤
//! scheduled advance             ───┼─▶ TutorMachine ─▶ Vec<Effect>
//! gateway completion            ───┘                       │
//!        ▲                                                 ▼
//!        └──── spawned TutorAi request ◀── RequestReference / Analyze / ...
//!                                          AwardXp / MarkLearned → ProgressStore
//!                                          Speak                 → Speaker
//! after every event: camera / dictation / timers re-synced, TutorView published
//! preview tick: latest camera frame published
//! ```
//!
//! Gateway calls run as separate tasks and report back over an internal
//! channel, so the orchestrator keeps handling input while a request is out.
//! Analysis results carry their attempt number; the machine ignores any that
//! a newer submission or a lesson change has overtaken.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};

use crate::ai::{self, AiError, AspectRatio, FeedbackResponse, ImageData, ImageRef, TutorAi};
use crate::capture::{CameraDevice, CameraSession};
use crate::config::AppConfig;
use crate::lesson::{Lesson, LessonQueue};
use crate::progress::{ProgressStore, StudentProgress};
use crate::voice::{Dictation, Speaker, SpeechRecognizer};

use super::machine::{Effect, Navigation, TutorMachine};
use super::state::{CameraStatus, SharedState, Tab, TutorView};

// ---------------------------------------------------------------------------
// TutorCommand
// ---------------------------------------------------------------------------

/// Input from the window.
#[derive(Debug, Clone, PartialEq)]
pub enum TutorCommand {
    /// Submit the current camera frame.
    Capture,
    Next,
    Previous,
    Repeat,
    /// A transcript, as if it had been dictated.
    Transcript(String),
    SubmitSentence(String),
    SubmitPractice(String),
    SetAutoMode(bool),
    SetTab(Tab),
    SetListening(bool),
}

/// Result of a spawned gateway request.
enum Completion {
    Reference {
        lesson_id: String,
        result: Result<ImageRef, AiError>,
    },
    Correction {
        lesson_id: String,
        result: Result<ImageRef, AiError>,
    },
    Analysis {
        attempt: u64,
        result: Result<FeedbackResponse, AiError>,
    },
    Lesson(Result<Lesson, AiError>),
}

/// The devices and remote services the orchestrator drives.
pub struct TutorServices {
    pub ai: Arc<dyn TutorAi>,
    pub camera: Arc<dyn CameraDevice>,
    pub speaker: Arc<dyn Speaker>,
    /// `None` disables voice input.
    pub recognizer: Option<Arc<dyn SpeechRecognizer>>,
    /// Downloads images that arrive as URLs so the window can draw them.
    /// `None` leaves them as links.
    pub image_client: Option<reqwest::Client>,
}

struct PendingAdvance {
    attempt: u64,
    sleep: Pin<Box<Sleep>>,
}

// ---------------------------------------------------------------------------
// TutorOrchestrator
// ---------------------------------------------------------------------------

/// Owns the state machine and every resource with a lifetime: the camera
/// session, the dictation subscription and the timers.
///
/// Create with [`TutorOrchestrator::new`], then spawn [`run`](Self::run).
pub struct TutorOrchestrator {
    machine: TutorMachine,
    services: TutorServices,
    progress: ProgressStore,
    shared: SharedState,

    session: Option<CameraSession>,
    camera_status: CameraStatus,
    frame: Option<ImageData>,
    frame_seq: u64,
    dictation: Option<Dictation>,
    auto_timer: Option<Interval>,
    preview_timer: Option<Interval>,
    advance: Option<PendingAdvance>,

    aspect: AspectRatio,
    auto_period: Duration,
    advance_delay: Duration,
    /// `None` when the preview is switched off.
    preview_period: Option<Duration>,
    restart_delay: Duration,
    last_transcript: Option<String>,

    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    in_flight: usize,
    transcript_tx: mpsc::Sender<String>,
    transcript_rx: mpsc::Receiver<String>,
}

impl TutorOrchestrator {
    pub fn new(
        config: &AppConfig,
        queue: LessonQueue,
        services: TutorServices,
        progress: ProgressStore,
        shared: SharedState,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(32);
        let (transcript_tx, transcript_rx) = mpsc::channel(16);
        let preview_fps = config.camera.preview_fps;
        Self {
            machine: TutorMachine::new(queue, &config.tutor),
            services,
            progress,
            shared,
            session: None,
            camera_status: CameraStatus::Off,
            frame: None,
            frame_seq: 0,
            dictation: None,
            auto_timer: None,
            preview_timer: None,
            advance: None,
            aspect: config.tutor.reference_aspect,
            auto_period: Duration::from_millis(config.tutor.auto_capture_ms.max(1)),
            advance_delay: Duration::from_millis(config.tutor.advance_delay_ms),
            preview_period: (preview_fps > 0)
                .then(|| Duration::from_millis(1_000 / u64::from(preview_fps)).max(Duration::from_millis(1))),
            restart_delay: Duration::from_millis(config.voice.restart_delay_ms),
            last_transcript: None,
            completion_tx,
            completion_rx,
            in_flight: 0,
            transcript_tx,
            transcript_rx,
        }
    }

    pub fn machine(&self) -> &TutorMachine {
        &self.machine
    }

    pub fn progress(&self) -> &StudentProgress {
        self.progress.progress()
    }

    pub fn camera_status(&self) -> &CameraStatus {
        &self.camera_status
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed and every outstanding request has
    /// reported back.
    pub async fn run(mut self, mut commands: mpsc::Receiver<TutorCommand>) {
        log::info!("tutor: orchestrator started");
        self.start();

        let mut commands_open = true;
        loop {
            tokio::select! {
                cmd = commands.recv(), if commands_open => match cmd {
                    Some(cmd) => self.dispatch(cmd),
                    None => commands_open = false,
                },
                Some(done) = self.completion_rx.recv(), if self.in_flight > 0 => self.complete(done),
                Some(text) = self.transcript_rx.recv() => self.dispatch(TutorCommand::Transcript(text)),
                _ = next_tick(&mut self.auto_timer), if self.auto_timer.is_some() => self.auto_tick(),
                attempt = advance_timer(&mut self.advance), if self.advance.is_some() => self.advance_due(attempt),
                _ = next_tick(&mut self.preview_timer), if self.preview_timer.is_some() => self.preview_tick(),
                _ = dictation_ended(&mut self.dictation), if self.dictation.is_some() => self.refresh(),
                else => break,
            }

            if !commands_open && self.in_flight == 0 {
                break;
            }
        }

        self.services.speaker.cancel();
        log::info!("tutor: command channel closed, orchestrator shutting down");
    }

    /// Load the first lesson and acquire the devices the initial tab needs.
    pub fn start(&mut self) {
        let effects = self.machine.load_current();
        self.apply(effects);
        self.refresh();
    }

    /// Handle one command.
    pub fn dispatch(&mut self, cmd: TutorCommand) {
        log::debug!("tutor: command {cmd:?}");
        let effects = match cmd {
            TutorCommand::Capture => self.machine.submit_capture(None),
            TutorCommand::Next => self.machine.navigate(Navigation::Next),
            TutorCommand::Previous => self.machine.navigate(Navigation::Previous),
            TutorCommand::Repeat => self.machine.repeat(),
            TutorCommand::Transcript(text) => {
                let effects = self.machine.voice_transcript(&text);
                self.last_transcript = Some(text);
                effects
            }
            TutorCommand::SubmitSentence(text) => self.machine.submit_sentence(&text),
            TutorCommand::SubmitPractice(text) => self.machine.submit_practice(&text),
            TutorCommand::SetAutoMode(on) => {
                self.machine.set_auto_mode(on);
                Vec::new()
            }
            TutorCommand::SetTab(tab) => {
                self.machine.set_tab(tab);
                Vec::new()
            }
            TutorCommand::SetListening(on) => {
                self.machine.set_listening(on);
                Vec::new()
            }
        };
        self.apply(effects);
        self.refresh();
    }

    /// Wait for every outstanding gateway request, handling each result.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.completion_rx.recv().await {
                Some(done) => self.complete(done),
                None => break,
            }
        }
    }

    fn auto_tick(&mut self) {
        let effects = self.machine.auto_tick();
        self.apply(effects);
        self.refresh();
    }

    fn advance_due(&mut self, attempt: u64) {
        self.advance = None;
        let effects = self.machine.advance_due(attempt);
        self.apply(effects);
        self.refresh();
    }

    /// Publish the camera's current frame for the preview.
    fn preview_tick(&mut self) {
        let Some(frame) = self.session.as_mut().and_then(|s| s.capture_frame()) else {
            return;
        };
        self.frame = Some(frame);
        self.frame_seq += 1;
        self.publish();
    }

    fn complete(&mut self, done: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);

        let effects = match done {
            Completion::Reference { lesson_id, result } => match result {
                Ok(image) => self.machine.reference_ready(&lesson_id, image),
                Err(e) => {
                    log::warn!("tutor: reference image failed: {e}");
                    self.machine.reference_failed(&lesson_id)
                }
            },
            Completion::Correction { lesson_id, result } => match result {
                Ok(image) => self.machine.correction_ready(&lesson_id, image),
                Err(e) => {
                    log::warn!("tutor: correction image failed: {e}");
                    Vec::new()
                }
            },
            Completion::Analysis { attempt, result } => match result {
                Ok(feedback) => self.machine.analysis_complete(attempt, feedback),
                Err(e) => {
                    log::warn!("tutor: analysis failed: {e}");
                    self.machine.analysis_failed(attempt)
                }
            },
            Completion::Lesson(result) => match result {
                Ok(lesson) => self.machine.lesson_created(lesson),
                Err(e) => {
                    log::warn!("tutor: lesson creation failed: {e}");
                    Vec::new()
                }
            },
        };
        self.apply(effects);
        self.refresh();
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    fn apply(&mut self, effects: Vec<Effect>) {
        let mut pending: VecDeque<Effect> = effects.into();

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::RequestReference {
                    lesson_id,
                    prompt,
                    aspect,
                } => {
                    let ai = Arc::clone(&self.services.ai);
                    let client = self.services.image_client.clone();
                    self.spawn(async move {
                        let result = ai.generate_reference_image(&prompt, aspect).await;
                        let result = inline(client, result).await;
                        Completion::Reference { lesson_id, result }
                    });
                }
                Effect::RequestCorrection { lesson_id, prompt } => {
                    let ai = Arc::clone(&self.services.ai);
                    let client = self.services.image_client.clone();
                    let aspect = self.aspect;
                    self.spawn(async move {
                        let result = ai.generate_reference_image(&prompt, aspect).await;
                        let result = inline(client, result).await;
                        Completion::Correction { lesson_id, result }
                    });
                }
                Effect::Analyze {
                    attempt,
                    target,
                    question,
                } => {
                    let Some(frame) = self.session.as_mut().and_then(|s| s.capture_frame()) else {
                        log::warn!("tutor: no camera frame to analyze");
                        pending.extend(self.machine.analysis_failed(attempt));
                        continue;
                    };
                    log::debug!(
                        "tutor: analyzing {} byte frame for {target} (attempt {attempt})",
                        frame.byte_len()
                    );
                    let ai = Arc::clone(&self.services.ai);
                    self.spawn(async move {
                        let result = ai
                            .analyze_hand_shape(&target, &frame, question.as_deref())
                            .await;
                        Completion::Analysis { attempt, result }
                    });
                }
                Effect::ScheduleAdvance { attempt } => {
                    self.advance = Some(PendingAdvance {
                        attempt,
                        sleep: Box::pin(tokio::time::sleep(self.advance_delay)),
                    });
                }
                Effect::CreateLesson { text } => {
                    let ai = Arc::clone(&self.services.ai);
                    self.spawn(async move {
                        Completion::Lesson(ai.create_lesson_from_intent(&text).await)
                    });
                }
                Effect::AwardXp(amount) => self.progress.add_xp(amount),
                Effect::MarkLearned(key) => self.progress.mark_learned(&key),
                Effect::Speak(text) => self.services.speaker.speak(&text),
            }
        }
    }

    fn spawn<F>(&mut self, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let done = request.await;
            let _ = tx.send(done).await;
        });
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    /// Bring the camera, dictation and timers in line with the state, then
    /// publish the view.
    fn refresh(&mut self) {
        self.sync_camera();
        self.sync_dictation();
        self.sync_timers();
        self.publish();
    }

    /// The camera is live only while the tutor tab is shown.  A failed open
    /// is not retried.
    fn sync_camera(&mut self) {
        let wanted = self.machine.state().tab == Tab::Tutor;

        if !wanted {
            if self.session.take().is_some() {
                self.camera_status = CameraStatus::Off;
            }
            self.frame = None;
            return;
        }
        if self.session.is_some() || matches!(self.camera_status, CameraStatus::Unavailable(_)) {
            return;
        }
        match self.services.camera.open() {
            Ok(session) => {
                self.session = Some(session);
                self.camera_status = CameraStatus::Active;
            }
            Err(e) => {
                log::warn!("camera: {} unavailable: {e}", self.services.camera.name());
                self.camera_status = CameraStatus::Unavailable(e.to_string());
            }
        }
    }

    fn sync_dictation(&mut self) {
        if self.dictation.as_ref().is_some_and(|d| !d.is_running()) {
            self.dictation = None;
            self.machine.set_listening(false);
        }

        let running = self.dictation.is_some();
        let wanted = self.machine.state().listening;
        if wanted && !running {
            match &self.services.recognizer {
                Some(recognizer) => {
                    self.dictation = Some(Dictation::start(
                        Arc::clone(recognizer),
                        self.transcript_tx.clone(),
                        self.restart_delay,
                    ));
                }
                None => {
                    log::warn!("voice: no speech recognizer configured");
                    self.machine.set_listening(false);
                }
            }
        } else if !wanted && running {
            self.dictation = None;
        }
    }

    fn sync_timers(&mut self) {
        if !self.machine.auto_capture_armed() {
            self.auto_timer = None;
        } else if self.auto_timer.is_none() {
            self.auto_timer = Some(delayed_interval(self.auto_period));
        }

        match self.preview_period {
            Some(period) if self.session.is_some() => {
                if self.preview_timer.is_none() {
                    self.preview_timer = Some(delayed_interval(period));
                }
            }
            _ => self.preview_timer = None,
        }
    }

    fn publish(&self) {
        let queue = self.machine.queue();
        let mut view = match self.shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *view = TutorView {
            state: self.machine.state().clone(),
            position: queue.current_index(),
            queue: queue.lessons().iter().map(|l| l.target.clone()).collect(),
            progress: self.progress.progress().clone(),
            camera: self.camera_status.clone(),
            frame: self.frame.clone(),
            frame_seq: self.frame_seq,
            voice_available: self.services.recognizer.is_some(),
            last_transcript: self.last_transcript.clone(),
        };
    }
}

/// Swap a URL for the downloaded image when a client is available.  A failed
/// download keeps the URL.
async fn inline(
    client: Option<reqwest::Client>,
    result: Result<ImageRef, AiError>,
) -> Result<ImageRef, AiError> {
    match (result, client) {
        (Ok(ImageRef::Url(url)), Some(client)) => match ai::image::fetch(&client, &url).await {
            Ok(data) => Ok(ImageRef::Inline(data)),
            Err(e) => {
                log::warn!("tutor: could not download {url}: {e}");
                Ok(ImageRef::Url(url))
            }
        },
        (result, _) => result,
    }
}

/// Interval whose first tick is one `period` away.
fn delayed_interval(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn advance_timer(advance: &mut Option<PendingAdvance>) -> u64 {
    match advance {
        Some(pending) => {
            pending.sleep.as_mut().await;
            pending.attempt
        }
        None => std::future::pending().await,
    }
}

async fn dictation_ended(dictation: &mut Option<Dictation>) {
    match dictation {
        Some(dictation) => dictation.stopped().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::capture::{CaptureError, FrameSource};
    use crate::tutor::{new_shared_state, TutorMode};
    use crate::voice::VoiceError;

    // ---- doubles ---

    struct MockAi {
        feedback: FeedbackResponse,
        fail_reference: bool,
        references: AtomicUsize,
        analyses: AtomicUsize,
        questions: Mutex<Vec<Option<String>>>,
    }

    impl MockAi {
        fn with_feedback(feedback: FeedbackResponse) -> Self {
            Self {
                feedback,
                fail_reference: false,
                references: AtomicUsize::new(0),
                analyses: AtomicUsize::new(0),
                questions: Mutex::new(Vec::new()),
            }
        }

        fn passing() -> Self {
            Self::with_feedback(FeedbackResponse {
                success: true,
                message: "Well done".into(),
                correction_prompt: None,
            })
        }
    }

    #[async_trait]
    impl TutorAi for MockAi {
        async fn analyze_hand_shape(
            &self,
            _target: &str,
            _image: &ImageData,
            spoken_question: Option<&str>,
        ) -> Result<FeedbackResponse, AiError> {
            self.analyses.fetch_add(1, Ordering::SeqCst);
            self.questions
                .lock()
                .unwrap()
                .push(spoken_question.map(str::to_string));
            Ok(self.feedback.clone())
        }

        async fn generate_reference_image(
            &self,
            _prompt: &str,
            _aspect_ratio: AspectRatio,
        ) -> Result<ImageRef, AiError> {
            self.references.fetch_add(1, Ordering::SeqCst);
            if self.fail_reference {
                Err(AiError::EmptyResponse)
            } else {
                Ok(ImageRef::Url("https://example.test/ref.png".into()))
            }
        }

        async fn create_lesson_from_intent(&self, _free_text: &str) -> Result<Lesson, AiError> {
            Ok(Lesson::word("coffee"))
        }
    }

    struct MockSource {
        frame: Option<ImageData>,
        released: Arc<AtomicBool>,
    }

    impl FrameSource for MockSource {
        fn latest_frame(&mut self) -> Result<Option<ImageData>, CaptureError> {
            Ok(self.frame.clone())
        }
    }

    impl Drop for MockSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    struct MockCamera {
        frame: Option<ImageData>,
        broken: bool,
        opens: AtomicUsize,
        released: Arc<AtomicBool>,
    }

    impl MockCamera {
        fn with_frame() -> Self {
            Self {
                frame: Some(ImageData::from_bytes("image/jpeg", b"frame")),
                broken: false,
                opens: AtomicUsize::new(0),
                released: Arc::new(AtomicBool::new(false)),
            }
        }

        fn blank() -> Self {
            Self {
                frame: None,
                ..Self::with_frame()
            }
        }

        fn broken() -> Self {
            Self {
                broken: true,
                ..Self::with_frame()
            }
        }
    }

    impl CameraDevice for MockCamera {
        fn open(&self) -> Result<CameraSession, CaptureError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(CaptureError::NoDevice);
            }
            self.released.store(false, Ordering::SeqCst);
            Ok(CameraSession::new(
                "mock",
                Box::new(MockSource {
                    frame: self.frame.clone(),
                    released: Arc::clone(&self.released),
                }),
            ))
        }

        fn name(&self) -> String {
            "mock".into()
        }
    }

    #[derive(Default)]
    struct RecordingSpeaker {
        said: Mutex<Vec<String>>,
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&self, text: &str) {
            self.said.lock().unwrap().push(text.to_string());
        }

        fn cancel(&self) {}
    }

    /// Says one thing, then keeps the session open.
    struct OneShotRecognizer(&'static str);

    #[async_trait]
    impl SpeechRecognizer for OneShotRecognizer {
        async fn run_session(&self, tx: &mpsc::Sender<String>) -> Result<(), VoiceError> {
            let _ = tx.send(self.0.to_string()).await;
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Reports the microphone missing once `gone` is notified.
    struct VanishingRecognizer {
        gone: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl SpeechRecognizer for VanishingRecognizer {
        async fn run_session(&self, _tx: &mpsc::Sender<String>) -> Result<(), VoiceError> {
            self.gone.notified().await;
            Err(VoiceError::Unavailable("no microphone".into()))
        }
    }

    struct Harness {
        orch: TutorOrchestrator,
        ai: Arc<MockAi>,
        camera: Arc<MockCamera>,
        speaker: Arc<RecordingSpeaker>,
        shared: SharedState,
        _dir: TempDir,
    }

    fn harness_with(
        config: AppConfig,
        ai: MockAi,
        camera: MockCamera,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
    ) -> Harness {
        let dir = tempfile::tempdir().expect("temp dir");
        let lessons = vec![Lesson::letter('a'), Lesson::letter('b'), Lesson::letter('c')];
        let shared = new_shared_state(lessons[0].clone());
        let ai = Arc::new(ai);
        let camera = Arc::new(camera);
        let speaker = Arc::new(RecordingSpeaker::default());

        let services = TutorServices {
            ai: ai.clone(),
            camera: camera.clone(),
            speaker: speaker.clone(),
            recognizer,
            image_client: None,
        };
        let orch = TutorOrchestrator::new(
            &config,
            LessonQueue::new(lessons).unwrap(),
            services,
            ProgressStore::load_from(dir.path().join("progress.json")),
            Arc::clone(&shared),
        );
        Harness {
            orch,
            ai,
            camera,
            speaker,
            shared,
            _dir: dir,
        }
    }

    fn harness(ai: MockAi, camera: MockCamera) -> Harness {
        harness_with(AppConfig::default(), ai, camera, None)
    }

    /// Started and waiting for the first attempt.
    async fn ready(ai: MockAi, camera: MockCamera) -> Harness {
        let mut h = harness(ai, camera);
        h.orch.start();
        h.orch.settle().await;
        h
    }

    fn mode(h: &Harness) -> TutorMode {
        h.orch.machine().state().mode
    }

    /// Poll the published view until `done` holds.
    async fn wait_for(shared: &SharedState, what: &str, done: impl Fn(&TutorView) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if done(&shared.lock().unwrap()) {
                return;
            }
            assert!(Instant::now() < deadline, "{what}");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    // ---- tests ---

    #[tokio::test]
    async fn start_loads_reference_and_opens_camera() {
        let h = ready(MockAi::passing(), MockCamera::with_frame()).await;
        assert_eq!(mode(&h), TutorMode::WaitingForUser);
        assert_eq!(h.ai.references.load(Ordering::SeqCst), 1);
        assert_eq!(h.orch.camera_status(), &CameraStatus::Active);

        let view = h.shared.lock().unwrap();
        assert_eq!(view.state.mode, TutorMode::WaitingForUser);
        assert_eq!(view.queue, ["A", "B", "C"]);
        assert_eq!(view.camera, CameraStatus::Active);
        assert!(!view.voice_available);
    }

    #[tokio::test]
    async fn success_awards_xp_and_marks_learned() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Capture);
        h.orch.settle().await;

        assert_eq!(mode(&h), TutorMode::Success);
        assert_eq!(h.orch.progress().xp, 50);
        assert!(h.orch.progress().learned_signs.contains("letter-a"));
        assert_eq!(h.shared.lock().unwrap().progress.xp, 50);
        assert!(h.speaker.said.lock().unwrap().contains(&"Well done".to_string()));
    }

    #[tokio::test]
    async fn submissions_ignored_while_analyzing() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Capture);
        assert_eq!(mode(&h), TutorMode::Analyzing);
        h.orch.dispatch(TutorCommand::Capture);
        h.orch.dispatch(TutorCommand::Transcript("is this right?".into()));
        h.orch.settle().await;

        assert_eq!(h.ai.analyses.load(Ordering::SeqCst), 1);
        assert_eq!(h.orch.progress().xp, 50);
    }

    #[tokio::test]
    async fn submissions_ignored_while_generating_reference() {
        let mut h = harness(MockAi::passing(), MockCamera::with_frame());
        h.orch.start();
        assert_eq!(mode(&h), TutorMode::GeneratingReference);

        h.orch.dispatch(TutorCommand::Capture);
        h.orch.settle().await;

        assert_eq!(h.ai.analyses.load(Ordering::SeqCst), 0);
        assert_eq!(mode(&h), TutorMode::WaitingForUser);
    }

    #[tokio::test]
    async fn skip_to_next_lesson_reloads_reference() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Transcript("skip to next lesson".into()));
        assert_eq!(h.orch.machine().queue().current_index(), 1);
        assert_eq!(mode(&h), TutorMode::GeneratingReference);
        h.orch.settle().await;

        assert_eq!(h.ai.references.load(Ordering::SeqCst), 2);
        assert_eq!(mode(&h), TutorMode::WaitingForUser);
        let view = h.shared.lock().unwrap();
        assert_eq!(view.position, 1);
        assert_eq!(view.last_transcript.as_deref(), Some("skip to next lesson"));
    }

    #[tokio::test]
    async fn go_back_on_first_lesson_changes_nothing() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Transcript("go back".into()));
        h.orch.settle().await;

        assert_eq!(h.orch.machine().queue().current_index(), 0);
        assert_eq!(h.ai.references.load(Ordering::SeqCst), 1);
        assert_eq!(mode(&h), TutorMode::WaitingForUser);
    }

    #[tokio::test]
    async fn spoken_question_reaches_analysis() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Transcript("is my thumb right?".into()));
        h.orch.settle().await;

        let questions = h.ai.questions.lock().unwrap().clone();
        assert_eq!(questions, vec![Some("is my thumb right?".to_string())]);
    }

    #[tokio::test]
    async fn reference_failure_goes_idle() {
        let ai = MockAi {
            fail_reference: true,
            ..MockAi::passing()
        };
        let h = ready(ai, MockCamera::with_frame()).await;
        assert_eq!(mode(&h), TutorMode::Idle);
        assert!(h.orch.machine().state().feedback.is_none());
    }

    #[tokio::test]
    async fn missing_frame_returns_to_waiting() {
        let mut h = ready(MockAi::passing(), MockCamera::blank()).await;

        h.orch.dispatch(TutorCommand::Capture);
        h.orch.settle().await;

        assert_eq!(mode(&h), TutorMode::WaitingForUser);
        assert_eq!(h.ai.analyses.load(Ordering::SeqCst), 0);
        assert!(h.orch.machine().state().feedback.is_none());
    }

    #[tokio::test]
    async fn broken_camera_is_reported_and_not_retried() {
        let mut h = ready(MockAi::passing(), MockCamera::broken()).await;
        assert!(matches!(h.orch.camera_status(), CameraStatus::Unavailable(_)));

        h.orch.dispatch(TutorCommand::Capture);
        h.orch.settle().await;
        assert_eq!(mode(&h), TutorMode::WaitingForUser);

        h.orch.dispatch(TutorCommand::SetTab(Tab::Progress));
        h.orch.dispatch(TutorCommand::SetTab(Tab::Tutor));
        assert_eq!(h.camera.opens.load(Ordering::SeqCst), 1);
        assert!(matches!(
            h.shared.lock().unwrap().camera,
            CameraStatus::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn camera_released_off_the_tutor_tab() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;
        assert!(!h.camera.released.load(Ordering::SeqCst));

        h.orch.dispatch(TutorCommand::SetTab(Tab::Sentence));
        assert!(h.camera.released.load(Ordering::SeqCst));
        assert_eq!(h.orch.camera_status(), &CameraStatus::Off);

        h.orch.dispatch(TutorCommand::SetTab(Tab::Tutor));
        assert_eq!(h.camera.opens.load(Ordering::SeqCst), 2);
        assert_eq!(h.orch.camera_status(), &CameraStatus::Active);
    }

    #[tokio::test]
    async fn failed_attempt_fetches_correction_image() {
        let ai = MockAi::with_feedback(FeedbackResponse {
            success: false,
            message: "Curl your fingers".into(),
            correction_prompt: Some("hand with curled fingers".into()),
        });
        let mut h = ready(ai, MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Capture);
        h.orch.settle().await;

        assert_eq!(mode(&h), TutorMode::Feedback);
        assert!(h.orch.machine().state().correction_image.is_some());
        assert_eq!(h.orch.progress().xp, 0);
        assert_eq!(h.ai.references.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn teach_me_appends_and_loads_lesson() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Transcript("teach me coffee".into()));
        h.orch.settle().await;

        assert_eq!(h.orch.machine().queue().len(), 4);
        assert_eq!(h.orch.machine().state().lesson.target, "COFFEE");
        assert_eq!(mode(&h), TutorMode::WaitingForUser);
    }

    #[tokio::test]
    async fn sentence_replaces_queue() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;
        h.orch.dispatch(TutorCommand::SetTab(Tab::Sentence));

        h.orch.dispatch(TutorCommand::SubmitSentence("Hello World!".into()));
        h.orch.settle().await;

        let view = h.shared.lock().unwrap();
        assert_eq!(view.queue, ["HELLO", "WORLD"]);
        assert_eq!(view.state.tab, Tab::Tutor);
        assert_eq!(view.camera, CameraStatus::Active);
    }

    #[tokio::test]
    async fn listening_without_recognizer_stays_off() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;
        h.orch.dispatch(TutorCommand::SetListening(true));
        assert!(!h.orch.machine().state().listening);
        assert!(!h.shared.lock().unwrap().state.listening);
    }

    #[tokio::test]
    async fn dictated_command_drives_the_tutor() {
        let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(OneShotRecognizer("skip"));
        let h = harness_with(
            AppConfig::default(),
            MockAi::passing(),
            MockCamera::with_frame(),
            Some(recognizer),
        );
        let shared = Arc::clone(&h.shared);
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(h.orch.run(rx));

        tx.send(TutorCommand::SetListening(true)).await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            {
                let view = shared.lock().unwrap();
                if view.position == 1 && view.state.mode == TutorMode::WaitingForUser {
                    assert!(view.state.listening);
                    assert!(view.voice_available);
                    break;
                }
            }
            assert!(Instant::now() < deadline, "transcript never handled");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn auto_mode_submits_frames() {
        let mut config = AppConfig::default();
        config.tutor.auto_capture_ms = 10;
        config.tutor.advance_delay_ms = 10;
        let h = harness_with(config, MockAi::passing(), MockCamera::with_frame(), None);
        let ai = Arc::clone(&h.ai);
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(h.orch.run(rx));

        tx.send(TutorCommand::SetAutoMode(true)).await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while ai.analyses.load(Ordering::SeqCst) < 2 {
            assert!(Instant::now() < deadline, "auto capture never fired");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(TutorCommand::SetAutoMode(false)).await.unwrap();
        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn passed_attempt_moves_to_next_lesson() {
        let mut config = AppConfig::default();
        config.tutor.advance_delay_ms = 20;
        let h = harness_with(config, MockAi::passing(), MockCamera::with_frame(), None);
        let shared = Arc::clone(&h.shared);
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(h.orch.run(rx));

        wait_for(&shared, "first reference never loaded", |v| {
            v.state.mode == TutorMode::WaitingForUser
        })
        .await;
        tx.send(TutorCommand::Capture).await.unwrap();

        wait_for(&shared, "never advanced after success", |v| {
            v.position == 1 && v.state.mode == TutorMode::WaitingForUser
        })
        .await;
        {
            let view = shared.lock().unwrap();
            assert_eq!(view.state.lesson.target, "B");
            assert_eq!(view.progress.xp, 50);
            assert!(view.state.feedback.is_none());
        }

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn success_stays_put_until_advance_fires() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Capture);
        h.orch.settle().await;
        h.orch.dispatch(TutorCommand::SetAutoMode(true));
        h.orch.auto_tick();

        assert_eq!(mode(&h), TutorMode::Success);
        assert_eq!(h.orch.machine().queue().current_index(), 0);
        assert_eq!(h.ai.analyses.load(Ordering::SeqCst), 1);
        assert_eq!(h.orch.progress().xp, 50);
    }

    #[tokio::test]
    async fn result_for_an_abandoned_attempt_is_dropped() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;

        h.orch.dispatch(TutorCommand::Capture);
        assert_eq!(mode(&h), TutorMode::Analyzing);
        h.orch.dispatch(TutorCommand::Repeat);
        h.orch.settle().await;

        assert_eq!(mode(&h), TutorMode::WaitingForUser);
        assert_eq!(h.ai.analyses.load(Ordering::SeqCst), 1);
        assert_eq!(h.orch.progress().xp, 0);
        assert!(h.orch.progress().learned_signs.is_empty());
    }

    #[tokio::test]
    async fn preview_publishes_camera_frames() {
        let mut h = ready(MockAi::passing(), MockCamera::with_frame()).await;
        assert!(h.shared.lock().unwrap().frame.is_none());

        h.orch.preview_tick();
        {
            let view = h.shared.lock().unwrap();
            assert_eq!(view.frame_seq, 1);
            let bytes = view.frame.as_ref().and_then(|f| f.bytes().ok());
            assert_eq!(bytes.as_deref(), Some(&b"frame"[..]));
        }

        h.orch.dispatch(TutorCommand::SetTab(Tab::Progress));
        h.orch.preview_tick();
        let view = h.shared.lock().unwrap();
        assert!(view.frame.is_none());
        assert_eq!(view.frame_seq, 1);
    }

    #[tokio::test]
    async fn listening_clears_when_recognizer_gives_up() {
        let gone = Arc::new(tokio::sync::Notify::new());
        let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(VanishingRecognizer {
            gone: Arc::clone(&gone),
        });
        let h = harness_with(
            AppConfig::default(),
            MockAi::passing(),
            MockCamera::with_frame(),
            Some(recognizer),
        );
        let shared = Arc::clone(&h.shared);
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(h.orch.run(rx));

        tx.send(TutorCommand::SetListening(true)).await.unwrap();
        wait_for(&shared, "listening never started", |v| v.state.listening).await;

        gone.notify_one();
        wait_for(&shared, "listening never cleared", |v| !v.state.listening).await;
        assert!(shared.lock().unwrap().voice_available);

        drop(tx);
        task.await.unwrap();
    }
}

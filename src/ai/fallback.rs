//! Fallback tutor: wraps any [`TutorAi`] and substitutes a local result on
//! error.
//!
//! When the remote call fails for any reason (no key, network, HTTP status,
//! malformed output) [`FallbackTutor`] waits a short simulated delay and then
//! returns a plausible locally synthesised result.  It never returns `Err`,
//! which keeps the tutor usable offline.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::ai::gateway::{AiError, FeedbackResponse, TutorAi};
use crate::ai::image::{AspectRatio, ImageData, ImageRef};
use crate::config::AiConfig;
use crate::lesson::{fresh_id, Lesson, Tier};

/// Critique templates used when a fallback attempt "fails".
const CRITIQUES: &[&str] = &[
    "Close! Try tucking your thumb in a little more.",
    "Almost there. Keep your fingers pressed closer together.",
    "Rotate your wrist slightly so your palm faces the camera.",
    "Make sure your whole hand is inside the frame.",
    "Relax your hand a bit; the shape looks tense.",
];

const SUCCESS_MESSAGE: &str = "Great job! That looks right.";

// ---------------------------------------------------------------------------
// FallbackTutor
// ---------------------------------------------------------------------------

/// Simulated latencies of the three fallback paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackDelays {
    pub analysis: Duration,
    pub image: Duration,
    pub lesson: Duration,
}

/// A transparent wrapper around any [`TutorAi`] that never returns an error.
///
/// # Example
/// ```rust
/// use asl_tutor::ai::{FallbackTutor, GeminiClient};
/// use asl_tutor::config::AiConfig;
///
/// let config = AiConfig::default();
/// let tutor = FallbackTutor::from_config(GeminiClient::from_config(&config), &config);
/// // `tutor` implements TutorAi and is safe to use without an API key.
/// ```
pub struct FallbackTutor<C: TutorAi> {
    inner: C,
    success_rate: f64,
    delays: FallbackDelays,
}

impl<C: TutorAi> FallbackTutor<C> {
    pub fn new(inner: C, success_rate: f64, delays: FallbackDelays) -> Self {
        Self {
            inner,
            success_rate: success_rate.clamp(0.0, 1.0),
            delays,
        }
    }

    /// Take success rate and delays from `config`.
    pub fn from_config(inner: C, config: &AiConfig) -> Self {
        Self::new(
            inner,
            config.fallback_success_rate,
            FallbackDelays {
                analysis: Duration::from_millis(config.fallback_analysis_delay_ms),
                image: Duration::from_millis(config.fallback_image_delay_ms),
                lesson: Duration::from_millis(config.fallback_lesson_delay_ms),
            },
        )
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl<C: TutorAi> TutorAi for FallbackTutor<C> {
    /// This implementation **never** returns `Err(_)`.
    async fn analyze_hand_shape(
        &self,
        target: &str,
        image: &ImageData,
        spoken_question: Option<&str>,
    ) -> Result<FeedbackResponse, AiError> {
        match self.inner.analyze_hand_shape(target, image, spoken_question).await {
            Ok(feedback) => Ok(feedback),
            Err(e) => {
                log::warn!("ai: analysis failed ({e}); using local feedback");
                simulate_latency(self.delays.analysis).await;
                Ok(local_feedback(
                    &mut rand::rng(),
                    target,
                    spoken_question,
                    self.success_rate,
                ))
            }
        }
    }

    async fn generate_reference_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<ImageRef, AiError> {
        match self.inner.generate_reference_image(prompt, aspect_ratio).await {
            Ok(image) => Ok(image),
            Err(e) => {
                log::warn!("ai: image generation failed ({e}); using placeholder");
                simulate_latency(self.delays.image).await;
                Ok(placeholder_image(prompt, aspect_ratio))
            }
        }
    }

    async fn create_lesson_from_intent(&self, free_text: &str) -> Result<Lesson, AiError> {
        match self.inner.create_lesson_from_intent(free_text).await {
            Ok(lesson) => Ok(lesson),
            Err(e) => {
                log::warn!("ai: lesson generation failed ({e}); using custom placeholder");
                simulate_latency(self.delays.lesson).await;
                Ok(placeholder_lesson(free_text))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Local results
// ---------------------------------------------------------------------------

fn correction_prompt(target: &str) -> String {
    format!(
        "A close-up photo of a hand correctly forming the American Sign Language sign for '{target}', \
         with arrows highlighting finger and thumb placement, plain background."
    )
}

/// Feedback synthesised without the remote model.
///
/// With a spoken question the answer is a fixed template.  Otherwise the
/// attempt passes with probability `success_rate`, else a critique is drawn
/// from a fixed pool.
pub fn local_feedback<R: Rng + ?Sized>(
    rng: &mut R,
    target: &str,
    spoken_question: Option<&str>,
    success_rate: f64,
) -> FeedbackResponse {
    if spoken_question.is_some_and(|q| !q.trim().is_empty()) {
        return FeedbackResponse {
            success: false,
            message: format!(
                "Good question! For \"{target}\", focus on the hand shape first: keep your palm \
                 toward the camera and compare your fingers with the reference image."
            ),
            correction_prompt: Some(correction_prompt(target)),
        };
    }

    if rng.random_bool(success_rate.clamp(0.0, 1.0)) {
        FeedbackResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            correction_prompt: None,
        }
    } else {
        let critique = CRITIQUES.choose(rng).copied().unwrap_or(CRITIQUES[0]);
        FeedbackResponse {
            success: false,
            message: critique.to_string(),
            correction_prompt: Some(correction_prompt(target)),
        }
    }
}

/// The single letter a prompt is about, if any: the token after the word
/// "letter", or a quoted one-character token.
///
/// ```
/// use asl_tutor::ai::fallback::letter_in_prompt;
///
/// assert_eq!(letter_in_prompt("the ASL letter 'b', palm out"), Some('B'));
/// assert_eq!(letter_in_prompt("a person signing \"HELLO\""), None);
/// ```
pub fn letter_in_prompt(prompt: &str) -> Option<char> {
    fn single_letter(token: &str) -> Option<char> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_alphabetic() => Some(c.to_ascii_uppercase()),
            _ => None,
        }
    }
    let trim = |t: &str| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string();

    let tokens: Vec<&str> = prompt.split_whitespace().collect();
    let after_letter = tokens.windows(2).find_map(|w| {
        if trim(w[0]).eq_ignore_ascii_case("letter") {
            single_letter(&trim(w[1]))
        } else {
            None
        }
    });

    after_letter.or_else(|| {
        tokens.iter().find_map(|t| {
            let t = t.trim_end_matches([',', '.', ';', ':', '!', '?']);
            let quoted = t
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .or_else(|| t.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
            single_letter(quoted)
        })
    })
}

/// Placeholder image URL labelled with the prompt's letter.
pub fn placeholder_image(prompt: &str, aspect_ratio: AspectRatio) -> ImageRef {
    let (w, h) = aspect_ratio.placeholder_size();
    let label = match letter_in_prompt(prompt) {
        Some(letter) => format!("ASL+{letter}"),
        None => "ASL+Sign".to_string(),
    };
    ImageRef::Url(format!("https://placehold.co/{w}x{h}/png?text={label}"))
}

/// Generic "custom sign" lesson for a request the model could not handle.
pub fn placeholder_lesson(free_text: &str) -> Lesson {
    let request = free_text.trim();
    Lesson {
        id: fresh_id("custom"),
        target: "CUSTOM SIGN".into(),
        description: format!(
            "Custom sign for \"{request}\". Try the sign, then ask a question for feedback."
        ),
        difficulty: Tier::Intermediate,
        image_prompt: format!(
            "A clear photo of a person demonstrating an American Sign Language sign for \"{request}\", \
             plain light background."
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

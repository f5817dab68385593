//! Lessons: the unit of instruction, the static catalog, the lesson queue and
//! sentence decomposition.
//!
//! * [`Lesson`]: one letter or phrase target plus description and image
//!   prompt.  Immutable once built.
//! * [`Tier`]: difficulty of a lesson, also used as the student's level.
//! * [`LessonQueue`]: ordered lessons with an explicit current index.
//! * [`catalog::starter_lessons`]: the lessons shown on first launch.
//! * [`sentence::decompose`]: free text → one lesson per word.

pub mod catalog;
pub mod queue;
pub mod sentence;

use serde::{Deserialize, Serialize};

pub use catalog::starter_lessons;
pub use queue::{LessonQueue, QueueError};
pub use sentence::decompose;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Difficulty tier of a lesson, and the level tier of a student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Beginner,
    Intermediate,
    Conversational,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Beginner => "Beginner",
            Tier::Intermediate => "Intermediate",
            Tier::Conversational => "Conversational",
        }
    }

    /// Lenient parse used for model output; unknown names map to `None`.
    ///
    /// ```
    /// use asl_tutor::lesson::Tier;
    ///
    /// assert_eq!(Tier::parse("beginner"), Some(Tier::Beginner));
    /// assert_eq!(Tier::parse(" Conversational "), Some(Tier::Conversational));
    /// assert_eq!(Tier::parse("expert"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Tier::Beginner),
            "intermediate" => Some(Tier::Intermediate),
            "conversational" => Some(Tier::Conversational),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Lesson
// ---------------------------------------------------------------------------

/// One unit of instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Unique within a [`LessonQueue`].
    pub id: String,
    /// Upper-case letter or phrase the student has to sign.
    pub target: String,
    pub description: String,
    pub difficulty: Tier,
    /// Prompt sent to the image model for the reference picture.
    pub image_prompt: String,
}

impl Lesson {
    /// A single-letter fingerspelling lesson with a fresh identifier.
    pub fn letter(letter: char) -> Self {
        let upper = letter.to_uppercase().to_string();
        Self {
            id: fresh_id("letter"),
            description: format!("Fingerspell the letter {upper}."),
            image_prompt: letter_prompt(&upper),
            target: upper,
            difficulty: Tier::Beginner,
        }
    }

    /// A whole-word lesson with a fresh identifier.
    pub fn word(word: &str) -> Self {
        let upper = word.to_uppercase();
        Self {
            id: fresh_id("word"),
            description: format!("Sign the word \"{upper}\"."),
            image_prompt: word_prompt(&upper),
            target: upper,
            difficulty: Tier::Intermediate,
        }
    }

    /// `true` when the target is one character (fingerspelling).
    pub fn is_letter(&self) -> bool {
        self.target.chars().count() == 1
    }

    /// Key under which the sign is recorded as learned.  Two lessons for the
    /// same sign share it, whatever their ids.
    ///
    /// ```
    /// use asl_tutor::lesson::Lesson;
    ///
    /// assert_eq!(Lesson::letter('a').sign_key(), "letter-a");
    /// assert_eq!(Lesson::word("Hello").sign_key(), "word-hello");
    /// ```
    pub fn sign_key(&self) -> String {
        let kind = if self.is_letter() { "letter" } else { "word" };
        let name = self
            .target
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase();
        format!("{kind}-{name}")
    }
}

/// `"{prefix}-{uuid}"`.
pub fn fresh_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// Image prompt template for single letters.
pub fn letter_prompt(letter: &str) -> String {
    format!(
        "A clear, well-lit photo of a right hand forming the American Sign Language letter '{letter}', \
         palm facing the camera, plain light background, educational style."
    )
}

/// Image prompt template for words and phrases.
pub fn word_prompt(word: &str) -> String {
    format!(
        "A clear, well-lit photo of a person signing the American Sign Language word \"{word}\", \
         upper body visible, motion arrows where the sign moves, plain light background."
    )
}

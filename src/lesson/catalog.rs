//! Static lesson catalog shown on first launch.

use super::{letter_prompt, word_prompt, Lesson, Tier};

fn entry(id: &str, target: &str, description: &str, difficulty: Tier, image_prompt: String) -> Lesson {
    Lesson {
        id: id.into(),
        target: target.into(),
        description: description.into(),
        difficulty,
        image_prompt,
    }
}

/// The built-in lesson sequence.  Identifiers are stable across launches and
/// equal to each lesson's [`Lesson::sign_key`].
pub fn starter_lessons() -> Vec<Lesson> {
    vec![
        entry(
            "letter-a",
            "A",
            "Make a fist with your thumb resting against the side of your index finger.",
            Tier::Beginner,
            letter_prompt("A"),
        ),
        entry(
            "letter-b",
            "B",
            "Hold your fingers straight up and together, thumb folded across the palm.",
            Tier::Beginner,
            letter_prompt("B"),
        ),
        entry(
            "letter-c",
            "C",
            "Curve your fingers and thumb into the shape of the letter C.",
            Tier::Beginner,
            letter_prompt("C"),
        ),
        entry(
            "letter-l",
            "L",
            "Extend your thumb and index finger into an L, other fingers closed.",
            Tier::Beginner,
            letter_prompt("L"),
        ),
        entry(
            "letter-y",
            "Y",
            "Extend your thumb and little finger, keep the middle three folded.",
            Tier::Beginner,
            letter_prompt("Y"),
        ),
        entry(
            "word-hello",
            "HELLO",
            "Touch a flat hand to your forehead and move it outward, like a salute.",
            Tier::Intermediate,
            word_prompt("HELLO"),
        ),
        entry(
            "word-thank-you",
            "THANK YOU",
            "Touch your fingertips to your chin and move the hand forward and down.",
            Tier::Intermediate,
            word_prompt("THANK YOU"),
        ),
        entry(
            "word-i-love-you",
            "I LOVE YOU",
            "Extend thumb, index and little finger together, palm facing out.",
            Tier::Conversational,
            word_prompt("I LOVE YOU"),
        ),
    ]
}

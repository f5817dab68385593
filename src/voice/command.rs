//! Voice command interpretation.
//!
//! Transcripts are matched case-insensitively by substring, in a fixed
//! priority order; the first matching rule wins.  The rules overlap ("show me
//! the next lesson" matches both navigation and teach keywords), so the order
//! below is part of the contract:
//!
//! 1. navigation: "next lesson" / "skip", then "previous lesson" / "go back"
//! 2. repeat: "again" / "repeat" / "restart"
//! 3. teach: "how to" / "show me" / "teach me"
//! 4. anything else is a question about the current attempt

const NEXT: &[&str] = &["next lesson", "skip"];
const PREVIOUS: &[&str] = &["previous lesson", "go back"];
const REPEAT: &[&str] = &["again", "repeat", "restart"];
const TEACH: &[&str] = &["how to", "show me", "teach me"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCommand {
    Next,
    Previous,
    /// Reload the current lesson.
    Repeat,
    /// Build a new lesson from the transcript.
    Teach(String),
    /// Capture a frame and ask the transcript alongside it.
    Answer(String),
}

/// Map a transcript to a command.  Blank transcripts map to `None`.
///
/// ```
/// use asl_tutor::voice::{interpret, VoiceCommand};
///
/// assert_eq!(interpret("Skip to next lesson"), Some(VoiceCommand::Next));
/// assert_eq!(interpret("   "), None);
/// ```
pub fn interpret(transcript: &str) -> Option<VoiceCommand> {
    let text = transcript.trim();
    if text.is_empty() {
        return None;
    }
    let lower = text.to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));

    let command = if has(NEXT) {
        VoiceCommand::Next
    } else if has(PREVIOUS) {
        VoiceCommand::Previous
    } else if has(REPEAT) {
        VoiceCommand::Repeat
    } else if has(TEACH) {
        VoiceCommand::Teach(text.to_string())
    } else {
        VoiceCommand::Answer(text.to_string())
    };
    Some(command)
}

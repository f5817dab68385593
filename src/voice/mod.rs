//! Voice input and spoken feedback.
//!
//! ```text
//! SpeechRecognizer ─(Dictation restarts sessions)─▶ mpsc<String> ─▶ interpret() ─▶ VoiceCommand
//! Speaker::speak(text)  (cancels the previous utterance)
//! ```

pub mod command;
pub mod dictation;
pub mod speech;

use thiserror::Error;

pub use command::{interpret, VoiceCommand};
pub use dictation::{CommandRecognizer, Dictation, SpeechRecognizer};
pub use speech::{CommandSpeaker, SilentSpeaker, Speaker};

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice backend unavailable: {0}")]
    Unavailable(String),

    #[error("voice I/O error: {0}")]
    Io(#[from] std::io::Error),
}

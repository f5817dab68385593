//! Spoken feedback.
//!
//! Utterances never overlap: starting a new one cancels whatever is still
//! being spoken.

use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use super::VoiceError;

pub trait Speaker: Send + Sync {
    /// Speak `text`, cancelling any utterance in progress.
    fn speak(&self, text: &str);

    fn cancel(&self);
}

// ---------------------------------------------------------------------------
// SilentSpeaker
// ---------------------------------------------------------------------------

/// Used when spoken feedback is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&self, text: &str) {
        log::debug!("speech (muted): {text}");
    }

    fn cancel(&self) {}
}

// ---------------------------------------------------------------------------
// CommandSpeaker
// ---------------------------------------------------------------------------

/// Speaks through an external text-to-speech program, the text passed as its
/// last argument (`espeak-ng`, `say`, ...).
#[derive(Debug)]
pub struct CommandSpeaker {
    argv: Vec<String>,
    current: Mutex<Option<Child>>,
}

impl CommandSpeaker {
    /// `None` for an empty argv.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        Some(Self {
            argv,
            current: Mutex::new(None),
        })
    }

    fn spawn(&self, text: &str) -> Result<Child, VoiceError> {
        Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VoiceError::Unavailable(format!("{}: {e}", self.argv[0])))
    }

    /// Process id of the utterance still running, if any.
    pub fn speaking_pid(&self) -> Option<u32> {
        let mut guard = self.current.lock().ok()?;
        let child = guard.as_mut()?;
        match child.try_wait() {
            Ok(None) => Some(child.id()),
            _ => {
                *guard = None;
                None
            }
        }
    }
}

fn stop_child(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Ok(mut guard) = self.current.lock() else {
            return;
        };
        if let Some(mut previous) = guard.take() {
            stop_child(&mut previous);
        }
        match self.spawn(text) {
            Ok(child) => *guard = Some(child),
            Err(e) => log::warn!("speech: {e}"),
        }
    }

    fn cancel(&self) {
        if let Ok(mut guard) = self.current.lock() {
            if let Some(mut child) = guard.take() {
                stop_child(&mut child);
            }
        }
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

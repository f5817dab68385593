//! Continuous dictation as a managed subscription.
//!
//! A [`SpeechRecognizer`] runs one recognition *session* at a time and sends
//! each transcript over a `tokio::sync::mpsc` channel.  Sessions end on their
//! own (the recogniser times out, the process exits).  [`Dictation`] restarts
//! them for as long as its `wanted` flag is set:
//!
//! ```text
//! start ──▶ session ──ends──▶ wanted? ──yes──▶ pause ──▶ session ...
//!                                    └─no──▶ done
//! stop / drop ──▶ wanted = false, task aborted
//! ```
//!
//! A recogniser that cannot start at all ([`VoiceError::Unavailable`]) is not
//! restarted.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::VoiceError;

// ---------------------------------------------------------------------------
// SpeechRecognizer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Run one session, sending transcripts to `tx`, until it ends.
    async fn run_session(&self, tx: &mpsc::Sender<String>) -> Result<(), VoiceError>;
}

// ---------------------------------------------------------------------------
// Dictation
// ---------------------------------------------------------------------------

/// Handle to a running dictation subscription.  Dropping it stops dictation.
pub struct Dictation {
    wanted: Arc<AtomicBool>,
    task: JoinHandle<()>,
    joined: bool,
}

impl Dictation {
    /// Start dictating into `tx`.  Must be called from within a tokio runtime.
    pub fn start(
        recognizer: Arc<dyn SpeechRecognizer>,
        tx: mpsc::Sender<String>,
        restart_delay: Duration,
    ) -> Self {
        let wanted = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&wanted);

        let task = tokio::spawn(async move {
            log::info!("dictation: started");
            while flag.load(Ordering::SeqCst) {
                match recognizer.run_session(&tx).await {
                    Ok(()) => log::debug!("dictation: session ended"),
                    Err(VoiceError::Unavailable(reason)) => {
                        log::warn!("dictation: recognizer unavailable ({reason}); voice input off");
                        break;
                    }
                    Err(e) => log::warn!("dictation: session failed: {e}"),
                }

                if !flag.load(Ordering::SeqCst) || tx.is_closed() {
                    break;
                }
                log::debug!("dictation: restarting session");
                tokio::time::sleep(restart_delay).await;
            }
            flag.store(false, Ordering::SeqCst);
            log::info!("dictation: stopped");
        });

        Self {
            wanted,
            task,
            joined: false,
        }
    }

    /// `true` until stopped, or until the recogniser gave up for good.
    pub fn is_running(&self) -> bool {
        self.wanted.load(Ordering::SeqCst) && !self.task.is_finished()
    }

    /// Resolves when the subscription task ends, whether stopped or given
    /// up.  Never resolves a second time.
    pub async fn stopped(&mut self) {
        if self.joined {
            return std::future::pending().await;
        }
        let _ = (&mut self.task).await;
        self.joined = true;
    }

    pub fn stop(&mut self) {
        self.wanted.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

impl Drop for Dictation {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// CommandRecognizer
// ---------------------------------------------------------------------------

/// Runs an external dictation program; each non-empty stdout line is one
/// transcript.  The child is killed when the session is dropped.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    argv: Vec<String>,
}

impl CommandRecognizer {
    /// `None` for an empty argv.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            None
        } else {
            Some(Self { argv })
        }
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn run_session(&self, tx: &mpsc::Sender<String>) -> Result<(), VoiceError> {
        let mut child = tokio::process::Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::Unavailable(format!("{}: {e}", self.argv[0])))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VoiceError::Unavailable("recognizer stdout not captured".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if tx.send(line.to_string()).await.is_err() {
                break;
            }
        }

        let _ = child.kill().await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

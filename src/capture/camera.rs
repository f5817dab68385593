//! Camera acquisition and on-demand frame capture.
//!
//! [`CameraDevice::open`] acquires the video stream and returns a
//! [`CameraSession`].  The session is a RAII guard: dropping it releases the
//! stream, whichever path the owner leaves by.
//!
//! Devices:
//!
//! * [`WebcamCamera`](super::WebcamCamera): a capture device opened through
//!   OpenCV (the `webcam` feature, on by default).
//! * [`SnapshotCamera`]: reads the newest frame from a file that an external
//!   capture process keeps rewriting, for machines without OpenCV, e.g.
//!
//! ```text
//! ffmpeg -f v4l2 -i /dev/video0 -vf fps=10 -update 1 -y ~/.cache/asl-tutor/frame.jpg
//! ```
//!
//! * [`NoCamera`]: the camera is switched off in settings.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ai::ImageData;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no camera available")]
    NoDevice,

    #[error("camera disabled in settings")]
    Disabled,

    #[error("camera access denied: {0}")]
    PermissionDenied(String),

    #[error("camera I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The capture library reported an error.
    #[error("camera backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A live video stream.  `latest_frame` returns the current encoded frame, or
/// `None` while the stream has nothing to show.
pub trait FrameSource: Send {
    fn latest_frame(&mut self) -> Result<Option<ImageData>, CaptureError>;
}

/// Something that can hand out an exclusive video stream.
pub trait CameraDevice: Send + Sync {
    fn open(&self) -> Result<CameraSession, CaptureError>;

    /// Short label for logs and the UI.
    fn name(&self) -> String;
}

// ---------------------------------------------------------------------------
// CameraSession
// ---------------------------------------------------------------------------

/// Exclusive handle on an open stream.  Dropping it releases the camera.
pub struct CameraSession {
    source: Box<dyn FrameSource>,
    label: String,
}

impl CameraSession {
    pub fn new(label: impl Into<String>, source: Box<dyn FrameSource>) -> Self {
        let label = label.into();
        log::info!("camera: acquired {label}");
        Self { source, label }
    }

    /// Encode the current frame, or `None` if there is no frame to capture.
    ///
    /// Read errors are logged and treated as "no frame".
    pub fn capture_frame(&mut self) -> Option<ImageData> {
        match self.source.latest_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("camera: frame capture failed on {}: {e}", self.label);
                None
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        log::info!("camera: released {}", self.label);
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SnapshotCamera
// ---------------------------------------------------------------------------

/// Camera backed by a continuously rewritten snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotCamera {
    path: PathBuf,
}

impl SnapshotCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CameraDevice for SnapshotCamera {
    fn open(&self) -> Result<CameraSession, CaptureError> {
        match std::fs::metadata(&self.path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CaptureError::NoDevice)
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(CaptureError::PermissionDenied(e.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        Ok(CameraSession::new(
            self.name(),
            Box::new(SnapshotStream {
                path: self.path.clone(),
            }),
        ))
    }

    fn name(&self) -> String {
        format!("snapshot {}", self.path.display())
    }
}

struct SnapshotStream {
    path: PathBuf,
}

impl FrameSource for SnapshotStream {
    fn latest_frame(&mut self) -> Result<Option<ImageData>, CaptureError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // A writer mid-rewrite may leave a zero-length file behind.
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(ImageData::from_bytes(mime_for(&self.path), &bytes)))
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

// ---------------------------------------------------------------------------
// NoCamera
// ---------------------------------------------------------------------------

/// Device used when the camera is disabled in settings.
pub struct NoCamera;

impl CameraDevice for NoCamera {
    fn open(&self) -> Result<CameraSession, CaptureError> {
        Err(CaptureError::Disabled)
    }

    fn name(&self) -> String {
        "none".into()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

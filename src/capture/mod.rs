//! Camera capture and the decorative overlay.
//!
//! # Pipeline
//!
//! ```text
//! CameraDevice::open() → CameraSession (RAII) → capture_frame() → ImageData
//!                                                     │
//!                                  TutorMode ─▶ Overlay::shapes(t) ─▶ painter
//! ```

pub mod camera;
pub mod overlay;
#[cfg(feature = "webcam")]
pub mod webcam;

use std::sync::Arc;

use crate::config::{CameraConfig, CameraSource};

pub use camera::{CameraDevice, CameraSession, CaptureError, FrameSource, NoCamera, SnapshotCamera};
pub use overlay::{Overlay, OverlayMode, OverlayShape};
#[cfg(feature = "webcam")]
pub use webcam::WebcamCamera;

/// The device `config` asks for.  Without the `webcam` feature a webcam
/// request falls back to the snapshot camera.
pub fn device_from_config(config: &CameraConfig) -> Arc<dyn CameraDevice> {
    if !config.enabled {
        return Arc::new(NoCamera);
    }
    match config.source {
        #[cfg(feature = "webcam")]
        CameraSource::Webcam => Arc::new(WebcamCamera::from_config(config)),
        #[cfg(not(feature = "webcam"))]
        CameraSource::Webcam => {
            log::warn!("camera: built without webcam support; using the snapshot file");
            Arc::new(SnapshotCamera::new(config.resolved_snapshot_path()))
        }
        CameraSource::Snapshot => Arc::new(SnapshotCamera::new(config.resolved_snapshot_path())),
    }
}

//! Live capture device opened through OpenCV's `videoio`.
//!
//! Each [`FrameSource::latest_frame`] call grabs the next frame from the
//! driver and JPEG-encodes it.  The device is released when the
//! [`CameraSession`] is dropped.

use opencv::{
    core::{Mat, Vector},
    imgcodecs,
    prelude::*,
    videoio::{self, VideoCapture},
};

use crate::ai::ImageData;
use crate::config::CameraConfig;

use super::camera::{CameraDevice, CameraSession, CaptureError, FrameSource};

const JPEG_QUALITY: i32 = 85;

fn backend(e: opencv::Error) -> CaptureError {
    CaptureError::Backend(e.to_string())
}

/// A system camera addressed by index.
#[derive(Debug, Clone)]
pub struct WebcamCamera {
    index: i32,
    width: u32,
    height: u32,
    fps: u32,
}

impl WebcamCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            index: config.device_index,
            width: config.width,
            height: config.height,
            fps: config.fps,
        }
    }
}

impl CameraDevice for WebcamCamera {
    fn open(&self) -> Result<CameraSession, CaptureError> {
        let mut cap = VideoCapture::new(self.index, videoio::CAP_ANY).map_err(backend)?;
        if !cap.is_opened().map_err(backend)? {
            return Err(CaptureError::NoDevice);
        }

        // Requests only; the driver picks the nearest mode it supports.
        let _ = cap.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(self.width));
        let _ = cap.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(self.height));
        let _ = cap.set(videoio::CAP_PROP_FPS, f64::from(self.fps));

        Ok(CameraSession::new(
            self.name(),
            Box::new(WebcamStream {
                cap,
                frame: Mat::default(),
            }),
        ))
    }

    fn name(&self) -> String {
        format!("webcam #{}", self.index)
    }
}

struct WebcamStream {
    cap: VideoCapture,
    frame: Mat,
}

impl FrameSource for WebcamStream {
    fn latest_frame(&mut self) -> Result<Option<ImageData>, CaptureError> {
        match self.cap.read(&mut self.frame) {
            Ok(true) if !self.frame.empty() => {}
            Ok(_) => return Ok(None),
            Err(e) => return Err(backend(e)),
        }

        let mut buf = Vector::<u8>::new();
        let params = Vector::<i32>::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, JPEG_QUALITY]);
        if !imgcodecs::imencode(".jpg", &self.frame, &mut buf, &params).map_err(backend)? {
            return Err(CaptureError::Backend("JPEG encoding failed".into()));
        }
        Ok(Some(ImageData::from_bytes("image/jpeg", &buf.to_vec())))
    }
}

impl Drop for WebcamStream {
    fn drop(&mut self) {
        if let Err(e) = self.cap.release() {
            log::warn!("camera: release failed: {e}");
        }
    }
}

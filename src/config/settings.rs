//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::ai::AspectRatio;

/// Environment variable consulted when `ai.api_key` is not set in the file.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ---------------------------------------------------------------------------
// AiConfig
// ---------------------------------------------------------------------------

/// Settings for the remote vision / image-generation service and its local
/// fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// API key. `None` falls back to the `GEMINI_API_KEY` environment variable;
    /// with neither set every request goes straight to the local fallback.
    pub api_key: Option<String>,
    /// Vision model that grades captured frames.
    pub analysis_model: String,
    /// Image model that draws reference and correction images.
    pub image_model: String,
    /// Text model that turns spoken intents into lessons.
    pub lesson_model: String,
    /// Per-request timeout. `None` leaves timing to the transport.
    pub timeout_secs: Option<u64>,
    /// Probability that a fallback analysis (no spoken question) passes.
    pub fallback_success_rate: f64,
    /// Simulated latency of the fallback analysis.
    pub fallback_analysis_delay_ms: u64,
    /// Simulated latency of the fallback placeholder image.
    pub fallback_image_delay_ms: u64,
    /// Simulated latency of the fallback lesson.
    pub fallback_lesson_delay_ms: u64,
}

impl AiConfig {
    /// The key to send, from the config file or the environment.
    ///
    /// Empty strings count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            analysis_model: "gemini-2.5-flash".into(),
            image_model: "gemini-2.5-flash-image".into(),
            lesson_model: "gemini-2.5-flash".into(),
            timeout_secs: None,
            fallback_success_rate: 0.6,
            fallback_analysis_delay_ms: 1_500,
            fallback_image_delay_ms: 800,
            fallback_lesson_delay_ms: 1_000,
        }
    }
}

// ---------------------------------------------------------------------------
// TutorConfig
// ---------------------------------------------------------------------------

/// Lesson-flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    /// Experience awarded for every passed attempt.
    pub xp_per_success: u64,
    /// Period of the automatic frame submission while auto-mode is on.
    pub auto_capture_ms: u64,
    /// Pause on a passed attempt before moving to the next lesson.
    pub advance_delay_ms: u64,
    /// Aspect ratio requested for reference and correction images.
    pub reference_aspect: AspectRatio,
    /// Speak lesson instructions and feedback aloud.
    pub speak_feedback: bool,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            xp_per_success: 50,
            auto_capture_ms: 3_500,
            advance_delay_ms: 2_500,
            reference_aspect: AspectRatio::Square,
            speak_feedback: true,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Where camera frames come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    /// Capture device opened through OpenCV.
    #[default]
    Webcam,
    /// Newest frame in a file rewritten by an external capture process.
    Snapshot,
}

/// Camera settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Turn the camera off entirely (the tutor shows the "no camera" screen).
    pub enabled: bool,
    pub source: CameraSource,
    /// Capture device index (`0` is the system default camera).
    pub device_index: i32,
    /// Requested capture size in pixels; the driver may pick the nearest.
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Camera preview refresh rate in the window. `0` hides the preview.
    pub preview_fps: u32,
    /// Snapshot file for [`CameraSource::Snapshot`]. `None` means the
    /// platform cache location.
    pub snapshot_path: Option<PathBuf>,
}

impl CameraConfig {
    pub fn resolved_snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(|| AppPaths::new().snapshot_file)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: CameraSource::Webcam,
            device_index: 0,
            width: 640,
            height: 480,
            fps: 30,
            preview_fps: 10,
            snapshot_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Speech input and output settings.
///
/// Both commands are argv vectors; an empty vector disables that direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Continuous dictation command. Each stdout line is one transcript.
    pub recognizer_command: Vec<String>,
    /// Text-to-speech command. The utterance is appended as the last argument.
    pub tts_command: Vec<String>,
    /// Pause before restarting a dictation session that ended on its own.
    pub restart_delay_ms: u64,
}

impl VoiceConfig {
    pub fn recognition_enabled(&self) -> bool {
        !self.recognizer_command.is_empty()
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            recognizer_command: Vec::new(),
            tts_command: Vec::new(),
            restart_delay_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window appearance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Initial inner window size in logical pixels.
    pub window_size: (f32, f32),
    /// Keep the window above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_size: (960.0, 720.0),
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use asl_tutor::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub tutor: TutorConfig,
    pub camera: CameraConfig,
    pub voice: VoiceConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.ai.analysis_model, default.ai.analysis_model);
        assert_eq!(config.tutor.xp_per_success, default.tutor.xp_per_success);
        assert_eq!(config.tutor.auto_capture_ms, default.tutor.auto_capture_ms);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.ai.base_url, "https://generativelanguage.googleapis.com");
        assert!(cfg.ai.api_key.is_none());
        assert!(cfg.ai.timeout_secs.is_none());
        assert!((cfg.ai.fallback_success_rate - 0.6).abs() < f64::EPSILON);
        assert_eq!(cfg.ai.fallback_analysis_delay_ms, 1_500);
        assert_eq!(cfg.tutor.xp_per_success, 50);
        assert_eq!(cfg.tutor.auto_capture_ms, 3_500);
        assert_eq!(cfg.tutor.reference_aspect, AspectRatio::Square);
        assert_eq!(cfg.tutor.advance_delay_ms, 2_500);
        assert!(cfg.camera.enabled);
        assert_eq!(cfg.camera.source, CameraSource::Webcam);
        assert_eq!(cfg.camera.device_index, 0);
        assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
        assert_eq!(cfg.camera.preview_fps, 10);
        assert!(!cfg.voice.recognition_enabled());
        assert!(cfg.voice.tts_command.is_empty());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut cfg = AppConfig::default();
        cfg.ai.api_key = Some("test-key".into());
        cfg.ai.timeout_secs = Some(20);
        cfg.tutor.xp_per_success = 75;
        cfg.tutor.reference_aspect = AspectRatio::Landscape;
        cfg.camera.source = CameraSource::Snapshot;
        cfg.camera.snapshot_path = Some(PathBuf::from("/tmp/frame.jpg"));
        cfg.voice.recognizer_command = vec!["dictate".into(), "--stream".into()];
        cfg.voice.tts_command = vec!["espeak".into()];

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.ai.api_key.as_deref(), Some("test-key"));
        assert_eq!(loaded.ai.timeout_secs, Some(20));
        assert_eq!(loaded.tutor.xp_per_success, 75);
        assert_eq!(loaded.tutor.reference_aspect, AspectRatio::Landscape);
        assert_eq!(loaded.camera.source, CameraSource::Snapshot);
        assert_eq!(
            loaded.camera.snapshot_path,
            Some(PathBuf::from("/tmp/frame.jpg"))
        );
        assert!(loaded.voice.recognition_enabled());
        assert_eq!(loaded.voice.tts_command, vec!["espeak".to_string()]);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[tutor]\nxp_per_success = 10\n").unwrap();

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.tutor.xp_per_success, 10);
        assert_eq!(loaded.tutor.auto_capture_ms, 3_500);
        assert_eq!(loaded.ai.image_model, "gemini-2.5-flash-image");
    }

    #[test]
    fn camera_source_reads_lower_case_names() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[camera]\nsource = \"snapshot\"\ndevice_index = 2\n").unwrap();

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.camera.source, CameraSource::Snapshot);
        assert_eq!(loaded.camera.device_index, 2);
        assert_eq!(loaded.camera.fps, 30);
    }

    #[test]
    fn blank_api_key_in_file_is_ignored() {
        let cfg = AiConfig {
            api_key: Some("   ".into()),
            ..AiConfig::default()
        };
        // Environment may or may not carry a key; the blank file value must
        // never be returned as-is.
        assert_ne!(cfg.resolved_api_key().as_deref(), Some("   "));
    }

    #[test]
    fn file_api_key_wins() {
        let cfg = AiConfig {
            api_key: Some("from-file".into()),
            ..AiConfig::default()
        };
        assert_eq!(cfg.resolved_api_key().as_deref(), Some("from-file"));
    }
}

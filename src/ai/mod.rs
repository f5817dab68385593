//! Remote AI gateway for the tutor.
//!
//! This module provides:
//! * [`TutorAi`]: async trait for the three remote operations (grade a
//!   frame, draw a reference image, build a lesson from speech).
//! * [`GeminiClient`]: Generative Language REST implementation.
//! * [`FallbackTutor`]: wraps any `TutorAi`; substitutes local results on
//!   failure and never returns an error.
//! * [`ImageData`] / [`ImageRef`] / [`AspectRatio`]: image payloads.
//! * [`AiError`]: error variants for remote calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use asl_tutor::ai::{FallbackTutor, GeminiClient, ImageData, TutorAi};
//! use asl_tutor::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let tutor = FallbackTutor::from_config(GeminiClient::from_config(&config.ai), &config.ai);
//!
//!     let frame = ImageData::from_bytes("image/jpeg", &std::fs::read("frame.jpg").unwrap());
//!     let feedback = tutor.analyze_hand_shape("A", &frame, None).await.unwrap();
//!     println!("{}: {}", feedback.success, feedback.message);
//! }
//! ```

pub mod fallback;
pub mod gateway;
pub mod image;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use fallback::{FallbackDelays, FallbackTutor};
pub use gateway::{AiError, FeedbackResponse, GeminiClient, TutorAi};
pub use image::{AspectRatio, ImageData, ImageRef};

//! Desktop ASL tutor.
//!
//! Captures camera frames, grades them against the current lesson through a
//! remote vision model (with a local randomized fallback), and keeps lesson
//! flow, voice commands and student progress in one orchestrated state
//! machine rendered by an egui window.

pub mod ai;
pub mod app;
pub mod capture;
pub mod config;
pub mod lesson;
pub mod progress;
pub mod tutor;
pub mod voice;

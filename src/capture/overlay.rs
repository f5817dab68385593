//! Decorative camera overlay.
//!
//! The overlay carries no information about the frame: it is a cosmetic
//! animation recomputed on every display refresh from the elapsed time plus a
//! little random jitter.  All coordinates are normalised to `[0.0, 1.0]` of
//! the camera viewport; the UI scales them to pixels.
//!
//! # Example
//!
//! ```rust
//! use asl_tutor::capture::{Overlay, OverlayMode, OverlayShape};
//!
//! let overlay = Overlay::default();
//! let shapes = overlay.shapes(OverlayMode::Scanning, 0.25, &mut rand::rng());
//! assert!(matches!(shapes[0], OverlayShape::ScanLine { .. }));
//! ```

use rand::Rng;

use crate::tutor::TutorMode;

/// Seconds for the scan line to sweep down and back up.
const SCAN_PERIOD_SECS: f32 = 2.0;

// ---------------------------------------------------------------------------
// OverlayMode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// A frame is being analysed: sweeping scan line.
    Scanning,
    /// Voice capture is on: pseudo audio-level bars.
    Listening,
    /// Otherwise: a floating bounding box.
    Tracking,
}

impl OverlayMode {
    pub fn for_state(mode: TutorMode, listening: bool) -> Self {
        if mode == TutorMode::Analyzing {
            OverlayMode::Scanning
        } else if listening {
            OverlayMode::Listening
        } else {
            OverlayMode::Tracking
        }
    }
}

// ---------------------------------------------------------------------------
// OverlayShape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    /// Horizontal line at height `y`.
    ScanLine { y: f32 },
    /// Bar heights, left to right, each in `[0.0, 1.0]`.
    LevelBars { heights: Vec<f32> },
    /// Rectangle with top-left corner `(x, y)`.
    BoundingBox { x: f32, y: f32, w: f32, h: f32 },
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Overlay {
    bars: usize,
}

impl Default for Overlay {
    fn default() -> Self {
        Self { bars: 16 }
    }
}

impl Overlay {
    pub fn with_bars(bars: usize) -> Self {
        Self { bars }
    }

    /// Shapes to draw at `t` seconds into the animation.
    pub fn shapes<R: Rng + ?Sized>(&self, mode: OverlayMode, t: f32, rng: &mut R) -> Vec<OverlayShape> {
        match mode {
            OverlayMode::Scanning => vec![OverlayShape::ScanLine { y: scan_y(t) }],
            OverlayMode::Listening => vec![OverlayShape::LevelBars {
                heights: (0..self.bars)
                    .map(|i| {
                        let wave = 0.5 + 0.35 * (t * 6.0 + i as f32 * 0.7).sin();
                        (wave * rng.random_range(0.75..=1.0)).clamp(0.0, 1.0)
                    })
                    .collect(),
            }],
            OverlayMode::Tracking => {
                let size = 0.45 + 0.03 * (t * 2.0).sin() + rng.random_range(-0.005..=0.005);
                let cx = 0.5 + 0.08 * (t * 0.9).sin();
                let cy = 0.5 + 0.06 * (t * 1.3).cos();
                let x = (cx - size / 2.0).clamp(0.0, 1.0 - size);
                let y = (cy - size / 2.0).clamp(0.0, 1.0 - size);
                vec![OverlayShape::BoundingBox {
                    x,
                    y,
                    w: size,
                    h: size,
                }]
            }
        }
    }
}

/// Triangle wave: 0 → 1 → 0 over one scan period.
fn scan_y(t: f32) -> f32 {
    let phase = (t / SCAN_PERIOD_SECS).rem_euclid(1.0);
    if phase < 0.5 {
        phase * 2.0
    } else {
        2.0 - phase * 2.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

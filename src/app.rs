//! ASL tutor window: egui/eframe application.
//!
//! # Architecture
//!
//! [`TutorApp`] is the top-level [`eframe::App`].  It owns:
//!
//! * `shared`: the [`TutorView`] published by the orchestrator; copied
//!   once per frame and never locked across frames.
//! * `command_tx`: sends [`TutorCommand`]s to the orchestrator.
//! * one texture per displayed image, re-uploaded only when the image changes.
//!
//! The window never mutates tutor state itself; every button becomes a
//! command and the next published view shows the result.
//!
//! # Tabs
//!
//! | Tab | Content |
//! |-----|---------|
//! | `Tutor` | Reference image, camera frame with overlay, controls, feedback |
//! | `Sentence` | Free text → lesson queue, queue listing |
//! | `Progress` | XP, level, streak, learned signs |

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use eframe::egui;
use tokio::sync::mpsc;

use crate::ai::{ImageData, ImageRef};
use crate::capture::{Overlay, OverlayMode, OverlayShape};
use crate::lesson::Tier;
use crate::progress::{CONVERSATIONAL_XP, INTERMEDIATE_XP};
use crate::tutor::{CameraStatus, SharedState, Tab, TutorCommand, TutorMode, TutorView};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const GOOD: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const WARN: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);
const DIM: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);

// ---------------------------------------------------------------------------
// TutorApp
// ---------------------------------------------------------------------------

pub struct TutorApp {
    shared: SharedState,
    command_tx: mpsc::Sender<TutorCommand>,

    // ── Camera overlay ───────────────────────────────────────────────────
    overlay: Overlay,
    started: Instant,

    // ── Textures ─────────────────────────────────────────────────────────
    reference_tex: TextureSlot,
    correction_tex: TextureSlot,
    camera_tex: TextureSlot,

    // ── Text inputs ──────────────────────────────────────────────────────
    sentence_input: String,
    practice_input: String,
}

impl TutorApp {
    pub fn new(shared: SharedState, command_tx: mpsc::Sender<TutorCommand>) -> Self {
        Self {
            shared,
            command_tx,
            overlay: Overlay::default(),
            started: Instant::now(),
            reference_tex: TextureSlot::default(),
            correction_tex: TextureSlot::default(),
            camera_tex: TextureSlot::default(),
            sentence_input: String::new(),
            practice_input: String::new(),
        }
    }

    fn send(&self, cmd: TutorCommand) {
        if let Err(e) = self.command_tx.try_send(cmd) {
            log::warn!("ui: command dropped: {e}");
        }
    }

    /// Copy of the latest published view.  The lock is held only for the copy.
    fn snapshot(&self) -> TutorView {
        match self.shared.lock() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // ── Tab bar ──────────────────────────────────────────────────────────

    fn draw_tabs(&self, ui: &mut egui::Ui, view: &TutorView) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("ASL Tutor").strong().size(16.0));
            ui.separator();
            for tab in [Tab::Tutor, Tab::Sentence, Tab::Progress] {
                if ui
                    .selectable_label(view.state.tab == tab, tab.label())
                    .clicked()
                    && view.state.tab != tab
                {
                    self.send(TutorCommand::SetTab(tab));
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "{} XP · {}",
                        view.progress.xp,
                        view.progress.level.label()
                    ))
                    .color(DIM),
                );
            });
        });
    }

    // ── Tutor tab ────────────────────────────────────────────────────────

    fn draw_tutor(&mut self, ui: &mut egui::Ui, view: &TutorView) {
        let state = &view.state;

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(&state.lesson.target).size(32.0).strong());
            ui.vertical(|ui| {
                ui.label(&state.lesson.description);
                ui.label(
                    egui::RichText::new(format!(
                        "{} · lesson {} of {}",
                        state.lesson.difficulty.label(),
                        view.position + 1,
                        view.queue.len()
                    ))
                    .color(DIM),
                );
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(state.mode.label()).color(mode_color(state.mode)));
                if state.mode.is_busy() {
                    ui.spinner();
                }
            });
        });
        ui.separator();

        ui.columns(2, |cols| {
            cols[0].label(egui::RichText::new("Reference").strong());
            draw_image_ref(
                &mut cols[0],
                &mut self.reference_tex,
                state.reference_image.as_ref(),
                "Reference image",
            );
            cols[1].label(egui::RichText::new("Camera").strong());
            self.draw_camera(&mut cols[1], view);
        });

        ui.add_space(6.0);
        self.draw_controls(ui, view);

        ui.add_space(6.0);
        if let Some(feedback) = &state.feedback {
            let color = if feedback.success { GOOD } else { WARN };
            ui.label(egui::RichText::new(&feedback.message).color(color).size(15.0));
            if state.correction_image.is_some() {
                draw_image_ref(
                    ui,
                    &mut self.correction_tex,
                    state.correction_image.as_ref(),
                    "Corrected hand shape",
                );
            }
        } else {
            self.correction_tex.clear();
        }

        if let Some(text) = &view.last_transcript {
            ui.label(egui::RichText::new(format!("Heard: \u{201c}{text}\u{201d}")).italics().color(DIM));
        }

        ui.separator();
        let mut submitted = None;
        ui.horizontal(|ui| {
            ui.label("Practice:");
            let resp = ui.add(
                egui::TextEdit::singleline(&mut self.practice_input)
                    .hint_text("e.g. how do I sign coffee"),
            );
            let entered = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Create lesson").clicked() || entered {
                submitted = Some(std::mem::take(&mut self.practice_input));
            }
        });
        if let Some(text) = submitted.filter(|t| !t.trim().is_empty()) {
            self.send(TutorCommand::SubmitPractice(text));
        }
    }

    fn draw_controls(&self, ui: &mut egui::Ui, view: &TutorView) {
        let state = &view.state;
        ui.horizontal(|ui| {
            if ui
                .add_enabled(state.mode.accepts_submission(), egui::Button::new("Check my sign"))
                .clicked()
            {
                self.send(TutorCommand::Capture);
            }
            if ui
                .add_enabled(view.position > 0, egui::Button::new("Previous"))
                .clicked()
            {
                self.send(TutorCommand::Previous);
            }
            if ui.button("Next").clicked() {
                self.send(TutorCommand::Next);
            }
            if ui.button("Retry").clicked() {
                self.send(TutorCommand::Repeat);
            }

            ui.separator();
            let mut auto = state.auto_mode;
            if ui.checkbox(&mut auto, "Auto capture").changed() {
                self.send(TutorCommand::SetAutoMode(auto));
            }

            let listen = ui
                .add_enabled(
                    view.voice_available,
                    egui::Button::new(if state.listening { "Listening…" } else { "Listen" })
                        .selected(state.listening),
                )
                .on_disabled_hover_text("No speech recognizer configured");
            if listen.clicked() {
                self.send(TutorCommand::SetListening(!state.listening));
            }
        });
    }

    fn draw_camera(&mut self, ui: &mut egui::Ui, view: &TutorView) {
        let width = ui.available_width();
        let (rect, _) = ui.allocate_exact_size(egui::vec2(width, width * 0.75), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 6.0, egui::Color32::from_rgb(24, 24, 28));

        match &view.frame {
            Some(frame) => {
                if let Some(texture) = self.camera_tex.get(ui.ctx(), "camera", view.frame_seq, frame) {
                    painter.image(texture.id(), rect, FULL_UV, egui::Color32::WHITE);
                }
            }
            None => self.camera_tex.clear(),
        }

        let message = match &view.camera {
            CameraStatus::Active => None,
            CameraStatus::Off => Some("Camera off".to_string()),
            CameraStatus::Unavailable(reason) => Some(format!("No camera: {reason}")),
        };
        if let Some(message) = message {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                message,
                egui::FontId::proportional(14.0),
                DIM,
            );
            return;
        }

        let mode = OverlayMode::for_state(view.state.mode, view.state.listening);
        let t = self.started.elapsed().as_secs_f32();
        let stroke = egui::Stroke::new(2.0, ACCENT);

        for shape in self.overlay.shapes(mode, t, &mut rand::rng()) {
            match shape {
                OverlayShape::ScanLine { y } => {
                    let y = rect.top() + y * rect.height();
                    painter.line_segment(
                        [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
                        stroke,
                    );
                }
                OverlayShape::LevelBars { heights } => {
                    let slot = rect.width() / heights.len().max(1) as f32;
                    for (i, h) in heights.iter().enumerate() {
                        let bar_h = (h * rect.height() * 0.5).max(2.0);
                        let x = rect.left() + slot * (i as f32 + 0.5);
                        painter.rect_filled(
                            egui::Rect::from_center_size(
                                egui::pos2(x, rect.center().y),
                                egui::vec2((slot * 0.6).max(1.0), bar_h),
                            ),
                            1.0,
                            GOOD,
                        );
                    }
                }
                OverlayShape::BoundingBox { x, y, w, h } => {
                    let min = to_screen(rect, x, y);
                    let max = to_screen(rect, x + w, y + h);
                    let corners = [
                        min,
                        egui::pos2(max.x, min.y),
                        max,
                        egui::pos2(min.x, max.y),
                    ];
                    for i in 0..4 {
                        painter.line_segment([corners[i], corners[(i + 1) % 4]], stroke);
                    }
                }
            }
        }
    }

    // ── Sentence tab ─────────────────────────────────────────────────────

    fn draw_sentence(&mut self, ui: &mut egui::Ui, view: &TutorView) {
        ui.label("Type a sentence to practise it word by word. Single letters are fingerspelled.");
        ui.add(
            egui::TextEdit::multiline(&mut self.sentence_input)
                .desired_rows(3)
                .desired_width(f32::INFINITY)
                .hint_text("Hello world"),
        );
        if ui.button("Practise this sentence").clicked() {
            let text = std::mem::take(&mut self.sentence_input);
            self.send(TutorCommand::SubmitSentence(text));
        }

        ui.separator();
        ui.label(egui::RichText::new("Lesson queue").strong());
        egui::ScrollArea::vertical().show(ui, |ui| {
            for (i, target) in view.queue.iter().enumerate() {
                let text = format!("{}. {target}", i + 1);
                if i == view.position {
                    ui.label(egui::RichText::new(text).strong().color(ACCENT));
                } else {
                    ui.label(text);
                }
            }
        });
    }

    // ── Progress tab ─────────────────────────────────────────────────────

    fn draw_progress(&self, ui: &mut egui::Ui, view: &TutorView) {
        let p = &view.progress;

        egui::Grid::new("progress_grid")
            .num_columns(2)
            .spacing([24.0, 6.0])
            .show(ui, |ui| {
                ui.label("Experience");
                ui.label(format!("{} XP", p.xp));
                ui.end_row();
                ui.label("Level");
                ui.label(p.level.label());
                ui.end_row();
                ui.label("Streak");
                ui.label(format!("{} day(s)", p.streak_days));
                ui.end_row();
                ui.label("Signs learned");
                ui.label(p.learned_signs.len().to_string());
                ui.end_row();
            });

        ui.add_space(8.0);
        let (fraction, caption) = level_progress(p.xp, p.level);
        ui.add(egui::ProgressBar::new(fraction).text(caption));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn mode_color(mode: TutorMode) -> egui::Color32 {
    match mode {
        TutorMode::Idle => DIM,
        TutorMode::GeneratingReference | TutorMode::Analyzing => ACCENT,
        TutorMode::WaitingForUser => egui::Color32::from_rgb(200, 200, 200),
        TutorMode::Feedback => WARN,
        TutorMode::Success => GOOD,
    }
}

/// Draw an inline image scaled to the column, or a link when only a URL is
/// known.
fn draw_image_ref(
    ui: &mut egui::Ui,
    slot: &mut TextureSlot,
    image: Option<&ImageRef>,
    caption: &str,
) {
    let data = match image {
        None => {
            slot.clear();
            ui.label(egui::RichText::new("No image yet").color(DIM));
            return;
        }
        Some(ImageRef::Url(url)) => {
            slot.clear();
            ui.hyperlink_to(caption, url);
            return;
        }
        Some(ImageRef::Inline(data)) => data,
    };

    let width = ui.available_width();
    match slot.get(ui.ctx(), caption, content_key(data), data) {
        Some(texture) => {
            ui.add(
                egui::Image::new(texture)
                    .max_width(width)
                    .max_height(width * 0.75)
                    .maintain_aspect_ratio(true),
            )
            .on_hover_text(caption);
        }
        None => {
            ui.label(
                egui::RichText::new(format!("{caption}: unreadable {} image", data.mime_type))
                    .color(WARN),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// TextureSlot
// ---------------------------------------------------------------------------

const FULL_UV: egui::Rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

/// A texture and the key of the image it was uploaded from.
#[derive(Default)]
struct TextureSlot {
    key: Option<u64>,
    handle: Option<egui::TextureHandle>,
}

impl TextureSlot {
    /// The texture for `data`, decoded and uploaded only when `key` differs
    /// from the last call.  `None` if the image cannot be decoded.
    fn get(
        &mut self,
        ctx: &egui::Context,
        name: &str,
        key: u64,
        data: &ImageData,
    ) -> Option<&egui::TextureHandle> {
        if self.key != Some(key) {
            self.key = Some(key);
            self.handle = data.to_rgba().map(|rgba| {
                let size = [rgba.width() as usize, rgba.height() as usize];
                let image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                ctx.load_texture(name, image, egui::TextureOptions::LINEAR)
            });
        }
        self.handle.as_ref()
    }

    fn clear(&mut self) {
        self.key = None;
        self.handle = None;
    }
}

fn content_key(data: &ImageData) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.data.hash(&mut hasher);
    hasher.finish()
}

/// Normalised overlay coordinates → screen position inside `rect`.
fn to_screen(rect: egui::Rect, x: f32, y: f32) -> egui::Pos2 {
    egui::pos2(
        rect.left() + x * rect.width(),
        rect.top() + y * rect.height(),
    )
}

/// Fraction of the way to the next level, and a caption for it.
fn level_progress(xp: u64, level: Tier) -> (f32, String) {
    let (floor, next) = match level {
        Tier::Beginner => (0, INTERMEDIATE_XP),
        Tier::Intermediate => (INTERMEDIATE_XP, CONVERSATIONAL_XP),
        Tier::Conversational => return (1.0, "Top level reached".into()),
    };
    let span = (next - floor) as f32;
    let done = xp.saturating_sub(floor).min(next - floor) as f32;
    (done / span, format!("{xp} / {next} XP"))
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let view = self.snapshot();

        // The orchestrator publishes without waking the window, so keep
        // polling; faster while the overlay animates.
        let animating = view.state.tab == Tab::Tutor && view.camera == CameraStatus::Active;
        let period = if animating {
            Duration::from_millis(33)
        } else if view.state.mode.is_busy() {
            Duration::from_millis(100)
        } else {
            Duration::from_millis(250)
        };
        ctx.request_repaint_after(period);

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_tabs(ui, &view);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| match view.state.tab {
            Tab::Tutor => self.draw_tutor(ui, &view),
            Tab::Sentence => self.draw_sentence(ui, &view),
            Tab::Progress => self.draw_progress(ui, &view),
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("ASL tutor window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_progress_fraction() {
        let (f, caption) = level_progress(250, Tier::Beginner);
        assert!((f - 0.5).abs() < 1e-6);
        assert_eq!(caption, "250 / 500 XP");

        let (f, _) = level_progress(1_000, Tier::Intermediate);
        assert!((f - 0.5).abs() < 1e-6);

        assert_eq!(level_progress(9_999, Tier::Conversational).0, 1.0);
    }

    #[test]
    fn level_progress_clamps_when_level_lags() {
        // Level is raised on the next award; until then the bar stays full.
        let (f, _) = level_progress(700, Tier::Beginner);
        assert_eq!(f, 1.0);
    }

    fn png(w: u32, h: u32) -> ImageData {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(w, h, image::Rgba([200, 40, 40, 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        ImageData::from_bytes("image/png", &bytes)
    }

    #[test]
    fn texture_uploaded_once_per_image() {
        let ctx = egui::Context::default();
        let mut slot = TextureSlot::default();
        let red = png(4, 3);

        let first = slot.get(&ctx, "reference", content_key(&red), &red).map(|t| t.id());
        assert!(first.is_some());
        assert_eq!(slot.handle.as_ref().map(|t| t.size()), Some([4, 3]));
        let again = slot.get(&ctx, "reference", content_key(&red), &red).map(|t| t.id());
        assert_eq!(first, again);

        let other = png(2, 2);
        assert_ne!(content_key(&red), content_key(&other));
        let replaced = slot.get(&ctx, "reference", content_key(&other), &other).map(|t| t.id());
        assert_ne!(first, replaced);
        assert_eq!(slot.handle.as_ref().map(|t| t.size()), Some([2, 2]));
    }

    #[test]
    fn undecodable_image_has_no_texture() {
        let ctx = egui::Context::default();
        let mut slot = TextureSlot::default();
        let junk = ImageData::from_bytes("image/jpeg", b"frame");
        assert!(slot.get(&ctx, "camera", 1, &junk).is_none());

        slot.clear();
        assert!(slot.key.is_none());
    }

    #[test]
    fn overlay_coordinates_scale_to_rect() {
        let rect = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(200.0, 100.0));
        assert_eq!(to_screen(rect, 0.0, 0.0), egui::pos2(10.0, 20.0));
        assert_eq!(to_screen(rect, 1.0, 1.0), egui::pos2(210.0, 120.0));
        assert_eq!(to_screen(rect, 0.5, 0.5), rect.center());
    }
}

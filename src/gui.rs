use std::sync::mpsc::Receiver;
use std::time::Duration;

use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};

use crate::answer::{code_markdown, split_answer};
use crate::command::{CommandEvent, Direction};
use crate::coordinator::Coordinator;
use crate::mailbox::ControlMessage;
use crate::session::SessionPhase;
use crate::settings::CommandBinding;

/// How often the cursor is checked against the panel while nothing else
/// wakes the UI loop.
pub const HOVER_POLL: Duration = Duration::from_millis(50);

struct Preview {
    seq: u64,
    texture: egui::TextureHandle,
}

/// The eframe application. Each frame it drains the control channel into
/// the [`Coordinator`], feeds hover changes and renders the session.
pub struct OverlayApp {
    coordinator: Coordinator,
    inbox: Receiver<ControlMessage>,
    hovering: bool,
    shortcuts: Vec<(String, &'static str)>,
    markdown_cache: CommonMarkCache,
    preview: Option<Preview>,
}

fn describe(cmd: CommandEvent) -> &'static str {
    match cmd {
        CommandEvent::ToggleAnalysis => "Analyze screen / collapse",
        CommandEvent::ToggleAlwaysOnTop => "Toggle always on top",
        CommandEvent::SubmitQuery => "Ask again with your question",
        CommandEvent::Quit => "Quit",
        CommandEvent::MoveStart(_) | CommandEvent::MoveStop(_) => "Move panel",
    }
}

impl OverlayApp {
    pub fn new(
        coordinator: Coordinator,
        inbox: Receiver<ControlMessage>,
        bindings: &[CommandBinding],
    ) -> Self {
        let mut shortcuts: Vec<(String, &'static str)> = Vec::new();
        let mut moves = Vec::new();
        for b in bindings {
            match b.on_press {
                CommandEvent::MoveStart(_) => moves.push(b.binding.hotkey.to_string()),
                cmd => shortcuts.push((b.binding.hotkey.to_string(), describe(cmd))),
            }
        }
        if !moves.is_empty() {
            shortcuts.push((moves.join(" / "), describe(CommandEvent::MoveStop(Direction::Up))));
        }

        coordinator.window().present();
        Self {
            coordinator,
            inbox,
            hovering: false,
            shortcuts,
            markdown_cache: CommonMarkCache::default(),
            preview: None,
        }
    }

    fn drain_inbox(&mut self) {
        while let Ok(msg) = self.inbox.try_recv() {
            self.coordinator.handle(msg);
        }
    }

    fn poll_hover(&mut self, ctx: &egui::Context) {
        let rect = ctx.input(|i| i.viewport().outer_rect);
        let hovering = match (rect, crate::native::cursor_position()) {
            (Some(rect), Some((x, y))) => rect.contains(egui::pos2(x, y)),
            _ => ctx.input(|i| i.pointer.hover_pos().is_some()),
        };
        if hovering != self.hovering {
            self.hovering = hovering;
            self.coordinator
                .handle(ControlMessage::HoverChanged(hovering));
        }
    }

    fn update_preview(&mut self, ctx: &egui::Context) {
        let state = self.coordinator.session().state();
        let Some(png) = &state.captured_image else {
            self.preview = None;
            return;
        };
        let seq = state.capture_seq;
        if self.preview.as_ref().map(|p| p.seq) == Some(seq) {
            return;
        }
        match image::load_from_memory(png) {
            Ok(img) => {
                let size = [img.width() as usize, img.height() as usize];
                let rgba = img.to_rgba8();
                let texture = ctx.load_texture(
                    "captured_screen",
                    egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()),
                    egui::TextureOptions::LINEAR,
                );
                self.preview = Some(Preview { seq, texture });
            }
            Err(e) => {
                tracing::warn!("failed to decode captured image: {e}");
                self.preview = None;
            }
        }
    }

    fn collapsed_ui(&self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for (keys, what) in &self.shortcuts {
                ui.label(egui::RichText::new(keys).strong());
                ui.label(*what);
                ui.add_space(12.0);
            }
        });
    }

    fn expanded_ui(&mut self, ui: &mut egui::Ui) {
        let (phase, is_loading, result_text) = {
            let state = self.coordinator.session().state();
            (state.phase, state.is_loading, state.result_text.clone())
        };

        ui.horizontal(|ui| {
            ui.label("Question:");
            let resp = ui.add(
                egui::TextEdit::singleline(self.coordinator.session_mut().query_mut())
                    .hint_text(crate::model::DEFAULT_QUERY)
                    .desired_width(f32::INFINITY),
            );
            let enter = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if enter || ui.button("Ask").clicked() {
                self.coordinator.command(CommandEvent::SubmitQuery);
            }
        });
        ui.separator();

        if is_loading {
            ui.horizontal(|ui| {
                ui.spinner();
                let what = match phase {
                    SessionPhase::Idle | SessionPhase::Capturing => "Capturing screen...",
                    _ => "Thinking...",
                };
                ui.label(what);
            });
        }

        if let Some(result) = &result_text {
            let split = split_answer(result);
            egui::ScrollArea::vertical().show(ui, |ui| {
                if split.explanation.is_empty() || phase == SessionPhase::Error {
                    if phase == SessionPhase::Error
                        || result == crate::session::NO_TEXT_MESSAGE
                    {
                        ui.label(result);
                    } else {
                        CommonMarkViewer::new("answer_code").show(
                            ui,
                            &mut self.markdown_cache,
                            &code_markdown(&split.code),
                        );
                    }
                } else {
                    ui.columns(2, |cols| {
                        CommonMarkViewer::new("answer_explanation").show(
                            &mut cols[0],
                            &mut self.markdown_cache,
                            &split.explanation,
                        );
                        CommonMarkViewer::new("answer_code").show(
                            &mut cols[1],
                            &mut self.markdown_cache,
                            &code_markdown(&split.code),
                        );
                    });
                }
            });
        } else if let Some(preview) = &self.preview {
            let avail = ui.available_size();
            let tex_size = preview.texture.size_vec2();
            let scale = (avail.x / tex_size.x).min(avail.y / tex_size.y).min(1.0);
            ui.add(egui::Image::new(&preview.texture).fit_to_exact_size(tex_size * scale));
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_inbox();
        if self.coordinator.quit_requested() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }
        self.poll_hover(ctx);
        self.update_preview(ctx);

        let panel = egui::Frame::none()
            .fill(egui::Color32::from_black_alpha(210))
            .rounding(10.0)
            .inner_margin(egui::Margin::same(12.0));
        egui::CentralPanel::default().frame(panel).show(ctx, |ui| {
            if self.coordinator.session().state().is_expanded {
                self.expanded_ui(ui);
            } else {
                self.collapsed_ui(ui);
            }
        });

        ctx.request_repaint_after(HOVER_POLL);
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0, 0.0, 0.0, 0.0]
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.coordinator.shutdown();
    }
}

use eframe::egui;

use crate::screen::{ScreenFrame, ScreenProvider, FALLBACK_FRAME};

pub const COLLAPSED_HEIGHT: f32 = 60.0;
pub const COLLAPSED_WIDTH_RATIO: f32 = 0.5;
pub const EXPANDED_WIDTH_RATIO: f32 = 0.5;
pub const EXPANDED_HEIGHT_RATIO: f32 = 0.8;
/// Gap between the top of the screen and a freshly placed panel.
pub const TOP_MARGIN: f32 = 30.0;
/// Where the panel is parked while it must not be on screen.
pub const OFFSCREEN_POS: (f32, f32) = (-20000.0, -20000.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowLevel {
    Normal,
    AlwaysOnTop,
}

/// Geometry in screen space: origin is the panel's bottom-left corner,
/// measured from the bottom-left of the active screen with y growing upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowGeometry {
    pub origin: (f32, f32),
    pub size: (f32, f32),
    pub level: WindowLevel,
    pub click_through: bool,
}

pub fn collapsed_size(screen: &ScreenFrame) -> (f32, f32) {
    (screen.width * COLLAPSED_WIDTH_RATIO, COLLAPSED_HEIGHT)
}

pub fn expanded_size(screen: &ScreenFrame) -> (f32, f32) {
    (
        screen.width * EXPANDED_WIDTH_RATIO,
        screen.height * EXPANDED_HEIGHT_RATIO,
    )
}

/// Origin after resizing from `old_size` to `new_size` so the panel's top
/// edge stays put: origin.y shifts by the height delta.
pub fn anchored_origin(origin: (f32, f32), old_size: (f32, f32), new_size: (f32, f32)) -> (f32, f32) {
    (origin.0, origin.1 + (old_size.1 - new_size.1))
}

/// Horizontally centred, `TOP_MARGIN` below the top of the screen.
pub fn default_origin(screen: &ScreenFrame, size: (f32, f32)) -> (f32, f32) {
    (
        (screen.width - size.0) / 2.0,
        screen.height - size.1 - TOP_MARGIN,
    )
}

/// Keep a saved origin only when a panel placed there would overlap the
/// screen; otherwise fall back to the default placement.
pub fn restore_origin(saved: Option<(f32, f32)>, size: (f32, f32), screen: &ScreenFrame) -> (f32, f32) {
    match saved {
        Some((x, y))
            if x < screen.width && x + size.0 > 0.0 && y < screen.height && y + size.1 > 0.0 =>
        {
            (x, y)
        }
        Some(pos) => {
            tracing::info!(?pos, "saved position is off screen; using default");
            default_origin(screen, size)
        }
        None => default_origin(screen, size),
    }
}

/// Convert a screen-space origin to the window system's top-left position.
pub fn to_viewport_pos(origin: (f32, f32), size: (f32, f32), screen: &ScreenFrame) -> egui::Pos2 {
    egui::pos2(
        screen.x + origin.0,
        screen.y + screen.height - (origin.1 + size.1),
    )
}

/// Seam over the window system; implemented by `egui::Context` and by test
/// doubles that record commands.
pub trait ViewportCtx {
    fn send_viewport_cmd(&self, cmd: egui::ViewportCommand);
    fn request_repaint(&self);
}

impl ViewportCtx for egui::Context {
    fn send_viewport_cmd(&self, cmd: egui::ViewportCommand) {
        egui::Context::send_viewport_cmd(self, cmd);
    }

    fn request_repaint(&self) {
        egui::Context::request_repaint(self);
    }
}

/// Sole owner of the overlay window's geometry, level, click-through flag
/// and on-screen presence.
pub struct OverlayWindowController {
    ctx: Box<dyn ViewportCtx>,
    screen: Box<dyn ScreenProvider>,
    geometry: WindowGeometry,
    expanded: bool,
    visible: bool,
}

impl OverlayWindowController {
    /// Place the collapsed panel, restoring `saved` when it is still on screen.
    pub fn new(
        ctx: Box<dyn ViewportCtx>,
        screen: Box<dyn ScreenProvider>,
        saved: Option<(f32, f32)>,
    ) -> Self {
        let frame = screen.active_frame().unwrap_or_else(|| {
            tracing::warn!("no screen information available; assuming {:?}", FALLBACK_FRAME);
            FALLBACK_FRAME
        });
        let size = collapsed_size(&frame);
        let origin = restore_origin(saved, size, &frame);
        Self {
            ctx,
            screen,
            geometry: WindowGeometry {
                origin,
                size,
                level: WindowLevel::AlwaysOnTop,
                click_through: true,
            },
            expanded: false,
            visible: true,
        }
    }

    fn frame(&self) -> ScreenFrame {
        self.screen.active_frame().unwrap_or(FALLBACK_FRAME)
    }

    /// Push the full current state to the window system.
    pub fn present(&self) {
        self.send_size();
        self.send_position();
        self.send_level();
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::MousePassthrough(self.geometry.click_through));
        self.ctx.request_repaint();
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub fn current_origin(&self) -> (f32, f32) {
        self.geometry.origin
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Resize for the collapsed or expanded layout, sizes taken from the
    /// screen as it is right now.
    pub fn apply_state(&mut self, expanded: bool) {
        let frame = self.frame();
        let new_size = if expanded {
            expanded_size(&frame)
        } else {
            collapsed_size(&frame)
        };
        let old = self.geometry;
        self.geometry.origin = anchored_origin(old.origin, old.size, new_size);
        self.geometry.size = new_size;
        self.expanded = expanded;
        tracing::debug!(
            expanded,
            from = ?old.size,
            to = ?new_size,
            origin = ?self.geometry.origin,
            "overlay resized"
        );
        self.send_size();
        self.send_position();
        self.ctx.request_repaint();
    }

    pub fn set_click_through(&mut self, click_through: bool) {
        if self.geometry.click_through == click_through {
            return;
        }
        self.geometry.click_through = click_through;
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::MousePassthrough(click_through));
    }

    /// Hovering makes the panel interactive; leaving restores click-through.
    pub fn hover_changed(&mut self, hovering: bool) {
        self.set_click_through(!hovering);
    }

    /// Move without any bounds check; the panel may leave the screen.
    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.geometry.origin.0 += dx;
        self.geometry.origin.1 += dy;
        self.send_position();
    }

    pub fn toggle_always_on_top(&mut self) {
        self.geometry.level = match self.geometry.level {
            WindowLevel::AlwaysOnTop => WindowLevel::Normal,
            WindowLevel::Normal => WindowLevel::AlwaysOnTop,
        };
        tracing::info!(level = ?self.geometry.level, "window level changed");
        self.send_level();
    }

    /// Take the panel off screen entirely (it is parked, not made
    /// transparent) or bring it back to its geometry.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.send_position();
        } else {
            self.ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(
                egui::pos2(OFFSCREEN_POS.0, OFFSCREEN_POS.1),
            ));
        }
        self.ctx.request_repaint();
    }

    fn send_size(&self) {
        let (w, h) = self.geometry.size;
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::InnerSize(egui::vec2(w, h)));
    }

    fn send_position(&self) {
        if !self.visible {
            return;
        }
        let pos = to_viewport_pos(self.geometry.origin, self.geometry.size, &self.frame());
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::OuterPosition(pos));
    }

    fn send_level(&self) {
        let level = match self.geometry.level {
            WindowLevel::AlwaysOnTop => egui::WindowLevel::AlwaysOnTop,
            WindowLevel::Normal => egui::WindowLevel::Normal,
        };
        self.ctx
            .send_viewport_cmd(egui::ViewportCommand::WindowLevel(level));
    }
}

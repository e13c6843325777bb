use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;

/// A display's frame in global desktop points (top-left origin, y down),
/// as reported by the window system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenFrame {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Frame used when the window system cannot tell us anything.
pub const FALLBACK_FRAME: ScreenFrame = ScreenFrame {
    x: 0.0,
    y: 0.0,
    width: 1440.0,
    height: 900.0,
};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no display available")]
    NoDisplay,
    #[error("screen capture failed: {0}")]
    Failed(String),
    #[error("could not encode capture: {0}")]
    Encode(String),
    #[error("screen capture is not supported on this platform")]
    Unsupported,
}

/// Source of the active display's geometry. Queried at every transition so a
/// display change between toggles is picked up.
pub trait ScreenProvider {
    fn active_frame(&self) -> Option<ScreenFrame>;
}

/// Captures the whole active display as PNG bytes.
pub trait DisplayCapture: Send + Sync {
    fn capture_display(&self) -> Result<Vec<u8>, CaptureError>;
}

/// A screen that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedScreen(pub ScreenFrame);

impl ScreenProvider for FixedScreen {
    fn active_frame(&self) -> Option<ScreenFrame> {
        Some(self.0)
    }
}

pub fn encode_png(img: &image::RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Write a capture into `dir` with a timestamped name.
pub fn archive_capture(dir: &Path, png: &[u8]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let filename = format!("glassbar_{}.png", Local::now().format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    std::fs::write(&path, png)?;
    Ok(path)
}

#[cfg(target_os = "macos")]
mod desktop {
    use screenshots::Screen;

    use super::{encode_png, CaptureError, DisplayCapture, ScreenFrame, ScreenProvider};

    /// The main display, through the screenshots crate.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DesktopScreen;

    fn primary() -> Result<Screen, CaptureError> {
        let screens = Screen::all().map_err(|e| CaptureError::Failed(e.to_string()))?;
        let idx = screens
            .iter()
            .position(|s| s.display_info.is_primary)
            .unwrap_or(0);
        screens.into_iter().nth(idx).ok_or(CaptureError::NoDisplay)
    }

    impl ScreenProvider for DesktopScreen {
        fn active_frame(&self) -> Option<ScreenFrame> {
            let info = primary().ok()?.display_info;
            Some(ScreenFrame::new(
                info.x as f32,
                info.y as f32,
                info.width as f32,
                info.height as f32,
            ))
        }
    }

    impl DisplayCapture for DesktopScreen {
        fn capture_display(&self) -> Result<Vec<u8>, CaptureError> {
            let screen = primary()?;
            let img = screen
                .capture()
                .map_err(|e| CaptureError::Failed(e.to_string()))?;
            encode_png(&img)
        }
    }
}

#[cfg(target_os = "macos")]
pub use desktop::DesktopScreen;

#[cfg(not(target_os = "macos"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopScreen;

#[cfg(not(target_os = "macos"))]
impl ScreenProvider for DesktopScreen {
    fn active_frame(&self) -> Option<ScreenFrame> {
        None
    }
}

#[cfg(not(target_os = "macos"))]
impl DisplayCapture for DesktopScreen {
    fn capture_display(&self) -> Result<Vec<u8>, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}

pub fn platform_display() -> (Box<dyn ScreenProvider>, Arc<dyn DisplayCapture>) {
    (Box::new(DesktopScreen), Arc::new(DesktopScreen))
}

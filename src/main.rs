use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui;
use glassbar::capture::CaptureSequencer;
use glassbar::coordinator::Coordinator;
use glassbar::gui::OverlayApp;
use glassbar::hotkey_registry::HotkeyRegistry;
use glassbar::key_tap::platform_tap;
use glassbar::model::{ModelClient, OpenAiClient};
use glassbar::motion::RepeatMotionController;
use glassbar::ocr::{TesseractRecognizer, TextRecognizer};
use glassbar::overlay::{collapsed_size, restore_origin, to_viewport_pos, OverlayWindowController};
use glassbar::screen::{platform_display, FALLBACK_FRAME};
use glassbar::settings::{app_data_dir, PositionStore, SettingsStore, LOG_FILE, SETTINGS_FILE};
use glassbar::{logging, mailbox, native};

fn main() -> anyhow::Result<()> {
    let data_dir = app_data_dir()?;
    let store = SettingsStore::new(data_dir.join(SETTINGS_FILE));
    let settings = store.load();
    logging::init(settings.debug_logging, Some(data_dir.join(LOG_FILE)));
    tracing::info!("starting; data directory {}", data_dir.display());

    let model: Arc<dyn ModelClient> = Arc::new(OpenAiClient::new(&settings.model)?);
    let recognizer: Arc<dyn TextRecognizer> = Arc::new(TesseractRecognizer::new(
        "tesseract",
        settings.ocr_language.clone(),
    ));
    let (screen, display) = platform_display();

    let saved = store.load_position();
    let frame = screen.active_frame().unwrap_or(FALLBACK_FRAME);
    let size = collapsed_size(&frame);
    let start = to_viewport_pos(restore_origin(saved, size, &frame), size, &frame);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([size.0, size.1])
            .with_position(start)
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_taskbar(false)
            .with_mouse_passthrough(true),
        ..Default::default()
    };

    eframe::run_native(
        "Glassbar",
        native_options,
        Box::new(move |cc| {
            if let Err(e) = native::configure_window(cc) {
                tracing::warn!("failed to configure overlay window: {e}");
            }

            let ctx = cc.egui_ctx.clone();
            let (mailbox, inbox) = mailbox::channel(move || ctx.request_repaint());

            let registry = HotkeyRegistry::new(platform_tap(), mailbox.clone());
            let motion = RepeatMotionController::new(
                mailbox.clone(),
                settings.repeat_interval(),
                settings.move_step,
            );
            let window = OverlayWindowController::new(Box::new(cc.egui_ctx.clone()), screen, saved);
            let sequencer = CaptureSequencer::new(
                mailbox,
                display,
                recognizer,
                model,
                settings.capture_settle(),
            )
            .with_archive_dir(settings.capture_dir.as_ref().map(PathBuf::from));

            let mut coordinator =
                Coordinator::new(registry, motion, window, sequencer, Box::new(store));
            let bindings = settings.hotkeys.bindings();
            let (handles, errors) = coordinator.register_bindings(&bindings);
            if errors.is_empty() {
                tracing::info!("{} hotkeys registered", handles.len());
            } else {
                tracing::warn!(
                    "{} of {} hotkeys unavailable",
                    errors.len(),
                    bindings.len()
                );
            }

            Box::new(OverlayApp::new(coordinator, inbox, &bindings))
        }),
    )
    .map_err(|e| anyhow::anyhow!("failed to start the overlay window: {e}"))?;

    tracing::info!("exited");
    Ok(())
}

use raw_window_handle::HasWindowHandle;

/// Keep the panel out of screen sharing and recordings made by other
/// applications, and show it on every space including full-screen ones.
#[cfg(target_os = "macos")]
pub fn configure_window(handle: &impl HasWindowHandle) -> anyhow::Result<()> {
    use objc2::msg_send;
    use objc2::runtime::AnyObject;
    use raw_window_handle::RawWindowHandle;

    // NSWindowSharingNone
    const SHARING_NONE: usize = 0;
    // CanJoinAllSpaces | Stationary | FullScreenAuxiliary
    const COLLECTION_BEHAVIOR: usize = (1 << 0) | (1 << 4) | (1 << 8);

    let raw = handle
        .window_handle()
        .map_err(|e| anyhow::anyhow!("window handle unavailable: {e}"))?
        .as_raw();
    let RawWindowHandle::AppKit(appkit) = raw else {
        anyhow::bail!("not an AppKit window");
    };

    let view = appkit.ns_view.as_ptr() as *mut AnyObject;
    unsafe {
        let window: *mut AnyObject = msg_send![view, window];
        if window.is_null() {
            anyhow::bail!("view is not attached to a window");
        }
        let _: () = msg_send![window, setSharingType: SHARING_NONE];
        let _: () = msg_send![window, setCollectionBehavior: COLLECTION_BEHAVIOR];
    }
    tracing::debug!("window excluded from screen sharing");
    Ok(())
}

#[cfg(not(target_os = "macos"))]
pub fn configure_window(_handle: &impl HasWindowHandle) -> anyhow::Result<()> {
    tracing::debug!("screen sharing exclusion not available on this platform");
    Ok(())
}

/// Global cursor position in points, origin at the top-left of the main
/// display.
pub fn cursor_position() -> Option<(f32, f32)> {
    #[cfg(target_os = "macos")]
    {
        use core_graphics::event::{CGEvent, CGEventSource};
        use core_graphics::event_source::CGEventSourceStateID;
        let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState).ok()?;
        let event = CGEvent::new(source).ok()?;
        let loc = event.location();
        Some((loc.x as f32, loc.y as f32))
    }

    #[cfg(not(target_os = "macos"))]
    {
        None
    }
}

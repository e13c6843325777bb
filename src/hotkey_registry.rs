use std::collections::HashMap;

use thiserror::Error;

use crate::command::CommandEvent;
use crate::hotkey::{BindingKind, Hotkey, HotkeyBinding};
use crate::mailbox::Mailbox;

pub type BindingId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Pressed,
    Released,
}

/// A raw press or release for a registered binding, as delivered by the
/// listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub binding: BindingId,
    pub phase: KeyPhase,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("hotkey '{0}' is already bound")]
    AlreadyBound(String),
    #[error("global key listener unavailable: {0}")]
    ListenerUnavailable(String),
    #[error("hotkey '{0}' was refused by the system")]
    Denied(String),
    #[error("repeating hotkey '{0}' needs a release callback")]
    MissingRelease(String),
}

/// The OS facility that observes global key events. Only one listener may be
/// installed per process; bindings are added to it afterwards.
pub trait KeyTap {
    /// Start the process-wide listener. Matched combos are posted to `sink`.
    fn install(&mut self, sink: Mailbox) -> Result<(), HotkeyError>;
    fn bind(&mut self, id: BindingId, hotkey: Hotkey) -> Result<(), HotkeyError>;
    fn unbind(&mut self, id: BindingId);
}

/// Opaque handle returned by [`HotkeyRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    id: BindingId,
}

impl RegistrationHandle {
    pub fn id(&self) -> BindingId {
        self.id
    }
}

pub type Callback = Box<dyn FnMut() -> Option<CommandEvent>>;

struct Route {
    binding: HotkeyBinding,
    on_press: Callback,
    on_release: Option<Callback>,
}

/// Owns every global binding and routes listener events to callbacks on the
/// control thread.
pub struct HotkeyRegistry {
    tap: Box<dyn KeyTap>,
    sink: Mailbox,
    installed: bool,
    install_error: Option<HotkeyError>,
    next_id: BindingId,
    routes: HashMap<BindingId, Route>,
}

impl HotkeyRegistry {
    pub fn new(tap: Box<dyn KeyTap>, sink: Mailbox) -> Self {
        Self {
            tap,
            sink,
            installed: false,
            install_error: None,
            next_id: 1,
            routes: HashMap::new(),
        }
    }

    /// Register a binding. The listener is installed on the first call; a
    /// failed install is remembered and returned again without retrying.
    /// IDs are never handed out twice, even when registration fails.
    pub fn register(
        &mut self,
        binding: HotkeyBinding,
        on_press: Callback,
        on_release: Option<Callback>,
    ) -> Result<RegistrationHandle, HotkeyError> {
        if self
            .routes
            .values()
            .any(|r| r.binding.hotkey == binding.hotkey)
        {
            return Err(HotkeyError::AlreadyBound(binding.hotkey.to_string()));
        }

        if binding.kind == BindingKind::Repeating && on_release.is_none() {
            return Err(HotkeyError::MissingRelease(binding.hotkey.to_string()));
        }

        if let Some(err) = &self.install_error {
            return Err(err.clone());
        }
        if !self.installed {
            if let Err(e) = self.tap.install(self.sink.clone()) {
                tracing::error!("global key listener unavailable: {e}");
                self.install_error = Some(e.clone());
                return Err(e);
            }
            self.installed = true;
            tracing::info!("global key listener installed");
        }

        let id = self.next_id;
        self.next_id += 1;

        self.tap.bind(id, binding.hotkey)?;
        tracing::info!(binding = id, "registered hotkey '{}'", binding.hotkey);
        self.routes.insert(
            id,
            Route {
                binding,
                on_press,
                on_release,
            },
        );
        Ok(RegistrationHandle { id })
    }

    /// Convenience over [`register`](Self::register) for bindings that map
    /// straight to commands.
    pub fn register_command(
        &mut self,
        binding: HotkeyBinding,
        on_press: CommandEvent,
        on_release: Option<CommandEvent>,
    ) -> Result<RegistrationHandle, HotkeyError> {
        let release: Option<Callback> = on_release.map(|cmd| Box::new(move || Some(cmd)) as Callback);
        self.register(binding, Box::new(move || Some(on_press)), release)
    }

    /// Release a binding. Calling it again is a no-op.
    pub fn unregister(&mut self, handle: RegistrationHandle) {
        if let Some(route) = self.routes.remove(&handle.id) {
            self.tap.unbind(handle.id);
            tracing::info!(binding = handle.id, "unregistered hotkey '{}'", route.binding.hotkey);
        }
    }

    pub fn unregister_all(&mut self) {
        let ids: Vec<BindingId> = self.routes.keys().copied().collect();
        for id in ids {
            self.unregister(RegistrationHandle { id });
        }
    }

    /// Run the callback for a listener event. Must be called on the control
    /// thread; events for unknown IDs are dropped.
    pub fn dispatch(&mut self, event: RawKeyEvent) -> Option<CommandEvent> {
        let Some(route) = self.routes.get_mut(&event.binding) else {
            tracing::debug!(binding = event.binding, "event for unknown binding");
            return None;
        };
        match event.phase {
            KeyPhase::Pressed => (route.on_press)(),
            KeyPhase::Released if route.binding.kind == BindingKind::Repeating => {
                route.on_release.as_mut().and_then(|cb| cb())
            }
            KeyPhase::Released => None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Drop for HotkeyRegistry {
    fn drop(&mut self) {
        self.unregister_all();
    }
}

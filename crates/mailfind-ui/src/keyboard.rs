//! Global keyboard shortcuts
//!
//! Bindings:
//!
//! ```text
//! Ctrl/Cmd+F    toggle the filter panel
//! Ctrl/Cmd+V    toggle voice input
//! Enter         search now
//! Escape        clear query, filters and results
//! ArrowUp/Down  move the result selection
//! 1-9           select the Nth visible result
//! ```
//!
//! Nothing fires while focus is in a text-entry element, so typing digits
//! or pasting with Ctrl+V in the query box behaves normally.

use tracing::{debug, trace};

/// Key identity, as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
    Char(char),
}

impl Key {
    /// Map a DOM-style key name (`"Enter"`, `"ArrowUp"`, `"f"`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Enter" => Some(Key::Enter),
            "Escape" | "Esc" => Some(Key::Escape),
            "ArrowUp" => Some(Key::ArrowUp),
            "ArrowDown" => Some(Key::ArrowDown),
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    /// Cmd on macOS
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Exactly one of Ctrl or Cmd, and nothing else
    fn is_command_chord(&self) -> bool {
        (self.ctrl != self.meta) && !self.shift && !self.alt
    }
}

/// Element that had focus when the key was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyTarget {
    #[default]
    Window,
    Element,
    TextInput,
    TextArea,
    ContentEditable,
}

impl KeyTarget {
    pub fn accepts_text(&self) -> bool {
        matches!(self, KeyTarget::TextInput | KeyTarget::TextArea | KeyTarget::ContentEditable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub target: KeyTarget,
}

impl KeyEvent {
    /// Unmodified key press on the window
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            target: KeyTarget::Window,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn in_target(mut self, target: KeyTarget) -> Self {
        self.target = target;
        self
    }
}

/// What a shortcut asks the search interface to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutCommand {
    Search,
    Clear,
    PreviousResult,
    NextResult,
    ToggleFilters,
    ToggleVoice,
    /// Select the Nth visible result, 1 through 9
    SelectVisible(usize),
}

/// Resolve a key press to a shortcut, if it is bound
pub fn resolve_shortcut(event: &KeyEvent) -> Option<ShortcutCommand> {
    if event.target.accepts_text() {
        return None;
    }

    let mods = event.modifiers;
    if mods.is_command_chord() {
        return match event.key {
            Key::Char(c) if c.eq_ignore_ascii_case(&'f') => Some(ShortcutCommand::ToggleFilters),
            Key::Char(c) if c.eq_ignore_ascii_case(&'v') => Some(ShortcutCommand::ToggleVoice),
            _ => None,
        };
    }
    if !mods.is_empty() {
        return None;
    }

    match event.key {
        Key::Enter => Some(ShortcutCommand::Search),
        Key::Escape => Some(ShortcutCommand::Clear),
        Key::ArrowUp => Some(ShortcutCommand::PreviousResult),
        Key::ArrowDown => Some(ShortcutCommand::NextResult),
        Key::Char(c @ '1'..='9') => c.to_digit(10).map(|n| ShortcutCommand::SelectVisible(n as usize)),
        Key::Char(_) => None,
    }
}

/// Handle returned by [`KeyRouter::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&KeyEvent)>;

/// Window-level key listener registry
#[derive(Default)]
pub struct KeyRouter {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&KeyEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the listener was registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver a key press to every listener, in registration order
    pub fn dispatch(&mut self, event: &KeyEvent) {
        trace!("Dispatching {:?} to {} listeners", event.key, self.listeners.len());
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

/// Mounts the shortcut bindings on a [`KeyRouter`]
///
/// At most one listener is registered per dispatcher; mounting twice is a
/// no-op and unmounting removes it.
#[derive(Debug, Default)]
pub struct ShortcutDispatcher {
    listener: Option<ListenerId>,
}

impl ShortcutDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self) -> bool {
        self.listener.is_some()
    }

    pub fn mount(&mut self, router: &mut KeyRouter, mut on_command: impl FnMut(ShortcutCommand) + 'static) {
        if self.listener.is_some() {
            return;
        }
        let id = router.add_listener(move |event| {
            if let Some(command) = resolve_shortcut(event) {
                debug!("Shortcut {:?}", command);
                on_command(command);
            }
        });
        self.listener = Some(id);
    }

    pub fn unmount(&mut self, router: &mut KeyRouter) {
        if let Some(id) = self.listener.take() {
            router.remove_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn mounted() -> (KeyRouter, ShortcutDispatcher, Rc<RefCell<Vec<ShortcutCommand>>>) {
        let mut router = KeyRouter::new();
        let mut dispatcher = ShortcutDispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        dispatcher.mount(&mut router, move |command| sink.borrow_mut().push(command));
        (router, dispatcher, seen)
    }

    #[test]
    fn test_bindings_on_window() {
        let cases = [
            (KeyEvent::new(Key::Enter), Some(ShortcutCommand::Search)),
            (KeyEvent::new(Key::Escape), Some(ShortcutCommand::Clear)),
            (KeyEvent::new(Key::ArrowUp), Some(ShortcutCommand::PreviousResult)),
            (KeyEvent::new(Key::ArrowDown), Some(ShortcutCommand::NextResult)),
            (KeyEvent::new(Key::Char('3')), Some(ShortcutCommand::SelectVisible(3))),
            (KeyEvent::new(Key::Char('0')), None),
            (KeyEvent::new(Key::Char('f')), None),
            (
                KeyEvent::new(Key::Char('f')).with_modifiers(Modifiers::ctrl()),
                Some(ShortcutCommand::ToggleFilters),
            ),
            (
                KeyEvent::new(Key::Char('F')).with_modifiers(Modifiers::meta()),
                Some(ShortcutCommand::ToggleFilters),
            ),
            (
                KeyEvent::new(Key::Char('v')).with_modifiers(Modifiers::meta()),
                Some(ShortcutCommand::ToggleVoice),
            ),
        ];
        for (event, expected) in cases {
            assert_eq!(resolve_shortcut(&event), expected, "{:?}", event);
        }
    }

    #[test]
    fn test_extra_modifiers_disable_bindings() {
        let shifted = Modifiers {
            shift: true,
            ..Modifiers::ctrl()
        };
        assert_eq!(resolve_shortcut(&KeyEvent::new(Key::Char('f')).with_modifiers(shifted)), None);

        let both = Modifiers {
            meta: true,
            ..Modifiers::ctrl()
        };
        assert_eq!(resolve_shortcut(&KeyEvent::new(Key::Char('v')).with_modifiers(both)), None);

        assert_eq!(resolve_shortcut(&KeyEvent::new(Key::Enter).with_modifiers(Modifiers::ctrl())), None);
    }

    #[test]
    fn test_text_targets_suppress_every_binding() {
        let (mut router, _dispatcher, seen) = mounted();
        for target in [KeyTarget::TextInput, KeyTarget::TextArea, KeyTarget::ContentEditable] {
            router.dispatch(&KeyEvent::new(Key::Char('2')).in_target(target));
            router.dispatch(&KeyEvent::new(Key::Enter).in_target(target));
            router.dispatch(
                &KeyEvent::new(Key::Char('v'))
                    .with_modifiers(Modifiers::ctrl())
                    .in_target(target),
            );
        }
        assert!(seen.borrow().is_empty());

        router.dispatch(&KeyEvent::new(Key::Char('2')).in_target(KeyTarget::Element));
        assert_eq!(*seen.borrow(), vec![ShortcutCommand::SelectVisible(2)]);
    }

    #[test]
    fn test_mount_is_idempotent_and_unmount_removes_listener() {
        let (mut router, mut dispatcher, seen) = mounted();
        dispatcher.mount(&mut router, |_| panic!("second mount must not register"));
        assert_eq!(router.listener_count(), 1);

        router.dispatch(&KeyEvent::new(Key::Escape));
        assert_eq!(seen.borrow().len(), 1);

        dispatcher.unmount(&mut router);
        assert!(!dispatcher.is_mounted());
        assert_eq!(router.listener_count(), 0);

        router.dispatch(&KeyEvent::new(Key::Escape));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("ArrowDown"), Some(Key::ArrowDown));
        assert_eq!(Key::from_name("7"), Some(Key::Char('7')));
        assert_eq!(Key::from_name("PageDown"), None);
        assert_eq!(Key::from_name(""), None);
    }
}

//! Key bindings for card actions.

use bubbletea_rs::KeyMsg;
use crossterm::event::KeyCode;

/// A key binding with help text, matched against incoming key messages.
#[derive(Debug, Clone)]
pub struct Binding {
    keys: Vec<KeyCode>,
    help_key: String,
    help_desc: String,
}

impl Binding {
    /// Creates a binding for the given key codes.
    pub fn new(keys: Vec<KeyCode>) -> Self {
        Self {
            keys,
            help_key: String::new(),
            help_desc: String::new(),
        }
    }

    /// Attaches help text: the key label and what the action does.
    pub fn with_help(mut self, key: impl Into<String>, desc: impl Into<String>) -> Self {
        self.help_key = key.into();
        self.help_desc = desc.into();
        self
    }

    /// Whether a key message matches this binding.
    pub fn matches(&self, msg: &KeyMsg) -> bool {
        self.keys.contains(&msg.key)
    }

    /// The help text as a `(key label, description)` pair.
    pub fn help(&self) -> (&str, &str) {
        (&self.help_key, &self.help_desc)
    }
}

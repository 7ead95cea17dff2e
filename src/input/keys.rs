//! Keyboard submission policy

/// Key reported by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Return / Enter
    Enter,
    /// Space bar
    Space,
    /// Any printable character
    Char(char),
    /// Anything else
    Other,
}

/// Widget that received the key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTarget {
    /// Multiline question text field
    QuestionField,
    /// Send button
    SendButton,
}

/// A key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    /// Widget that received the key
    pub target: KeyTarget,
    /// Key pressed
    pub key: Key,
    /// Shift held
    pub shift: bool,
    /// IME composition in progress
    pub composing: bool,
}

impl KeyInput {
    /// Plain key press in the question field
    #[must_use]
    pub const fn field(key: Key) -> Self {
        Self {
            target: KeyTarget::QuestionField,
            key,
            shift: false,
            composing: false,
        }
    }

    /// Plain key press on the send button
    #[must_use]
    pub const fn button(key: Key) -> Self {
        Self {
            target: KeyTarget::SendButton,
            key,
            shift: false,
            composing: false,
        }
    }

    /// Same key with Shift held
    #[must_use]
    pub const fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Same key during IME composition
    #[must_use]
    pub const fn composing(mut self) -> Self {
        self.composing = true;
        self
    }
}

/// Whether a key press should submit the question
///
/// In the text field only a bare Enter outside IME composition submits;
/// Shift+Enter inserts a newline. The send button submits on Enter or Space.
#[must_use]
pub const fn submit_on_key(input: &KeyInput) -> bool {
    match input.target {
        KeyTarget::QuestionField => {
            matches!(input.key, Key::Enter) && !input.shift && !input.composing
        }
        KeyTarget::SendButton => matches!(input.key, Key::Enter | Key::Space),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_submits_from_field() {
        assert!(submit_on_key(&KeyInput::field(Key::Enter)));
    }

    #[test]
    fn test_shift_enter_is_newline() {
        assert!(!submit_on_key(&KeyInput::field(Key::Enter).with_shift()));
    }

    #[test]
    fn test_enter_during_composition_ignored() {
        assert!(!submit_on_key(&KeyInput::field(Key::Enter).composing()));
    }

    #[test]
    fn test_typing_never_submits() {
        assert!(!submit_on_key(&KeyInput::field(Key::Char('a'))));
        assert!(!submit_on_key(&KeyInput::field(Key::Space)));
    }

    #[test]
    fn test_send_button_keys() {
        assert!(submit_on_key(&KeyInput::button(Key::Enter)));
        assert!(submit_on_key(&KeyInput::button(Key::Space)));
        assert!(!submit_on_key(&KeyInput::button(Key::Other)));
    }
}

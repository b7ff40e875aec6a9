//! Draft text of the message being composed for the open thread.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposerState {
    text: String,
}

impl ComposerState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Puts a failed submission back so the user can retry it.
    /// Text typed since the submission wins; returns whether the draft was restored.
    pub fn restore(&mut self, draft: String) -> bool {
        if !self.text.trim().is_empty() {
            return false;
        }

        self.text = draft;
        true
    }
}

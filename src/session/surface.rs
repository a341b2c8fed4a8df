//! Where the session renders

/// What a rendered bubble is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
    /// Apology or failure text; shown like a bubble but not part of the
    /// transcript
    Notice,
}

/// The visible popup and call modal.
///
/// Messages are only ever appended. The session guarantees at most one
/// typing indicator and calls `scroll_to_end` after every change to the
/// message list.
pub trait UiSurface: Send {
    fn set_popup_open(&mut self, open: bool);

    fn append_message(&mut self, kind: MessageKind, text: &str);

    fn show_typing(&mut self);

    fn hide_typing(&mut self);

    fn scroll_to_end(&mut self);

    fn set_call_visible(&mut self, visible: bool);

    fn set_call_status(&mut self, status: &str);

    fn set_call_timer(&mut self, timer: &str);

    fn set_speaking(&mut self, speaking: bool);
}

/// Renders to the log. Used when there is no page of our own to draw on.
#[derive(Debug, Default)]
pub struct TracingSurface;

impl UiSurface for TracingSurface {
    fn set_popup_open(&mut self, open: bool) {
        tracing::debug!(open, "Popup");
    }

    fn append_message(&mut self, kind: MessageKind, text: &str) {
        match kind {
            MessageKind::User => tracing::info!(text, "User"),
            MessageKind::Assistant => tracing::info!(text, "Assistant"),
            MessageKind::Notice => tracing::warn!(text, "Notice"),
        }
    }

    fn show_typing(&mut self) {
        tracing::debug!("Assistant typing");
    }

    fn hide_typing(&mut self) {}

    fn scroll_to_end(&mut self) {}

    fn set_call_visible(&mut self, visible: bool) {
        tracing::debug!(visible, "Call modal");
    }

    fn set_call_status(&mut self, status: &str) {
        tracing::info!(status, "Call status");
    }

    fn set_call_timer(&mut self, timer: &str) {
        tracing::trace!(timer, "Call timer");
    }

    fn set_speaking(&mut self, speaking: bool) {
        tracing::debug!(speaking, "Agent speaking");
    }
}

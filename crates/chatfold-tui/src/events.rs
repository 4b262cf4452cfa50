//! Event types coordinating the UI thread with input and session workers.

use crossterm::event::Event;

use chatfold_core::{BadgeHandle, RenderCommand};

pub enum UiMessage {
    Input(Event),
    Render(RenderCommand),
    /// Fired after the cosmetic pulse interval; only clears a highlight.
    PulseExpired(BadgeHandle),
}

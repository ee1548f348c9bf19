use std::time::Duration;

use crate::shared::frame::Frame;

/// User command read from the display between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Capture,
}

/// Window the consumer loop renders into and reads commands from.
///
/// Not `Send`: windowing backends are bound to the thread that created them,
/// which is also the thread running the consumer loop.
pub trait SessionDisplay {
    fn render(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Waits at most `timeout` for a command. Input that maps to no command
    /// yields `Ok(None)`.
    fn poll_command(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Command>, Box<dyn std::error::Error>>;

    /// Shows `reference` and `candidate` side by side until dismissed.
    fn show_comparison(
        &mut self,
        reference: &Frame,
        candidate: &Frame,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Releases the window. Safe to call more than once.
    fn close(&mut self);
}

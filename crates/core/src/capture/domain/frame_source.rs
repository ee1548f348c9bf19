use thiserror::Error;

use crate::shared::frame::Frame;

/// Describes an opened capture source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub device: String,
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; 0.0 when the device does not report one.
    pub fps: f64,
}

#[derive(Error, Debug)]
#[error("cannot open capture device {device}: {reason}")]
pub struct OpenError {
    pub device: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("end of stream")]
    EndOfStream,
    #[error("frame read failed: {0}")]
    Failed(String),
}

/// A device (camera, capture card, video file) that yields frames on demand.
///
/// `open` runs on the caller's thread so a missing device is reported before
/// any acquisition thread exists; afterwards the source is moved into the
/// acquisition thread, hence `Send`.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, OpenError>;

    /// Blocks until the next frame is decoded.
    fn read_next(&mut self) -> Result<Frame, ReadError>;

    /// Releases the underlying device handle. Must be idempotent.
    fn release(&mut self);
}

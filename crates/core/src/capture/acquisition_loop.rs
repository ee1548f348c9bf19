use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::capture::domain::frame_buffer::FrameBuffer;
use crate::capture::domain::frame_source::{FrameSource, ReadError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("acquisition loop already started")]
    AlreadyStarted,
    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(String),
    #[error("acquisition thread panicked")]
    ThreadPanicked,
}

/// Lifecycle of one acquisition loop. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Stopped,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            _ => RunState::Stopped,
        }
    }
}

struct SharedState(AtomicU8);

impl SharedState {
    fn new() -> Self {
        Self(AtomicU8::new(RunState::NotStarted as u8))
    }

    fn load(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn begin(&self) -> bool {
        self.0
            .compare_exchange(
                RunState::NotStarted as u8,
                RunState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn stop(&self) {
        self.0.store(RunState::Stopped as u8, Ordering::Release);
    }
}

/// Drives a [`FrameSource`] on a dedicated thread, publishing every frame
/// into a shared [`FrameBuffer`] until stopped or the source runs dry.
///
/// Stop is cooperative: the flag is checked once per iteration, so shutdown
/// latency is bounded by one `read_next` call. Dropping the loop stops it,
/// joins the thread and releases the source.
pub struct AcquisitionLoop {
    state: Arc<SharedState>,
    buffer: Arc<FrameBuffer>,
    source: Option<Box<dyn FrameSource>>,
    handle: Option<JoinHandle<Box<dyn FrameSource>>>,
}

impl AcquisitionLoop {
    /// `source` must already be opened.
    pub fn new(source: Box<dyn FrameSource>, buffer: Arc<FrameBuffer>) -> Self {
        Self {
            state: Arc::new(SharedState::new()),
            buffer,
            source: Some(source),
            handle: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state.load()
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if !self.state.begin() {
            return Err(CaptureError::AlreadyStarted);
        }
        let Some(mut source) = self.source.take() else {
            self.state.stop();
            return Err(CaptureError::AlreadyStarted);
        };

        let state = self.state.clone();
        let buffer = self.buffer.clone();
        let spawned = thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || {
                run_acquisition(&mut *source, &state, &buffer);
                source
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.stop();
                Err(CaptureError::Spawn(e.to_string()))
            }
        }
    }

    /// Signals the loop to finish after its current read. Never blocks;
    /// calling it again, or before `start`, is a no-op beyond marking the
    /// loop stopped.
    pub fn stop(&self) {
        self.state.stop();
    }

    /// Waits for the acquisition thread and hands back the source.
    ///
    /// Returns `Ok(None)` once the source has already been handed out.
    pub fn join(&mut self) -> Result<Option<Box<dyn FrameSource>>, CaptureError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map(Some)
                .map_err(|_| CaptureError::ThreadPanicked),
            None => Ok(self.source.take()),
        }
    }

    /// Stop, join and release the source. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> Result<(), CaptureError> {
        self.stop();
        if let Some(mut source) = self.join()? {
            source.release();
            log::debug!(
                "Capture source released after {} frames",
                self.buffer.published()
            );
        }
        Ok(())
    }
}

impl Drop for AcquisitionLoop {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Acquisition shutdown failed: {e}");
        }
    }
}

fn run_acquisition(source: &mut dyn FrameSource, state: &SharedState, buffer: &FrameBuffer) {
    log::debug!("Acquisition thread started");
    while state.load() == RunState::Running {
        match source.read_next() {
            Ok(frame) => buffer.publish(frame),
            Err(ReadError::EndOfStream) => {
                log::info!("Capture source reached end of stream");
                break;
            }
            Err(e) => {
                log::warn!("Stopping acquisition: {e}");
                break;
            }
        }
    }
    state.stop();
    log::debug!(
        "Acquisition thread finished, {} frames published",
        buffer.published()
    );
}

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::capture::acquisition_loop::{AcquisitionLoop, CaptureError};
use crate::capture::domain::frame_buffer::FrameBuffer;
use crate::capture::domain::frame_source::{FrameSource, OpenError};
use crate::detection::domain::region_detector::RegionDetector;
use crate::identity::domain::identity_store::{IdentityStore, StoreError};
use crate::pipeline::capture_loop::{CaptureLoop, CaptureOutcome};
use crate::pipeline::session_display::SessionDisplay;
use crate::pipeline::session_logger::SessionLogger;
use crate::shared::constants::DEFAULT_POLL_INTERVAL_MS;
use crate::shared::frame::Frame;
use crate::verification::domain::verifier::{Verdict, Verifier};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    DeviceOpen(#[from] OpenError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no identity enrolled under '{0}'")]
    UnknownIdentity(String),
    #[error("display failed: {0}")]
    Display(String),
    #[error("verification failed: {0}")]
    Verification(String),
}

/// What a session does with its capture, decided once before the device opens.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionMode {
    /// The store is empty; the capture becomes the first reference.
    Enroll,
    /// The capture is compared against this stored reference.
    Verify { reference: Frame },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionReport {
    Enrolled { name: String },
    Verified { name: String, verdict: Verdict },
    /// The user quit before capturing.
    Aborted,
}

#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Upper bound on each wait for a user command.
    pub poll_interval: Duration,
    /// Show reference and candidate side by side after verifying.
    pub show_comparison: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            show_comparison: true,
        }
    }
}

/// One enroll-or-verify session against a capture device.
///
/// Owns its collaborators for the length of the session. Whatever path
/// `execute` takes, the acquisition thread is stopped and joined, the
/// device released, the display closed and the store closed before it
/// returns.
pub struct IdentitySessionUseCase {
    store: Box<dyn IdentityStore>,
    detector: Box<dyn RegionDetector>,
    verifier: Box<dyn Verifier>,
    display: Box<dyn SessionDisplay>,
    logger: Box<dyn SessionLogger>,
    options: SessionOptions,
}

impl IdentitySessionUseCase {
    pub fn new(
        store: Box<dyn IdentityStore>,
        detector: Box<dyn RegionDetector>,
        verifier: Box<dyn Verifier>,
        display: Box<dyn SessionDisplay>,
        logger: Box<dyn SessionLogger>,
        options: SessionOptions,
    ) -> Self {
        Self {
            store,
            detector,
            verifier,
            display,
            logger,
            options,
        }
    }

    /// Whether the next session will enroll rather than verify.
    pub fn is_first_enrollment(&self) -> Result<bool, StoreError> {
        Ok(self.store.count()? == 0)
    }

    /// Runs a full session for `name` on `source`, which must not be open yet.
    pub fn execute(
        &mut self,
        name: &str,
        source: Box<dyn FrameSource>,
    ) -> Result<SessionReport, SessionError> {
        let result = self.run(name, source);

        self.logger.summary();
        self.display.close();
        match (result, self.store.close()) {
            (result, Ok(())) => result,
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Err(close_err)) => {
                log::warn!("Failed to close identity store: {close_err}");
                Err(e)
            }
        }
    }

    fn select_mode(&self, name: &str) -> Result<SessionMode, SessionError> {
        if self.store.count()? == 0 {
            return Ok(SessionMode::Enroll);
        }
        match self.store.load(name)? {
            Some(reference) => Ok(SessionMode::Verify { reference }),
            None => Err(SessionError::UnknownIdentity(name.to_string())),
        }
    }

    fn run(
        &mut self,
        name: &str,
        mut source: Box<dyn FrameSource>,
    ) -> Result<SessionReport, SessionError> {
        let mode = self.select_mode(name)?;
        let info = source.open()?;
        self.logger.info(&format!(
            "Capturing from {} ({}x{})",
            info.device, info.width, info.height
        ));

        let buffer = Arc::new(FrameBuffer::new());
        let mut acquisition = AcquisitionLoop::new(source, buffer.clone());
        acquisition.start()?;

        let outcome = CaptureLoop::new(
            &buffer,
            &mut *self.detector,
            &mut *self.display,
            &mut *self.logger,
            self.options.poll_interval,
        )
        .run();
        let stopped = acquisition.shutdown();
        let outcome = outcome?;
        stopped?;

        let crop = match outcome {
            CaptureOutcome::Quit => return Ok(SessionReport::Aborted),
            CaptureOutcome::Captured(crop) => crop,
        };

        match mode {
            SessionMode::Enroll => {
                self.store.save(name, &crop)?;
                self.logger.info(&format!("Enrolled '{name}'"));
                Ok(SessionReport::Enrolled {
                    name: name.to_string(),
                })
            }
            SessionMode::Verify { reference } => {
                let verdict = self
                    .verifier
                    .verify(&reference, &crop)
                    .map_err(|e| SessionError::Verification(e.to_string()))?;
                self.logger.info(&format!(
                    "Verified '{name}': {} (similarity {:.3}, threshold {:.3})",
                    verdict.verified, verdict.similarity, verdict.threshold
                ));
                if self.options.show_comparison {
                    if let Err(e) = self.display.show_comparison(&reference, &crop) {
                        log::warn!("Comparison view failed: {e}");
                    }
                }
                Ok(SessionReport::Verified {
                    name: name.to_string(),
                    verdict,
                })
            }
        }
    }
}

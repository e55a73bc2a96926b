//! Capture session orchestration.
//!
//! `SessionController` owns the one camera handle and drives the two flows:
//!
//! - **Enrollment**: validate the identity label, collect a fixed-size
//!   batch, upload it, then finalize registration. Idle → Capturing →
//!   Uploading → Complete, with Failed terminal and reachable from any
//!   non-terminal state. Cancellation discards the batch and uploads
//!   nothing.
//! - **Authentication**: capture a single probe and submit it. On a match
//!   the controller emits a navigation intent (carrying the matched
//!   display name) exactly once, after a fixed display delay. On a
//!   no-match or error it returns to Idle with a status message, ready
//!   for a user-initiated retry.
//!
//! The camera is released on every exit path, including errors,
//! cancellation, and drop; `close()` on a source is idempotent.

use std::time::{Duration, Instant};

use crate::collector::{
    BatchCollector, CancelToken, Clock, CollectOutcome, CollectorConfig, SystemClock,
};
use crate::error::{Error, Result};
use crate::frame::encode_jpeg;
use crate::source::FrameSource;
use crate::upload::{AuthProbe, EnrollmentRequest, VerificationApi};

/// How long a successful authentication result is displayed before the
/// navigation intent is emitted.
pub const AUTH_DISPLAY_DELAY: Duration = Duration::from_millis(1500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    Uploading,
    Complete,
    Failed,
}

/// Intent for a presentation layer to navigate to the matched identity's
/// destination (the controller does no rendering itself).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationIntent {
    pub identity: String,
}

#[derive(Debug)]
pub enum EnrollmentOutcome {
    /// Batch uploaded and registration finalized.
    Complete { message: String },
    /// The service declined the upload or registration in-band.
    Rejected { message: String },
    /// Cancelled before the batch was full; nothing was uploaded.
    Cancelled,
}

#[derive(Debug)]
pub enum AuthOutcome {
    /// Probe matched an enrolled identity.
    Match {
        intent: NavigationIntent,
        message: String,
    },
    /// The service did not recognize the probe.
    NoMatch { message: String },
}

pub struct SessionController<S: FrameSource, A: VerificationApi, C: Clock = SystemClock> {
    source: S,
    api: A,
    clock: C,
    collector_config: CollectorConfig,
    state: SessionState,
    last_message: String,
    started_at: Option<Instant>,
}

impl<S: FrameSource, A: VerificationApi> SessionController<S, A, SystemClock> {
    pub fn new(source: S, api: A, collector_config: CollectorConfig) -> Self {
        Self::with_clock(source, api, collector_config, SystemClock)
    }
}

impl<S: FrameSource, A: VerificationApi, C: Clock> SessionController<S, A, C> {
    pub fn with_clock(source: S, api: A, collector_config: CollectorConfig, clock: C) -> Self {
        Self {
            source,
            api,
            clock,
            collector_config,
            state: SessionState::Idle,
            last_message: String::new(),
            started_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last status message, for observation by a presentation layer.
    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Run the enrollment flow for `identity_label`.
    pub fn enroll(
        &mut self,
        identity_label: &str,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<EnrollmentOutcome> {
        self.require_idle()?;

        let label = identity_label.trim().to_string();
        if label.is_empty() {
            let err = Error::Validation("Name is required".to_string());
            self.fail(&err);
            return Err(err);
        }

        self.started_at = Some(Instant::now());
        self.advance(SessionState::Capturing);
        if let Err(err) = self.source.open() {
            self.fail(&err);
            return Err(err);
        }

        let collector = BatchCollector::with_clock(
            self.collector_config.clone(),
            cancel.clone(),
            &self.clock,
        );
        let collected = collector.run(&mut self.source, on_progress);
        self.source.close();

        let batch = match collected {
            Ok(CollectOutcome::Complete(batch)) => batch,
            Ok(CollectOutcome::Cancelled) => {
                self.last_message = "Capture cancelled.".to_string();
                self.state = SessionState::Idle;
                return Ok(EnrollmentOutcome::Cancelled);
            }
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        if cancel.is_cancelled() {
            self.last_message = "Capture cancelled.".to_string();
            self.state = SessionState::Idle;
            return Ok(EnrollmentOutcome::Cancelled);
        }

        self.advance(SessionState::Uploading);
        let request = match EnrollmentRequest::new(&label, batch) {
            Ok(request) => request,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        let uploaded = match self.api.upload_batch(&request) {
            Ok(result) => result,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };
        // Cancellation cannot abort an in-flight upload; it discards the
        // result instead. The remote side may have buffered the samples.
        if cancel.is_cancelled() {
            log::info!("upload result discarded after cancellation");
            self.last_message = "Capture cancelled.".to_string();
            self.state = SessionState::Idle;
            return Ok(EnrollmentOutcome::Cancelled);
        }
        if !uploaded.success {
            log::warn!("batch upload declined: {}", uploaded.message);
            self.last_message = uploaded.message.clone();
            self.state = SessionState::Failed;
            return Ok(EnrollmentOutcome::Rejected {
                message: uploaded.message,
            });
        }

        let registered = match self.api.register(&label) {
            Ok(result) => result,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };
        if !registered.success {
            log::warn!("registration declined: {}", registered.message);
            self.last_message = registered.message.clone();
            self.state = SessionState::Failed;
            return Ok(EnrollmentOutcome::Rejected {
                message: registered.message,
            });
        }

        self.last_message = registered.message.clone();
        self.advance(SessionState::Complete);
        Ok(EnrollmentOutcome::Complete {
            message: registered.message,
        })
    }

    /// Run the authentication flow: one probe, one verdict.
    pub fn authenticate(&mut self) -> Result<AuthOutcome> {
        self.require_idle()?;

        self.started_at = Some(Instant::now());
        self.advance(SessionState::Capturing);
        let probe = match self.capture_probe() {
            Ok(probe) => probe,
            Err(err) => {
                self.reset_idle(&err);
                return Err(err);
            }
        };

        self.advance(SessionState::Uploading);
        let result = match self.api.upload_probe(&probe) {
            Ok(result) => result,
            Err(err) => {
                self.reset_idle(&err);
                return Err(err);
            }
        };

        self.last_message = result.message.clone();
        match (result.success, result.matched_identity) {
            (true, Some(identity)) => {
                // Let the result linger on screen before navigating.
                self.clock.sleep(AUTH_DISPLAY_DELAY);
                self.advance(SessionState::Complete);
                Ok(AuthOutcome::Match {
                    intent: NavigationIntent { identity },
                    message: result.message,
                })
            }
            _ => {
                log::info!("probe not recognized: {}", result.message);
                self.state = SessionState::Idle;
                Ok(AuthOutcome::NoMatch {
                    message: result.message,
                })
            }
        }
    }

    fn capture_probe(&mut self) -> Result<AuthProbe> {
        self.source.open()?;
        let quality = self.collector_config.quality;
        let result = self
            .source
            .capture_frame()
            .and_then(|frame| encode_jpeg(&frame, quality));
        self.source.close();
        Ok(AuthProbe { image: result? })
    }

    fn require_idle(&self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(Error::Validation(format!(
                "session is {:?}, not Idle; start a new session",
                self.state
            )));
        }
        Ok(())
    }

    fn advance(&mut self, to: SessionState) {
        log::debug!("session {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    fn fail(&mut self, err: &Error) {
        log::warn!("session failed: {}", err);
        self.last_message = err.status_message();
        self.state = SessionState::Failed;
    }

    fn reset_idle(&mut self, err: &Error) {
        log::warn!("authentication attempt failed: {}", err);
        self.last_message = err.status_message();
        self.source.close();
        self.state = SessionState::Idle;
    }
}

impl<S: FrameSource, A: VerificationApi, C: Clock> Drop for SessionController<S, A, C> {
    fn drop(&mut self) {
        self.source.close();
    }
}

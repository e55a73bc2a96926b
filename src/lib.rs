//! facecap — bounded, cancellable frame capture and upload.
//!
//! This crate is the client side of a face enrollment/verification
//! service: it opens a live camera source, collects a fixed-size batch of
//! JPEG frames on a fixed interval, and hands the batch (or a single
//! probe) to the remote service as JSON over HTTP.
//!
//! # Design
//!
//! - One camera handle per session; a second open fails with `DeviceBusy`
//!   and close is idempotent, so teardown is safe on every exit path.
//! - Collection is fail-fast: a capture failure mid-sequence fails the
//!   whole batch, and nothing partial is ever uploaded. Cancellation is a
//!   cooperative flag checked at each suspension boundary.
//! - Uploads have bounded waits and zero automatic retries; the remote
//!   side of an enrollment upload is irrevocable, so resubmission is a
//!   caller decision.
//!
//! # Module structure
//!
//! - `frame`: raw frames, JPEG encoding, data-URL interchange, batches
//! - `source`: frame sources (HTTP cameras, `stub://` synthetic)
//! - `collector`: the timed N-tick capture loop with cancellation
//! - `upload`: wire types and the HTTP client for the service
//! - `session`: the enrollment/authentication state machine
//! - `config`: file + environment configuration

pub mod collector;
pub mod config;
pub mod error;
pub mod frame;
pub mod session;
pub mod source;
pub mod upload;

pub use collector::{BatchCollector, CancelToken, Clock, CollectOutcome, CollectorConfig, SystemClock};
pub use error::{Error, Result};
pub use frame::{encode_jpeg, Batch, EncodedImage, Frame, DEFAULT_QUALITY};
pub use session::{
    AuthOutcome, EnrollmentOutcome, NavigationIntent, SessionController, SessionState,
};
pub use source::{CameraConfig, CameraSource, FrameSource, SourceStats};
pub use upload::{
    AuthProbe, CaptureStatus, EnrollmentRequest, UploadClient, UploadResult, UserSummary,
    VerificationApi,
};

//! Batch collection: N capture ticks at a fixed interval.
//!
//! The collector drives exactly `target_count` ticks, one outstanding at a
//! time, on the caller's thread. Each tick captures a frame, encodes it,
//! appends it to the batch, and reports progress. Ticks are fail-fast: a
//! capture failure mid-sequence indicates camera loss, not transient load,
//! so the whole collection fails and no partial batch is delivered.
//!
//! Cancellation is cooperative. A `CancelToken` may be flipped from another
//! thread (e.g. a Ctrl-C handler) at any point, including before the first
//! tick or after completion; the token is checked before the capture step
//! and again before the append step, so a tick that observes cancellation
//! performs no further batch mutation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::frame::{encode_jpeg, Batch};
use crate::source::FrameSource;

/// Sleep abstraction so tick timing is countable in tests without real
/// timers.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Wall-clock implementation used outside tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared cancellation flag. Cloning shares the flag; `cancel()` is
/// idempotent and safe to call concurrently with a running collection.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Collection parameters.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Number of frames to collect. Must be at least 1.
    pub target_count: usize,
    /// Fixed wait between consecutive ticks.
    pub interval: Duration,
    /// JPEG encode quality in (0.0, 1.0].
    pub quality: f32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            target_count: 50,
            interval: Duration::from_millis(200),
            quality: crate::frame::DEFAULT_QUALITY,
        }
    }
}

/// Result of a collection run.
pub enum CollectOutcome {
    /// All `target_count` frames captured, in capture order.
    Complete(Batch),
    /// Cancelled before completion; the in-progress batch was discarded.
    Cancelled,
}

pub struct BatchCollector<C: Clock = SystemClock> {
    config: CollectorConfig,
    cancel: CancelToken,
    clock: C,
}

impl BatchCollector<SystemClock> {
    pub fn new(config: CollectorConfig, cancel: CancelToken) -> Self {
        Self::with_clock(config, cancel, SystemClock)
    }
}

impl<C: Clock> BatchCollector<C> {
    pub fn with_clock(config: CollectorConfig, cancel: CancelToken, clock: C) -> Self {
        Self {
            config,
            cancel,
            clock,
        }
    }

    /// Drive the tick loop to completion, cancellation, or failure.
    ///
    /// `on_progress(count, target)` fires once per appended frame. On
    /// `Err` or `Cancelled` nothing has been delivered and the partial
    /// batch is dropped.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<CollectOutcome> {
        let target = self.config.target_count;
        if target == 0 {
            return Err(Error::Validation(
                "target count must be at least 1".to_string(),
            ));
        }

        let mut batch = Batch::new(target);
        for tick in 0..target {
            if tick > 0 {
                self.clock.sleep(self.config.interval);
            }

            if self.cancel.is_cancelled() {
                log::info!("capture cancelled at {}/{} frames", batch.len(), target);
                return Ok(CollectOutcome::Cancelled);
            }

            let frame = source.capture_frame()?;
            let image = encode_jpeg(&frame, self.config.quality)?;

            // Re-check after the capture/encode suspension point: a tick
            // that observes cancellation must not mutate the batch.
            if self.cancel.is_cancelled() {
                log::info!("capture cancelled at {}/{} frames", batch.len(), target);
                return Ok(CollectOutcome::Cancelled);
            }

            batch.push(image);
            on_progress(batch.len(), target);
        }

        log::info!("captured {} frames", batch.len());
        Ok(CollectOutcome::Complete(batch))
    }
}

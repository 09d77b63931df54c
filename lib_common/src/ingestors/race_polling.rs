//! # Race Polling Ingestor
//!
//! The self-scheduling broadcast loop. Each tick:
//!
//! 1.  **Collect**: ask the fallback chain for a raw record. This cannot fail;
//!     at worst the record is simulated.
//! 2.  **Transform**: shape it into a `RacePayload`.
//! 3.  **Serialize**: once, into the frame every client will share.
//! 4.  **Fan out**: hand the frame to the dispatcher, which drops clients whose
//!     connection has gone away.
//!
//! Then it sleeps for the configured interval and starts over. Nothing but the
//! chain's result cache survives from one tick to the next, and no error ends
//! the loop; it runs until the task is dropped.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::{Dispatcher, FallbackChain, RaceFrame};
use crate::error::FeedError;
use crate::processor::{transform, TransformOptions};

/// Default pause between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// # Poll Result
///
/// What one tick did, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResult {
    pub tick: u64,
    /// Source the record came from (`openf1`, `jolpica`, `simulation`).
    pub source: String,
    /// Number of clients that accepted the frame.
    pub delivered: usize,
    /// Size of the serialized payload in bytes.
    pub payload_bytes: usize,
}

/// # Race Polling Plugin
pub struct RacePollingPlugin {
    chain: Arc<FallbackChain>,
    dispatcher: Arc<Dispatcher>,
    options: TransformOptions,
    interval: Duration,
    ticks: AtomicU64,
}

impl RacePollingPlugin {
    pub fn new(
        chain: Arc<FallbackChain>,
        dispatcher: Arc<Dispatcher>,
        options: TransformOptions,
        interval: Duration,
    ) -> Self {
        Self {
            chain,
            dispatcher,
            options,
            interval,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// # Main Execution Loop
    ///
    /// Tick, sleep, repeat. A failed tick is logged and the loop carries on
    /// with the next one after the usual interval.
    pub async fn run(&self) {
        log::info!(
            "Race polling started (interval {}s, sources: {:?})",
            self.interval.as_secs_f64(),
            self.chain.source_names()
        );

        loop {
            match self.tick().await {
                Ok(result) => log::debug!(
                    "Tick {} from {}: {} bytes to {} client(s)",
                    result.tick,
                    result.source,
                    result.payload_bytes,
                    result.delivered
                ),
                Err(e) => log::error!("Tick skipped: {}", e),
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// # Tick
    ///
    /// One collect -> transform -> serialize -> fan-out cycle.
    pub async fn tick(&self) -> Result<PollResult, FeedError> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let ts_in = Instant::now();

        let collected = self.chain.collect().await;
        let payload = transform(&collected.record, &self.options);
        let text = serde_json::to_string(&payload).map_err(|e| FeedError::Encode {
            message: e.to_string(),
        })?;
        let payload_bytes = text.len();

        let delivered = self.dispatcher.broadcast(RaceFrame {
            tick,
            source: collected.source.clone(),
            started_at: ts_in,
            text,
        });

        Ok(PollResult {
            tick,
            source: collected.source,
            delivered,
            payload_bytes,
        })
    }
}

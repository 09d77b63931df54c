//! # Core Engine Module
//!
//! The two stateful pieces of the feed:
//!
//! - **`upstream_manager`**: the fallback chain. Tries each live source in
//!   order and falls back to the simulation, tracking the `OperationMode`.
//!
//! - **`dispatcher`**: the subscriber set. Zero-copy fan-out of each tick's
//!   frame to every connected client, pruning the ones that went away.
//!
//! Both are plain owned values; the server wraps them in `Arc` and injects
//! them where needed, so tests build isolated instances.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Zero-copy fan-out to connected clients.
pub mod dispatcher;
/// Ordered live sources with a simulation fallback.
pub mod upstream_manager;

// --- Public API Re-exports ---
pub use dispatcher::{Dispatcher, FrameReceiver, RaceFrame};
pub use upstream_manager::{Collected, FallbackChain, OperationMode};

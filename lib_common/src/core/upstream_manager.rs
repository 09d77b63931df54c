//! # Upstream Manager
//!
//! The fallback chain. It walks an ordered list of live sources, returns the
//! first record that comes back, and falls through to the simulation when
//! every live source has failed. The simulation cannot fail, so neither can
//! [`FallbackChain::collect_live`].
//!
//! The chain also tracks which [`OperationMode`] the feed is in so mode
//! transitions (live -> simulated and back) show up once in the log instead of
//! on every tick.

use std::sync::{PoisonError, RwLock};

use crate::sources::{LiveSource, SimulationSource};
use crate::RawRecord;

/// What the last collection produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Nothing collected yet.
    Idle,
    /// A live source answered.
    Live,
    /// Every live source failed (or none is configured); simulated roster.
    Simulated,
}

/// A record together with the name of the source that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub source: String,
    pub record: RawRecord,
}

#[derive(Debug)]
struct ChainState {
    mode: OperationMode,
    last_source: Option<String>,
}

pub struct FallbackChain {
    sources: Vec<Box<dyn LiveSource>>,
    simulation: SimulationSource,
    state: RwLock<ChainState>,
}

impl FallbackChain {
    /// Builds a chain that tries `sources` in order before `simulation`.
    pub fn new(sources: Vec<Box<dyn LiveSource>>, simulation: SimulationSource) -> Self {
        Self {
            sources,
            simulation,
            state: RwLock::new(ChainState {
                mode: OperationMode::Idle,
                last_source: None,
            }),
        }
    }

    /// A chain with no live sources, for hosts without network access.
    pub fn simulation_only() -> Self {
        Self::new(Vec::new(), SimulationSource::new())
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Collects one raw record. Never fails.
    pub async fn collect_live(&self) -> RawRecord {
        self.collect().await.record
    }

    /// Like [`collect_live`](Self::collect_live) but also reports which source won.
    pub async fn collect(&self) -> Collected {
        for source in &self.sources {
            log::debug!("Attempting {} ...", source.name());
            match source.fetch().await {
                Ok(record) => {
                    self.record_outcome(OperationMode::Live, source.name());
                    return Collected {
                        source: source.name().to_string(),
                        record,
                    };
                }
                Err(e) if e.is_transport() => {
                    log::warn!("Source {} unreachable, falling through: {}", source.name(), e);
                }
                Err(e) => {
                    log::warn!("Source {} failed, falling through: {}", source.name(), e);
                }
            }
        }

        self.record_outcome(OperationMode::Simulated, SimulationSource::NAME);
        Collected {
            source: SimulationSource::NAME.to_string(),
            record: self.simulation.generate(),
        }
    }

    /// Mode of the most recent collection.
    pub fn current_mode(&self) -> OperationMode {
        self.state.read().unwrap_or_else(PoisonError::into_inner).mode
    }

    pub fn last_source(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_source
            .clone()
    }

    fn record_outcome(&self, mode: OperationMode, source: &str) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.mode != mode {
            log::info!("Transitioning mode: {:?} -> {:?} (source: {})", state.mode, mode, source);
        } else if state.last_source.as_deref() != Some(source) {
            log::info!("Switching source to {}", source);
        }
        state.mode = mode;
        state.last_source = Some(source.to_string());
    }
}

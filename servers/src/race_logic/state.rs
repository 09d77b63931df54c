use std::sync::Arc;

use anyhow::Result;
use lib_common::core::{Dispatcher, FallbackChain};
use lib_common::sources::{JolpicaClient, JolpicaSource, LiveSource, OpenF1Source, SimulationSource};
use tokio::sync::broadcast;

use crate::race_logic::config::Config;

/// Shared between the tick loop and every HTTP/WebSocket handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    // Cached standings client; also backs the secondary live source
    pub jolpica: Arc<JolpicaClient>,
    pub chain: Arc<FallbackChain>,
    // Lets open sockets close when the server stops
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(config: &Config, shutdown_tx: broadcast::Sender<()>) -> Result<Self> {
        let jolpica = Arc::new(JolpicaClient::new(
            config.jolpica_base_url(),
            config.request_timeout(),
            config.cache_ttl(),
        )?);

        let chain = if config.simulation_only() {
            log::info!("Simulation only: live sources disabled.");
            FallbackChain::simulation_only()
        } else {
            let openf1 = OpenF1Source::new(
                config.openf1_base_url(),
                config.request_timeout(),
                config.openf1_query(),
            )?;
            let sources: Vec<Box<dyn LiveSource>> = vec![
                Box::new(openf1) as Box<dyn LiveSource>,
                Box::new(JolpicaSource::new(Arc::clone(&jolpica), config.season())) as Box<dyn LiveSource>,
            ];
            FallbackChain::new(sources, SimulationSource::new())
        };

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new()),
            jolpica,
            chain: Arc::new(chain),
            shutdown_tx,
        })
    }
}

use crate::race_logic::config::Config;
use crate::race_logic::state::AppState;
use lib_common::ingestors::RacePollingPlugin;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Drives the broadcast loop until shutdown.
pub async fn run(config: Config, app_state: AppState, mut shutdown: broadcast::Receiver<()>) {
    let plugin = RacePollingPlugin::new(
        Arc::clone(&app_state.chain),
        Arc::clone(&app_state.dispatcher),
        config.transform_options(),
        config.tick_interval(),
    );

    tokio::select! {
        _ = plugin.run() => {}
        _ = shutdown.recv() => {
            log::info!("Upstream shutting down...");
        }
    }
}

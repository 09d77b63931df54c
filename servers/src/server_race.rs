use anyhow::Result;
use tokio::signal;

mod race_logic;
use race_logic::{config, downstream, logger, state, upstream};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    logger::setup_logging(&config.log_dir(), config.log_level())?;
    log::info!("Starting server_race with {:?}", config);

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let app_state = state::AppState::new(&config, shutdown_tx.clone())?;

    let upstream_handle = tokio::spawn(upstream::run(
        config.clone(),
        app_state.clone(),
        shutdown_tx.subscribe(),
    ));

    let mut downstream_handle = tokio::spawn(downstream::run(
        config.clone(),
        app_state.clone(),
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal, or for the server to stop on its own (bind failure)
    let early_exit = tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
            None
        }
        _ = terminate() => {
            log::info!("SIGTERM received, initiating shutdown.");
            None
        }
        result = &mut downstream_handle => Some(result),
    };

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    // Wait for components to shut down
    let downstream_result = match early_exit {
        Some(result) => result,
        None => downstream_handle.await,
    };
    if let Err(e) = upstream_handle.await {
        log::error!("Upstream task failed: {}", e);
    }

    let outcome = match downstream_result {
        Ok(result) => result,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = &outcome {
        log::error!("Downstream server failed: {}", e);
    }

    log::info!("Shutdown complete.");
    outcome
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut term_signal) => {
            term_signal.recv().await;
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    // On non-unix platforms, just wait forever.
    std::future::pending::<()>().await;
}

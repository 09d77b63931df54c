use crate::race_logic::config::Config;
use crate::race_logic::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::StreamExt;
use lib_common::{FeedError, RawRecord};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

const BANNER: &str = "<h1>Race telemetry</h1><p>Connect to <code>/ws</code> for live frames.</p>";

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/api/schedule/{season}", get(schedule_handler))
        .route("/api/standings/{season}", get(standings_handler))
        .route("/api/results/{season}", get(results_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn run(
    config: Config,
    app_state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let app = router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Downstream server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            log::info!("Downstream server shutting down.");
        })
        .await?;

    Ok(())
}

async fn root_handler() -> Html<&'static str> {
    Html(BANNER)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn schedule_handler(State(state): State<AppState>, Path(season): Path<String>) -> Response {
    passthrough(state.jolpica.get_schedule(&season).await)
}

async fn standings_handler(State(state): State<AppState>, Path(season): Path<String>) -> Response {
    passthrough(state.jolpica.get_driver_standings(&season).await)
}

async fn results_handler(State(state): State<AppState>, Path(season): Path<String>) -> Response {
    passthrough(state.jolpica.get_latest_results(&season).await)
}

fn passthrough(result: Result<RawRecord, FeedError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let client_id = format!("ws-{}", NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed));
    let mut frames = state.dispatcher.add_client(&client_id);
    let mut shutdown = state.shutdown_tx.subscribe();
    log::info!("Client {} connected ({} total)", client_id, state.dispatcher.client_count());

    loop {
        tokio::select! {
            // Client-sent data is ignored; only closure matters
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                log::trace!(
                    "Client {} <- tick {} from {} ({:?} after collection started)",
                    client_id,
                    frame.tick,
                    frame.source,
                    frame.started_at.elapsed()
                );
                if socket.send(Message::Text(frame.text.clone().into())).await.is_err() {
                    break; // client disconnected
                }
            }
            _ = shutdown.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.dispatcher.remove_client(&client_id);
    log::info!("Client {} disconnected", client_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn serve(config: &Config) -> String {
        let (tx, _) = broadcast::channel(1);
        let state = AppState::new(config, tx).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn health_and_banner() {
        let base = serve(&Config::defaults()).await;

        let health: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health, json!({ "status": "ok" }));

        let banner = reqwest::get(format!("{}/", base)).await.unwrap();
        assert_eq!(banner.status(), reqwest::StatusCode::OK);
        assert!(banner.text().await.unwrap().contains("/ws"));
    }

    #[tokio::test]
    async fn standings_failure_is_bad_gateway() {
        let mut config = Config::defaults();
        // Discard port; nothing listens there
        config.jolpica_base_url = Some("http://127.0.0.1:9/ergast/f1/".to_string());
        config.request_timeout_secs = Some(1);
        let base = serve(&config).await;

        let response = reqwest::get(format!("{}/api/standings/2024", base)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("jolpica"));
    }
}

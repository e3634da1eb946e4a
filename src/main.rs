use std::env;
use std::sync::Arc;

use anyhow::Result;
use axum::{Router, routing::get};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use quiz_battle::auth;
use quiz_battle::backend::BackendClient;
use quiz_battle::bank;
use quiz_battle::model::battle::BattleConfig;
use quiz_battle::progress::FileProgressStore;
use quiz_battle::server::{AppState, start_ws_server};

async fn health_check() -> &'static str {
    "OK"
}

fn port_from_env(var: &str, default: u16) -> u16 {
    env::var(var)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    info!("Starting quiz-battle backend");

    let bank = bank::load_bank_from_env()?;
    let validator = auth::create_validator_from_env();
    let backend = BackendClient::from_env();
    let progress_path =
        env::var("PROGRESS_PATH").unwrap_or_else(|_| "quiz_progress.json".to_string());
    let progress = FileProgressStore::load(progress_path.into());

    let app_state = Arc::new(AppState::new(
        bank,
        BattleConfig::default(),
        validator,
        backend,
        Box::new(progress),
    ));

    let ws_port = port_from_env("WS_PORT", 9002);
    let ws_listener = TcpListener::bind(("0.0.0.0", ws_port)).await?;
    let ws_server = start_ws_server(ws_listener, app_state);

    let http_port = port_from_env("HTTP_PORT", 8080);
    let health_app = Router::new()
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive());
    let health_listener = TcpListener::bind(("0.0.0.0", http_port)).await?;

    tokio::select! {
        _ = ws_server => {},
        _ = axum::serve(health_listener, health_app) => {},
    }

    Ok(())
}

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use log::*;
use rand::Rng;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, mpsc},
};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error, Message, Result},
};

use crate::auth::JwtValidator;
use crate::backend::BackendClient;
use crate::handler;
use crate::model::battle::BattleConfig;
use crate::model::question::Question;
use crate::model::session::Session;
use crate::progress::ProgressStore;

pub type Tx = mpsc::UnboundedSender<Message>;
pub type Rx = mpsc::UnboundedReceiver<Message>;

/// Shared server state: one session per connection plus the injected
/// collaborators (identity, backend RPCs, question bank, progress store).
pub struct AppState {
    pub sessions: Mutex<HashMap<String, Session>>,
    pub validator: Arc<dyn JwtValidator>,
    pub backend: BackendClient,
    pub bank: Vec<Question>,
    pub progress: std::sync::Mutex<Box<dyn ProgressStore>>,
    pub cfg: BattleConfig,
}

impl AppState {
    pub fn new(
        bank: Vec<Question>,
        cfg: BattleConfig,
        validator: Arc<dyn JwtValidator>,
        backend: BackendClient,
        progress: Box<dyn ProgressStore>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            validator,
            backend,
            bank,
            progress: std::sync::Mutex::new(progress),
            cfg,
        }
    }
}

fn generate_code() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

pub async fn start_ws_server(listener: TcpListener, app_state: Arc<AppState>) {
    let addr = listener.local_addr().expect("Failed to get local address");
    info!("Listening on: {addr}");

    while let Ok((stream, _)) = listener.accept().await {
        let peer = stream
            .peer_addr()
            .expect("connected streams should have a peer address");
        info!("Peer address: {peer}");

        tokio::spawn(accept_connection(peer, stream, app_state.clone()));
    }
}

async fn accept_connection(peer: SocketAddr, stream: TcpStream, app_state: Arc<AppState>) {
    if let Err(e) = handle_connection(peer, stream, app_state).await {
        match e {
            Error::ConnectionClosed | Error::Protocol(_) | Error::Utf8(_) => (),
            err => error!("Error processing connection: {err}"),
        }
    }
}

async fn handle_connection(
    peer: SocketAddr,
    stream: TcpStream,
    app_state: Arc<AppState>,
) -> Result<()> {
    let ws_stream = accept_async(stream).await.expect("Failed to accept");
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let code = {
        let mut sessions = app_state.sessions.lock().await;
        let mut code = generate_code();
        while sessions.contains_key(&code) {
            code = generate_code();
        }
        sessions.insert(
            code.clone(),
            Session::new(
                code.clone(),
                tx.clone(),
                app_state.cfg.starting_booster_balance,
            ),
        );
        code
    };
    info!("Session {code} connected from {peer}");

    // The start-phase snapshot so the surface can render immediately
    {
        let sessions = app_state.sessions.lock().await;
        if let Some(session) = sessions.get(&code) {
            session.broadcast();
        }
    }

    handler::player::run_session(ws_stream, app_state, rx, tx, code).await;
    Ok(())
}

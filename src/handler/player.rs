use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use log::*;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{Bytes, Message},
};

use crate::backend;
use crate::booster::BoosterTier;
use crate::model::battle::{Battle, Phase};
use crate::model::client_message::ClientIntent;
use crate::model::question::Difficulty;
use crate::model::server_message::{ServerMessage, send_msg};
use crate::prepare;
use crate::round_timer;
use crate::sequence;
use crate::server::{AppState, Rx, Tx};

const PING_INTERVAL: Duration = Duration::from_secs(5);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Drive one player connection: pump outgoing messages, read intents,
/// keep the connection alive with pings, and tear the session down when
/// any of the three stops.
pub async fn run_session(
    ws_stream: WebSocketStream<TcpStream>,
    app_state: Arc<AppState>,
    mut rx: Rx,
    tx: Tx,
    code: String,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_write.send(msg).await.is_err() {
                break;
            }
        }
    });

    let last_pong = Arc::new(std::sync::Mutex::new(Instant::now()));

    let ping_tx = tx.clone();
    let ping_pong = last_pong.clone();
    let ping_code = code.clone();
    let ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(PING_INTERVAL).await;
            let alive =
                ping_pong.lock().expect("pong lock poisoned").elapsed() < PONG_TIMEOUT;
            if !alive {
                warn!("No pong from session {ping_code}, dropping connection");
                break;
            }
            if ping_tx.send(Message::Ping(Bytes::new())).is_err() {
                break;
            }
        }
    });

    let app_state2 = app_state.clone();
    let code2 = code.clone();
    let intent_tx = tx.clone();
    let read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_read.next().await {
            if let Message::Pong(_) = msg {
                *last_pong.lock().expect("pong lock poisoned") = Instant::now();
                continue;
            }
            if let Ok(text) = msg.to_text() {
                if text.is_empty() {
                    warn!("Received empty message");
                    continue;
                }
                info!("Received message: {text}");
                process_intent(text, &app_state2, &code2, &intent_tx).await;
            }
        }
    });

    tokio::select! {
        _ = write_task => {},
        _ = read_task => {},
        _ = ping_task => {},
    }

    info!("Session {code} disconnected, tearing down");
    let mut sessions = app_state.sessions.lock().await;
    if let Some(mut session) = sessions.remove(&code) {
        flush_streak_on_disconnect(&app_state, &session);
        session.cancel_pending();
    } else {
        error!("Session {code} not found in app_state at teardown");
    }
}

async fn process_intent(text: &str, app_state: &Arc<AppState>, code: &str, tx: &Tx) {
    let intent = match serde_json::from_str::<ClientIntent>(text) {
        Ok(intent) => intent,
        Err(e) => {
            warn!("Failed to parse message: {text}");
            warn!("Error: {e}");
            send_msg(
                tx,
                ServerMessage::error("Server error: Failed to parse message"),
            );
            return;
        }
    };

    match intent {
        ClientIntent::Authenticate { token } => authenticate(app_state, code, &token, tx).await,
        ClientIntent::StartMatch { difficulty } => {
            start_match(app_state, code, difficulty, tx).await
        }
        ClientIntent::SubmitAnswer { index } => submit_answer(app_state, code, index).await,
        ClientIntent::UseBooster { tier } => use_booster(app_state, code, tier, tx).await,
        ClientIntent::QuitMatch => quit_match(app_state, code).await,
        ClientIntent::RestartMatch => {
            // Discard and redraw a fresh set at the same difficulty
            let difficulty = {
                let mut sessions = app_state.sessions.lock().await;
                let Some(session) = sessions.get_mut(code) else {
                    return;
                };
                let difficulty = session.battle.as_ref().and_then(|b| b.difficulty);
                session.cancel_pending();
                session.end_match();
                difficulty
            };
            start_match(app_state, code, difficulty, tx).await;
        }
    }
}

async fn authenticate(app_state: &Arc<AppState>, code: &str, token: &str, tx: &Tx) {
    let user = match app_state.validator.validate(token) {
        Ok(user) => user,
        Err(e) => {
            warn!("Authentication failed for session {code}: {e:#}");
            send_msg(tx, ServerMessage::error(format!("Authentication failed: {e}")));
            return;
        }
    };
    info!("Session {code} authenticated as {}", user.user_id);
    let user_id = user.user_id.clone();
    {
        let mut sessions = app_state.sessions.lock().await;
        let Some(session) = sessions.get_mut(code) else {
            return;
        };
        session.user = Some(user);
    }

    // Mirror the backend-owned balance; skipped mid-match so the active
    // ledger's accounting is never clobbered.
    match app_state.backend.fetch_booster_balance(&user_id).await {
        Ok(Some(balance)) => {
            let mut sessions = app_state.sessions.lock().await;
            if let Some(session) = sessions.get_mut(code) {
                if session.battle.is_none() {
                    session.booster_balance = balance;
                }
            }
        }
        Ok(None) => {}
        Err(e) => warn!("fetch_booster_balance failed for {user_id}: {e:#}"),
    }

    let sessions = app_state.sessions.lock().await;
    if let Some(session) = sessions.get(code) {
        session.broadcast();
    }
}

async fn start_match(
    app_state: &Arc<AppState>,
    code: &str,
    difficulty: Option<Difficulty>,
    tx: &Tx,
) {
    let user_key = {
        let sessions = app_state.sessions.lock().await;
        let Some(session) = sessions.get(code) else {
            return;
        };
        if session
            .battle
            .as_ref()
            .is_some_and(|b| b.phase == Phase::Playing)
        {
            send_msg(tx, ServerMessage::error("Match already in progress"));
            return;
        }
        session.user_id().unwrap_or("guest").to_string()
    };

    let excluded = app_state
        .progress
        .lock()
        .expect("progress lock poisoned")
        .recently_answered(&user_key);

    let questions = {
        let mut rng = rand::rng();
        prepare::prepare(
            &app_state.bank,
            difficulty,
            &excluded,
            app_state.cfg.questions_per_match,
            &mut rng,
        )
    };

    let mut sessions = app_state.sessions.lock().await;
    let Some(session) = sessions.get_mut(code) else {
        return;
    };
    if session
        .battle
        .as_ref()
        .is_some_and(|b| b.phase == Phase::Playing)
    {
        send_msg(tx, ServerMessage::error("Match already in progress"));
        return;
    }
    if questions.is_empty() {
        error!("Prepared question set for session {code} is empty, refusing to start");
        send_msg(tx, ServerMessage::error("No questions available"));
        return;
    }

    session.cancel_pending();
    session.end_match();
    info!(
        "Session {code} starting a {}-question match at {difficulty:?}",
        questions.len()
    );
    session.battle = Some(Battle::new(
        questions,
        difficulty,
        session.booster_balance,
        app_state.cfg.clone(),
    ));
    session.timer_task = Some(round_timer::spawn_tick_task(app_state, code));
    session.broadcast();
}

async fn submit_answer(app_state: &Arc<AppState>, code: &str, index: usize) {
    let record = {
        let mut sessions = app_state.sessions.lock().await;
        let Some(session) = sessions.get_mut(code) else {
            return;
        };
        let Some(battle) = session.battle.as_mut() else {
            debug!("Answer with no active battle on session {code}, ignoring");
            return;
        };
        let question_id = battle.current_question().map(|q| q.id.clone());
        let Some(resolution) = battle.submit_answer(index, Instant::now()) else {
            // Duplicate or late input; recovered locally by ignoring it
            debug!("Ignoring answer on already-resolved question for session {code}");
            return;
        };
        let record = resolution
            .correct
            .then(|| {
                question_id.map(|id| (session.user_id().unwrap_or("guest").to_string(), id))
            })
            .flatten();
        sequence::stage_resolution(app_state, code, session, resolution);
        session.broadcast();
        record
    };

    // Cooldown bookkeeping happens outside the session lock
    if let Some((user_key, question_id)) = record {
        app_state
            .progress
            .lock()
            .expect("progress lock poisoned")
            .record_answered(&user_key, &question_id);
    }
}

async fn use_booster(app_state: &Arc<AppState>, code: &str, tier: BoosterTier, tx: &Tx) {
    // Reserve the per-question flag while holding the lock, so a double
    // tap fails on the flag before any balance is touched.
    let (user, generation, question_index) = {
        let mut sessions = app_state.sessions.lock().await;
        let Some(session) = sessions.get_mut(code) else {
            return;
        };
        let Some(battle) = session.battle.as_mut() else {
            send_msg(tx, ServerMessage::error("No active match"));
            return;
        };
        if battle.phase != Phase::Playing || battle.is_resolved() {
            send_msg(tx, ServerMessage::error("Round already resolved"));
            return;
        }
        let question_index = battle.question_index();
        if let Err(e) = battle.ledger.try_reserve(tier) {
            send_msg(tx, ServerMessage::error(e.to_string()));
            return;
        }
        let user = session.user_id().map(String::from);
        (user, session.generation, question_index)
    };

    // The effect lands only after the externally owned balance moved
    let outcome = match &user {
        Some(user_id) => {
            app_state
                .backend
                .consume_boosters(user_id, tier.cost())
                .await
        }
        None => Ok(None),
    };

    let mut sessions = app_state.sessions.lock().await;
    let Some(session) = sessions.get_mut(code) else {
        return;
    };
    let same_round = session.generation == generation
        && session.battle.as_ref().is_some_and(|b| {
            b.phase == Phase::Playing && !b.is_resolved() && b.question_index() == question_index
        });

    match outcome {
        Ok(new_balance) => {
            let Some(battle) = session.battle.as_mut() else {
                return;
            };
            battle.ledger.confirm(tier, new_balance);
            if same_round {
                match tier {
                    BoosterTier::Freeze => {
                        battle.timer.pause();
                        if let Some(handle) = session.timer_task.take() {
                            handle.abort();
                        }
                    }
                    BoosterTier::Reveal => battle.revealed = true,
                    extra => {
                        if let Some(secs) = extra.extra_seconds() {
                            battle.timer.extend(Duration::from_secs(secs));
                        }
                    }
                }
            } else {
                // The balance is spent server-side either way
                warn!("Booster {tier:?} confirmed after its round ended on session {code}");
            }
            session.broadcast();
        }
        Err(e) => {
            warn!("consume_boosters failed on session {code}: {e:#}");
            if same_round {
                if let Some(battle) = session.battle.as_mut() {
                    battle.ledger.release(tier);
                }
            }
            send_msg(tx, ServerMessage::error("Booster unavailable right now"));
        }
    }
}

async fn quit_match(app_state: &Arc<AppState>, code: &str) {
    let mut sessions = app_state.sessions.lock().await;
    let Some(session) = sessions.get_mut(code) else {
        return;
    };
    info!("Session {code} left the match");
    session.cancel_pending();
    session.end_match();
    session.broadcast();
}

/// A dropped connection forfeits the match's score and coins, but the
/// best-streak high-water mark is still flushed: the server applies
/// max(), so the call is harmless even if it races a later match.
fn flush_streak_on_disconnect(app_state: &Arc<AppState>, session: &crate::model::session::Session) {
    if let Some(battle) = &session.battle {
        if battle.best_streak > 0 {
            backend::spawn_streak_update(
                app_state,
                session.user_id().map(String::from),
                battle.best_streak,
            );
        }
    }
}

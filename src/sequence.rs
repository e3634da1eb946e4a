use std::sync::Arc;
use std::time::Instant;

use log::warn;
use tokio::task::AbortHandle;

use crate::backend;
use crate::model::battle::{AdvanceOutcome, MatchOutcome, Resolution, Settlement};
use crate::model::session::Session;
use crate::round_timer;
use crate::server::AppState;

/// Stage the animation playback for a resolved question. Called while
/// holding the session lock; the countdown is cancelled, the broken
/// streak (if any) is flushed best-effort, and a task is spawned to walk
/// windup -> impact -> advance. The task re-checks the session generation
/// at every step, so a quit or restart in between leaves it inert.
pub fn stage_resolution(
    app_state: &Arc<AppState>,
    code: &str,
    session: &mut Session,
    resolution: Resolution,
) {
    if let Some(streak) = resolution.broken_streak {
        backend::spawn_streak_update(app_state, session.user_id().map(String::from), streak);
    }
    if let Some(handle) = session.timer_task.take() {
        handle.abort();
    }
    let handle = spawn_resolution_task(
        app_state.clone(),
        code.to_string(),
        session.generation,
        resolution,
    );
    session.sequence_task = Some(handle);
}

fn spawn_resolution_task(
    app_state: Arc<AppState>,
    code: String,
    generation: u64,
    resolution: Resolution,
) -> AbortHandle {
    let (windup, impact, advance) = (
        app_state.cfg.windup_delay,
        app_state.cfg.impact_delay,
        app_state.cfg.advance_delay,
    );

    let task = tokio::spawn(async move {
        tokio::time::sleep(windup).await;
        {
            let mut sessions = app_state.sessions.lock().await;
            let Some(session) = live_session(&mut sessions, &code, generation) else {
                return;
            };
            let Some(battle) = session.battle.as_mut() else {
                return;
            };
            battle.begin_windup(&resolution);
            session.broadcast();
        }

        tokio::time::sleep(impact.saturating_sub(windup)).await;
        {
            let mut sessions = app_state.sessions.lock().await;
            let Some(session) = live_session(&mut sessions, &code, generation) else {
                return;
            };
            let Some(battle) = session.battle.as_mut() else {
                return;
            };
            if let Some(outcome) = battle.apply_impact(&resolution) {
                let (settlement, user) = finish_match(session, outcome);
                session.broadcast();
                drop(sessions);
                if let Some(settlement) = settlement {
                    backend::spawn_settlement(&app_state, user, settlement);
                }
                return;
            }
            session.broadcast();
        }

        tokio::time::sleep(advance.saturating_sub(impact)).await;
        {
            let mut sessions = app_state.sessions.lock().await;
            let Some(session) = live_session(&mut sessions, &code, generation) else {
                return;
            };
            let Some(battle) = session.battle.as_mut() else {
                return;
            };
            match battle.advance(Instant::now()) {
                AdvanceOutcome::Next => {
                    session.timer_task = Some(round_timer::spawn_tick_task(&app_state, &code));
                    session.broadcast();
                }
                AdvanceOutcome::Exhausted(outcome) => {
                    let (settlement, user) = finish_match(session, outcome);
                    session.broadcast();
                    drop(sessions);
                    if let Some(settlement) = settlement {
                        backend::spawn_settlement(&app_state, user, settlement);
                    }
                }
            }
        }
    });

    task.abort_handle()
}

/// Close out the battle under the lock: phase, outcome, the one-shot
/// settlement, and the balance mirror for the next match.
fn finish_match(
    session: &mut Session,
    outcome: MatchOutcome,
) -> (Option<Settlement>, Option<String>) {
    let Some(battle) = session.battle.as_mut() else {
        warn!("Tried to finish a match on session {} with no battle", session.code);
        return (None, None);
    };
    battle.finish(outcome);
    let settlement = battle.take_settlement();
    let balance = battle.ledger.balance();
    session.booster_balance = balance;
    let user = session.user_id().map(String::from);
    (settlement, user)
}

fn live_session<'a>(
    sessions: &'a mut std::collections::HashMap<String, Session>,
    code: &str,
    generation: u64,
) -> Option<&'a mut Session> {
    let session = sessions.get_mut(code)?;
    if session.generation != generation {
        return None;
    }
    Some(session)
}

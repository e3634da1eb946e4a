use std::sync::Arc;
use std::time::{Duration, Instant};

use log::error;
use tokio::task::AbortHandle;

use crate::model::battle::Phase;
use crate::model::server_message::{ServerMessage, send_msg};
use crate::sequence;
use crate::server::AppState;

pub const LOW_TIME_THRESHOLD: Duration = Duration::from_secs(3);

const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Wall-clock countdown for one question. The deadline is an absolute
/// instant; remaining time is recomputed from it on every observation, so
/// slow ticks or a suspended process can never stretch the countdown.
#[derive(Debug)]
pub struct RoundTimer {
    deadline: Instant,
    max_duration: Duration,
    frozen_remaining: Option<Duration>,
    fired: bool,
}

impl RoundTimer {
    pub fn start(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
            max_duration: duration,
            frozen_remaining: None,
            fired: false,
        }
    }

    pub fn reset(&mut self, duration: Duration) {
        *self = Self::start(duration);
    }

    /// Freeze the remaining time. Idempotent.
    pub fn pause(&mut self) {
        if self.frozen_remaining.is_none() {
            self.frozen_remaining = Some(self.remaining_at(Instant::now()));
        }
    }

    /// Continue from the frozen remainder, not from the full duration.
    pub fn resume(&mut self) {
        if let Some(remaining) = self.frozen_remaining.take() {
            self.deadline = Instant::now() + remaining;
        }
    }

    /// Push the deadline out in place; the countdown keeps its elapsed part.
    pub fn extend(&mut self, amount: Duration) {
        self.deadline += amount;
        self.max_duration += amount;
        if let Some(remaining) = self.frozen_remaining.as_mut() {
            *remaining += amount;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.frozen_remaining.is_some()
    }

    pub fn time_left(&self) -> Duration {
        self.frozen_remaining
            .unwrap_or_else(|| self.remaining_at(Instant::now()))
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    pub fn is_low_time(&self) -> bool {
        self.time_left() <= LOW_TIME_THRESHOLD
    }

    /// Report expiry exactly once per countdown. A paused timer never
    /// expires, so an answer in flight always beats the timeout.
    pub fn take_expiry(&mut self) -> bool {
        if self.fired || self.frozen_remaining.is_some() {
            return false;
        }
        if self.remaining_at(Instant::now()).is_zero() {
            self.fired = true;
            return true;
        }
        false
    }

    fn remaining_at(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }
}

/// Spawn the countdown tick task for a session. The task polls the
/// deadline, broadcasts a TimerTick when the whole-second value changes,
/// and on expiry resolves the timeout through the battle controller.
/// The abort handle is stored on the session; answering, freezing, and
/// quitting all abort the task.
pub fn spawn_tick_task(app_state: &Arc<AppState>, code: &str) -> AbortHandle {
    let app_state = app_state.clone();
    let code = code.to_string();

    let task = tokio::spawn(async move {
        let mut last_broadcast: Option<u32> = None;
        loop {
            tokio::time::sleep(TICK_INTERVAL).await;

            let mut sessions = app_state.sessions.lock().await;
            let Some(session) = sessions.get_mut(&code) else {
                error!("Tried to tick round timer, but session {code} no longer exists!");
                break;
            };

            enum Step {
                Stop,
                Tick(u32),
                Expired(crate::model::battle::Resolution),
            }

            let step = match session.battle.as_mut() {
                None => Step::Stop,
                Some(battle) if battle.phase != Phase::Playing => Step::Stop,
                Some(battle) if battle.timer.is_paused() => Step::Stop,
                Some(battle) => {
                    if battle.timer.take_expiry() {
                        match battle.resolve_timeout(Instant::now()) {
                            Some(resolution) => Step::Expired(resolution),
                            None => Step::Stop,
                        }
                    } else {
                        Step::Tick(whole_seconds_left(battle.timer.time_left()))
                    }
                }
            };

            match step {
                Step::Stop => break,
                Step::Tick(seconds_remaining) => {
                    if last_broadcast != Some(seconds_remaining) {
                        send_msg(&session.tx, ServerMessage::TimerTick { seconds_remaining });
                        last_broadcast = Some(seconds_remaining);
                    }
                }
                Step::Expired(resolution) => {
                    sequence::stage_resolution(&app_state, &code, session, resolution);
                    session.broadcast();
                    break;
                }
            }
        }
    });

    task.abort_handle()
}

pub fn whole_seconds_left(time_left: Duration) -> u32 {
    time_left.as_secs_f64().ceil() as u32
}

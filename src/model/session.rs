use tokio::task::AbortHandle;

use crate::auth::AuthedUser;
use crate::booster::BoosterTier;
use crate::model::battle::{AnimationState, Battle, Phase};
use crate::model::server_message::{BattleSnapshot, QuestionView, ServerMessage, send_msg};
use crate::round_timer::whole_seconds_left;
use crate::server::Tx;

/// One connected player. Lives in the server's session map; the battle
/// and every pending task handle hang off it so that teardown is a
/// single place.
pub struct Session {
    pub code: String,
    pub user: Option<AuthedUser>,
    /// Mirror of the backend-owned booster balance between matches.
    pub booster_balance: u32,
    pub battle: Option<Battle>,
    /// Bumped whenever the battle is reset; staged callbacks check it
    /// before touching state, so nothing stale ever lands.
    pub generation: u64,
    pub timer_task: Option<AbortHandle>,
    pub sequence_task: Option<AbortHandle>,
    pub tx: Tx,
}

impl Session {
    pub fn new(code: String, tx: Tx, booster_balance: u32) -> Self {
        Self {
            code,
            user: None,
            booster_balance,
            battle: None,
            generation: 0,
            timer_task: None,
            sequence_task: None,
            tx,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }

    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.display_name.as_str())
            .unwrap_or("Guest")
    }

    /// Invalidate and abort everything scheduled against the current
    /// battle. Must precede any battle reset.
    pub fn cancel_pending(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.timer_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.sequence_task.take() {
            handle.abort();
        }
    }

    /// Discard the battle, keeping the booster balance mirror current.
    /// Abandoned progress is forfeited by design.
    pub fn end_match(&mut self) {
        if let Some(battle) = self.battle.take() {
            self.booster_balance = battle.ledger.balance();
        }
    }

    pub fn to_snapshot(&self) -> BattleSnapshot {
        match &self.battle {
            Some(battle) => {
                let question = battle.current_question().map(|q| QuestionView {
                    prompt: q.prompt.clone(),
                    options: q.options.clone(),
                    round_number: battle.question_number(),
                    total_rounds: battle.total_questions(),
                });
                BattleSnapshot {
                    phase: battle.phase,
                    player_name: self.display_name().to_string(),
                    difficulty: battle.difficulty,
                    question,
                    player_life: battle.player_life,
                    opponent_life: battle.opponent_life,
                    max_life: battle.config().max_life,
                    score: battle.score,
                    correct_count: battle.correct_count,
                    incorrect_count: battle.incorrect_count,
                    match_streak: battle.streak,
                    best_streak: battle.best_streak,
                    selected_answer: battle.selected_answer,
                    player_animation: battle.player_anim,
                    opponent_animation: battle.opponent_anim,
                    time_left_seconds: whole_seconds_left(battle.timer.time_left()),
                    max_time_seconds: whole_seconds_left(battle.timer.max_duration()),
                    timer_paused: battle.timer.is_paused(),
                    low_time: battle.timer.is_low_time(),
                    booster_balance: battle.ledger.balance(),
                    boosters_available: BoosterTier::ALL
                        .into_iter()
                        .filter(|t| battle.ledger.can_use(*t))
                        .collect(),
                    boosters_used: battle.ledger.used_tiers(),
                    revealed_option: battle
                        .revealed
                        .then(|| battle.current_question().map(|q| q.correct_index))
                        .flatten(),
                    outcome: battle.outcome,
                    #[cfg(feature = "test-support")]
                    correct_option: battle.current_question().map(|q| q.correct_index),
                }
            }
            None => BattleSnapshot {
                phase: Phase::Start,
                player_name: self.display_name().to_string(),
                difficulty: None,
                question: None,
                player_life: 0,
                opponent_life: 0,
                max_life: 0,
                score: 0,
                correct_count: 0,
                incorrect_count: 0,
                match_streak: 0,
                best_streak: 0,
                selected_answer: None,
                player_animation: AnimationState::Idle,
                opponent_animation: AnimationState::Idle,
                time_left_seconds: 0,
                max_time_seconds: 0,
                timer_paused: false,
                low_time: false,
                booster_balance: self.booster_balance,
                boosters_available: BoosterTier::ALL
                    .into_iter()
                    .filter(|t| t.cost() <= self.booster_balance)
                    .collect(),
                boosters_used: Vec::new(),
                revealed_option: None,
                outcome: None,
                #[cfg(feature = "test-support")]
                correct_option: None,
            },
        }
    }

    pub fn broadcast(&self) {
        send_msg(
            &self.tx,
            ServerMessage::BattleState {
                state: self.to_snapshot(),
            },
        );
    }
}

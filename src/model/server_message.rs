use log::error;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

use crate::booster::BoosterTier;
use crate::model::battle::{AnimationState, MatchOutcome, Phase};
use crate::model::question::Difficulty;
use crate::server::Tx;

/// The client's view of the active question. The correct option is not
/// part of the view; answers are resolved server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    pub round_number: usize,
    pub total_rounds: usize,
}

/// The full render-facing state, re-emitted on every change so the
/// surface can draw declaratively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSnapshot {
    pub phase: Phase,
    pub player_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub player_life: u32,
    pub opponent_life: u32,
    pub max_life: u32,
    pub score: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub match_streak: u32,
    pub best_streak: u32,
    pub selected_answer: Option<usize>,
    pub player_animation: AnimationState,
    pub opponent_animation: AnimationState,
    pub time_left_seconds: u32,
    pub max_time_seconds: u32,
    pub timer_paused: bool,
    pub low_time: bool,
    pub booster_balance: u32,
    pub boosters_available: Vec<BoosterTier>,
    pub boosters_used: Vec<BoosterTier>,
    pub revealed_option: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
    /// Lets the integ harness answer questions; never present in
    /// production builds.
    #[cfg(feature = "test-support")]
    pub correct_option: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    BattleState { state: BattleSnapshot },
    #[serde(rename_all = "camelCase")]
    TimerTick { seconds_remaining: u32 },
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

pub fn send_msg(tx: &Tx, msg: ServerMessage) {
    let msg = serde_json::to_string(&msg).unwrap_or_else(|e| {
        format!("Catastrophic! Serde error when trying to serialize serverside: {e}")
    });
    tx.send(Message::text(msg.clone())).unwrap_or_else(|e| {
        error!("Sending server message through channel failed: {e}");
        error!("Tried to send message: {msg}");
    })
}

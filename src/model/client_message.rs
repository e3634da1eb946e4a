use serde::{Deserialize, Serialize};

use crate::booster::BoosterTier;
use crate::model::question::Difficulty;

/// Everything the presentation surface can ask of the battle controller.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ClientIntent {
    #[serde(rename_all = "camelCase")]
    Authenticate { token: String },

    #[serde(rename_all = "camelCase")]
    StartMatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        difficulty: Option<Difficulty>,
    },

    #[serde(rename_all = "camelCase")]
    SubmitAnswer { index: usize },

    #[serde(rename_all = "camelCase")]
    UseBooster { tier: BoosterTier },

    QuitMatch,
    RestartMatch,
}

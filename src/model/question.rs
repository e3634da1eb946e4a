use serde::{Deserialize, Serialize};

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One entry of the question bank. Immutable once drawn into a match:
/// the preparer hands the battle a derived copy with re-shuffled options,
/// never a mutated bank entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub difficulty: Difficulty,
}

impl Question {
    pub fn correct_text(&self) -> &str {
        &self.options[self.correct_index]
    }
}

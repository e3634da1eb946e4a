use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::question::{Difficulty, Question};

/// Select and shuffle a match question set from the bank.
///
/// The difficulty filter and the recently-answered exclusion are both
/// best-effort: whenever either would leave fewer than `amount` questions,
/// it is dropped and the wider pool is used instead, so a match is never
/// under-filled while the bank itself can fill it.
pub fn prepare(
    bank: &[Question],
    difficulty: Option<Difficulty>,
    excluded: &HashSet<String>,
    amount: usize,
    rng: &mut impl Rng,
) -> Vec<Question> {
    let mut pool: Vec<&Question> = match difficulty {
        Some(level) => {
            let filtered: Vec<&Question> =
                bank.iter().filter(|q| q.difficulty == level).collect();
            if filtered.len() >= amount {
                filtered
            } else {
                bank.iter().collect()
            }
        }
        None => bank.iter().collect(),
    };

    if !excluded.is_empty() {
        let fresh: Vec<&Question> = pool
            .iter()
            .copied()
            .filter(|q| !excluded.contains(&q.id))
            .collect();
        if fresh.len() >= amount {
            pool = fresh;
        }
    }

    pool.shuffle(rng);
    pool.truncate(amount);
    pool.into_iter().map(|q| shuffle_options(q, rng)).collect()
}

/// Derive a copy of the question with its options permuted and
/// `correct_index` pointing at the same answer text.
pub fn shuffle_options(question: &Question, rng: &mut impl Rng) -> Question {
    let mut options = question.options.clone();
    options.shuffle(rng);
    let correct_index = options
        .iter()
        .position(|o| o == question.correct_text())
        .expect("shuffling preserves every option");
    Question {
        options,
        correct_index,
        ..question.clone()
    }
}

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::booster::BoosterLedger;
use crate::model::question::{Difficulty, Question};
use crate::round_timer::RoundTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Playing,
    Gameover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationState {
    Idle,
    Attack,
    Hit,
    Victory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchOutcome {
    Victory,
    Defeat,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combatant {
    Player,
    Opponent,
}

/// Damage as a step function of answer latency: each step is
/// (upper bound in seconds, damage), checked in order, with a floor for
/// slower answers. Thresholds are configuration, not law.
#[derive(Debug, Clone)]
pub struct DamageSchedule {
    steps: Vec<(f64, u32)>,
    floor: u32,
}

impl DamageSchedule {
    pub fn new(steps: Vec<(f64, u32)>, floor: u32) -> Self {
        Self { steps, floor }
    }

    pub fn damage_for(&self, response_seconds: f64) -> u32 {
        for &(upper, damage) in &self.steps {
            if response_seconds < upper {
                return damage;
            }
        }
        self.floor
    }
}

impl Default for DamageSchedule {
    fn default() -> Self {
        Self::new(vec![(3.0, 10), (6.0, 6), (8.0, 4), (10.0, 3)], 3)
    }
}

#[derive(Debug, Clone)]
pub struct BattleConfig {
    pub max_life: u32,
    pub question_seconds: u64,
    pub questions_per_match: usize,
    pub points_per_correct: u32,
    pub wrong_answer_damage: u32,
    pub damage: DamageSchedule,
    pub coins_per_correct: u32,
    pub victory_coin_bonus: u32,
    pub starting_booster_balance: u32,
    /// Attacker animation starts this long after resolution.
    pub windup_delay: Duration,
    /// The hit lands and the life mutation applies at this offset.
    pub impact_delay: Duration,
    /// The next question loads at this offset.
    pub advance_delay: Duration,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_life: 100,
            question_seconds: 10,
            questions_per_match: 100,
            points_per_correct: 100,
            wrong_answer_damage: 10,
            damage: DamageSchedule::default(),
            coins_per_correct: 2,
            victory_coin_bonus: 50,
            starting_booster_balance: 3,
            windup_delay: Duration::from_millis(200),
            impact_delay: Duration::from_millis(1000),
            advance_delay: Duration::from_millis(1800),
        }
    }
}

/// What a resolved question does to the arena: who takes the hit, for how
/// much, and whether a streak just broke (carrying the value to persist).
/// Damage is applied later, at the impact step of the animation sequence.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub correct: bool,
    pub damage: u32,
    pub target: Combatant,
    pub broken_streak: Option<u32>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Next,
    Exhausted(MatchOutcome),
}

/// The one-shot terminal payload for the external store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub score: u32,
    pub coins: u32,
    pub best_streak: u32,
}

/// The battle state machine. Owned exclusively by the session behind the
/// server lock; every mutation comes from an intent, a timer expiry, or a
/// staged resolution step.
pub struct Battle {
    cfg: BattleConfig,
    pub difficulty: Option<Difficulty>,
    questions: Vec<Question>,
    index: usize,
    pub phase: Phase,
    pub player_life: u32,
    pub opponent_life: u32,
    pub score: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub selected_answer: Option<usize>,
    resolved: bool,
    pub revealed: bool,
    pub player_anim: AnimationState,
    pub opponent_anim: AnimationState,
    pub outcome: Option<MatchOutcome>,
    coins_earned: u32,
    pub timer: RoundTimer,
    pub ledger: BoosterLedger,
    question_presented_at: Instant,
    settled: bool,
}

impl Battle {
    pub fn new(
        questions: Vec<Question>,
        difficulty: Option<Difficulty>,
        booster_balance: u32,
        cfg: BattleConfig,
    ) -> Self {
        let timer = RoundTimer::start(Duration::from_secs(cfg.question_seconds));
        Self {
            phase: Phase::Playing,
            player_life: cfg.max_life,
            opponent_life: cfg.max_life,
            cfg,
            difficulty,
            questions,
            index: 0,
            score: 0,
            correct_count: 0,
            incorrect_count: 0,
            streak: 0,
            best_streak: 0,
            selected_answer: None,
            resolved: false,
            revealed: false,
            player_anim: AnimationState::Idle,
            opponent_anim: AnimationState::Idle,
            outcome: None,
            coins_earned: 0,
            timer,
            ledger: BoosterLedger::new(booster_balance),
            question_presented_at: Instant::now(),
            settled: false,
        }
    }

    pub fn config(&self) -> &BattleConfig {
        &self.cfg
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn question_index(&self) -> usize {
        self.index
    }

    pub fn question_number(&self) -> usize {
        self.index + 1
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Resolve an answer tap. Returns None when the question is already
    /// resolved (duplicate input is ignored) or the match is not playing.
    pub fn submit_answer(&mut self, index: usize, now: Instant) -> Option<Resolution> {
        if self.phase != Phase::Playing || self.resolved {
            return None;
        }
        let correct_index = self.current_question()?.correct_index;

        self.resolved = true;
        self.selected_answer = Some(index);
        self.timer.pause();

        let response_seconds = now
            .saturating_duration_since(self.question_presented_at)
            .as_secs_f64();

        if index == correct_index {
            self.correct_count += 1;
            self.score += self.cfg.points_per_correct;
            self.coins_earned += self.cfg.coins_per_correct;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
            Some(Resolution {
                correct: true,
                damage: self.cfg.damage.damage_for(response_seconds),
                target: Combatant::Opponent,
                broken_streak: None,
            })
        } else {
            Some(self.resolve_wrong())
        }
    }

    /// The timeout branch: identical to a wrong answer, but only when no
    /// answer is in flight, and `selected_answer` stays unset.
    pub fn resolve_timeout(&mut self, _now: Instant) -> Option<Resolution> {
        if self.phase != Phase::Playing || self.resolved || self.selected_answer.is_some() {
            return None;
        }
        self.current_question()?;
        self.resolved = true;
        self.timer.pause();
        Some(self.resolve_wrong())
    }

    fn resolve_wrong(&mut self) -> Resolution {
        self.incorrect_count += 1;
        let broken_streak = if self.streak > 0 {
            let broken = self.streak;
            self.streak = 0;
            Some(broken)
        } else {
            None
        };
        Resolution {
            correct: false,
            damage: self.cfg.wrong_answer_damage,
            target: Combatant::Player,
            broken_streak,
        }
    }

    /// First staged step: the attacker winds up.
    pub fn begin_windup(&mut self, resolution: &Resolution) {
        match resolution.target {
            Combatant::Opponent => self.player_anim = AnimationState::Attack,
            Combatant::Player => self.opponent_anim = AnimationState::Attack,
        }
    }

    /// Second staged step: the hit lands. Applies the clamped life
    /// mutation and immediately evaluates the terminal rule.
    pub fn apply_impact(&mut self, resolution: &Resolution) -> Option<MatchOutcome> {
        match resolution.target {
            Combatant::Opponent => {
                self.opponent_anim = AnimationState::Hit;
                self.opponent_life = self.opponent_life.saturating_sub(resolution.damage);
            }
            Combatant::Player => {
                self.player_anim = AnimationState::Hit;
                self.player_life = self.player_life.saturating_sub(resolution.damage);
            }
        }
        self.check_terminal()
    }

    /// Defeat is checked first: a simultaneous double-zero is a defeat.
    fn check_terminal(&self) -> Option<MatchOutcome> {
        if self.player_life == 0 {
            Some(MatchOutcome::Defeat)
        } else if self.opponent_life == 0 {
            Some(MatchOutcome::Victory)
        } else {
            None
        }
    }

    /// Final staged step: load the next question, or end the match when
    /// the set is exhausted. The index never wraps; an exhausted set is
    /// decided by remaining life, equal lives being an explicit draw.
    pub fn advance(&mut self, now: Instant) -> AdvanceOutcome {
        self.player_anim = AnimationState::Idle;
        self.opponent_anim = AnimationState::Idle;

        if self.index + 1 >= self.questions.len() {
            let outcome = if self.player_life > self.opponent_life {
                MatchOutcome::Victory
            } else if self.player_life < self.opponent_life {
                MatchOutcome::Defeat
            } else {
                MatchOutcome::Draw
            };
            return AdvanceOutcome::Exhausted(outcome);
        }

        self.index += 1;
        self.selected_answer = None;
        self.resolved = false;
        self.revealed = false;
        self.ledger.reset_question_flags();
        self.timer
            .reset(Duration::from_secs(self.cfg.question_seconds));
        self.question_presented_at = now;
        AdvanceOutcome::Next
    }

    pub fn finish(&mut self, outcome: MatchOutcome) {
        if self.phase == Phase::Gameover {
            return;
        }
        self.phase = Phase::Gameover;
        self.outcome = Some(outcome);
        self.timer.pause();
        if outcome == MatchOutcome::Victory {
            self.player_anim = AnimationState::Victory;
            self.coins_earned += self.cfg.victory_coin_bonus;
        }
    }

    /// The terminal payload, exactly once. The guard survives the terminal
    /// condition being observed more than once.
    pub fn take_settlement(&mut self) -> Option<Settlement> {
        if self.settled {
            return None;
        }
        self.settled = true;
        Some(Settlement {
            score: self.score,
            coins: self.coins_earned,
            best_streak: self.best_streak,
        })
    }
}

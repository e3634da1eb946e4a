use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of single-use consumables. Costs and effects are
/// declarative data on the tier, not scattered through the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoosterTier {
    Extra10,
    Extra20,
    Extra30,
    Freeze,
    Reveal,
}

impl BoosterTier {
    pub const ALL: [BoosterTier; 5] = [
        BoosterTier::Extra10,
        BoosterTier::Extra20,
        BoosterTier::Extra30,
        BoosterTier::Freeze,
        BoosterTier::Reveal,
    ];

    pub fn cost(self) -> u32 {
        match self {
            BoosterTier::Extra10 => 1,
            BoosterTier::Extra20 => 2,
            BoosterTier::Extra30 => 3,
            BoosterTier::Freeze => 8,
            BoosterTier::Reveal => 10,
        }
    }

    /// Seconds added to the countdown, for the extra-time tiers.
    pub fn extra_seconds(self) -> Option<u64> {
        match self {
            BoosterTier::Extra10 => Some(10),
            BoosterTier::Extra20 => Some(20),
            BoosterTier::Extra30 => Some(30),
            BoosterTier::Freeze | BoosterTier::Reveal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoosterError {
    InsufficientBalance,
    AlreadyUsed,
}

impl fmt::Display for BoosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoosterError::InsufficientBalance => write!(f, "Not enough boosters"),
            BoosterError::AlreadyUsed => write!(f, "Booster already used this question"),
        }
    }
}

/// Per-match booster bookkeeping. The balance is owned by the backend and
/// mirrored here; consumption is a reserve/confirm pair so that the
/// per-question flag is taken before the balance RPC is awaited and a
/// second tap can never double-spend.
#[derive(Debug)]
pub struct BoosterLedger {
    balance: u32,
    used_this_question: HashSet<BoosterTier>,
}

impl BoosterLedger {
    pub fn new(balance: u32) -> Self {
        Self {
            balance,
            used_this_question: HashSet::new(),
        }
    }

    pub fn balance(&self) -> u32 {
        self.balance
    }

    pub fn set_balance(&mut self, balance: u32) {
        self.balance = balance;
    }

    pub fn can_use(&self, tier: BoosterTier) -> bool {
        !self.used_this_question.contains(&tier) && self.balance >= tier.cost()
    }

    /// Take the per-question flag for `tier`, checking the mirrored balance.
    /// Must be followed by `confirm` or `release`.
    pub fn try_reserve(&mut self, tier: BoosterTier) -> Result<(), BoosterError> {
        if self.used_this_question.contains(&tier) {
            return Err(BoosterError::AlreadyUsed);
        }
        if self.balance < tier.cost() {
            return Err(BoosterError::InsufficientBalance);
        }
        self.used_this_question.insert(tier);
        Ok(())
    }

    /// Settle a reserved use. `new_balance` is the backend's post-decrement
    /// value; `None` means no backend is attached and the mirror is
    /// decremented locally.
    pub fn confirm(&mut self, tier: BoosterTier, new_balance: Option<u32>) {
        self.balance = new_balance.unwrap_or_else(|| self.balance.saturating_sub(tier.cost()));
    }

    /// Undo a reservation whose backend decrement failed.
    pub fn release(&mut self, tier: BoosterTier) {
        self.used_this_question.remove(&tier);
    }

    pub fn reset_question_flags(&mut self) {
        self.used_this_question.clear();
    }

    /// Tiers spent on the current question, in declaration order.
    pub fn used_tiers(&self) -> Vec<BoosterTier> {
        BoosterTier::ALL
            .into_iter()
            .filter(|t| self.used_this_question.contains(t))
            .collect()
    }
}

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::warn;
use serde::{Deserialize, Serialize};

/// How long a correctly answered question stays out of the draw.
pub const COOLDOWN: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Injected capability for the answered-question cooldown. The preparer
/// excludes whatever this reports; the controller records every correct
/// answer.
pub trait ProgressStore: Send {
    fn recently_answered(&self, user_id: &str) -> HashSet<String>;
    fn record_answered(&mut self, user_id: &str, question_id: &str);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnsweredEntry {
    id: String,
    ts: u64,
}

/// JSON-file-backed store. Writes are best-effort: a failure is logged
/// and the in-memory view stays authoritative for the process lifetime.
pub struct FileProgressStore {
    path: PathBuf,
    answered: HashMap<String, Vec<AnsweredEntry>>,
    cooldown: Duration,
}

impl FileProgressStore {
    pub fn load(path: PathBuf) -> Self {
        let answered = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Could not parse progress file {}: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            answered,
            cooldown: COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    fn save(&self) {
        match serde_json::to_string(&self.answered) {
            Ok(raw) => {
                if let Err(e) = fs::write(&self.path, raw) {
                    warn!("Could not write progress file {}: {e}", self.path.display());
                }
            }
            Err(e) => warn!("Could not serialize progress: {e}"),
        }
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl ProgressStore for FileProgressStore {
    fn recently_answered(&self, user_id: &str) -> HashSet<String> {
        let cutoff = Self::now_secs().saturating_sub(self.cooldown.as_secs());
        self.answered
            .get(user_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.ts >= cutoff)
                    .map(|e| e.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn record_answered(&mut self, user_id: &str, question_id: &str) {
        let cutoff = Self::now_secs().saturating_sub(self.cooldown.as_secs());
        let entries = self.answered.entry(user_id.to_string()).or_default();
        entries.retain(|e| e.id != question_id && e.ts >= cutoff);
        entries.push(AnsweredEntry {
            id: question_id.to_string(),
            ts: Self::now_secs(),
        });
        self.save();
    }
}

/// In-memory store with no cooldown expiry; the test double.
#[derive(Default)]
pub struct MemoryProgressStore {
    answered: HashMap<String, HashSet<String>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn recently_answered(&self, user_id: &str) -> HashSet<String> {
        self.answered.get(user_id).cloned().unwrap_or_default()
    }

    fn record_answered(&mut self, user_id: &str, question_id: &str) {
        self.answered
            .entry(user_id.to_string())
            .or_default()
            .insert(question_id.to_string());
    }
}

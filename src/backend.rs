use std::env;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::{Value, json};
use url::Url;

use crate::model::battle::Settlement;
use crate::server::AppState;

/// RPC surface of the hosted backend (score, coins, streaks, booster
/// balance). Initialized from environment variables; without a
/// BACKEND_URL every call is a no-op and the caller falls back to local
/// bookkeeping, so the game is fully playable offline.
pub struct BackendClient {
    http: Option<Client>,
    base: Option<Url>,
    service_key: String,
}

impl BackendClient {
    pub fn from_env() -> Self {
        let Ok(mut raw) = env::var("BACKEND_URL") else {
            info!("BACKEND_URL not set, backend RPCs disabled");
            return Self::disabled();
        };
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = match Url::parse(&raw) {
            Ok(base) => base,
            Err(e) => {
                warn!("Invalid BACKEND_URL {raw}: {e}; backend RPCs disabled");
                return Self::disabled();
            }
        };
        let service_key = env::var("BACKEND_SERVICE_KEY").unwrap_or_else(|_| {
            warn!("BACKEND_SERVICE_KEY not set, backend calls will be anonymous");
            String::new()
        });
        info!("Backend RPCs enabled against {base}");
        Self {
            http: Some(Client::new()),
            base: Some(base),
            service_key,
        }
    }

    pub fn disabled() -> Self {
        Self {
            http: None,
            base: None,
            service_key: String::new(),
        }
    }

    /// POST a row-level RPC. Ok(None) means the client is disabled.
    async fn rpc(&self, name: &str, body: Value) -> Result<Option<Value>> {
        let (Some(http), Some(base)) = (&self.http, &self.base) else {
            return Ok(None);
        };
        let url = base
            .join(&format!("rest/v1/rpc/{name}"))
            .map_err(|e| anyhow!("bad rpc url for {name}: {e}"))?;
        let response = http
            .post(url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("rpc {name} failed with status {status}");
        }
        let value = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok(Some(value))
    }

    pub async fn fetch_booster_balance(&self, user_id: &str) -> Result<Option<u32>> {
        let value = self
            .rpc("get_booster_balance", json!({ "p_user_id": user_id }))
            .await?;
        Ok(value.and_then(|v| v.as_u64()).map(|n| n as u32))
    }

    /// Decrement the externally held balance. Ok(Some) carries the new
    /// balance; Ok(None) means no backend is attached and the caller
    /// should decrement its local mirror instead.
    pub async fn consume_boosters(&self, user_id: &str, amount: u32) -> Result<Option<u32>> {
        let value = self
            .rpc(
                "consume_boosters",
                json!({ "p_user_id": user_id, "p_amount": amount }),
            )
            .await?;
        Ok(value
            .and_then(|v| v.get("new_boosters").and_then(Value::as_u64).or(v.as_u64()))
            .map(|n| n as u32))
    }

    /// Additive server-side; called at most once per match.
    pub async fn submit_match_score(&self, user_id: &str, score: u32) -> Result<()> {
        self.rpc(
            "submit_score",
            json!({ "p_user_id": user_id, "p_score": score }),
        )
        .await?;
        Ok(())
    }

    /// Additive server-side; called at most once per match.
    pub async fn grant_coins(&self, user_id: &str, amount: u32) -> Result<()> {
        self.rpc(
            "add_coins",
            json!({ "p_user_id": user_id, "p_amount": amount }),
        )
        .await?;
        Ok(())
    }

    /// The server applies max(current, streak), so repeats are harmless.
    pub async fn update_best_streak(&self, user_id: &str, streak: u32) -> Result<()> {
        self.rpc(
            "update_best_streak",
            json!({ "p_user_id": user_id, "p_streak": streak }),
        )
        .await?;
        Ok(())
    }
}

/// Best-effort streak persistence at streak-break. Failures are logged
/// and never retried; the result screen does not depend on it.
pub fn spawn_streak_update(app_state: &Arc<AppState>, user_id: Option<String>, streak: u32) {
    let Some(user_id) = user_id else {
        debug!("Guest streak of {streak} not persisted");
        return;
    };
    if streak == 0 {
        return;
    }
    let app_state = app_state.clone();
    tokio::spawn(async move {
        if let Err(e) = app_state.backend.update_best_streak(&user_id, streak).await {
            warn!("update_best_streak failed for {user_id}: {e:#}");
        }
    });
}

/// Fire the one-shot terminal submissions. The caller guarantees this
/// runs at most once per match (the settlement guard).
pub fn spawn_settlement(app_state: &Arc<AppState>, user_id: Option<String>, settlement: Settlement) {
    let Some(user_id) = user_id else {
        debug!(
            "Guest match ended with score {}, nothing persisted",
            settlement.score
        );
        return;
    };
    let app_state = app_state.clone();
    tokio::spawn(async move {
        let backend = &app_state.backend;
        if settlement.score > 0 {
            if let Err(e) = backend.submit_match_score(&user_id, settlement.score).await {
                warn!("submit_match_score failed for {user_id}: {e:#}");
            }
        }
        if settlement.coins > 0 {
            if let Err(e) = backend.grant_coins(&user_id, settlement.coins).await {
                warn!("grant_coins failed for {user_id}: {e:#}");
            }
        }
        if settlement.best_streak > 0 {
            if let Err(e) = backend
                .update_best_streak(&user_id, settlement.best_streak)
                .await
            {
                warn!("update_best_streak failed for {user_id}: {e:#}");
            }
        }
    });
}

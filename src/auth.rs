use anyhow::{Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the battle core needs from the identity provider: is the player
/// authenticated, and who are they.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    exp: u64,
}

pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<AuthedUser>;
}

/// Validates HS256 tokens issued by the hosted backend's auth service.
pub struct HsValidator {
    decoding_key: DecodingKey,
}

impl HsValidator {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
        }
    }
}

impl JwtValidator for HsValidator {
    fn validate(&self, token: &str) -> Result<AuthedUser> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow!("Invalid token: {e}"))?;

        let claims = token_data.claims;
        let display_name = claims.name.unwrap_or_else(|| "Player".to_string());

        Ok(AuthedUser {
            user_id: claims.sub,
            display_name,
        })
    }
}

/// Used when no signing secret is configured: guests can still play, but
/// every Authenticate attempt is refused.
pub struct DenyAllValidator;

impl JwtValidator for DenyAllValidator {
    fn validate(&self, _token: &str) -> Result<AuthedUser> {
        Err(anyhow!("authentication is not configured on this server"))
    }
}

pub fn create_validator_from_env() -> Arc<dyn JwtValidator> {
    match std::env::var("QUIZ_JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => Arc::new(HsValidator::new(secret.as_bytes())),
        _ => {
            warn!("QUIZ_JWT_SECRET not set; sign-in disabled, guest play only");
            Arc::new(DenyAllValidator)
        }
    }
}

#[cfg(feature = "test-support")]
pub const TEST_SECRET: &str = "quiz-battle-test-secret";

#[cfg(feature = "test-support")]
pub fn test_validator() -> Arc<dyn JwtValidator> {
    Arc::new(HsValidator::new(TEST_SECRET.as_bytes()))
}

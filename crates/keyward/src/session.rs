use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use keyward_store::{HashField, HashWrite, KeyValueStore};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::token::generate_token;

/// Outcome of validating a presented token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// No session exists for the principal.
    NotLoggedIn,
    /// A session exists but its token differs from the presented one.
    TokenIncorrect,
    /// The token matches but its expiry has passed.
    Expired,
    /// The token matches and has not expired.
    Valid,
}

impl TokenStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "not_logged_in",
            Self::TokenIncorrect => "token_incorrect",
            Self::Expired => "expired",
            Self::Valid => "valid",
        }
    }

    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issues, validates and revokes the session token of one principal.
///
/// The token and its expiry live in two hashes keyed by principal id
/// ([`SessionConfig::token_hash`] and [`SessionConfig::expiry_hash`]).
/// Creating and destroying a session touch both fields in a single atomic
/// store call. Validation reads the token and then the expiry; a concurrent
/// `create_token` landing between the two reads can pair the old token with
/// the new expiry for that one call.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    principal: String,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, principal: impl Into<String>) -> Self {
        Self {
            store,
            principal: principal.into(),
            config: SessionConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Start a session lasting [`SessionConfig::default_timeout_secs`].
    pub async fn create_token(&self) -> Result<String, SessionError> {
        self.create_token_with_timeout(self.config.default_timeout_secs)
            .await
    }

    /// Start a session lasting `timeout_secs`, replacing any previous one.
    ///
    /// A timeout of zero or less creates a session that is already expired.
    /// Returns the new token; the caller is the only party besides the store
    /// that sees it.
    #[allow(clippy::cast_precision_loss)]
    pub async fn create_token_with_timeout(
        &self,
        timeout_secs: i64,
    ) -> Result<String, SessionError> {
        let token = generate_token();
        let expires_at = self.clock.now() + timeout_secs as f64;
        let expires_at = expires_at.to_string();

        self.store
            .hash_set_many(&[
                HashWrite::new(&self.config.token_hash, &self.principal, &token),
                HashWrite::new(&self.config.expiry_hash, &self.principal, &expires_at),
            ])
            .await?;

        debug!(
            principal = %self.principal,
            timeout_secs,
            expires_at = %expires_at,
            "session created"
        );
        Ok(token)
    }

    /// Check whether any session record exists for the principal, expired
    /// or not.
    pub async fn is_logged_in(&self) -> Result<bool, SessionError> {
        Ok(self
            .store
            .hash_exists(&self.config.token_hash, &self.principal)
            .await?)
    }

    /// Classify `input_token` against the stored session.
    ///
    /// Checks run in a fixed order: existence, then token equality, then
    /// expiry. A wrong token is reported as [`TokenStatus::TokenIncorrect`]
    /// even when the session has also expired. The session is expired only
    /// when `now > expires_at`. Never writes to the store.
    ///
    /// # Errors
    ///
    /// [`SessionError::CorruptedExpiry`] if the token matches but the stored
    /// expiry is missing or not a finite number.
    pub async fn validate_token(&self, input_token: &str) -> Result<TokenStatus, SessionError> {
        let Some(stored) = self
            .store
            .hash_get(&self.config.token_hash, &self.principal)
            .await?
        else {
            return Ok(TokenStatus::NotLoggedIn);
        };

        if !bool::from(stored.as_bytes().ct_eq(input_token.as_bytes())) {
            return Ok(TokenStatus::TokenIncorrect);
        }

        let raw = self
            .store
            .hash_get(&self.config.expiry_hash, &self.principal)
            .await?;
        let expires_at = self.parse_expiry(raw)?;

        if self.clock.now() > expires_at {
            Ok(TokenStatus::Expired)
        } else {
            Ok(TokenStatus::Valid)
        }
    }

    fn parse_expiry(&self, raw: Option<String>) -> Result<f64, SessionError> {
        match raw.as_deref().map(str::trim).map(str::parse::<f64>) {
            Some(Ok(ts)) if ts.is_finite() => Ok(ts),
            _ => {
                warn!(
                    principal = %self.principal,
                    value = ?raw,
                    "stored session expiry is not a number"
                );
                Err(SessionError::CorruptedExpiry {
                    principal: self.principal.clone(),
                    value: raw,
                })
            }
        }
    }

    /// Remove the principal's session. Does nothing if there is none.
    pub async fn destroy(&self) -> Result<(), SessionError> {
        self.store
            .hash_delete_many(&[
                HashField::new(&self.config.token_hash, &self.principal),
                HashField::new(&self.config.expiry_hash, &self.principal),
            ])
            .await?;
        debug!(principal = %self.principal, "session destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use keyward_store_memory::MemoryStore;

    use super::*;
    use crate::clock::ManualClock;

    fn session(store: &Arc<MemoryStore>, clock: &ManualClock) -> SessionManager {
        SessionManager::new(store.clone(), "msk").with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn status_names() {
        assert_eq!(TokenStatus::NotLoggedIn.to_string(), "not_logged_in");
        assert_eq!(TokenStatus::TokenIncorrect.as_str(), "token_incorrect");
        assert_eq!(TokenStatus::Expired.as_str(), "expired");
        assert!(TokenStatus::Valid.is_valid());
        assert!(!TokenStatus::Expired.is_valid());
    }

    #[tokio::test]
    async fn walkthrough() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        let token = session.create_token().await.unwrap();
        assert_eq!(
            session.validate_token("WRONG_TOKEN").await.unwrap(),
            TokenStatus::TokenIncorrect
        );
        assert_eq!(
            session.validate_token(&token).await.unwrap(),
            TokenStatus::Valid
        );
        session.destroy().await.unwrap();
        assert_eq!(
            session.validate_token(&token).await.unwrap(),
            TokenStatus::NotLoggedIn
        );
    }

    #[tokio::test]
    async fn fields_are_stored_under_principal() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        let token = session.create_token_with_timeout(60).await.unwrap();
        assert_eq!(
            store
                .hash_get("SESSION_TOKEN_HASH", "msk")
                .await
                .unwrap()
                .as_deref(),
            Some(token.as_str())
        );
        assert_eq!(
            store
                .hash_get("SESSION_TOKEN_HASH_EXPIRE", "msk")
                .await
                .unwrap()
                .as_deref(),
            Some("1060")
        );
    }

    #[tokio::test]
    async fn expiry_boundary_is_inclusive() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        let token = session.create_token_with_timeout(10).await.unwrap();
        clock.set(1_010.0);
        assert_eq!(
            session.validate_token(&token).await.unwrap(),
            TokenStatus::Valid,
            "now == expires_at is still valid"
        );
        clock.set(1_010.001);
        assert_eq!(
            session.validate_token(&token).await.unwrap(),
            TokenStatus::Expired
        );
    }

    #[tokio::test]
    async fn corrupted_expiry_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        let token = session.create_token().await.unwrap();
        store
            .hash_set("SESSION_TOKEN_HASH_EXPIRE", "msk", "next tuesday")
            .await
            .unwrap();

        let err = session.validate_token(&token).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::CorruptedExpiry { ref principal, value: Some(ref v) }
                if principal == "msk" && v == "next tuesday"
        ));
    }

    #[tokio::test]
    async fn missing_expiry_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        let token = session.create_token().await.unwrap();
        store
            .hash_delete("SESSION_TOKEN_HASH_EXPIRE", "msk")
            .await
            .unwrap();

        let err = session.validate_token(&token).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::CorruptedExpiry { value: None, .. }
        ));
    }

    #[tokio::test]
    async fn nan_expiry_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        let token = session.create_token().await.unwrap();
        store
            .hash_set("SESSION_TOKEN_HASH_EXPIRE", "msk", "NaN")
            .await
            .unwrap();
        assert!(session.validate_token(&token).await.is_err());
    }

    #[tokio::test]
    async fn corrupted_expiry_behind_wrong_token_is_not_read() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        session.create_token().await.unwrap();
        store
            .hash_set("SESSION_TOKEN_HASH_EXPIRE", "msk", "garbage")
            .await
            .unwrap();
        assert_eq!(
            session.validate_token("nope").await.unwrap(),
            TokenStatus::TokenIncorrect
        );
    }

    #[tokio::test]
    async fn is_logged_in_tracks_record_existence() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock);

        assert!(!session.is_logged_in().await.unwrap());
        session.create_token_with_timeout(-1).await.unwrap();
        assert!(
            session.is_logged_in().await.unwrap(),
            "expired sessions still have a record"
        );
        session.destroy().await.unwrap();
        assert!(!session.is_logged_in().await.unwrap());
    }

    #[tokio::test]
    async fn custom_hash_names() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000.0);
        let session = session(&store, &clock).with_config(SessionConfig {
            default_timeout_secs: 5,
            token_hash: "tokens".into(),
            expiry_hash: "expiries".into(),
        });

        let token = session.create_token().await.unwrap();
        assert!(store.hash_exists("tokens", "msk").await.unwrap());
        assert_eq!(
            store.hash_get("expiries", "msk").await.unwrap().as_deref(),
            Some("1005")
        );
        clock.advance(6.0);
        assert_eq!(
            session.validate_token(&token).await.unwrap(),
            TokenStatus::Expired
        );
    }
}

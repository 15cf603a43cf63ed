//! Access token suppliers for the Drive client.
//!
//! The client asks for a token before every request, so an implementation is
//! free to refresh between calls.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::auth::AuthDetails;
use crate::auth_store::{AuthStore, FileAuthStore};
use crate::drive::{DriveError, GOOGLE_PROVIDER};
use crate::oauth;

/// Env var holding a ready-to-use Google access token.
pub const ACCESS_TOKEN_ENV: &str = "DRIVELENS_GOOGLE_ACCESS_TOKEN";

/// Store keys searched in order.
pub const STORE_KEYS: [&str; 2] = ["google-drive", "google-common"];

#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self, provider: &str) -> Result<String, DriveError>;
}

fn ensure_google(provider: &str) -> Result<(), DriveError> {
    if provider == GOOGLE_PROVIDER {
        Ok(())
    } else {
        Err(DriveError::Authentication(format!(
            "no credentials for provider '{}'",
            provider
        )))
    }
}

/// Hands out one fixed token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self, provider: &str) -> Result<String, DriveError> {
        ensure_google(provider)?;
        if self.token.is_empty() {
            return Err(DriveError::Authentication("empty access token".to_string()));
        }
        Ok(self.token.clone())
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves tokens from, in order: `DRIVELENS_GOOGLE_ACCESS_TOKEN`, the
/// connector's own auth details, then the auth store. An expired token is
/// refreshed from whichever source holds it: refreshed connector details stay
/// in memory, refreshed store entries are written back.
pub struct StoredTokenProvider {
    details: Mutex<AuthDetails>,
    store: Arc<dyn AuthStore>,
    env: EnvLookup,
    token_url: String,
}

impl StoredTokenProvider {
    pub fn new(details: AuthDetails, store: Arc<dyn AuthStore>) -> Self {
        Self {
            details: Mutex::new(details),
            store,
            env: Box::new(|key: &str| std::env::var(key).ok()),
            token_url: oauth::GOOGLE_TOKEN_URL.to_string(),
        }
    }

    pub fn with_default_store(details: AuthDetails) -> Self {
        Self::new(details, Arc::new(FileAuthStore::new_default()))
    }

    /// Read environment variables through `lookup` instead of the process env.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    fn details(&self) -> AuthDetails {
        match self.details.lock() {
            Ok(d) => d.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_details(&self, updated: AuthDetails) {
        match self.details.lock() {
            Ok(mut d) => *d = updated,
            Err(poisoned) => *poisoned.into_inner() = updated,
        }
    }

    fn stored(&self) -> Option<(&'static str, AuthDetails)> {
        STORE_KEYS
            .iter()
            .find_map(|key| self.store.load(key).map(|auth| (*key, auth)))
    }

    /// Run the refresh grant for `auth`; returns the new token and the merged
    /// details.
    async fn refresh(
        &self,
        source: &str,
        auth: AuthDetails,
    ) -> Result<(String, AuthDetails), DriveError> {
        let refresh_token = auth.get("refresh_token").cloned().ok_or_else(|| {
            DriveError::Authentication("access token expired and no refresh_token stored".into())
        })?;
        let client_id = auth.get("client_id").cloned().ok_or_else(|| {
            DriveError::Authentication("Missing client_id for refresh".to_string())
        })?;
        let client_secret = auth.get("client_secret").cloned();

        debug!(source, "refreshing google access token");
        let tokens = oauth::google_refresh_token(
            &self.token_url,
            &client_id,
            client_secret.as_deref(),
            &refresh_token,
        )
        .await
        .map_err(|e| DriveError::Authentication(e.to_string()))?;
        if tokens.access_token.is_empty() {
            return Err(DriveError::Authentication(
                "refresh returned no access_token".to_string(),
            ));
        }

        let updated = oauth::apply_tokens(auth, &tokens);
        Ok((tokens.access_token, updated))
    }
}

#[async_trait]
impl AccessTokenProvider for StoredTokenProvider {
    async fn access_token(&self, provider: &str) -> Result<String, DriveError> {
        ensure_google(provider)?;

        if let Some(token) = (self.env)(ACCESS_TOKEN_ENV).filter(|t| !t.is_empty()) {
            return Ok(token);
        }

        let details = self.details();
        if let Some(token) = oauth::unexpired_access_token(&details) {
            return Ok(token);
        }
        if details.contains_key("refresh_token") {
            let (token, updated) = self.refresh("connector details", details).await?;
            self.set_details(updated);
            return Ok(token);
        }

        let (key, auth) = self.stored().ok_or_else(|| {
            DriveError::Authentication(
                "Google Drive auth not configured; run the device flow first".to_string(),
            )
        })?;
        if let Some(token) = oauth::unexpired_access_token(&auth) {
            return Ok(token);
        }
        let (token, updated) = self.refresh(key, auth).await?;
        if let Err(e) = self.store.save(key, &updated) {
            warn!(store_key = key, "could not persist refreshed token: {}", e);
        }
        Ok(token)
    }
}

//! OAuth2 credentials for the Classroom API.
//!
//! Tokens come either from a static bearer token in the config or from an
//! authorized-user JSON file (the `token.json` written by Google's installed
//! app flow), which is refreshed with its refresh token when it nears expiry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use classkit_core::config::AuthConfig;
use classkit_core::error::{ClasskitError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scopes the token must be granted for every classkit command to work.
pub const CLASSROOM_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/classroom.rosters",
    "https://www.googleapis.com/auth/classroom.profile.emails",
    "https://www.googleapis.com/auth/classroom.profile.photos",
    "https://www.googleapis.com/auth/classroom.courses",
    "https://www.googleapis.com/auth/classroom.coursework.students",
    "https://www.googleapis.com/auth/classroom.courseworkmaterials",
    "https://www.googleapis.com/auth/classroom.topics",
    "https://www.googleapis.com/auth/classroom.announcements",
];

/// A bearer token for Google API requests.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { secret, expires_at }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Source of access tokens. Consulted once per command run.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken>;
}

/// Build the provider described by the `[auth]` config section.
pub fn provider_from_config(config: &AuthConfig) -> Result<Arc<dyn CredentialProvider>> {
    if let Some(token) = config.access_token.as_deref() {
        return Ok(Arc::new(StaticToken::new(token.to_string())));
    }

    let margin = Duration::try_seconds(config.refresh_margin_secs).ok_or_else(|| {
        ClasskitError::Config(format!(
            "auth.refresh_margin_secs is out of range: {}",
            config.refresh_margin_secs
        ))
    })?;
    Ok(Arc::new(
        AuthorizedUserFile::new(&config.token_file).with_refresh_margin(margin),
    ))
}

/// A fixed bearer token.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<AccessToken> {
        if self.token.is_empty() {
            return Err(ClasskitError::Auth("static access token is empty".into()));
        }
        Ok(AccessToken::new(self.token.clone(), None))
    }
}

/// Contents of a Google authorized-user token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.into()
}

impl AuthorizedUser {
    /// True when the token exists and does not expire within `margin`.
    fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match (&self.token, self.expiry) {
            (Some(token), Some(expiry)) => !token.is_empty() && expiry - now > margin,
            (Some(token), None) => !token.is_empty(),
            (None, _) => false,
        }
    }

    /// Scopes from [`CLASSROOM_SCOPES`] this token was not granted.
    pub fn missing_scopes(&self) -> Vec<&'static str> {
        if self.scopes.is_empty() {
            return Vec::new();
        }
        CLASSROOM_SCOPES
            .iter()
            .copied()
            .filter(|s| !self.scopes.iter().any(|granted| granted == s))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Authorized-user token file with refresh support.
pub struct AuthorizedUserFile {
    path: PathBuf,
    refresh_margin: Duration,
    http: reqwest::Client,
    cached: Mutex<Option<AuthorizedUser>>,
}

impl AuthorizedUserFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            refresh_margin: Duration::seconds(60),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    fn load(&self) -> Result<AuthorizedUser> {
        if !self.path.exists() {
            return Err(ClasskitError::Auth(format!(
                "token file not found: {}. Authorize classkit with Google's installed-app \
                 flow for the Classroom scopes and save the authorized-user JSON there",
                self.path.display()
            )));
        }

        let content = std::fs::read_to_string(&self.path)?;
        let creds: AuthorizedUser = serde_json::from_str(&content).map_err(|e| {
            ClasskitError::Auth(format!(
                "cannot parse token file {}: {e}",
                self.path.display()
            ))
        })?;

        let missing = creds.missing_scopes();
        if !missing.is_empty() {
            warn!(missing = ?missing, "token was not granted all Classroom scopes");
        }

        Ok(creds)
    }

    fn save(&self, creds: &AuthorizedUser) {
        let written = serde_json::to_string_pretty(creds)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&self.path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => info!(path = %self.path.display(), "tokens saved"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to save refreshed token"),
        }
    }

    async fn refresh(&self, creds: &mut AuthorizedUser) -> Result<()> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            creds.refresh_token.as_deref(),
            creds.client_id.as_deref(),
            creds.client_secret.as_deref(),
        ) else {
            return Err(ClasskitError::Auth(
                "access token expired and the token file has no refresh credentials".into(),
            ));
        };

        info!("refreshing tokens");

        let response = self
            .http
            .post(&creds.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| ClasskitError::Auth(format!("token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClasskitError::Auth(format!(
                "token refresh failed ({status}): {body}"
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ClasskitError::Auth(format!("cannot parse token refresh response: {e}")))?;

        let expiry = match refreshed.expires_in {
            Some(secs) => Some(
                Duration::try_seconds(secs)
                    .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                    .ok_or_else(|| {
                        ClasskitError::Auth(format!(
                            "token refresh returned an invalid expires_in: {secs}"
                        ))
                    })?,
            ),
            None => None,
        };

        creds.token = Some(refreshed.access_token);
        creds.expiry = expiry;
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for AuthorizedUserFile {
    async fn access_token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = Some(self.load()?);
        }
        let Some(creds) = cached.as_mut() else {
            return Err(ClasskitError::Auth("credentials not loaded".into()));
        };

        if !creds.is_fresh(Utc::now(), self.refresh_margin) {
            self.refresh(creds).await?;
            self.save(creds);
        } else {
            debug!(expiry = ?creds.expiry, "using cached access token");
        }

        let token = creds
            .token
            .clone()
            .ok_or_else(|| ClasskitError::Auth("token file has no access token".into()))?;
        Ok(AccessToken::new(token, creds.expiry))
    }
}

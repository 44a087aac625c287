//! Credential store for the Sheets publisher.
//!
//! Credentials live in a JSON token file at an explicitly configured path,
//! provisioned out-of-band through the standard delegated-authorization flow.
//! The store loads the file, refreshes the access token against the stored
//! token endpoint when it has expired, and persists the refreshed token so
//! subsequent runs skip the refresh.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AuthError, AuthResult};

/// OAuth scope required to overwrite spreadsheet ranges.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens within this margin of expiry are refreshed eagerly, so a token
/// does not expire between the freshness check and the API call.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The persisted token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl StoredCredentials {
    /// Whether the access token is still usable at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_MARGIN_SECS) > now,
            // No recorded expiry: assume usable and let the API reject it.
            None => true,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

/// Successful response of the `refresh_token` grant.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Scoped token store injected into the publisher.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    token_path: PathBuf,
}

impl CredentialStore {
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Load the token file.
    pub fn load(&self) -> AuthResult<StoredCredentials> {
        if !self.token_path.exists() {
            return Err(AuthError::MissingToken(self.token_path.clone()));
        }

        let content =
            std::fs::read_to_string(&self.token_path).map_err(|e| AuthError::InvalidToken {
                path: self.token_path.clone(),
                message: e.to_string(),
            })?;

        serde_json::from_str(&content).map_err(|e| AuthError::InvalidToken {
            path: self.token_path.clone(),
            message: e.to_string(),
        })
    }

    /// Persist credentials back to the token file.
    pub fn save(&self, creds: &StoredCredentials) -> AuthResult<()> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AuthError::SaveFailed {
                    path: self.token_path.clone(),
                    message: e.to_string(),
                })?;
            }
        }

        let content = serde_json::to_string_pretty(creds).map_err(|e| AuthError::SaveFailed {
            path: self.token_path.clone(),
            message: e.to_string(),
        })?;

        std::fs::write(&self.token_path, content).map_err(|e| AuthError::SaveFailed {
            path: self.token_path.clone(),
            message: e.to_string(),
        })
    }

    /// Return a usable bearer token, refreshing and persisting when expired.
    pub async fn access_token(&self, http: &reqwest::Client) -> AuthResult<String> {
        let mut creds = self.load()?;

        if creds.is_fresh() {
            return Ok(creds.access_token);
        }

        info!(path = %self.token_path.display(), "access token expired, refreshing");
        let refresh_token = creds
            .refresh_token
            .clone()
            .ok_or(AuthError::Unrefreshable)?;

        let response = http
            .post(&creds.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::RefreshFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let refreshed: RefreshResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        creds.access_token = refreshed.access_token;
        creds.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        self.save(&creds)?;

        info!("access token refreshed and saved");
        Ok(creds.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(expiry: Option<DateTime<Utc>>) -> StoredCredentials {
        StoredCredentials {
            access_token: "ya29.test".into(),
            refresh_token: Some("1//refresh".into()),
            client_id: "client".into(),
            client_secret: "secret".into(),
            token_uri: DEFAULT_TOKEN_URI.into(),
            expiry,
            scopes: vec![SPREADSHEETS_SCOPE.into()],
        }
    }

    #[test]
    fn test_freshness_with_margin() {
        let now = Utc::now();

        let fresh = creds(Some(now + Duration::hours(1)));
        assert!(fresh.is_fresh_at(now));

        let expired = creds(Some(now - Duration::hours(1)));
        assert!(!expired.is_fresh_at(now));

        // Inside the refresh margin counts as expired.
        let nearly = creds(Some(now + Duration::seconds(30)));
        assert!(!nearly.is_fresh_at(now));
    }

    #[test]
    fn test_no_expiry_assumed_fresh() {
        assert!(creds(None).is_fresh_at(Utc::now()));
    }

    #[test]
    fn test_missing_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        let err = store.load().unwrap_err();
        assert!(matches!(err, AuthError::MissingToken(_)));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        let original = creds(Some(Utc::now() + Duration::hours(1)));
        store.save(&original).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token, original.access_token);
        assert_eq!(loaded.refresh_token, original.refresh_token);
        assert_eq!(loaded.scopes, original.scopes);
    }

    #[test]
    fn test_invalid_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let store = CredentialStore::new(path);
        assert!(matches!(
            store.load(),
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_token_uri_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"access_token":"t","client_id":"c","client_secret":"s"}"#,
        )
        .unwrap();

        let loaded = CredentialStore::new(path).load().unwrap();
        assert_eq!(loaded.token_uri, DEFAULT_TOKEN_URI);
        assert!(loaded.refresh_token.is_none());
    }
}

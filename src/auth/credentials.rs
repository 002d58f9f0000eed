//! Per-user Google OAuth2 credentials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 credentials with access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// The access token for API requests
    pub access_token: String,

    /// The refresh token for obtaining new access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// When the access token expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Whether the user finished linking Google Classroom
    #[serde(default = "default_connected")]
    pub classroom_connected: bool,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_connected() -> bool {
    true
}

impl Credentials {
    /// Create new credentials from token response
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            Utc::now() + chrono::Duration::seconds(secs)
        });

        Self {
            access_token,
            refresh_token,
            token_type: default_token_type(),
            expires_at,
            scope: None,
            classroom_connected: true,
        }
    }

    /// Check if the access token is expired or about to expire
    ///
    /// Returns true if the token expires within the next 5 minutes
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => {
                let buffer = chrono::Duration::minutes(5);
                Utc::now() + buffer >= expires
            }
            None => false,
        }
    }

    /// Check if we have a refresh token
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Merge a refresh result. Google omits the refresh token on most
    /// refreshes, so the old one is kept unless a new one was issued.
    pub fn rotate(&self, rotated: Credentials) -> Credentials {
        Credentials {
            refresh_token: rotated.refresh_token.or_else(|| self.refresh_token.clone()),
            scope: rotated.scope.or_else(|| self.scope.clone()),
            classroom_connected: self.classroom_connected,
            ..rotated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_not_expired() {
        let creds = Credentials::new(
            "test_token".to_string(),
            Some("refresh".to_string()),
            Some(3600),
        );
        assert!(!creds.is_expired());
    }

    #[test]
    fn test_credentials_expired() {
        let mut creds = Credentials::new(
            "test_token".to_string(),
            Some("refresh".to_string()),
            Some(0),
        );
        creds.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        assert!(creds.is_expired());
    }

    #[test]
    fn test_credentials_expiring_soon() {
        let creds = Credentials::new(
            "test_token".to_string(),
            Some("refresh".to_string()),
            Some(120),
        );
        assert!(creds.is_expired());
    }

    #[test]
    fn test_credentials_no_expiry() {
        let creds = Credentials::new("test".to_string(), None, None);
        assert!(!creds.is_expired());
        assert!(!creds.can_refresh());
    }

    #[test]
    fn test_rotate_keeps_refresh_token() {
        let old = Credentials::new("old".to_string(), Some("r1".to_string()), Some(10));
        let rotated = old.rotate(Credentials::new("new".to_string(), None, Some(3600)));
        assert_eq!(rotated.access_token, "new");
        assert_eq!(rotated.refresh_token.as_deref(), Some("r1"));

        let rotated = old.rotate(Credentials::new("new".to_string(), Some("r2".to_string()), None));
        assert_eq!(rotated.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn test_missing_connected_flag_defaults_true() {
        let creds: Credentials = serde_json::from_str(r#"{"access_token": "a"}"#).unwrap();
        assert!(creds.classroom_connected);
        assert_eq!(creds.token_type, "Bearer");
    }
}

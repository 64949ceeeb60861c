use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Credentials used to call the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub success: bool,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Absolute expiration instant, `None` means the token does not expire.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// A token representing "no credentials yet".
    pub fn empty() -> Self {
        Self {
            success: false,
            access_token: String::new(),
            refresh_token: None,
            id_token: None,
            expires_at: None,
        }
    }

    /// A successful bearer token, optionally expiring `expires_in_secs` from now.
    pub fn bearer(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        Self {
            success: true,
            access_token: access_token.into(),
            refresh_token,
            id_token: None,
            expires_at: expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Valid iff the token was issued successfully, is not expired and is non-empty.
    pub fn is_valid(&self) -> bool {
        self.success && !self.is_expired() && !self.access_token.is_empty()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl Default for AuthToken {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_token_is_invalid() {
        let token = AuthToken::empty();
        assert!(!token.is_valid());
        assert!(!token.can_refresh());
    }

    #[test]
    fn test_bearer_token_valid() {
        let token = AuthToken::bearer("abc", Some("refresh".to_string()), Some(3600));
        assert!(token.is_valid());
        assert!(token.can_refresh());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expired_token_invalid() {
        let mut token = AuthToken::bearer("abc", None, None);
        token.expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(token.is_expired());
        assert!(!token.is_valid());
    }

    #[test]
    fn test_unsuccessful_or_blank_token_invalid() {
        let mut token = AuthToken::bearer("abc", None, None);
        token.success = false;
        assert!(!token.is_valid());

        let blank = AuthToken::bearer("", None, None);
        assert!(!blank.is_valid());
    }

    #[test]
    fn test_token_serialization() {
        let token = AuthToken::bearer("abc", Some("r".to_string()), Some(60));
        let json = serde_json::to_string(&token).unwrap();
        let parsed: AuthToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, token);
    }
}

//! Signed tokens for the stateless sign-in flow.
//!
//! Two token kinds pass through here: assertions issued by the identity
//! provider (verified with the shared SSO secret) and our own stateless
//! session tokens (signed with the token secret). Both are HS256 and carry an
//! expiry that is always validated.

use anyhow::{Context, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::state::AuthConfig;

/// Claims of a stateless session token issued by us.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct SessionClaims {
    pub(super) sub: String,
    pub(super) email: String,
    pub(super) name: Option<String>,
    pub(super) iat: i64,
    pub(super) exp: i64,
}

/// Claims of a provider assertion: subject, tenant, and profile basics.
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ProviderAssertion {
    pub(super) oid: String,
    pub(super) tid: String,
    pub(super) email: String,
    pub(super) name: Option<String>,
    pub(super) exp: i64,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

/// Issue a stateless session token valid for the configured session TTL.
pub(super) fn issue_session_token(
    config: &AuthConfig,
    user_id: &str,
    email: &str,
    name: Option<&str>,
) -> Result<String> {
    let now = unix_now();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        name: name.map(str::to_string),
        iat: now,
        exp: now.saturating_add(config.session_ttl_seconds()),
    };
    let key = EncodingKey::from_secret(config.token_secret().expose_secret().as_bytes());
    encode(&Header::default(), &claims, &key).context("failed to sign session token")
}

/// Decode a stateless session token. Invalid signatures, garbage input, and
/// expired tokens all come back as `None`.
pub(super) fn decode_session_token(config: &AuthConfig, token: &str) -> Option<SessionClaims> {
    let key = DecodingKey::from_secret(config.token_secret().expose_secret().as_bytes());
    decode::<SessionClaims>(token, &key, &Validation::default())
        .map(|data| data.claims)
        .ok()
}

/// Verify a provider assertion against the shared SSO secret.
pub(super) fn decode_provider_assertion(
    config: &AuthConfig,
    assertion: &str,
) -> Option<ProviderAssertion> {
    let key = DecodingKey::from_secret(config.sso_secret().expose_secret().as_bytes());
    decode::<ProviderAssertion>(assertion, &key, &Validation::default())
        .map(|data| data.claims)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_config() -> AuthConfig {
        AuthConfig::new(
            "https://teambase.dev".to_string(),
            SecretString::from("token-secret"),
            SecretString::from("sso-secret"),
        )
    }

    #[test]
    fn session_token_round_trips() {
        let config = test_config();
        let token = issue_session_token(&config, "user-1", "alice@example.com", Some("Alice"))
            .expect("token");
        let claims = decode_session_token(&config, &token).expect("claims");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn session_token_rejects_wrong_secret() {
        let config = test_config();
        let other = AuthConfig::new(
            "https://teambase.dev".to_string(),
            SecretString::from("different-secret"),
            SecretString::from("sso-secret"),
        );
        let token =
            issue_session_token(&config, "user-1", "alice@example.com", None).expect("token");
        assert!(decode_session_token(&other, &token).is_none());
        assert!(decode_session_token(&config, "garbage").is_none());
    }

    #[test]
    fn provider_assertion_round_trips() {
        let config = test_config();
        let claims = ProviderAssertion {
            oid: "subject-1".to_string(),
            tid: "tenant-1".to_string(),
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            exp: unix_now() + 300,
        };
        let key = EncodingKey::from_secret(b"sso-secret");
        let assertion = encode(&Header::default(), &claims, &key).expect("assertion");
        let decoded = decode_provider_assertion(&config, &assertion).expect("decoded");
        assert_eq!(decoded.oid, "subject-1");
        assert_eq!(decoded.tid, "tenant-1");
    }

    #[test]
    fn provider_assertion_rejects_expired() {
        let config = test_config();
        let claims = ProviderAssertion {
            oid: "subject-1".to_string(),
            tid: "tenant-1".to_string(),
            email: "alice@example.com".to_string(),
            name: None,
            exp: unix_now() - 300,
        };
        let key = EncodingKey::from_secret(b"sso-secret");
        let assertion = encode(&Header::default(), &claims, &key).expect("assertion");
        assert!(decode_provider_assertion(&config, &assertion).is_none());
    }

    #[test]
    fn provider_assertion_rejects_session_secret() {
        // An assertion signed with the session token secret must not verify.
        let config = test_config();
        let claims = ProviderAssertion {
            oid: "subject-1".to_string(),
            tid: "tenant-1".to_string(),
            email: "alice@example.com".to_string(),
            name: None,
            exp: unix_now() + 300,
        };
        let key = EncodingKey::from_secret(b"token-secret");
        let assertion = encode(&Header::default(), &claims, &key).expect("assertion");
        assert!(decode_provider_assertion(&config, &assertion).is_none());
    }
}

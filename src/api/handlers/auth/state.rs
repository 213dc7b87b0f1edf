//! Auth state and configuration.

use secrecy::SecretString;
use std::sync::Arc;

use super::rate_limit::RateLimiter;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_SESSION_REFRESH_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_COMPANY_NAME: &str = "Teambase";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    base_url: String,
    company_name: String,
    token_secret: SecretString,
    sso_secret: SecretString,
    session_ttl_seconds: i64,
    session_refresh_seconds: i64,
    reset_token_ttl_seconds: i64,
    test_login_enabled: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String, token_secret: SecretString, sso_secret: SecretString) -> Self {
        Self {
            base_url,
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            token_secret,
            sso_secret,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_refresh_seconds: DEFAULT_SESSION_REFRESH_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            test_login_enabled: false,
        }
    }

    #[must_use]
    pub fn with_company_name(mut self, company_name: String) -> Self {
        self.company_name = company_name;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_refresh_seconds(mut self, seconds: i64) -> Self {
        self.session_refresh_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_test_login_enabled(mut self, enabled: bool) -> Self {
        self.test_login_enabled = enabled;
        self
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn company_name(&self) -> &str {
        &self.company_name
    }

    pub(super) fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    pub(super) fn sso_secret(&self) -> &SecretString {
        &self.sso_secret
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) fn session_refresh_seconds(&self) -> i64 {
        self.session_refresh_seconds
    }

    pub(crate) fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    pub(super) fn test_login_enabled(&self) -> bool {
        self.test_login_enabled
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            config,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}

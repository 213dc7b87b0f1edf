use crate::api::{
    self, LogEmailSender, Mailer,
    handlers::auth::{AuthConfig, FixedWindowRateLimiter, NoopRateLimiter, RateLimiter},
};
use anyhow::Result;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub base_url: String,
    pub company_name: String,
    pub token_secret: SecretString,
    pub sso_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub session_refresh_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub rate_limit_per_minute: u32,
    pub test_login: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.base_url, args.token_secret, args.sso_secret)
        .with_company_name(args.company_name)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_refresh_seconds(args.session_refresh_seconds)
        .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds)
        .with_test_login_enabled(args.test_login);

    // A zero budget disables limiting, which is useful for load tests.
    let rate_limiter: Arc<dyn RateLimiter> = if args.rate_limit_per_minute == 0 {
        Arc::new(NoopRateLimiter)
    } else {
        Arc::new(FixedWindowRateLimiter::new(
            Duration::from_secs(60),
            args.rate_limit_per_minute,
        ))
    };

    let mailer: Mailer = Arc::new(LogEmailSender);

    api::new(args.port, args.dsn, auth_config, rate_limiter, mailer).await
}

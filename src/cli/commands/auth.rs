//! Auth and session related CLI arguments.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use secrecy::SecretString;

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_COMPANY_NAME: &str = "company-name";
pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_SSO_SECRET: &str = "sso-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_REFRESH_SECONDS: &str = "session-refresh-seconds";
pub const ARG_RESET_TOKEN_TTL_SECONDS: &str = "reset-token-ttl-seconds";
pub const ARG_RATE_LIMIT_PER_MINUTE: &str = "rate-limit-per-minute";
pub const ARG_TEST_LOGIN: &str = "test-login";

/// Parsed auth CLI options consumed by the server action.
#[derive(Debug)]
pub struct Options {
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

impl Options {
    /// Extract auth options from parsed CLI matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let base_url = matches
            .get_one::<String>(ARG_BASE_URL)
            .cloned()
            .context("missing required argument: --base-url")?;
        let company_name = matches
            .get_one::<String>(ARG_COMPANY_NAME)
            .cloned()
            .context("missing required argument: --company-name")?;
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --token-secret")?;
        let sso_secret = matches
            .get_one::<String>(ARG_SSO_SECRET)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --sso-secret")?;

        Ok(Self {
            base_url,
            company_name,
            token_secret,
            sso_secret,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(30 * 24 * 60 * 60),
            session_refresh_seconds: matches
                .get_one::<i64>(ARG_SESSION_REFRESH_SECONDS)
                .copied()
                .unwrap_or(24 * 60 * 60),
            reset_token_ttl_seconds: matches
                .get_one::<i64>(ARG_RESET_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(30 * 60),
            rate_limit_per_minute: matches
                .get_one::<u32>(ARG_RATE_LIMIT_PER_MINUTE)
                .copied()
                .unwrap_or(10),
            test_login: matches.get_flag(ARG_TEST_LOGIN),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long(ARG_BASE_URL)
                .help("Frontend base URL used for cookies, CORS, and email links")
                .default_value("http://localhost:3000")
                .env("TEAMBASE_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_COMPANY_NAME)
                .long(ARG_COMPANY_NAME)
                .help("Company name used in outbound emails")
                .default_value("Teambase")
                .env("TEAMBASE_COMPANY_NAME"),
        )
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign stateless session tokens")
                .env("TEAMBASE_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SSO_SECRET)
                .long(ARG_SSO_SECRET)
                .help("Shared secret used to verify identity provider assertions")
                .env("TEAMBASE_SSO_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .default_value("2592000")
                .env("TEAMBASE_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SESSION_REFRESH_SECONDS)
                .long(ARG_SESSION_REFRESH_SECONDS)
                .help("Idle age after which an active session has its expiry extended")
                .default_value("86400")
                .env("TEAMBASE_SESSION_REFRESH_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_SECONDS)
                .long(ARG_RESET_TOKEN_TTL_SECONDS)
                .help("Password reset token lifetime in seconds")
                .default_value("1800")
                .env("TEAMBASE_RESET_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_PER_MINUTE)
                .long(ARG_RATE_LIMIT_PER_MINUTE)
                .help("Per-IP request budget per minute for sensitive auth routes (0 disables)")
                .default_value("10")
                .env("TEAMBASE_RATE_LIMIT_PER_MINUTE")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_TEST_LOGIN)
                .long(ARG_TEST_LOGIN)
                .help("Allow the debug-only test login shortcut (never available in release builds)")
                .env("TEAMBASE_TEST_LOGIN")
                .action(ArgAction::SetTrue),
        )
}

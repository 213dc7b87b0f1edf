//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        base_url: auth_opts.base_url,
        company_name: auth_opts.company_name,
        token_secret: auth_opts.token_secret,
        sso_secret: auth_opts.sso_secret,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        session_refresh_seconds: auth_opts.session_refresh_seconds,
        reset_token_ttl_seconds: auth_opts.reset_token_ttl_seconds,
        rate_limit_per_minute: auth_opts.rate_limit_per_minute,
        test_login: auth_opts.test_login,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars([("TEAMBASE_TEST_LOGIN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec![
                "teambase",
                "--dsn",
                "postgres://user@localhost:5432/teambase",
                "--token-secret",
                "token-secret",
                "--sso-secret",
                "sso-secret",
                "--base-url",
                "https://teambase.dev",
            ]);
            let action = handler(&matches);
            assert!(action.is_ok());
            if let Ok(Action::Server(args)) = action {
                assert_eq!(args.port, 8080);
                assert_eq!(args.base_url, "https://teambase.dev");
                assert_eq!(args.session_ttl_seconds, 2_592_000);
                assert_eq!(args.session_refresh_seconds, 86_400);
                assert_eq!(args.reset_token_ttl_seconds, 1800);
                assert_eq!(args.rate_limit_per_minute, 10);
                assert!(!args.test_login);
            }
        });
    }

    #[test]
    fn dsn_required() {
        temp_env::with_vars([("TEAMBASE_DSN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let result = command.try_get_matches_from(vec![
                "teambase",
                "--token-secret",
                "token-secret",
                "--sso-secret",
                "sso-secret",
            ]);
            assert!(result.is_err());
        });
    }
}

//! # Teambase (Team Management & Authentication API)
//!
//! `teambase` is the authentication and team-management backend. It handles
//! credentials and federated sign-in, database-backed sessions, and
//! team-scoped authorization.
//!
//! ## Tenant Model (Teams)
//!
//! Teams are the tenant boundary. Every user belongs to at most one team, and
//! team membership carries a role (`owner`, `admin`, `member`). Authorization
//! is derived from the caller's role in their own team; cross-team access is
//! never granted.
//!
//! ## Authentication
//!
//! Two sign-in flows are supported and selected explicitly per route:
//!
//! - **Credentials:** email + password (argon2id at rest) resolving to a
//!   database-backed session. The browser holds an opaque cookie token; the
//!   database stores only its SHA-256 hash.
//! - **Federated:** a provider assertion (signed JWT carrying subject and
//!   tenant ids) is exchanged for a stateless signed token. Provider subjects
//!   are mapped to local users on every sign-in, creating teams and
//!   memberships as needed.
//!
//! ## Authorization & Membership
//!
//! Roles are ordered: `owner` outranks `admin`, which outranks `member`.
//! Write operations on the team require at least `admin`. Member removal is
//! additionally constrained: owners can only remove themselves, and admins
//! can only be removed by an owner.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}

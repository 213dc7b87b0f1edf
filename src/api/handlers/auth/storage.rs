//! Database helpers for sessions, identities, and reset tokens.

use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::guard::Role;
use super::utils::{generate_session_token, hash_opaque_token, is_unique_violation};

/// Minimal data returned for a valid session cookie.
pub(crate) struct SessionRecord {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
}

/// User row joined with the role held in their own team.
pub(crate) struct ContextRow {
    pub(crate) id: Uuid,
    pub(crate) name: Option<String>,
    pub(crate) email: String,
    pub(crate) image: Option<String>,
    pub(crate) team_id: Option<String>,
    pub(crate) role: Option<i32>,
}

/// Fields needed to verify a credentials sign-in.
pub(super) struct CredentialRow {
    pub(super) user_id: Uuid,
    pub(super) email: String,
    pub(super) name: Option<String>,
    pub(super) password_hash: Option<String>,
}

/// Verified identity fields from a provider assertion.
pub(super) struct FederatedProfile<'a> {
    pub(super) subject: &'a str,
    pub(super) tenant: &'a str,
    pub(super) email: &'a str,
    pub(super) name: Option<&'a str>,
}

pub(super) async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let query = r"
        INSERT INTO user_sessions (user_id, session_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_opaque_token(&token);
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Resolve a session token hash to its user, refreshing the sliding window.
///
/// Expired rows are filtered in SQL. Sessions seen within the refresh age only
/// get `last_seen_at` bumped; older ones also have their expiry extended to a
/// full TTL from now.
pub(super) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
    refresh_seconds: i64,
    ttl_seconds: i64,
) -> Result<Option<SessionRecord>> {
    let query = r"
        SELECT users.id, users.email
        FROM user_sessions
        JOIN users ON users.id = user_sessions.user_id
        WHERE user_sessions.session_hash = $1
          AND user_sessions.expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    if row.is_none() {
        return Ok(None);
    }

    let query = r"
        UPDATE user_sessions
        SET expires_at = CASE
                WHEN last_seen_at IS NULL
                  OR last_seen_at < NOW() - ($2 * INTERVAL '1 second')
                THEN NOW() + ($3 * INTERVAL '1 second')
                ELSE expires_at
            END,
            last_seen_at = NOW()
        WHERE session_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .bind(refresh_seconds)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to refresh session")?;

    Ok(row.map(|row| SessionRecord {
        user_id: row.get("id"),
        email: row.get("email"),
    }))
}

pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM user_sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

pub(crate) async fn fetch_context(pool: &PgPool, email: &str) -> Result<Option<ContextRow>> {
    // Role is joined against the user's own team; roles held in other teams
    // (stale rows) never leak into the context.
    let query = r"
        SELECT users.id, users.name, users.email, users.image, users.team_id, team_roles.role
        FROM users
        LEFT JOIN team_roles
          ON team_roles.user_id = users.id
         AND team_roles.team_id = users.team_id
        WHERE users.email = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch user context")?;

    Ok(row.map(|row| ContextRow {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        image: row.get("image"),
        team_id: row.get("team_id"),
        role: row.get("role"),
    }))
}

/// Create a missing membership role row. Returns whether a row was inserted.
pub(super) async fn ensure_member_role(
    pool: &PgPool,
    user_id: Uuid,
    team_id: &str,
) -> Result<bool> {
    let query = r"
        INSERT INTO team_roles (user_id, team_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, team_id) DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(team_id)
        .bind(Role::Member.rank())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert membership role")?;
    Ok(result.rows_affected() > 0)
}

/// Apply the allow-listed profile fields from a session update trigger.
pub(super) async fn update_profile(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    image: Option<&str>,
    notification_settings: Option<&serde_json::Value>,
) -> Result<()> {
    let settings = notification_settings
        .map(serde_json::to_string)
        .transpose()
        .context("failed to serialize notification settings")?;

    let query = r"
        UPDATE users
        SET name = COALESCE($1, name),
            image = COALESCE($2, image),
            notification_settings = COALESCE($3::jsonb, notification_settings),
            updated_at = NOW()
        WHERE email = $4
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(name)
        .bind(image)
        .bind(settings)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update profile")?;
    Ok(())
}

pub(super) async fn lookup_credentials(
    pool: &PgPool,
    email: &str,
) -> Result<Option<CredentialRow>> {
    let query = r"
        SELECT id, email, name, password_hash
        FROM users
        WHERE email = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup credentials")?;

    Ok(row.map(|row| CredentialRow {
        user_id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
    }))
}

/// Replace the stored password hash. Returns the number of updated rows,
/// which is 0 when no user exists for the email.
pub(super) async fn update_password(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<u64> {
    let query = r"
        UPDATE users
        SET password_hash = $1,
            updated_at = NOW()
        WHERE email = $2
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(password_hash)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(result.rows_affected())
}

pub(super) enum FederatedOutcome {
    Upserted(Uuid),
    /// The email already belongs to an account without a provider subject.
    EmailInUse,
}

/// Map a verified provider assertion to a local user, creating the team and
/// membership as needed. Safe to repeat: re-running with the same assertion
/// leaves the store unchanged.
///
/// The first sign-in that creates the team grants `Owner`; later sign-ins
/// ensure at least `Member` without touching an existing role.
pub(super) async fn upsert_federated_identity(
    pool: &PgPool,
    profile: &FederatedProfile<'_>,
) -> Result<FederatedOutcome> {
    let mut tx = pool.begin().await.context("begin federated transaction")?;

    let query = r"
        INSERT INTO teams (id, name)
        VALUES ($1, NULL)
        ON CONFLICT (id) DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(profile.tenant)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to upsert team")?;
    let team_created = result.rows_affected() > 0;

    let query = r"
        INSERT INTO users (email, name, team_id, provider_subject, email_verified_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (provider_subject) DO UPDATE
        SET email = EXCLUDED.email,
            name = COALESCE(EXCLUDED.name, users.name),
            team_id = EXCLUDED.team_id,
            updated_at = NOW()
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    // The conflict target is the provider subject; a credentials-only account
    // holding the same email trips the email unique index instead.
    let row = sqlx::query(query)
        .bind(profile.email)
        .bind(profile.name)
        .bind(profile.tenant)
        .bind(profile.subject)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await;
    let user_id: Uuid = match row {
        Ok(row) => row.get("id"),
        Err(err) if is_unique_violation(&err) => return Ok(FederatedOutcome::EmailInUse),
        Err(err) => return Err(err).context("failed to upsert federated user"),
    };

    let role = if team_created {
        Role::Owner
    } else {
        Role::Member
    };
    let query = r"
        INSERT INTO team_roles (user_id, team_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, team_id) DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(profile.tenant)
        .bind(role.rank())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to upsert membership role")?;

    tx.commit().await.context("commit federated transaction")?;

    Ok(FederatedOutcome::Upserted(user_id))
}

pub(super) async fn user_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let query = "SELECT 1 AS present FROM users WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user")?;
    Ok(row.is_some())
}

/// Single-liveness reset token: any previous tokens for the email are dropped
/// before the new hash is stored.
pub(super) async fn replace_reset_token(
    pool: &PgPool,
    email: &str,
    token_hash: &[u8],
    ttl_seconds: i64,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let query = "DELETE FROM reset_password_tokens WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete old reset tokens")?;

    let query = r"
        INSERT INTO reset_password_tokens (email, token_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert reset token")?;

    tx.commit().await.context("commit reset transaction")?;
    Ok(())
}

pub(super) async fn reset_token_valid(
    pool: &PgPool,
    email: &str,
    token_hash: &[u8],
) -> Result<bool> {
    let query = r"
        SELECT 1 AS present
        FROM reset_password_tokens
        WHERE email = $1
          AND token_hash = $2
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup reset token")?;
    Ok(row.is_some())
}

pub(super) async fn delete_reset_tokens(pool: &PgPool, email: &str) -> Result<()> {
    let query = "DELETE FROM reset_password_tokens WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete reset tokens")?;
    Ok(())
}

/// Provision the shared test-login fixture user (debug builds only).
#[cfg(debug_assertions)]
pub(super) async fn provision_test_user(pool: &PgPool, email: &str, role: Role) -> Result<Uuid> {
    let mut tx = pool.begin().await.context("begin test-login transaction")?;

    let query = r"
        INSERT INTO teams (id, name)
        VALUES ('test', 'Test team')
        ON CONFLICT (id) DO NOTHING
    ";
    sqlx::query(query)
        .execute(&mut *tx)
        .await
        .context("failed to upsert test team")?;

    let query = r"
        INSERT INTO users (email, name, team_id, email_verified_at)
        VALUES ($1, 'John Doe', 'test', NOW())
        ON CONFLICT (email) DO UPDATE
        SET team_id = 'test',
            updated_at = NOW()
        RETURNING id
    ";
    let row = sqlx::query(query)
        .bind(email)
        .fetch_one(&mut *tx)
        .await
        .context("failed to upsert test user")?;
    let user_id: Uuid = row.get("id");

    let query = r"
        INSERT INTO team_roles (user_id, team_id, role)
        VALUES ($1, 'test', $2)
        ON CONFLICT (user_id, team_id) DO NOTHING
    ";
    sqlx::query(query)
        .bind(user_id)
        .bind(role.rank())
        .execute(&mut *tx)
        .await
        .context("failed to upsert test role")?;

    tx.commit().await.context("commit test-login transaction")?;
    Ok(user_id)
}

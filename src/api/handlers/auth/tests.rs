//! Auth storage tests against a real Postgres.

use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::storage::{
    FederatedOutcome, FederatedProfile, delete_reset_tokens, delete_session, insert_session,
    lookup_session, replace_reset_token, reset_token_valid, upsert_federated_identity,
};
use super::utils::hash_opaque_token;
use crate::api::handlers::test_db::TestDb;

async fn seed_user(pool: &PgPool, email: &str) -> Result<Uuid> {
    let row = sqlx::query("INSERT INTO users (email, name) VALUES ($1, $1) RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(row.get("id"))
}

async fn role_rank(pool: &PgPool, user_id: Uuid, team_id: &str) -> Result<Option<i32>> {
    let row = sqlx::query("SELECT role FROM team_roles WHERE user_id = $1 AND team_id = $2")
        .bind(user_id)
        .bind(team_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("role")))
}

#[tokio::test]
async fn federated_signin_is_idempotent() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let profile = FederatedProfile {
        subject: "subject-1",
        tenant: "tenant-1",
        email: "alice@example.com",
        name: Some("Alice"),
    };

    let first = upsert_federated_identity(&db.pool, &profile).await?;
    let FederatedOutcome::Upserted(user_id) = first else {
        panic!("expected upsert");
    };
    // Creating the team makes the first user its owner.
    assert_eq!(role_rank(&db.pool, user_id, "tenant-1").await?, Some(0));

    let second = upsert_federated_identity(&db.pool, &profile).await?;
    let FederatedOutcome::Upserted(repeat_id) = second else {
        panic!("expected upsert");
    };
    assert_eq!(repeat_id, user_id);
    assert_eq!(role_rank(&db.pool, user_id, "tenant-1").await?, Some(0));

    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
        .fetch_one(&db.pool)
        .await?
        .get("n");
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn federated_signin_joins_existing_team_as_member() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let owner = FederatedProfile {
        subject: "subject-1",
        tenant: "tenant-1",
        email: "alice@example.com",
        name: Some("Alice"),
    };
    upsert_federated_identity(&db.pool, &owner).await?;

    let joiner = FederatedProfile {
        subject: "subject-2",
        tenant: "tenant-1",
        email: "bob@example.com",
        name: None,
    };
    let outcome = upsert_federated_identity(&db.pool, &joiner).await?;
    let FederatedOutcome::Upserted(user_id) = outcome else {
        panic!("expected upsert");
    };
    assert_eq!(role_rank(&db.pool, user_id, "tenant-1").await?, Some(2));
    Ok(())
}

#[tokio::test]
async fn federated_signin_rejects_taken_email() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    sqlx::query("INSERT INTO users (email, password_hash) VALUES ($1, 'hash')")
        .bind("alice@example.com")
        .execute(&db.pool)
        .await?;

    let profile = FederatedProfile {
        subject: "subject-1",
        tenant: "tenant-1",
        email: "alice@example.com",
        name: Some("Alice"),
    };
    let outcome = upsert_federated_identity(&db.pool, &profile).await?;
    assert!(matches!(outcome, FederatedOutcome::EmailInUse));

    // The whole transaction rolls back, including the team row.
    let team = sqlx::query("SELECT 1 AS present FROM teams WHERE id = 'tenant-1'")
        .fetch_optional(&db.pool)
        .await?;
    assert!(team.is_none());
    Ok(())
}

#[tokio::test]
async fn session_lookup_filters_expired_rows() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let user_id = seed_user(&db.pool, "alice@example.com").await?;

    let expired = insert_session(&db.pool, user_id, -1).await?;
    let expired_hash = hash_opaque_token(&expired);
    assert!(
        lookup_session(&db.pool, &expired_hash, 86_400, 2_592_000)
            .await?
            .is_none()
    );

    let token = insert_session(&db.pool, user_id, 3_600).await?;
    let token_hash = hash_opaque_token(&token);
    let record = lookup_session(&db.pool, &token_hash, 86_400, 2_592_000)
        .await?
        .ok_or_else(|| anyhow::anyhow!("session should resolve"))?;
    assert_eq!(record.user_id, user_id);
    assert_eq!(record.email, "alice@example.com");

    delete_session(&db.pool, &token_hash).await?;
    assert!(
        lookup_session(&db.pool, &token_hash, 86_400, 2_592_000)
            .await?
            .is_none()
    );
    Ok(())
}

#[tokio::test]
async fn reset_token_replacement_invalidates_previous() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = "alice@example.com";
    let first_hash = hash_opaque_token("first-token");
    let second_hash = hash_opaque_token("second-token");

    replace_reset_token(&db.pool, email, &first_hash, 1_800).await?;
    assert!(reset_token_valid(&db.pool, email, &first_hash).await?);

    replace_reset_token(&db.pool, email, &second_hash, 1_800).await?;
    assert!(!reset_token_valid(&db.pool, email, &first_hash).await?);
    assert!(reset_token_valid(&db.pool, email, &second_hash).await?);

    delete_reset_tokens(&db.pool, email).await?;
    assert!(!reset_token_valid(&db.pool, email, &second_hash).await?);
    Ok(())
}

#[tokio::test]
async fn reset_token_expiry_enforced() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = "alice@example.com";
    let token_hash = hash_opaque_token("stale-token");
    replace_reset_token(&db.pool, email, &token_hash, -1).await?;
    assert!(!reset_token_valid(&db.pool, email, &token_hash).await?);
    Ok(())
}

//! Session endpoints for cookie and bearer auth.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};

use super::super::{internal_error, unauthenticated};
use super::guard::Role;
use super::principal::resolve_context;
use super::state::AuthState;
use super::storage::{delete_session, ensure_member_role, fetch_context, update_profile};
use super::types::{AuthContext, SessionUpdateRequest};
use super::utils::hash_opaque_token;

const SESSION_COOKIE_NAME: &str = "teambase_session";

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = AuthContext),
        (status = 401, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match resolve_context(&headers, &pool, &auth_state).await {
        Ok(Some(context)) => (StatusCode::OK, Json(context)).into_response(),
        Ok(None) => unauthenticated(),
        Err(err) => {
            error!("Failed to resolve session: {err}");
            internal_error()
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/auth/session",
    request_body = SessionUpdateRequest,
    responses(
        (status = 200, description = "Profile updated; refreshed context returned", body = AuthContext),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn update_session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SessionUpdateRequest>>,
) -> impl IntoResponse {
    let context = match resolve_context(&headers, &pool, &auth_state).await {
        Ok(Some(context)) => context,
        Ok(None) => return unauthenticated(),
        Err(err) => {
            error!("Failed to resolve session: {err}");
            return internal_error();
        }
    };

    // Only name, image, and notification settings are writable here. Role,
    // team, and email never change through the session endpoint.
    if let Some(Json(update)) = payload {
        let result = update_profile(
            &pool,
            &context.email,
            update.name.as_deref(),
            update.image.as_deref(),
            update.notification_settings.as_ref(),
        )
        .await;
        if let Err(err) = result {
            error!("Failed to update profile: {err}");
            return internal_error();
        }
    }

    match materialize_context(&pool, &context.email).await {
        Ok(Some(context)) => (StatusCode::OK, Json(context)).into_response(),
        Ok(None) => unauthenticated(),
        Err(err) => {
            error!("Failed to materialize context: {err}");
            internal_error()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_cookie(&headers) {
        let token_hash = hash_opaque_token(&token);
        if let Err(err) = delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Load the caller context for an email, repairing a missing role row.
///
/// A user attached to a team without a role row is an inconsistency left by
/// older writes; it is logged and healed to a plain membership on read.
pub(super) async fn materialize_context(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AuthContext>> {
    let Some(row) = fetch_context(pool, email).await? else {
        return Ok(None);
    };

    let mut role = row.role;
    if role.is_none() {
        if let Some(team_id) = row.team_id.as_deref() {
            warn!("User {} in team {team_id} has no role, repairing", row.id);
            ensure_member_role(pool, row.id, team_id).await?;
            role = Some(Role::Member.rank());
        }
    }

    Ok(Some(AuthContext {
        id: row.id.to_string(),
        name: row.name,
        email: row.email,
        image: row.image,
        role,
        team_id: row.team_id,
    }))
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    auth_state: &AuthState,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = auth_state.config().session_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = auth_state.config().session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(
    auth_config: &super::state::AuthConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = auth_config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

pub(super) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::rate_limit::NoopRateLimiter;
    use crate::api::handlers::auth::state::AuthConfig;
    use secrecy::SecretString;

    fn test_state(base_url: &str) -> AuthState {
        AuthState::new(
            AuthConfig::new(
                base_url.to_string(),
                SecretString::from("token-secret"),
                SecretString::from("sso-secret"),
            ),
            Arc::new(NoopRateLimiter),
        )
    }

    #[test]
    fn session_cookie_is_http_only_lax() {
        let state = test_state("http://localhost:3000");
        let cookie = session_cookie(&state, "token-value").expect("cookie");
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.starts_with("teambase_session=token-value;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn session_cookie_secure_over_https() {
        let state = test_state("https://teambase.dev");
        let cookie = session_cookie(&state, "token-value").expect("cookie");
        assert!(cookie.to_str().expect("ascii").contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let state = test_state("http://localhost:3000");
        let cookie = clear_session_cookie(state.config()).expect("cookie");
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.starts_with("teambase_session=;"));
    }

    #[test]
    fn extract_session_cookie_finds_named_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("other=1; teambase_session=abc123; theme=dark"),
        );
        assert_eq!(extract_session_cookie(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_session_cookie_ignores_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("other=1; theme=dark"),
        );
        assert_eq!(extract_session_cookie(&headers), None);
    }

    #[test]
    fn extract_bearer_token_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(
            extract_bearer_token(&headers),
            Some("abc.def.ghi".to_string())
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);
    }
}

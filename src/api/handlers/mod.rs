pub mod auth;
pub mod health;
pub mod invites;
pub mod members;
pub mod team;
#[cfg(test)]
pub(crate) mod test_db;
pub mod users;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Uniform envelope for plain-status responses and every error body.
#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub ok: bool,
    pub message: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(StatusResponse {
            ok: false,
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn ok_message(message: &str) -> Response {
    Json(StatusResponse {
        ok: true,
        message: message.to_string(),
    })
    .into_response()
}

pub(crate) fn unauthenticated() -> Response {
    error_response(StatusCode::UNAUTHORIZED, "Not authenticated")
}

pub(crate) fn missing_team() -> Response {
    error_response(StatusCode::BAD_REQUEST, "You need to be a part of a team")
}

pub(crate) fn insufficient_role() -> Response {
    error_response(StatusCode::FORBIDDEN, "You don't have a high enough role")
}

pub(crate) fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_sets_ok_false() {
        let response = unauthenticated();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = missing_team();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = insufficient_role();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = internal_error();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_response_serializes_message() {
        let body = serde_json::to_value(StatusResponse {
            ok: true,
            message: "done".to_string(),
        })
        .ok();
        assert_eq!(body, Some(serde_json::json!({"ok": true, "message": "done"})));
    }
}

//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::guard::Role;

/// Materialized caller context returned by session endpoints and used for
/// authorization decisions. Provider subject ids never appear here.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AuthContext {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    /// Numeric role rank in the caller's team; lower means more privilege.
    pub role: Option<i32>,
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
}

impl AuthContext {
    /// Caller's role, when the rank is one of the known values.
    pub(crate) fn role(&self) -> Option<Role> {
        self.role.and_then(Role::from_rank)
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CredentialsSigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SsoSigninRequest {
    /// Signed identity assertion from the provider.
    pub assertion: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct SsoSigninResponse {
    /// Stateless signed token for subsequent bearer authentication.
    pub token: String,
    pub user: AuthContext,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionUpdateRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "notificationSettings")]
    pub notification_settings: Option<serde_json::Value>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyResetPasswordRequest {
    pub email: String,
    pub token: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

//! Auth and account wire payloads.
//!
//! The auth endpoints speak snake_case; everything else on the API uses
//! camelCase (see the other model modules).

use serde::{Deserialize, Serialize};

use crate::auth::profile::{Role, UserProfile};
use crate::auth::session::AuthSession;

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Response from `/auth/login` and `/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

impl From<AuthResponse> for AuthSession {
    fn from(response: AuthResponse) -> Self {
        AuthSession {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            profile: response.user,
        }
    }
}

/// Body for `POST /auth/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response from `POST /auth/refresh`. The refresh token is only
/// present when the server rotates it.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// One page of the admin user listing.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub page: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(rename = "totalUsers")]
    pub total_users: u64,
}

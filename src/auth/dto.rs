use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub refresh: String,
    pub access: String,
    pub user: PublicUser,
}

/// Request body for logout. The token is optional: logging out without
/// one succeeds trivially.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub detail: String,
}

impl LogoutResponse {
    pub fn ok() -> Self {
        Self {
            detail: "Successfully logged out".into(),
        }
    }
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn login_response_serialization() {
        let response = LoginResponse {
            refresh: "r-token".into(),
            access: "a-token".into(),
            user: PublicUser {
                id: Uuid::new_v4(),
                first_name: "Kirby".into(),
                last_name: "Fox".into(),
                email: "test@example.com".into(),
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"refresh\":\"r-token\""));
        assert!(json.contains("\"access\":\"a-token\""));
        assert!(json.contains("test@example.com"));
    }

    #[test]
    fn logout_request_token_is_optional() {
        let empty: LogoutRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.refresh_token.is_none());

        let with: LogoutRequest =
            serde_json::from_str(r#"{"refresh_token": "abc"}"#).unwrap();
        assert_eq!(with.refresh_token.as_deref(), Some("abc"));
    }
}

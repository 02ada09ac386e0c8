//! Wire types for the users API.
//!
//! Every endpoint answers with an [`ApiResponse`] envelope.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use villa_core::models::auth::{Principal, TokenClaims};

pub use villa_core::models::auth::TokenPair;

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub is_success: bool,
    #[serde(default)]
    pub error_messages: Vec<String>,
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            is_success: true,
            error_messages: Vec::new(),
            result: Some(result),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            is_success: false,
            error_messages: vec![message.into()],
            result: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub user_name: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Public view of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub user_name: String,
    pub name: String,
    pub role: String,
}

impl From<Principal> for UserDto {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id.to_string(),
            role: p.primary_role().unwrap_or_default().to_string(),
            user_name: p.user_name,
            name: p.name,
        }
    }
}

/// Session identity carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub name: String,
    pub role: String,
}

impl From<&TokenClaims> for SessionUser {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            name: claims.unique_name.clone(),
            role: claims.role.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_camel_case() {
        let json = serde_json::to_value(ApiResponse::ok(TokenPair::new("a", "r"))).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["isSuccess"], true);
        assert_eq!(json["result"]["accessToken"], "a");
        assert!(json["errorMessages"].as_array().unwrap().is_empty());
    }

    #[test]
    fn error_envelope_has_no_result() {
        let resp = ApiResponse::<()>::error(StatusCode::BAD_REQUEST, "nope");
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["isSuccess"], false);
        assert_eq!(json["errorMessages"][0], "nope");
        assert!(json["result"].is_null());
    }

    #[test]
    fn registration_role_is_optional() {
        let req: RegistrationRequest =
            serde_json::from_str(r#"{"userName":"a","name":"A","password":"p"}"#).unwrap();
        assert!(req.role.is_none());
    }
}

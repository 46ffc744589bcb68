use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration. Fields absent on the wire deserialize
/// as empty strings so the flow answers with its own validation error instead
/// of the extractor's 422.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for email verification.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "emailToken")]
    pub email_token: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response returned after register, verify-email or login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Public part of the user attached to authenticated requests.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_request_uses_camel_case_token_field() {
        let req: VerifyEmailRequest =
            serde_json::from_str(r#"{"email":"a@x.com","emailToken":"abc"}"#).unwrap();
        assert_eq!(req.email, "a@x.com");
        assert_eq!(req.email_token, "abc");
    }

    #[test]
    fn absent_fields_deserialize_as_empty() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"secret1"}"#).unwrap();
        assert_eq!(req.username, "");
        assert_eq!(req.email, "a@x.com");

        let req: VerifyEmailRequest = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert_eq!(req.email_token, "");

        let req: LoginRequest = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert_eq!(req.password, "");
    }

    #[test]
    fn token_response_serializes_single_field() {
        let json = serde_json::to_string(&TokenResponse {
            token: "t".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"token":"t"}"#);
    }
}

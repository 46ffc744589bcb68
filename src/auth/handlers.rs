use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse, VerifyEmailRequest},
        email_token::generate_email_token,
        error::AuthError,
        extractors::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
    },
    mail::VerificationEmail,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", post(verify_email))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn verification_link(base_url: &str, email: &str, email_token: &str) -> String {
    // The token is hex; only the email needs escaping.
    format!(
        "{}/verify-email?email={}&emailToken={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(email),
        email_token
    )
}

fn check_email_token(user: &User, presented: &str) -> Result<(), AuthError> {
    if user.email_token != presented {
        warn!(user_id = %user.id, "verification token mismatch");
        return Err(AuthError::TokenMismatch);
    }
    Ok(())
}

/// Credential check shared by the login flow. A missing account and a wrong
/// password collapse into the same error so the response never confirms
/// whether an account exists.
fn authenticate(user: Option<User>, password: &str) -> Result<User, AuthError> {
    let user = user.ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AuthError::InvalidCredentials);
    }
    if !user.is_verified {
        warn!(user_id = %user.id, "login before verification");
        return Err(AuthError::NotVerified);
    }
    Ok(user)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AuthError> {
    payload.email = payload.email.trim().to_lowercase();
    let username = payload.username.trim();

    if username.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        warn!("registration with missing fields");
        return Err(AuthError::Validation("Please add all fields".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::Conflict);
    }

    let hash = hash_password(&payload.password)?;
    let email_token = generate_email_token();

    // The unique index on email settles concurrent registrations; the loser
    // comes back as a Conflict via the sqlx error mapping.
    let user = User::create(&state.db, &payload.email, username, &hash, &email_token).await?;

    state.outbox.enqueue(VerificationEmail {
        to: user.email.clone(),
        username: user.username.clone(),
        verify_url: verification_link(&state.config.mail.base_url, &user.email, &user.email_token),
    });

    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyEmailRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(AuthError::NotFound)?;

    check_email_token(&user, &payload.email_token)?;

    let user = User::mark_verified(&state.db, user.id).await?;
    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = authenticate(
        User::find_by_email(&state.db, &payload.email).await?,
        &payload.password,
    )?;

    let token = JwtKeys::from_ref(&state).sign(&user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(TokenResponse { token }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

#[instrument(skip(current))]
pub async fn me(current: CurrentUser) -> Json<MeResponse> {
    // Falls back to the token claims when the record is gone; the token is
    // still honored until it expires.
    let response = match current.user {
        Some(PublicUser {
            id,
            username,
            email,
            is_verified,
        }) => MeResponse {
            id,
            username,
            email,
            is_verified: Some(is_verified),
        },
        None => MeResponse {
            id: current.claims.sub,
            username: current.claims.username,
            email: current.claims.email,
            is_verified: None,
        },
    };
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(password: &str, is_verified: bool) -> User {
        User {
            id: uuid::Uuid::new_v4(),
            email: "a@x.com".into(),
            username: "alice".into(),
            password_hash: hash_password(password).expect("hash"),
            is_verified,
            email_token: generate_email_token(),
            created_at: time::OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
    }

    #[test]
    fn verification_link_embeds_email_and_token() {
        let link = verification_link("https://app.example.com/", "a@x.com", "abc123");
        assert_eq!(
            link,
            "https://app.example.com/verify-email?email=a%40x.com&emailToken=abc123"
        );
    }

    #[test]
    fn verification_link_percent_encodes_the_email() {
        // A plus sign would otherwise decode as a space on the other end.
        let link = verification_link("https://app.example.com", "a+b@x.com", "abc123");
        assert_eq!(
            link,
            "https://app.example.com/verify-email?email=a%2Bb%40x.com&emailToken=abc123"
        );
    }

    // The fake state's pool is lazy and points at nothing reachable, so any
    // store access in these flows would surface as an internal error rather
    // than a validation one.
    #[tokio::test]
    async fn register_rejects_absent_field_before_any_store_access() {
        let state = crate::state::AppState::fake();
        let payload: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"secret1"}"#).unwrap();
        let err = register(State(state), Json(payload)).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(err.to_string(), "Please add all fields");
    }

    #[tokio::test]
    async fn register_rejects_each_empty_field() {
        let state = crate::state::AppState::fake();
        for body in [
            r#"{"username":"","email":"a@x.com","password":"secret1"}"#,
            r#"{"username":"alice","email":"","password":"secret1"}"#,
            r#"{"username":"alice","email":"a@x.com","password":""}"#,
        ] {
            let payload: RegisterRequest = serde_json::from_str(body).unwrap();
            let err = register(State(state.clone()), Json(payload))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Please add all fields");
        }
    }

    #[tokio::test]
    async fn register_rejects_malformed_email_before_any_store_access() {
        let state = crate::state::AppState::fake();
        let payload: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","email":"not-an-email","password":"secret1"}"#,
        )
        .unwrap();
        let err = register(State(state), Json(payload)).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[test]
    fn unknown_email_and_wrong_password_are_indistinguishable() {
        let user = make_user("secret1", true);
        let missing = authenticate(None, "secret1").unwrap_err();
        let wrong = authenticate(Some(user), "wrong").unwrap_err();
        assert!(matches!(missing, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(missing.to_string(), wrong.to_string());
    }

    #[test]
    fn login_is_gated_on_verification() {
        let unverified = make_user("secret1", false);
        let err = authenticate(Some(unverified), "secret1").unwrap_err();
        assert!(matches!(err, AuthError::NotVerified));

        let verified = make_user("secret1", true);
        let user = authenticate(Some(verified), "secret1").expect("login should pass");
        assert!(user.is_verified);
    }

    #[test]
    fn verification_token_must_match_exactly() {
        let user = make_user("secret1", false);
        assert!(check_email_token(&user, &user.email_token).is_ok());

        let truncated = &user.email_token[..user.email_token.len() - 1];
        assert!(matches!(
            check_email_token(&user, truncated).unwrap_err(),
            AuthError::TokenMismatch
        ));

        let case_altered = user.email_token.to_uppercase();
        assert!(matches!(
            check_email_token(&user, &case_altered).unwrap_err(),
            AuthError::TokenMismatch
        ));

        assert!(matches!(
            check_email_token(&user, "").unwrap_err(),
            AuthError::TokenMismatch
        ));
    }

    #[test]
    fn me_response_omits_verification_when_record_is_gone() {
        let json = serde_json::to_string(&MeResponse {
            id: uuid::Uuid::new_v4(),
            username: "alice".into(),
            email: "a@x.com".into(),
            is_verified: None,
        })
        .unwrap();
        assert!(!json.contains("is_verified"));
    }
}

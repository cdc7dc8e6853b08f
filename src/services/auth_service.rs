use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::Claims;
use crate::models::{User, UserResponse};
use crate::state::AppState;
use crate::utils::{text, AppError};

pub const SESSION_COOKIE: &str = "jwt";

const TOKEN_TTL_DAYS: i64 = 7;
const JWT_ISSUER: &str = "careergap-service";
const JWT_AUDIENCE: &str = "careergap-api";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body returned by signup and login alongside the session cookie.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        SessionUser {
            id: user.id_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
        }
    }
}

// Generate JWT token
pub fn generate_token(user: &User, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id_hex(),
        email: user.email.clone(),
        name: user.name.clone(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: JWT_AUDIENCE.to_string(),
        iss: JWT_ISSUER.to_string(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[JWT_AUDIENCE]);
    validation.set_issuer(&[JWT_ISSUER]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)
        .map(|data| data.claims)
        .map_err(|e| format!("Invalid token: {}", e))
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .max_age(CookieDuration::days(TOKEN_TTL_DAYS))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();
    cookie.make_removal();
    cookie
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))
}

/// Creates a password account and returns it with a fresh session token.
pub async fn signup(state: &AppState, request: &SignupRequest) -> Result<(SessionUser, String), AppError> {
    let (name, email, password) = match (
        present(&request.name),
        present(&request.email),
        present(&request.password),
    ) {
        (Some(name), Some(email), Some(password)) => (name, email, password),
        _ => return Err(AppError::Validation("All fields are required".into())),
    };

    let name = name.trim().to_string();
    let email = email.trim().to_lowercase();

    let name_len = name.chars().count();
    if !(2..=50).contains(&name_len) {
        return Err(AppError::Validation("Name must be between 2 and 50 characters".into()));
    }
    if email.chars().count() > 100 {
        return Err(AppError::Validation("Email is too long".into()));
    }
    if !text::looks_like_email(&email) {
        return Err(AppError::Validation("Invalid email format".into()));
    }
    let password_len = password.chars().count();
    if !(6..=128).contains(&password_len) {
        return Err(AppError::Validation("Password must be between 6 and 128 characters".into()));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Validation("Email already exists".into()));
    }

    let hash = hash_password(password.to_string(), state.config.bcrypt_cost).await?;
    let user = state
        .store
        .insert_user(User::with_password(name, email, hash))
        .await?;

    let token = generate_token(&user, &state.config.jwt_secret)?;
    Ok((SessionUser::from(&user), token))
}

/// Checks credentials and returns the user with a fresh session token.
pub async fn login(state: &AppState, request: &LoginRequest) -> Result<(SessionUser, String), AppError> {
    let (email, password) = match (present(&request.email), present(&request.password)) {
        (Some(email), Some(password)) => (email.trim().to_lowercase(), password.to_string()),
        _ => return Err(AppError::Validation("Email and password are required".into())),
    };

    if email.chars().count() > 100 {
        return Err(AppError::Validation("Email is too long".into()));
    }
    if password.chars().count() > 128 {
        return Err(AppError::Validation("Password is too long".into()));
    }

    let invalid = || AppError::Validation("Invalid credentials".into());

    let user = state.store.find_user_by_email(&email).await?.ok_or_else(invalid)?;
    // Conta sem senha (login federado): nada para verificar
    let stored_hash = user.password.clone().ok_or_else(invalid)?;

    if !verify_password(password, stored_hash).await? {
        return Err(invalid());
    }

    let token = generate_token(&user, &state.config.jwt_secret)?;
    Ok((SessionUser::from(&user), token))
}

pub async fn current_user(state: &AppState, user_id: &ObjectId) -> Result<UserResponse, AppError> {
    state
        .store
        .find_user_by_id(user_id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let mut user = User::with_password("Ada".into(), "ada@example.com".into(), "hash".into());
        user.id = Some(ObjectId::new());
        user
    }

    #[test]
    fn test_token_round_trip() {
        let user = sample_user();
        let token = generate_token(&user, "secret").unwrap();

        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, user.id_hex());
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.user_id().unwrap(), user.id.unwrap());
    }

    #[test]
    fn test_token_with_wrong_secret_is_rejected() {
        let token = generate_token(&sample_user(), "secret").unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_session_cookie_is_http_only() {
        let cookie = session_cookie("abc".into(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }
}

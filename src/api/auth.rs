use actix_web::{web, HttpResponse, ResponseError};

use crate::middleware::Claims;
use crate::models::UserResponse;
use crate::services::auth_service::{self, LoginRequest, SessionUser, SignupRequest};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, session cookie set", body = SessionUser),
        (status = 400, description = "Missing or invalid fields, or e-mail already registered")
    )
)]
pub async fn signup(state: web::Data<AppState>, request: web::Json<SignupRequest>) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("📝 POST /auth/signup - email: {}", email);

    match auth_service::signup(&state, &request).await {
        Ok((user, token)) => {
            log::info!("✅ Signup successful: {}", user.email);
            HttpResponse::Created()
                .cookie(auth_service::session_cookie(token, state.config.secure_cookies))
                .json(user)
        }
        Err(e) => {
            log::warn!("❌ Signup failed: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = SessionUser),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(state: web::Data<AppState>, request: web::Json<LoginRequest>) -> HttpResponse {
    let email = request.email.as_deref().unwrap_or("N/A");
    log::info!("🔐 POST /auth/login - email: {}", email);

    match auth_service::login(&state, &request).await {
        Ok((user, token)) => {
            log::info!("✅ Login successful: {}", user.email);
            HttpResponse::Ok()
                .cookie(auth_service::session_cookie(token, state.config.secure_cookies))
                .json(user)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session cookie cleared")
    )
)]
pub async fn logout() -> HttpResponse {
    log::info!("👋 POST /auth/logout");

    HttpResponse::Ok()
        .cookie(auth_service::removal_cookie())
        .json(serde_json::json!({ "message": "Logged out successfully" }))
}

#[utoipa::path(
    get,
    path = "/api/auth/check",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid session")
    ),
    security(("cookie_auth" = []))
)]
pub async fn check(state: web::Data<AppState>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("👤 GET /auth/check - user: {}", claims.sub);

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => return e.error_response(),
    };

    match auth_service::current_user(&state, &user_id).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => {
            log::warn!("❌ Session check failed for {}: {}", claims.sub, e);
            e.error_response()
        }
    }
}

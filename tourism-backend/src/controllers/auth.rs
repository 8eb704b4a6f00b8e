use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::auth::{generate_token, hash_password, verify_password};
use crate::errors::{ApiError, ApiResult};
use crate::middleware::{extract_token, require_session, SESSION_COOKIE};
use crate::models::{LoginRequest, RegisterRequest, Role, UserResponse};
use crate::validation::Validate;
use crate::AppState;

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    token: String,
    expires_at: i64,
    user: UserResponse,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserResponse>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me))
            .route("/validate", web::get().to(validate)),
    );
}

fn session_cookie(token: &str, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::hours(ttl_hours))
        .finish()
}

async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    if state.db.get_user_by_email(&body.email)?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    // Self-registration always yields a plain user; staff roles are granted by an admin
    let hash = hash_password(&body.password)?;
    let user = state
        .db
        .create_user(&body.email, &body.name, &hash, Role::User)
        .map_err(|e| crate::errors::conflict_on_unique(e, "Email is already registered"))?;

    log::info!("Registered user {} (id {})", user.email, user.id);
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(&user),
    })))
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> ApiResult<HttpResponse> {
    match state.db.purge_expired_sessions() {
        Ok(0) => {}
        Ok(n) => log::debug!("Purged {} expired sessions", n),
        Err(e) => log::warn!("Failed to purge expired sessions: {}", e),
    }

    let user = state.db.get_user_by_email(&body.email)?;
    let user = match user {
        Some(u) if verify_password(&body.password, &u.password_hash) => u,
        _ => {
            log::info!("Failed login for {}", body.email.trim().to_lowercase());
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }
    };

    let token = generate_token();
    let session = state
        .db
        .create_session(user.id, &token, state.config.session_ttl_hours)?;

    log::info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&token, state.config.session_ttl_hours))
        .json(LoginResponse {
            success: true,
            token,
            expires_at: session.expires_at.timestamp(),
            user: UserResponse::from(&user),
        }))
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    if let Some(token) = extract_token(&req) {
        state.db.delete_session(&token)?;
    }

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(removal)
        .json(serde_json::json!({ "success": true })))
}

async fn me(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let auth = require_session(&state.db, &req)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(&auth.user),
    })))
}

async fn validate(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let user = crate::middleware::optional_session(&state.db, &req)?;
    Ok(HttpResponse::Ok().json(ValidateResponse {
        valid: user.is_some(),
        user: user.map(|a| UserResponse::from(&a.user)),
    }))
}

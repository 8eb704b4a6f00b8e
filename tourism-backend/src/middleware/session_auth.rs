//! Session and role guards
//!
//! Handlers call these at the top of the request, the way every protected route
//! starts: resolve the session, then check the role.

use actix_web::HttpRequest;

use crate::db::Database;
use crate::errors::{ApiError, ApiResult};
use crate::models::{Role, User};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// The user behind a valid session
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// Token from `Authorization: Bearer <token>`, falling back to the session cookie
pub fn extract_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    from_header.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the session if one was presented; a bad token is treated as anonymous
pub fn optional_session(db: &Database, req: &HttpRequest) -> ApiResult<Option<AuthUser>> {
    let Some(token) = extract_token(req) else {
        return Ok(None);
    };

    let Some(session) = db.validate_session(&token)? else {
        return Ok(None);
    };

    Ok(db.get_user(session.user_id)?.map(|user| AuthUser { user }))
}

/// 401 unless the request carries a valid, unexpired session
pub fn require_session(db: &Database, req: &HttpRequest) -> ApiResult<AuthUser> {
    if extract_token(req).is_none() {
        return Err(ApiError::Unauthorized("No authorization token provided".to_string()));
    }
    optional_session(db, req)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))
}

/// 401 without a session, 403 when the user's role is not in `allowed`
pub fn require_role(db: &Database, req: &HttpRequest, allowed: &[Role]) -> ApiResult<AuthUser> {
    let auth = require_session(db, req)?;
    if !auth.role().satisfies(allowed) {
        log::warn!(
            "User {} ({}) denied access to {} {}",
            auth.id(),
            auth.role(),
            req.method(),
            req.path()
        );
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }
    Ok(auth)
}

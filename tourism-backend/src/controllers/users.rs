use actix_web::{web, HttpRequest, HttpResponse};

use crate::errors::{ApiError, ApiResult};
use crate::middleware::require_role;
use crate::models::{Role, UpdateRoleRequest, UserResponse, ADMIN_ONLY};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("", web::get().to(list_users))
            .route("/{id}/role", web::put().to(update_role)),
    );
}

async fn list_users(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, ADMIN_ONLY)?;

    let users: Vec<UserResponse> = state.db.list_users()?.iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "users": users,
    })))
}

async fn update_role(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateRoleRequest>,
) -> ApiResult<HttpResponse> {
    let auth = require_role(&state.db, &req, ADMIN_ONLY)?;
    let id = path.into_inner();

    if id == auth.id() && body.role != Role::Admin {
        return Err(ApiError::field("role", "admins cannot demote themselves"));
    }

    let user = state
        .db
        .update_user_role(id, body.role)?
        .ok_or_else(|| ApiError::not_found("User"))?;

    log::info!("User {} changed role of user {} to {}", auth.id(), user.id, user.role);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(&user),
    })))
}

#[cfg(test)]
mod tests {
    use crate::controllers::test_support::*;
    use crate::models::Role;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_users_are_admin_only() {
        let state = state();
        let app = test_app!(state);
        let editor = token_for(&state, Role::Editor);

        let req = test::TestRequest::get().uri("/api/users").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(bearer(&editor))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_change_role() {
        let state = state();
        let app = test_app!(state);
        let admin = token_for(&state, Role::Admin);
        let target = state.db.create_user("guide@example.com", "Guide", "x", Role::User).unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/users/{}/role", target.id))
            .insert_header(bearer(&admin))
            .set_json(json!({"role": "EDITOR"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["role"], "EDITOR");

        let req = test::TestRequest::put()
            .uri("/api/users/9999/role")
            .insert_header(bearer(&admin))
            .set_json(json!({"role": "EDITOR"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(bearer(&admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["users"].as_array().unwrap().len(), 2);
        assert!(body["users"][0].get("password_hash").is_none());
    }

    #[actix_web::test]
    async fn test_admin_cannot_demote_self() {
        let state = state();
        let app = test_app!(state);
        let admin = token_for(&state, Role::Admin);
        let admin_id = state.db.validate_session(&admin).unwrap().unwrap().user_id;

        let req = test::TestRequest::put()
            .uri(&format!("/api/users/{}/role", admin_id))
            .insert_header(bearer(&admin))
            .set_json(json!({"role": "USER"}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}

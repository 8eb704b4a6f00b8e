use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::db::Database;
use crate::errors::{ApiError, ApiResult};
use crate::middleware::require_role;
use crate::models::{
    build_menu_tree, creates_cycle, depth_of, subtree_height, CreateMenuItemRequest,
    SortRequest, UpdateMenuItemRequest, MAX_MENU_DEPTH, STAFF,
};
use crate::validation::Validate;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/menu").route(web::get().to(public_menu)));
    cfg.service(
        web::scope("/api/admin/menu")
            .route("", web::get().to(list_items))
            .route("", web::post().to(create_item))
            .route("/sort", web::put().to(sort_items))
            .route("/{id}", web::get().to(get_item))
            .route("/{id}", web::put().to(update_item))
            .route("/{id}", web::delete().to(delete_item)),
    );
}

/// `parent_id` must name an existing item, must not place `id` under itself and
/// must keep the deepest affected item within `MAX_MENU_DEPTH`
fn check_parent(db: &Database, id: Option<i64>, parent_id: i64) -> ApiResult<()> {
    let items = db.list_menu_items(false)?;
    if !items.iter().any(|i| i.id == parent_id) {
        return Err(ApiError::field("parent_id", "does not match an existing menu item"));
    }
    if let Some(id) = id {
        if creates_cycle(&items, id, parent_id) {
            return Err(ApiError::field("parent_id", "would make the item its own ancestor"));
        }
    }

    let below = id.map(|id| subtree_height(&items, id)).unwrap_or(0);
    if depth_of(&items, parent_id) + 1 + below > MAX_MENU_DEPTH {
        return Err(ApiError::field(
            "parent_id",
            &format!("would nest the menu deeper than {} levels", MAX_MENU_DEPTH),
        ));
    }
    Ok(())
}

async fn public_menu(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let items = state.db.list_menu_items(true)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "menu": build_menu_tree(&items) })))
}

async fn list_items(state: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let items = state.db.list_menu_items(false)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "items": items })))
}

async fn get_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    let item = state
        .db
        .get_menu_item(path.into_inner())?
        .ok_or_else(|| ApiError::not_found("Menu item"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "item": item })))
}

async fn create_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateMenuItemRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    body.validate()?;
    if let Some(parent_id) = body.parent_id {
        check_parent(&state.db, None, parent_id)?;
    }

    let item = state.db.create_menu_item(&body)?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "item": item })))
}

async fn update_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateMenuItemRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    body.validate()?;
    let id = path.into_inner();
    if let Some(Some(parent_id)) = body.parent_id {
        check_parent(&state.db, Some(id), parent_id)?;
    }

    let item = state
        .db
        .update_menu_item(id, &body)?
        .ok_or_else(|| ApiError::not_found("Menu item"))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "item": item })))
}

async fn delete_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    if !state.db.delete_menu_item(path.into_inner())? {
        return Err(ApiError::not_found("Menu item"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn sort_items(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SortRequest>,
) -> ApiResult<HttpResponse> {
    require_role(&state.db, &req, STAFF)?;
    if let Some(id) = state.db.sort_menu_items(&body.items)? {
        return Err(ApiError::NotFound(format!("Menu item {} not found", id)));
    }
    let items = state.db.list_menu_items(false)?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "items": items })))
}

#[cfg(test)]
mod tests {
    use crate::controllers::test_support::*;
    use crate::models::Role;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::{json, Value};

    macro_rules! create_item {
        ($app:expr, $token:expr, $body:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/admin/menu")
                .insert_header(bearer($token))
                .set_json($body)
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            body["item"]["id"].as_i64().unwrap()
        }};
    }

    #[actix_web::test]
    async fn test_public_menu_tree() {
        let state = state();
        let app = test_app!(state);
        let editor = token_for(&state, Role::Editor);

        let tours = create_item!(app, &editor, json!({"label": "Tours", "url": "/tours"}));
        create_item!(app, &editor, json!({"label": "North", "url": "/tours/north", "parent_id": tours}));
        create_item!(app, &editor, json!({"label": "Hidden", "url": "/hidden", "visible": false}));
        create_item!(app, &editor, json!({"label": "Contact", "url": "/contact"}));

        let req = test::TestRequest::get().uri("/api/menu").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let menu = body["menu"].as_array().unwrap();
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[0]["label"], "Tours");
        assert_eq!(menu[0]["children"][0]["label"], "North");
        assert_eq!(menu[1]["label"], "Contact");
    }

    #[actix_web::test]
    async fn test_parent_checks() {
        let state = state();
        let app = test_app!(state);
        let editor = token_for(&state, Role::Editor);

        let top = create_item!(app, &editor, json!({"label": "Stay", "url": "/stay"}));
        let child = create_item!(app, &editor, json!({"label": "Homestays", "url": "/homestays", "parent_id": top}));

        let req = test::TestRequest::post()
            .uri("/api/admin/menu")
            .insert_header(bearer(&editor))
            .set_json(json!({"label": "Orphan", "url": "/x", "parent_id": 999}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/menu/{}", top))
            .insert_header(bearer(&editor))
            .set_json(json!({"parent_id": child}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        // Moving the child back to the top level is fine
        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/menu/{}", child))
            .insert_header(bearer(&editor))
            .set_json(json!({"parent_id": null}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["item"]["parent_id"].is_null());
    }

    #[actix_web::test]
    async fn test_sort_and_cascade_delete() {
        let state = state();
        let app = test_app!(state);
        let admin = token_for(&state, Role::Admin);

        let a = create_item!(app, &admin, json!({"label": "A", "url": "/a"}));
        let b = create_item!(app, &admin, json!({"label": "B", "url": "/b"}));
        create_item!(app, &admin, json!({"label": "A1", "url": "/a/1", "parent_id": a}));

        let req = test::TestRequest::put()
            .uri("/api/admin/menu/sort")
            .insert_header(bearer(&admin))
            .set_json(json!({"items": [{"id": a, "sort_order": 5}, {"id": 777, "sort_order": 0}]}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/api/admin/menu/sort")
            .insert_header(bearer(&admin))
            .set_json(json!({"items": [{"id": a, "sort_order": 5}, {"id": b, "sort_order": 0}]}))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::get().uri("/api/menu").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["menu"][0]["label"], "B");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/admin/menu/{}", a))
            .insert_header(bearer(&admin))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
        assert_eq!(state.db.list_menu_items(false).unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_menu_depth_is_limited() {
        let state = state();
        let app = test_app!(state);
        let editor = token_for(&state, Role::Editor);

        // A chain of nine items reaches depth 8, the deepest allowed
        let mut chain = vec![create_item!(app, &editor, json!({"label": "L0", "url": "/0"}))];
        for level in 1..=8 {
            let parent = *chain.last().unwrap();
            let url = format!("/{}", level);
            chain.push(create_item!(
                app,
                &editor,
                json!({"label": format!("L{}", level), "url": url, "parent_id": parent})
            ));
        }

        let req = test::TestRequest::post()
            .uri("/api/admin/menu")
            .insert_header(bearer(&editor))
            .set_json(json!({"label": "L9", "url": "/9", "parent_id": chain[8]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["details"][0]["field"], "parent_id");

        // Moving a two-level branch under the deepest item is rejected as well
        let branch = create_item!(app, &editor, json!({"label": "B", "url": "/b"}));
        create_item!(app, &editor, json!({"label": "B1", "url": "/b/1", "parent_id": branch}));
        let req = test::TestRequest::put()
            .uri(&format!("/api/admin/menu/{}", branch))
            .insert_header(bearer(&editor))
            .set_json(json!({"parent_id": chain[7]}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let req = test::TestRequest::get().uri("/api/menu").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let mut node = &body["menu"][0];
        for _ in 0..8 {
            node = &node["children"][0];
        }
        assert_eq!(node["label"], "L8");
    }
}

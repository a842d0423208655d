use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::AppResult;
use crate::middleware::{AuthMiddleware, AuthUser};
use crate::services::UserService;
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/settings")
            .wrap(AuthMiddleware)
            .route(web::get().to(get_settings))
            .route(web::post().to(update_settings)),
    );
}

/// GET /settings - client presentation state (theme etc.) stored per user
async fn get_settings(auth_user: AuthUser) -> AppResult<HttpResponse> {
    let mut user = auth_user.user;
    user.parse_json_fields();

    Ok(HttpResponse::Ok().json(user.settings.unwrap_or_else(|| json!({}))))
}

/// POST /settings - replace the settings blob
async fn update_settings(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    payload: web::Json<serde_json::Value>,
) -> AppResult<HttpResponse> {
    UserService::new(&state.db)
        .update_settings(&auth_user.user.id, &payload)
        .await?;

    Ok(HttpResponse::Ok().json(payload.into_inner()))
}

use actix_web::{
    cookie::{Cookie, SameSite},
    http::header,
    web, HttpResponse,
};
use serde_json::json;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthMiddleware, AuthUser};
use crate::models::{SessionResponse, SigninRequest, SignupRequest};
use crate::services::{AuthService, UserService};
use crate::utils::auth::{create_jwt, parse_duration};
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/signin", web::post().to(signin))
        .route("/signup", web::post().to(signup))
        .route("/signout", web::get().to(signout))
        .service(
            web::resource("")
                .wrap(AuthMiddleware)
                .route(web::get().to(get_session_user)),
        )
        .service(
            web::resource("/update/password")
                .wrap(AuthMiddleware)
                .route(web::post().to(update_password)),
        )
        .service(
            web::resource("/api_key")
                .wrap(AuthMiddleware)
                .route(web::post().to(create_api_key))
                .route(web::delete().to(delete_api_key)),
        );
}

fn session_cookie(token: &str, expires_at: Option<i64>) -> Cookie<'static> {
    let mut cookie = Cookie::new("token", token.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_secure(true);
    cookie.set_path("/");

    if let Some(exp) = expires_at {
        cookie.set_expires(time::OffsetDateTime::from_unix_timestamp(exp).ok());
    }

    cookie
}

fn issue_session(
    state: &AppState,
    user: &crate::models::User,
) -> AppResult<(SessionResponse, Cookie<'static>)> {
    let token = create_jwt(&user.id, &state.config.secret_key, &state.config.jwt_expires_in)?;

    let expires_at = chrono::Utc::now()
        .checked_add_signed(parse_duration(&state.config.jwt_expires_in)?)
        .map(|dt| dt.timestamp());

    let cookie = session_cookie(&token, expires_at);

    let session = SessionResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_at,
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role.clone(),
    };

    Ok((session, cookie))
}

/// GET "" - the "who am I" endpoint. The browser extension validates a
/// scavenged token against this before saving the current tab.
async fn get_session_user(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> AppResult<HttpResponse> {
    let (session, cookie) = issue_session(&state, &auth_user.user)?;

    Ok(HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(session))
}

async fn signin(
    state: web::Data<AppState>,
    req: web::Json<SigninRequest>,
) -> AppResult<HttpResponse> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let auth_service = AuthService::new(&state.db);
    let user_service = UserService::new(&state.db);

    let user_id = auth_service
        .authenticate(&req.email.to_lowercase(), &req.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let user = user_service
        .get_user_by_id(&user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let (session, cookie) = issue_session(&state, &user)?;

    Ok(HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(session))
}

async fn signup(
    state: web::Data<AppState>,
    req: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let auth_service = AuthService::new(&state.db);
    let user_service = UserService::new(&state.db);

    let user_count = user_service.count_users().await?;

    // The first account is always allowed so the instance can be bootstrapped
    if !state.config.enable_signup && user_count > 0 {
        return Err(AppError::Forbidden("Signup is disabled".to_string()));
    }

    if user_service
        .get_user_by_email(&req.email.to_lowercase())
        .await?
        .is_some()
    {
        return Err(AppError::UserAlreadyExists);
    }

    let role = if user_count == 0 { "admin" } else { "user" };

    let user_id = uuid::Uuid::new_v4().to_string();
    let user = user_service
        .create_user(&user_id, &req.name, &req.email.to_lowercase(), role)
        .await?;

    auth_service
        .create_auth(&user_id, &req.email.to_lowercase(), &req.password)
        .await?;

    let (session, cookie) = issue_session(&state, &user)?;

    Ok(HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(session))
}

async fn signout(_state: web::Data<AppState>) -> HttpResponse {
    // Clear the token cookie by setting an expired cookie
    let mut cookie = Cookie::new("token", "");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_secure(true);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(-1));

    HttpResponse::Ok()
        .append_header((header::SET_COOKIE, cookie.to_string()))
        .json(json!({"status": true}))
}

async fn update_password(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    req: web::Json<serde_json::Value>,
) -> AppResult<HttpResponse> {
    let password = req
        .get("password")
        .and_then(|v| v.as_str())
        .ok_or(AppError::BadRequest("password is required".to_string()))?;

    let new_password = req
        .get("new_password")
        .and_then(|v| v.as_str())
        .ok_or(AppError::BadRequest("new_password is required".to_string()))?;

    if new_password.len() < 8 {
        return Err(AppError::Validation(
            "new_password must be at least 8 characters".to_string(),
        ));
    }

    let auth_service = AuthService::new(&state.db);

    let user_id = auth_service
        .authenticate(&auth_user.user.email, password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if user_id != auth_user.user.id {
        return Err(AppError::InvalidCredentials);
    }

    auth_service
        .update_password(&auth_user.user.id, new_password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({"status": true})))
}

async fn create_api_key(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> AppResult<HttpResponse> {
    if !state.config.enable_api_key {
        return Err(AppError::Forbidden("API keys are disabled".to_string()));
    }

    let api_key = format!("lv-{}", uuid::Uuid::new_v4().simple());

    UserService::new(&state.db)
        .update_api_key(&auth_user.user.id, Some(&api_key))
        .await?;

    Ok(HttpResponse::Ok().json(json!({"api_key": api_key})))
}

async fn delete_api_key(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> AppResult<HttpResponse> {
    UserService::new(&state.db)
        .update_api_key(&auth_user.user.id, None)
        .await?;

    Ok(HttpResponse::Ok().json(json!({"status": true})))
}

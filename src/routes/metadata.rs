use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthMiddleware;
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .wrap(AuthMiddleware)
            .route(web::get().to(get_metadata)),
    );
}

#[derive(Debug, Deserialize)]
struct MetadataQuery {
    url: Option<String>,
}

/// GET /?url= - same-origin relay for page metadata. A missing parameter is
/// the only error; every fetch or parse failure degrades to default values.
async fn get_metadata(
    state: web::Data<AppState>,
    query: web::Query<MetadataQuery>,
) -> AppResult<HttpResponse> {
    let url = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::BadRequest("URL parameter is required".to_string()))?;

    let metadata = state.metadata.fetch(url).await;

    Ok(HttpResponse::Ok().json(metadata))
}

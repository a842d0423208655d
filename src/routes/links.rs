use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthMiddleware, AuthUser};
use crate::models::link::{LinkForm, LinkUpdateForm};
use crate::services::collection::{filter_and_sort, SortOrder};
use crate::services::LinkService;
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .wrap(AuthMiddleware)
            .route(web::get().to(get_links)),
    )
    .service(
        web::resource("/create")
            .wrap(AuthMiddleware)
            .route(web::post().to(create_link)),
    )
    .service(
        web::resource("/{id}")
            .wrap(AuthMiddleware)
            .route(web::get().to(get_link_by_id)),
    )
    .service(
        web::resource("/{id}/update")
            .wrap(AuthMiddleware)
            .route(web::post().to(update_link_by_id)),
    )
    .service(
        web::resource("/{id}/delete")
            .wrap(AuthMiddleware)
            .route(web::delete().to(delete_link_by_id)),
    );
}

#[derive(Debug, Deserialize)]
struct CollectionQuery {
    tag: Option<String>,
    q: Option<String>,
    sort: Option<SortOrder>,
}

/// GET / - the owner's collection with tag filter, search and sort applied
async fn get_links(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<CollectionQuery>,
) -> AppResult<HttpResponse> {
    let link_service = LinkService::new(&state.db);
    let links = link_service.get_links_with_tags(&auth_user.user.id).await?;

    let links = filter_and_sort(
        links,
        query.tag.as_deref(),
        query.q.as_deref(),
        query.sort.unwrap_or_default(),
    );

    Ok(HttpResponse::Ok().json(links))
}

/// POST /create - save a link. Returns as soon as the row and its tag
/// associations exist; metadata enrichment runs in a detached task whose
/// failure never reaches this caller.
async fn create_link(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    form_data: web::Json<LinkForm>,
) -> AppResult<HttpResponse> {
    if form_data.url.trim().is_empty() {
        return Err(AppError::Validation("URL is required".to_string()));
    }

    let link_service = LinkService::new(&state.db);
    let link = link_service
        .create_link(&auth_user.user.id, &form_data)
        .await?;

    // The extension supplies the tab title and opts out of enrichment; the
    // dashboard saves with a placeholder and lets this task patch it later
    let enrich = state.config.enable_metadata_fetch
        && form_data.fetch_metadata.unwrap_or(true)
        && form_data.title.is_none();

    if enrich {
        let db = state.db.clone();
        let fetcher = state.metadata.clone();
        let link_id = link.id.clone();
        let url = link.url.clone();
        let fallback_title = link.title.clone();

        tokio::spawn(async move {
            let metadata = fetcher.fetch(&url).await;
            let service = LinkService::new(&db);
            if let Err(e) = service
                .apply_metadata(&link_id, &metadata, &fallback_title)
                .await
            {
                tracing::warn!("Failed to apply metadata to link {}: {}", link_id, e);
            }
        });
    }

    let with_tags = link_service
        .get_link_with_tags(&auth_user.user.id, &link.id)
        .await?
        .ok_or_else(|| AppError::InternalServerError("Failed to create link".to_string()))?;

    Ok(HttpResponse::Ok().json(with_tags))
}

/// GET /{id}
async fn get_link_by_id(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let link_id = path.into_inner();

    let link = LinkService::new(&state.db)
        .get_link_with_tags(&auth_user.user.id, &link_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Link not found".to_string()))?;

    Ok(HttpResponse::Ok().json(link))
}

/// POST /{id}/update
async fn update_link_by_id(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    form_data: web::Json<LinkUpdateForm>,
) -> AppResult<HttpResponse> {
    let link_id = path.into_inner();

    let link = LinkService::new(&state.db)
        .update_link(&auth_user.user.id, &link_id, &form_data)
        .await?;

    Ok(HttpResponse::Ok().json(link))
}

/// DELETE /{id}/delete
async fn delete_link_by_id(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let link_id = path.into_inner();

    LinkService::new(&state.db)
        .delete_link(&auth_user.user.id, &link_id)
        .await?;

    Ok(HttpResponse::Ok().json(true))
}

use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::middleware::{AuthMiddleware, AuthUser};
use crate::models::tag::TagDeleteForm;
use crate::services::{LinkService, TagService};
use crate::AppState;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .wrap(AuthMiddleware)
            .route(web::get().to(get_tags)),
    )
    .service(
        web::resource("/{id}/delete")
            .wrap(AuthMiddleware)
            .route(web::post().to(delete_tag_by_id)),
    );
}

/// GET / - the owner's tags with association counts, ordered by name
async fn get_tags(state: web::Data<AppState>, auth_user: AuthUser) -> AppResult<HttpResponse> {
    let tags = TagService::new(&state.db)
        .get_tags_with_counts(&auth_user.user.id)
        .await?;

    Ok(HttpResponse::Ok().json(tags))
}

/// POST /{id}/delete - delete a tag, keeping only the listed links.
/// Every other link carrying the tag is deleted outright, so this is a bulk
/// link deletion gated by tag membership, not just a tag removal.
async fn delete_tag_by_id(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    form_data: web::Json<TagDeleteForm>,
) -> AppResult<HttpResponse> {
    let tag_id = path.into_inner();

    LinkService::new(&state.db)
        .delete_tag_with_links(&auth_user.user.id, &tag_id, &form_data.links_to_keep)
        .await?;

    Ok(HttpResponse::Ok().json(true))
}

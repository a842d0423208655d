pub mod auth;
pub mod links;
pub mod metadata;
pub mod tags;
pub mod users;

use actix_web::web;

pub fn create_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auths").configure(auth::create_routes))
        .service(web::scope("/links").configure(links::create_routes))
        .service(web::scope("/metadata").configure(metadata::create_routes))
        .service(web::scope("/tags").configure(tags::create_routes))
        .service(web::scope("/users").configure(users::create_routes));
}

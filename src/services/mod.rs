pub mod auth;
pub mod collection;
pub mod link;
pub mod metadata;
pub mod tag;
pub mod user;

pub use auth::AuthService;
pub use link::LinkService;
pub use tag::TagService;
pub use user::UserService;

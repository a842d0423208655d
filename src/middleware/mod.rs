mod auth;

pub use auth::{AuthMiddleware, AuthUser};

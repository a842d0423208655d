pub mod auth;
pub mod link;
pub mod tag;
pub mod user;

pub use auth::{Auth, Claims, SessionResponse, SigninRequest, SignupRequest};
pub use user::User;

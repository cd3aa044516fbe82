pub mod auth;
pub mod authorize;

pub use auth::AuthUser;

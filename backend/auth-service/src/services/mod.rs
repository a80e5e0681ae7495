pub mod admin;
pub mod auth;

pub use admin::AdminAuthService;
pub use auth::{AuthConfig, AuthService, IssuedSession};

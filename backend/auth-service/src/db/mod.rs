pub mod admin_sessions;

pub use admin_sessions::{AdminAuthStore, AdminSession, PgAdminAuthStore};

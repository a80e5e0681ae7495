use std::sync::Arc;

use auth_core::store::AuthStore;
use auth_core::TokenValidator;

use crate::services::{AdminAuthService, AuthService};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub admin: Arc<AdminAuthService>,
    pub store: Arc<dyn AuthStore>,
    pub validator: Arc<dyn TokenValidator>,
}

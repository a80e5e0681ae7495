use std::sync::Arc;

use auth_core::TokenValidator;

use crate::services::DialogService;

#[derive(Clone)]
pub struct AppState {
    pub dialogs: Arc<DialogService>,
    pub validator: Arc<dyn TokenValidator>,
}

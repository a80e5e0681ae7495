pub mod dialog_service;
pub mod events;

pub use dialog_service::DialogService;
pub use events::EventPublisher;

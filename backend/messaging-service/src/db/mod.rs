mod dialog_repo;

pub use dialog_repo::{DialogStore, PgDialogStore};

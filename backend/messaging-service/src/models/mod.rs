mod dialog;
mod message;

pub use dialog::DialogSummary;
pub use message::Message;

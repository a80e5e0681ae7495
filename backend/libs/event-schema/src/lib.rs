pub mod bus;
mod events;

pub use bus::{BusError, EventBus, LocalBus, RedisBus};
pub use events::{user_channel, DialogEvent};

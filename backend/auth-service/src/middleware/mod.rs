pub mod bearer;
pub mod logging;
pub mod rate_limit;

pub use bearer::{bearer_token, require_auth, AuthedUser};
pub use rate_limit::{rate_limit, RateLimiter};

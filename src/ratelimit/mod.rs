//! Rate limiting logic and state management.

mod clock;
mod limiter;
mod log;

pub use clock::{Clock, MockClock, SystemClock};
pub use limiter::{RateLimiter, CLEANUP_INTERVAL};
pub use log::AccessLog;

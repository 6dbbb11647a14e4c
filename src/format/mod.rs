//! Leaf format checkers for scalar fields.

pub mod cron;
pub mod duration;
pub mod names;
pub mod quantity;

pub use cron::{CronError, parse_cron};
pub use duration::{Duration, DurationError, parse_duration};
pub use names::is_dns1123_subdomain;
pub use quantity::{Quantity, QuantityError, parse_quantity};

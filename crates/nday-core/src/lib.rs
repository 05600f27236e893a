pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::NdayConfig;
pub use error::{NdayError, Result};
pub use types::*;

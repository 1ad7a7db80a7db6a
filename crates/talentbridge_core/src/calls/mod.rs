pub mod active;
pub mod scheduled;

pub use active::{ActiveCallManager, DEFAULT_CALL_TICK_INTERVAL};
pub use scheduled::ScheduledCalls;

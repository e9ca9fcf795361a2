pub mod budget;
pub mod error;
pub mod mapping;
pub mod metrics;
pub mod progress;
pub mod retry;
pub mod state;

pub mod core;
pub mod error;
pub mod mapping;
pub mod params;
pub mod progress;
pub mod records;
pub mod shop;

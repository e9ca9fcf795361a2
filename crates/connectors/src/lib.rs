pub mod assets;
pub mod error;
pub mod profile;
pub mod sql;
pub mod target;

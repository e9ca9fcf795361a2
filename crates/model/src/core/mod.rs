pub mod entity;
pub mod value;

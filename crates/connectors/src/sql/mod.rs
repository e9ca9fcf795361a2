pub mod params;
pub mod row;

pub mod article;
pub mod configurator;
pub mod prices;

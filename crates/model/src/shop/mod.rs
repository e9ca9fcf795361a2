pub mod article;
pub mod category;
pub mod configurator;
pub mod customer;
pub mod image;
pub mod order;
pub mod price;
pub mod rating;
pub mod translation;

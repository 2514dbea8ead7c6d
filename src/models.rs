pub mod catalog;
pub mod stock;
pub mod tasks;

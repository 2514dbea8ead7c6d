pub mod putaway;
pub mod replenishment;
pub mod stock;
pub mod tasks;

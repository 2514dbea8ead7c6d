pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod task_repo;
pub use task_repo::TaskRepository;

pub mod reservation_service;
pub use reservation_service::ReservationService;
pub mod location_service;
pub use location_service::LocationService;
pub mod putaway_service;
pub use putaway_service::PutawayService;
pub mod replenishment_service;
pub use replenishment_service::ReplenishmentService;
pub mod execution_service;
pub use execution_service::ExecutionService;

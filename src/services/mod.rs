pub mod products;
pub mod replenishment;

pub use products::ProductService;
pub use replenishment::ReplenishmentService;

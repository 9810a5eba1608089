pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use models::*;
pub use repository::{AvailabilityRepository, DoctorDirectory};
pub use router::{availability_routes, DoctorCellState};
pub use services::availability::AvailabilityService;

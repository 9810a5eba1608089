use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::clock::Clock;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::repository::{AvailabilityRepository, DoctorDirectory};
use crate::services::availability::AvailabilityService;

#[derive(Clone)]
pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub availability: Arc<AvailabilityService>,
}

impl DoctorCellState {
    pub fn new(
        config: Arc<AppConfig>,
        doctors: Arc<dyn DoctorDirectory>,
        availability: Arc<dyn AvailabilityRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            availability: Arc::new(AvailabilityService::new(doctors, availability, clock)),
        }
    }
}

pub fn availability_routes(state: DoctorCellState) -> Router {
    let public_routes =
        Router::new().route("/doctor/{doctor_id}", get(handlers::get_doctor_availability));

    let protected_routes = Router::new()
        .route(
            "/my-availability",
            get(handlers::get_my_availability).post(handlers::create_availability),
        )
        .route(
            "/my-availability/default",
            post(handlers::setup_default_availability),
        )
        .route(
            "/{availability_id}",
            put(handlers::update_availability).delete(handlers::delete_availability),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use doctor_cell::repository::{AvailabilityRepository, DoctorDirectory};
use shared_config::AppConfig;
use shared_utils::clock::Clock;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::repository::AppointmentRepository;
use crate::services::{AppointmentBookingService, SlotService};

#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub booking_service: Arc<AppointmentBookingService>,
    pub slot_service: Arc<SlotService>,
}

impl AppointmentCellState {
    pub fn new(
        config: Arc<AppConfig>,
        doctors: Arc<dyn DoctorDirectory>,
        availability: Arc<dyn AvailabilityRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let booking_service =
            AppointmentBookingService::new(doctors.clone(), appointments.clone(), clock.clone())
                .with_single_confirmation(config.enforce_single_confirmation);
        let slot_service = SlotService::new(
            doctors,
            availability,
            appointments,
            clock,
            config.max_slot_range_days,
        );

        Self {
            config,
            booking_service: Arc::new(booking_service),
            slot_service: Arc::new(slot_service),
        }
    }
}

/// Public slot listing, mounted next to the availability routes.
pub fn slot_routes(state: AppointmentCellState) -> Router {
    Router::new()
        .route("/doctor/{doctor_id}/slots", get(handlers::get_available_slots))
        .with_state(state)
}

pub fn appointment_routes(state: AppointmentCellState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/",
            post(handlers::create_appointment).get(handlers::list_appointments),
        )
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).put(handlers::update_appointment),
        )
        .route(
            "/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::repository::build_repository;
use appointment_cell::{appointment_routes, slot_routes, AppointmentCellState};
use doctor_cell::repository::build_repositories;
use doctor_cell::{availability_routes, DoctorCellState};
use shared_config::AppConfig;
use shared_utils::clock::{Clock, SystemClock};

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let (doctors, availability) = build_repositories(&state);
    let appointments = build_repository(&state);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(state.clinic_utc_offset_minutes));

    let doctor_state = DoctorCellState::new(
        state.clone(),
        doctors.clone(),
        availability.clone(),
        clock.clone(),
    );
    let appointment_state =
        AppointmentCellState::new(state, doctors, availability, appointments, clock);

    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest(
            "/availability",
            availability_routes(doctor_state).merge(slot_routes(appointment_state.clone())),
        )
        .nest("/appointments", appointment_routes(appointment_state))
}

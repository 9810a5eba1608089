use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::caller_role;

use crate::models::{
    Actor, AppointmentError, AppointmentQuery, CancelAppointmentRequest,
    CreateAppointmentRequest, SlotQuery, UpdateAppointmentRequest, UpdateStatusRequest,
};
use crate::router::AppointmentCellState;
use crate::services::booking::AppointmentBookingService;

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound | AppointmentError::DoctorNotFound => {
            AppError::NotFound(e.to_string())
        }
        AppointmentError::InvalidTimeRange
        | AppointmentError::NotInFuture
        | AppointmentError::SlotUnavailable
        | AppointmentError::InvalidStatusTransition { .. }
        | AppointmentError::RangeTooLong { .. } => AppError::BadRequest(e.to_string()),
        AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
        AppointmentError::ConcurrentModification => AppError::Conflict(e.to_string()),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn actor(user: &User) -> Result<Actor, AppError> {
    Ok(Actor::new(user.id.clone(), caller_role(user)?))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppointmentCellState>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state
        .slot_service
        .list_slots(&doctor_id, query.start_date, query.end_date)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(slots)))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let actor = actor(&user)?;
    let patient_id =
        AppointmentBookingService::require_patient(&actor).map_err(map_appointment_error)?;

    let appointment = state
        .booking_service
        .create_appointment(patient_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;

    let appointments = state
        .booking_service
        .list_appointments(&actor, query)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentCellState>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;

    let appointment = state
        .booking_service
        .get_appointment(&appointment_id, &actor)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppointmentCellState>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;

    let appointment = state
        .booking_service
        .update_appointment(&appointment_id, &actor, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentCellState>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;

    let appointment = state
        .booking_service
        .update_status(
            &appointment_id,
            &actor,
            request.status,
            request.cancellation_reason,
        )
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentCellState>,
    Path(appointment_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;

    let appointment = state
        .booking_service
        .cancel_appointment(&appointment_id, &actor, request.cancellation_reason)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment cancelled successfully",
        "appointment": appointment
    })))
}

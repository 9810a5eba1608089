use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::extractor::caller_role;

use crate::models::{AvailabilityError, CreateAvailabilityRequest, UpdateAvailabilityRequest};
use crate::router::DoctorCellState;

fn map_availability_error(e: AvailabilityError) -> AppError {
    match e {
        AvailabilityError::NotFound => AppError::NotFound("Availability not found".to_string()),
        AvailabilityError::DoctorNotFound => {
            AppError::NotFound("Doctor profile not found".to_string())
        }
        AvailabilityError::InvalidTimeRange | AvailabilityError::Overlap => {
            AppError::BadRequest(e.to_string())
        }
        AvailabilityError::Forbidden(msg) => AppError::Forbidden(msg),
        AvailabilityError::DatabaseError(msg) => AppError::Database(msg),
    }
}

/// Doctor acting on their own schedule.
fn require_doctor(user: &User) -> Result<&str, AppError> {
    match caller_role(user)? {
        Role::Doctor => Ok(user.id.as_str()),
        _ => Err(AppError::Forbidden(
            "Only doctors can manage their availability".to_string(),
        )),
    }
}

/// Owner restriction for template changes: doctors are limited to their own
/// templates, admins are not.
fn template_owner(user: &User) -> Result<Option<&str>, AppError> {
    match caller_role(user)? {
        Role::Doctor => Ok(Some(user.id.as_str())),
        Role::Admin => Ok(None),
        Role::Patient => Err(AppError::Forbidden(
            "Patients cannot modify availability".to_string(),
        )),
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(state): State<DoctorCellState>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let availability = state
        .availability
        .list_active(&doctor_id)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!(availability)))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_availability(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let availability = state
        .availability
        .list_own(doctor_id)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor_id = require_doctor(&user)?;

    let availability = state
        .availability
        .create_availability(doctor_id, request)
        .await
        .map_err(map_availability_error)?;

    Ok((StatusCode::CREATED, Json(json!(availability))))
}

#[axum::debug_handler]
pub async fn setup_default_availability(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor_id = require_doctor(&user)?;

    let created = state
        .availability
        .setup_default_availability(doctor_id)
        .await
        .map_err(map_availability_error)?;

    Ok((StatusCode::CREATED, Json(json!(created))))
}

#[axum::debug_handler]
pub async fn update_availability(
    State(state): State<DoctorCellState>,
    Path(availability_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let owner = template_owner(&user)?;

    let updated = state
        .availability
        .update_availability(&availability_id, owner, request)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn delete_availability(
    State(state): State<DoctorCellState>,
    Path(availability_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let owner = template_owner(&user)?;

    state
        .availability
        .delete_availability(&availability_id, owner)
        .await
        .map_err(map_availability_error)?;

    Ok(Json(json!({ "message": "Availability deleted successfully" })))
}

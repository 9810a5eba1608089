use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use shared_models::auth::Role;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Statuses reachable from `current` for patients and doctors.
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::InProgress => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => vec![],
        }
    }

    /// Admins may move any appointment to any status, terminal ones included.
    pub fn can_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
        role: Role,
    ) -> bool {
        match role {
            Role::Admin => true,
            Role::Patient | Role::Doctor => self
                .get_valid_transitions(current_status)
                .contains(&new_status),
        }
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
        role: Role,
    ) -> Result<(), AppointmentError> {
        debug!(
            "Validating status transition from {} to {} as {}",
            current_status, new_status, role
        );

        if !self.can_transition(current_status, new_status, role) {
            warn!(
                "Invalid status transition attempted by {}: {} -> {}",
                role, current_status, new_status
            );
            return Err(AppointmentError::InvalidStatusTransition {
                current: current_status,
                requested: new_status,
            });
        }

        Ok(())
    }

    /// Validates and returns the appointment as it looks after the change.
    /// The input is left untouched when the transition is rejected.
    pub fn apply_transition(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        role: Role,
        cancellation_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        self.validate_status_transition(appointment.status, new_status, role)?;

        let mut updated = appointment.clone();
        updated.status = new_status;
        updated.updated_at = Some(now);

        if new_status == AppointmentStatus::Cancelled {
            updated.cancelled_at = Some(now);
            updated.cancellation_reason =
                Some(cancellation_reason.unwrap_or_else(|| format!("Cancelled by {}", role)));
        } else if appointment.status == AppointmentStatus::Cancelled {
            // Leaving Cancelled (admin reopen) drops the stale cancellation stamp.
            updated.cancelled_at = None;
            updated.cancellation_reason = None;
        }

        info!(
            "Appointment {} moves {} -> {}",
            appointment.id, appointment.status, new_status
        );
        Ok(updated)
    }
}

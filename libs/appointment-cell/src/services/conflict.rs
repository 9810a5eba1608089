use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentError};
use crate::repository::AppointmentRepository;

/// First appointment that blocks exactly this slot. Overlapping but
/// differently bounded appointments do not count.
pub fn find_blocking<'a>(
    appointments: &'a [Appointment],
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Option<&'a Appointment> {
    appointments
        .iter()
        .find(|a| a.status.blocks_slot() && a.occupies(date, start_time, end_time))
}

pub struct ConflictDetectionService {
    appointments: Arc<dyn AppointmentRepository>,
}

impl ConflictDetectionService {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    /// True iff a Confirmed, InProgress, Completed or NoShow appointment of
    /// the doctor sits on exactly this slot.
    pub async fn has_conflict(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<bool, AppointmentError> {
        Ok(self
            .blocking_appointment(doctor_id, date, start_time, end_time, None)
            .await?
            .is_some())
    }

    /// The appointment blocking the slot, ignoring `exclude_id`.
    pub async fn blocking_appointment(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        exclude_id: Option<&str>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        debug!(
            "Checking conflicts for doctor {} on {} {}-{}",
            doctor_id, date, start_time, end_time
        );

        let mut existing = self
            .appointments
            .find_by_slot(doctor_id, date, start_time, end_time)
            .await?;
        existing.retain(|a| Some(a.id.as_str()) != exclude_id);

        let blocking = find_blocking(&existing, date, start_time, end_time).cloned();
        if let Some(appointment) = &blocking {
            warn!(
                "Slot {} {}-{} for doctor {} is held by appointment {} ({})",
                date, start_time, end_time, doctor_id, appointment.id, appointment.status
            );
        }
        Ok(blocking)
    }
}

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::repository::DoctorDirectory;
use shared_models::auth::Role;
use shared_utils::clock::Clock;

use crate::models::{
    Actor, Appointment, AppointmentError, AppointmentQuery, AppointmentStatus,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::repository::AppointmentRepository;
use crate::services::access::{authorize, scoped_filter};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;

/// Booking and status changes of appointments.
pub struct AppointmentBookingService {
    doctors: Arc<dyn DoctorDirectory>,
    appointments: Arc<dyn AppointmentRepository>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
    enforce_single_confirmation: bool,
}

impl AppointmentBookingService {
    pub fn new(
        doctors: Arc<dyn DoctorDirectory>,
        appointments: Arc<dyn AppointmentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            doctors,
            conflict_service: ConflictDetectionService::new(appointments.clone()),
            appointments,
            lifecycle_service: AppointmentLifecycleService::new(),
            clock,
            enforce_single_confirmation: false,
        }
    }

    /// Refuse moving an appointment into a slot-blocking status while another
    /// appointment already blocks the same slot.
    pub fn with_single_confirmation(mut self, enforce: bool) -> Self {
        self.enforce_single_confirmation = enforce;
        self
    }

    /// Books a tentative `Scheduled` hold. Several holds on one slot may
    /// coexist; only committed appointments block it.
    #[instrument(skip(self, request), fields(doctor_id = %request.doctor_id))]
    pub async fn create_appointment(
        &self,
        patient_id: &str,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let doctor = match self.doctors.find_doctor(&request.doctor_id).await? {
            Some(doctor) if doctor.is_verified => doctor,
            _ => {
                warn!("Booking refused, doctor {} unknown or unverified", request.doctor_id);
                return Err(AppointmentError::DoctorNotFound);
            }
        };

        if request.start_time >= request.end_time {
            return Err(AppointmentError::InvalidTimeRange);
        }

        let requested_start = request.appointment_date.and_time(request.start_time);
        if requested_start <= self.clock.local_now() {
            return Err(AppointmentError::NotInFuture);
        }

        if self
            .conflict_service
            .has_conflict(
                &doctor.id,
                request.appointment_date,
                request.start_time,
                request.end_time,
            )
            .await?
        {
            return Err(AppointmentError::SlotUnavailable);
        }

        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor.id.clone(),
            patient_id: patient_id.to_string(),
            appointment_date: request.appointment_date,
            start_time: request.start_time,
            end_time: request.end_time,
            status: AppointmentStatus::Scheduled,
            reason: request.reason,
            notes: None,
            fee: doctor.consultation_fee,
            created_at: self.clock.now(),
            updated_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            version: 0,
        };

        let created = self.appointments.insert(appointment).await?;
        info!(
            "Appointment {} booked for patient {} with doctor {} on {} {}",
            created.id, patient_id, created.doctor_id, created.appointment_date, created.start_time
        );
        Ok(created)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: &str,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        authorize(actor, &appointment)?;
        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        actor: &Actor,
        query: AppointmentQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = scoped_filter(actor, query);
        debug!("Listing appointments with filter {:?}", filter);
        Ok(self.appointments.list(filter).await?)
    }

    /// Authorizes, validates and writes a status change. The write only
    /// lands if the row still has the version that was validated.
    #[instrument(skip(self, actor, cancellation_reason), fields(role = %actor.role))]
    pub async fn update_status(
        &self,
        appointment_id: &str,
        actor: &Actor,
        new_status: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;
        authorize(actor, &current)?;

        let updated = self.lifecycle_service.apply_transition(
            &current,
            new_status,
            actor.role,
            cancellation_reason,
            self.clock.now(),
        )?;

        if self.enforce_single_confirmation && new_status.blocks_slot() {
            self.ensure_slot_free(&updated).await?;
        }

        self.commit(&current, updated).await
    }

    /// Reschedules or annotates an appointment on behalf of its doctor or an
    /// admin. A moved window goes through the booking checks again.
    #[instrument(skip(self, actor, request), fields(role = %actor.role))]
    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        actor: &Actor,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;
        if actor.role == Role::Patient {
            return Err(AppointmentError::Forbidden(
                "Only the assigned doctor or an admin can update this appointment".to_string(),
            ));
        }
        authorize(actor, &current)?;

        let now = self.clock.now();
        let mut updated = match request.status {
            Some(status) => self.lifecycle_service.apply_transition(
                &current,
                status,
                actor.role,
                request.cancellation_reason,
                now,
            )?,
            None => {
                let mut unchanged = current.clone();
                unchanged.updated_at = Some(now);
                unchanged
            }
        };

        if let Some(date) = request.appointment_date {
            updated.appointment_date = date;
        }
        if let Some(start_time) = request.start_time {
            updated.start_time = start_time;
        }
        if let Some(end_time) = request.end_time {
            updated.end_time = end_time;
        }
        if let Some(reason) = request.reason {
            updated.reason = Some(reason);
        }
        if let Some(notes) = request.notes {
            updated.notes = Some(notes);
        }

        let moved =
            !updated.occupies(current.appointment_date, current.start_time, current.end_time);
        if moved {
            if updated.start_time >= updated.end_time {
                return Err(AppointmentError::InvalidTimeRange);
            }
            if updated.appointment_date.and_time(updated.start_time) <= self.clock.local_now() {
                return Err(AppointmentError::NotInFuture);
            }
            self.ensure_slot_free(&updated).await?;
            info!(
                "Appointment {} moved to {} {}-{}",
                updated.id, updated.appointment_date, updated.start_time, updated.end_time
            );
        } else if self.enforce_single_confirmation
            && request.status.is_some_and(AppointmentStatus::blocks_slot)
        {
            self.ensure_slot_free(&updated).await?;
        }

        self.commit(&current, updated).await
    }

    /// Cancellation with an explicit reason. Same rules as any other status
    /// change.
    pub async fn cancel_appointment(
        &self,
        appointment_id: &str,
        actor: &Actor,
        cancellation_reason: String,
    ) -> Result<Appointment, AppointmentError> {
        self.update_status(
            appointment_id,
            actor,
            AppointmentStatus::Cancelled,
            Some(cancellation_reason),
        )
        .await
    }

    /// Booking is reserved to patients, who always book for themselves.
    pub fn require_patient(actor: &Actor) -> Result<&str, AppointmentError> {
        match actor.role {
            Role::Patient => Ok(actor.user_id.as_str()),
            _ => Err(AppointmentError::Forbidden(
                "Only patients can book appointments".to_string(),
            )),
        }
    }

    /// Fails when another appointment already blocks the window of `appointment`.
    async fn ensure_slot_free(&self, appointment: &Appointment) -> Result<(), AppointmentError> {
        let holder = self
            .conflict_service
            .blocking_appointment(
                &appointment.doctor_id,
                appointment.appointment_date,
                appointment.start_time,
                appointment.end_time,
                Some(&appointment.id),
            )
            .await?;
        match holder {
            Some(_) => Err(AppointmentError::SlotUnavailable),
            None => Ok(()),
        }
    }

    /// Writes `updated` only if the stored row is still at `current.version`.
    async fn commit(
        &self,
        current: &Appointment,
        mut updated: Appointment,
    ) -> Result<Appointment, AppointmentError> {
        updated.version = current.version + 1;
        self.appointments
            .compare_and_update(updated, current.version)
            .await?
            .ok_or_else(|| {
                warn!(
                    "Appointment {} changed since version {}",
                    current.id, current.version
                );
                AppointmentError::ConcurrentModification
            })
    }

    async fn load(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }
}

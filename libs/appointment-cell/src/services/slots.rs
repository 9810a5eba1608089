use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, instrument};

use doctor_cell::models::{Availability, DayOfWeek};
use doctor_cell::repository::{AvailabilityRepository, DoctorDirectory};
use shared_utils::clock::Clock;

use crate::models::{AppointmentError, CandidateSlot};
use crate::repository::AppointmentRepository;
use crate::services::conflict::find_blocking;

/// Projects weekly templates onto concrete dates. Nothing is stored; every
/// call reads the current templates and appointments.
pub struct SlotService {
    doctors: Arc<dyn DoctorDirectory>,
    availability: Arc<dyn AvailabilityRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    clock: Arc<dyn Clock>,
    max_range_days: i64,
}

impl SlotService {
    pub fn new(
        doctors: Arc<dyn DoctorDirectory>,
        availability: Arc<dyn AvailabilityRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        clock: Arc<dyn Clock>,
        max_range_days: i64,
    ) -> Self {
        Self {
            doctors,
            availability,
            appointments,
            clock,
            max_range_days,
        }
    }

    /// One slot per active template per matching date in `[start_date,
    /// end_date]`, ordered by date then start time.
    #[instrument(skip(self))]
    pub async fn list_slots(
        &self,
        doctor_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<CandidateSlot>, AppointmentError> {
        match self.doctors.find_doctor(doctor_id).await? {
            Some(doctor) if doctor.is_verified => {}
            _ => return Err(AppointmentError::DoctorNotFound),
        }

        if end_date < start_date {
            return Ok(Vec::new());
        }
        if (end_date - start_date).num_days() + 1 > self.max_range_days {
            return Err(AppointmentError::RangeTooLong {
                max_days: self.max_range_days,
            });
        }

        let mut by_day: HashMap<DayOfWeek, Vec<Availability>> = HashMap::new();
        for template in self.availability.list_for_doctor(doctor_id).await? {
            if template.is_active {
                by_day.entry(template.day_of_week).or_default().push(template);
            }
        }
        for templates in by_day.values_mut() {
            templates.sort_by_key(|t| (t.start_time, t.end_time));
        }

        let booked = self
            .appointments
            .list_for_doctor_between(doctor_id, start_date, end_date)
            .await?;
        let now = self.clock.local_now();

        let mut slots = Vec::new();
        let mut date = start_date;
        while date <= end_date {
            let day = DayOfWeek::from(date.weekday());
            for template in by_day.get(&day).into_iter().flatten() {
                let blocked =
                    find_blocking(&booked, date, template.start_time, template.end_time).is_some();
                let in_future = date.and_time(template.start_time) > now;

                slots.push(CandidateSlot {
                    date,
                    start_time: template.start_time,
                    end_time: template.end_time,
                    is_available: !blocked && in_future,
                });
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        debug!(
            "Materialized {} slots for doctor {} between {} and {}",
            slots.len(),
            doctor_id,
            start_date,
            end_date
        );
        Ok(slots)
    }
}

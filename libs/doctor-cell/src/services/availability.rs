use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_utils::clock::Clock;

use crate::models::{
    times_overlap, Availability, AvailabilityError, CreateAvailabilityRequest, DayOfWeek, Doctor,
    UpdateAvailabilityRequest,
};
use crate::repository::{AvailabilityRepository, DoctorDirectory};

/// Days that receive the default schedule.
const DEFAULT_DAYS: [DayOfWeek; 6] = [
    DayOfWeek::Monday,
    DayOfWeek::Tuesday,
    DayOfWeek::Wednesday,
    DayOfWeek::Thursday,
    DayOfWeek::Friday,
    DayOfWeek::Saturday,
];
const DEFAULT_FIRST_HOUR: u32 = 9;
const DEFAULT_LAST_HOUR: u32 = 21;

/// Manages the weekly availability templates of doctors.
pub struct AvailabilityService {
    doctors: Arc<dyn DoctorDirectory>,
    availability: Arc<dyn AvailabilityRepository>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(
        doctors: Arc<dyn DoctorDirectory>,
        availability: Arc<dyn AvailabilityRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            doctors,
            availability,
            clock,
        }
    }

    /// Active templates of a doctor, as shown to patients.
    pub async fn list_active(&self, doctor_id: &str) -> Result<Vec<Availability>, AvailabilityError> {
        debug!("Fetching active availability for doctor: {}", doctor_id);
        let all = self.availability.list_for_doctor(doctor_id).await?;
        Ok(all.into_iter().filter(|a| a.is_active).collect())
    }

    /// Every template of the doctor, including inactive ones.
    pub async fn list_own(&self, doctor_id: &str) -> Result<Vec<Availability>, AvailabilityError> {
        self.require_doctor(doctor_id).await?;
        Ok(self.availability.list_for_doctor(doctor_id).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create_availability(
        &self,
        doctor_id: &str,
        request: CreateAvailabilityRequest,
    ) -> Result<Availability, AvailabilityError> {
        self.require_doctor(doctor_id).await?;
        validate_range(request.start_time, request.end_time)?;
        self.ensure_no_overlap(
            doctor_id,
            request.day_of_week,
            request.start_time,
            request.end_time,
            None,
        )
        .await?;

        let availability = Availability {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.to_string(),
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            is_active: true,
            created_at: self.clock.now(),
            updated_at: None,
        };

        let created = self.availability.insert(availability).await?;
        info!(
            "Availability {} created for doctor {} on {}",
            created.id, doctor_id, created.day_of_week
        );
        Ok(created)
    }

    /// Replaces day and times of a template owned by `doctor_id`. Admins pass
    /// `None` to act on any template.
    #[instrument(skip(self, request))]
    pub async fn update_availability(
        &self,
        availability_id: &str,
        doctor_id: Option<&str>,
        request: UpdateAvailabilityRequest,
    ) -> Result<Availability, AvailabilityError> {
        let current = self.owned_template(availability_id, doctor_id).await?;
        validate_range(request.start_time, request.end_time)?;

        let is_active = request.is_active.unwrap_or(current.is_active);
        if is_active {
            self.ensure_no_overlap(
                &current.doctor_id,
                request.day_of_week,
                request.start_time,
                request.end_time,
                Some(&current.id),
            )
            .await?;
        }

        let updated = Availability {
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
            is_active,
            updated_at: Some(self.clock.now()),
            ..current
        };

        self.availability
            .update(updated)
            .await?
            .ok_or(AvailabilityError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn delete_availability(
        &self,
        availability_id: &str,
        doctor_id: Option<&str>,
    ) -> Result<(), AvailabilityError> {
        self.owned_template(availability_id, doctor_id).await?;

        if !self.availability.delete(availability_id).await? {
            return Err(AvailabilityError::NotFound);
        }
        info!("Availability {} deleted", availability_id);
        Ok(())
    }

    /// Creates the default hourly schedule. Windows that would overlap an
    /// existing active template are skipped, so calling this twice is a no-op.
    #[instrument(skip(self))]
    pub async fn setup_default_availability(
        &self,
        doctor_id: &str,
    ) -> Result<Vec<Availability>, AvailabilityError> {
        self.require_doctor(doctor_id).await?;

        let existing: Vec<Availability> = self
            .availability
            .list_for_doctor(doctor_id)
            .await?
            .into_iter()
            .filter(|a| a.is_active)
            .collect();

        let now = self.clock.now();
        let mut to_create = Vec::new();
        for day in DEFAULT_DAYS {
            for hour in DEFAULT_FIRST_HOUR..DEFAULT_LAST_HOUR {
                let (start, end) = match (
                    NaiveTime::from_hms_opt(hour, 0, 0),
                    NaiveTime::from_hms_opt(hour + 1, 0, 0),
                ) {
                    (Some(start), Some(end)) => (start, end),
                    _ => continue,
                };

                let taken = existing
                    .iter()
                    .any(|a| a.day_of_week == day && a.overlaps(start, end));
                if taken {
                    debug!("Skipping default window {} {}-{}", day, start, end);
                    continue;
                }

                to_create.push(Availability {
                    id: Uuid::new_v4().to_string(),
                    doctor_id: doctor_id.to_string(),
                    day_of_week: day,
                    start_time: start,
                    end_time: end,
                    is_active: true,
                    created_at: now,
                    updated_at: None,
                });
            }
        }

        let created = self.availability.insert_many(to_create).await?;
        info!(
            "Created {} default availability templates for doctor {}",
            created.len(),
            doctor_id
        );
        Ok(created)
    }

    async fn require_doctor(&self, doctor_id: &str) -> Result<Doctor, AvailabilityError> {
        self.doctors.find_doctor(doctor_id).await?.ok_or_else(|| {
            warn!("Doctor profile not found: {}", doctor_id);
            AvailabilityError::DoctorNotFound
        })
    }

    async fn owned_template(
        &self,
        availability_id: &str,
        doctor_id: Option<&str>,
    ) -> Result<Availability, AvailabilityError> {
        let template = self
            .availability
            .get(availability_id)
            .await?
            .ok_or(AvailabilityError::NotFound)?;

        if let Some(owner) = doctor_id {
            if template.doctor_id != owner {
                return Err(AvailabilityError::Forbidden(
                    "Not authorized to modify this availability".to_string(),
                ));
            }
        }
        Ok(template)
    }

    async fn ensure_no_overlap(
        &self,
        doctor_id: &str,
        day_of_week: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<&str>,
    ) -> Result<(), AvailabilityError> {
        let same_day = self
            .availability
            .list_active_for_day(doctor_id, day_of_week)
            .await?;

        let clash = same_day
            .iter()
            .filter(|a| Some(a.id.as_str()) != exclude_id)
            .find(|a| times_overlap(a.start_time, a.end_time, start, end));

        if let Some(existing) = clash {
            warn!(
                "Availability {}-{} on {} overlaps template {}",
                start, end, day_of_week, existing.id
            );
            return Err(AvailabilityError::Overlap);
        }
        Ok(())
    }
}

fn validate_range(start: NaiveTime, end: NaiveTime) -> Result<(), AvailabilityError> {
    if start >= end {
        return Err(AvailabilityError::InvalidTimeRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockAvailabilityRepository, MockDoctorDirectory};
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use shared_utils::clock::FixedClock;

    fn clock() -> Arc<dyn Clock> {
        let local = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Arc::new(FixedClock::at(local))
    }

    fn doctor() -> Doctor {
        Doctor {
            id: "doc-1".to_string(),
            first_name: "Amara".to_string(),
            last_name: "Okafor".to_string(),
            specialization: None,
            consultation_fee: Some(100.0),
            is_verified: true,
        }
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_database_error() {
        let mut doctors = MockDoctorDirectory::new();
        doctors
            .expect_find_doctor()
            .returning(|_| Ok(Some(doctor())));

        let mut repo = MockAvailabilityRepository::new();
        repo.expect_list_active_for_day()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset")));
        repo.expect_insert().never();

        let service = AvailabilityService::new(Arc::new(doctors), Arc::new(repo), clock());
        let result = service
            .create_availability(
                "doc-1",
                CreateAvailabilityRequest {
                    day_of_week: DayOfWeek::Monday,
                    start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                },
            )
            .await;

        assert_matches!(result, Err(AvailabilityError::DatabaseError(msg)) if msg.contains("connection reset"));
    }

    #[tokio::test]
    async fn inverted_range_is_rejected_before_store_access() {
        let mut doctors = MockDoctorDirectory::new();
        doctors
            .expect_find_doctor()
            .returning(|_| Ok(Some(doctor())));
        let mut repo = MockAvailabilityRepository::new();
        repo.expect_list_active_for_day().never();

        let service = AvailabilityService::new(Arc::new(doctors), Arc::new(repo), clock());
        let result = service
            .create_availability(
                "doc-1",
                CreateAvailabilityRequest {
                    day_of_week: DayOfWeek::Monday,
                    start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                },
            )
            .await;

        assert_matches!(result, Err(AvailabilityError::InvalidTimeRange));
    }
}

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::RwLock;

use crate::models::{Appointment, AppointmentFilter};

use super::AppointmentRepository;

/// Process-local appointment table. Each method holds the lock for its whole
/// body, so a conditional update is atomic per row.
#[derive(Debug, Default)]
pub struct InMemoryAppointmentRepository {
    rows: RwLock<HashMap<String, Appointment>>,
}

fn ordered(mut rows: Vec<Appointment>) -> Vec<Appointment> {
    rows.sort_by(|a, b| {
        (a.appointment_date, a.start_time, a.created_at, &a.id).cmp(&(
            b.appointment_date,
            b.start_time,
            b.created_at,
            &b.id,
        ))
    });
    rows
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment> {
        self.rows
            .write()
            .await
            .insert(appointment.id.clone(), appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, appointment_id: &str) -> Result<Option<Appointment>> {
        Ok(self.rows.read().await.get(appointment_id).cloned())
    }

    async fn find_by_slot(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Vec<Appointment>> {
        let rows = self.rows.read().await;
        Ok(ordered(
            rows.values()
                .filter(|a| a.doctor_id == doctor_id && a.occupies(date, start_time, end_time))
                .cloned()
                .collect(),
        ))
    }

    async fn list_for_doctor_between(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>> {
        let rows = self.rows.read().await;
        Ok(ordered(
            rows.values()
                .filter(|a| {
                    a.doctor_id == doctor_id
                        && a.appointment_date >= from
                        && a.appointment_date <= to
                })
                .cloned()
                .collect(),
        ))
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>> {
        let rows = self.rows.read().await;
        Ok(ordered(
            rows.values().filter(|a| filter.matches(a)).cloned().collect(),
        ))
    }

    async fn compare_and_update(
        &self,
        appointment: Appointment,
        expected_version: i64,
    ) -> Result<Option<Appointment>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&appointment.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = appointment.clone();
                Ok(Some(appointment))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::Utc;

    fn appointment(id: &str, version: i64) -> Appointment {
        Appointment {
            id: id.to_string(),
            doctor_id: "doc-1".to_string(),
            patient_id: "pat-1".to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            fee: Some(100.0),
            created_at: Utc::now(),
            updated_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            version,
        }
    }

    #[tokio::test]
    async fn stale_version_is_not_written() {
        let repo = InMemoryAppointmentRepository::default();
        repo.insert(appointment("a1", 0)).await.unwrap();

        let mut first = appointment("a1", 1);
        first.status = AppointmentStatus::Confirmed;
        assert!(repo.compare_and_update(first, 0).await.unwrap().is_some());

        let mut second = appointment("a1", 1);
        second.status = AppointmentStatus::Cancelled;
        assert!(repo.compare_and_update(second, 0).await.unwrap().is_none());

        let stored = repo.get("a1").await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn missing_row_is_not_created() {
        let repo = InMemoryAppointmentRepository::default();
        assert!(repo
            .compare_and_update(appointment("ghost", 1), 0)
            .await
            .unwrap()
            .is_none());
        assert!(repo.get("ghost").await.unwrap().is_none());
    }
}

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Availability, DayOfWeek, Doctor};

use super::{AvailabilityRepository, DoctorDirectory};

#[derive(Debug, Default)]
pub struct InMemoryDoctorDirectory {
    doctors: RwLock<HashMap<String, Doctor>>,
}

impl InMemoryDoctorDirectory {
    pub fn with_doctors(doctors: impl IntoIterator<Item = Doctor>) -> Self {
        Self {
            doctors: RwLock::new(
                doctors
                    .into_iter()
                    .map(|doctor| (doctor.id.clone(), doctor))
                    .collect(),
            ),
        }
    }

    pub async fn upsert(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id.clone(), doctor);
    }

    pub async fn set_consultation_fee(&self, doctor_id: &str, fee: Option<f64>) -> bool {
        match self.doctors.write().await.get_mut(doctor_id) {
            Some(doctor) => {
                doctor.consultation_fee = fee;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn find_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>> {
        Ok(self.doctors.read().await.get(doctor_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAvailabilityRepository {
    rows: RwLock<HashMap<String, Availability>>,
}

fn sorted(mut rows: Vec<Availability>) -> Vec<Availability> {
    rows.sort_by(|a, b| {
        (a.day_of_week, a.start_time, &a.id).cmp(&(b.day_of_week, b.start_time, &b.id))
    });
    rows
}

#[async_trait]
impl AvailabilityRepository for InMemoryAvailabilityRepository {
    async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Availability>> {
        let rows = self.rows.read().await;
        Ok(sorted(
            rows.values()
                .filter(|a| a.doctor_id == doctor_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_active_for_day(
        &self,
        doctor_id: &str,
        day_of_week: DayOfWeek,
    ) -> Result<Vec<Availability>> {
        let rows = self.rows.read().await;
        Ok(sorted(
            rows.values()
                .filter(|a| a.doctor_id == doctor_id && a.day_of_week == day_of_week && a.is_active)
                .cloned()
                .collect(),
        ))
    }

    async fn get(&self, availability_id: &str) -> Result<Option<Availability>> {
        Ok(self.rows.read().await.get(availability_id).cloned())
    }

    async fn insert(&self, availability: Availability) -> Result<Availability> {
        self.rows
            .write()
            .await
            .insert(availability.id.clone(), availability.clone());
        Ok(availability)
    }

    async fn insert_many(&self, availabilities: Vec<Availability>) -> Result<Vec<Availability>> {
        let mut rows = self.rows.write().await;
        for availability in &availabilities {
            rows.insert(availability.id.clone(), availability.clone());
        }
        Ok(availabilities)
    }

    async fn update(&self, availability: Availability) -> Result<Option<Availability>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&availability.id) {
            Some(existing) => {
                *existing = availability.clone();
                Ok(Some(availability))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, availability_id: &str) -> Result<bool> {
        Ok(self.rows.write().await.remove(availability_id).is_some())
    }
}

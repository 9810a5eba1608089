use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use shared_database::SupabaseClient;

use crate::models::{Availability, DayOfWeek, Doctor};

use super::{AvailabilityRepository, DoctorDirectory};

const DOCTORS: &str = "/rest/v1/doctors";
const AVAILABILITY: &str = "/rest/v1/doctor_availability";

pub struct SupabaseDoctorDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn find_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>> {
        let query = [
            ("id", format!("eq.{}", doctor_id)),
            (
                "select",
                "id,first_name,last_name,specialization,consultation_fee,is_verified".to_string(),
            ),
        ];
        let rows: Vec<Doctor> = self.supabase.request(Method::GET, DOCTORS, &query, None).await?;
        Ok(rows.into_iter().next())
    }
}

/// Row shape of `doctor_availability`.
#[derive(Debug, Serialize, Deserialize)]
struct AvailabilityRow {
    id: String,
    doctor_id: String,
    day_of_week: DayOfWeek,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<AvailabilityRow> for Availability {
    fn from(row: AvailabilityRow) -> Self {
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            day_of_week: row.day_of_week,
            start_time: row.start_time,
            end_time: row.end_time,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Availability> for AvailabilityRow {
    fn from(a: &Availability) -> Self {
        Self {
            id: a.id.clone(),
            doctor_id: a.doctor_id.clone(),
            day_of_week: a.day_of_week,
            start_time: a.start_time,
            end_time: a.end_time,
            is_active: a.is_active,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

pub struct SupabaseAvailabilityRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAvailabilityRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<Vec<Availability>> {
        let rows: Vec<AvailabilityRow> = self
            .supabase
            .request(Method::GET, AVAILABILITY, query, None)
            .await?;
        Ok(rows.into_iter().map(Availability::from).collect())
    }

    async fn write(
        &self,
        method: Method,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Vec<Availability>> {
        let rows: Vec<AvailabilityRow> = self
            .supabase
            .request_with_headers(
                method,
                AVAILABILITY,
                query,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(rows.into_iter().map(Availability::from).collect())
    }
}

#[async_trait]
impl AvailabilityRepository for SupabaseAvailabilityRepository {
    async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Availability>> {
        self.fetch(&[
            ("doctor_id", format!("eq.{}", doctor_id)),
            ("order", "day_of_week.asc,start_time.asc".to_string()),
        ])
        .await
    }

    async fn list_active_for_day(
        &self,
        doctor_id: &str,
        day_of_week: DayOfWeek,
    ) -> Result<Vec<Availability>> {
        self.fetch(&[
            ("doctor_id", format!("eq.{}", doctor_id)),
            ("day_of_week", format!("eq.{}", day_of_week.index())),
            ("is_active", "eq.true".to_string()),
            ("order", "start_time.asc".to_string()),
        ])
        .await
    }

    async fn get(&self, availability_id: &str) -> Result<Option<Availability>> {
        Ok(self
            .fetch(&[("id", format!("eq.{}", availability_id))])
            .await?
            .into_iter()
            .next())
    }

    async fn insert(&self, availability: Availability) -> Result<Availability> {
        let body = serde_json::to_value(AvailabilityRow::from(&availability))?;
        self.write(Method::POST, &[], body)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create availability"))
    }

    async fn insert_many(&self, availabilities: Vec<Availability>) -> Result<Vec<Availability>> {
        if availabilities.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<AvailabilityRow> = availabilities.iter().map(AvailabilityRow::from).collect();
        debug!("Inserting {} availability rows", rows.len());
        self.write(Method::POST, &[], serde_json::to_value(rows)?)
            .await
    }

    async fn update(&self, availability: Availability) -> Result<Option<Availability>> {
        let query = [("id", format!("eq.{}", availability.id))];
        let body = serde_json::to_value(AvailabilityRow::from(&availability))?;
        Ok(self.write(Method::PATCH, &query, body).await?.into_iter().next())
    }

    async fn delete(&self, availability_id: &str) -> Result<bool> {
        let query = [("id", format!("eq.{}", availability_id))];
        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                AVAILABILITY,
                &query,
                None,
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(!deleted.is_empty())
    }
}

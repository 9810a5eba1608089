use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus};

use super::AppointmentRepository;

const APPOINTMENTS: &str = "/rest/v1/appointments";
const ORDER: &str = "appointment_date.asc,start_time.asc,created_at.asc";

/// Row shape of `appointments`.
#[derive(Debug, Serialize, Deserialize)]
struct AppointmentRow {
    id: String,
    doctor_id: String,
    patient_id: String,
    appointment_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: AppointmentStatus,
    reason: Option<String>,
    notes: Option<String>,
    fee: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    version: i64,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
            appointment_date: row.appointment_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status,
            reason: row.reason,
            notes: row.notes,
            fee: row.fee,
            created_at: row.created_at,
            updated_at: row.updated_at,
            cancelled_at: row.cancelled_at,
            cancellation_reason: row.cancellation_reason,
            version: row.version,
        }
    }
}

impl From<&Appointment> for AppointmentRow {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id.clone(),
            doctor_id: a.doctor_id.clone(),
            patient_id: a.patient_id.clone(),
            appointment_date: a.appointment_date,
            start_time: a.start_time,
            end_time: a.end_time,
            status: a.status,
            reason: a.reason.clone(),
            notes: a.notes.clone(),
            fee: a.fee,
            created_at: a.created_at,
            updated_at: a.updated_at,
            cancelled_at: a.cancelled_at,
            cancellation_reason: a.cancellation_reason.clone(),
            version: a.version,
        }
    }
}

fn time_param(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

pub struct SupabaseAppointmentRepository {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, mut query: Vec<(&str, String)>) -> Result<Vec<Appointment>> {
        query.push(("order", ORDER.to_string()));
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request(Method::GET, APPOINTMENTS, &query, None)
            .await?;
        Ok(rows.into_iter().map(Appointment::from).collect())
    }

    async fn write(
        &self,
        method: Method,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Vec<Appointment>> {
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request_with_headers(
                method,
                APPOINTMENTS,
                query,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        Ok(rows.into_iter().map(Appointment::from).collect())
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment> {
        let body = serde_json::to_value(AppointmentRow::from(&appointment))?;
        self.write(Method::POST, &[], body)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Failed to create appointment"))
    }

    async fn get(&self, appointment_id: &str) -> Result<Option<Appointment>> {
        Ok(self
            .fetch(vec![("id", format!("eq.{}", appointment_id))])
            .await?
            .into_iter()
            .next())
    }

    async fn find_by_slot(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Vec<Appointment>> {
        self.fetch(vec![
            ("doctor_id", format!("eq.{}", doctor_id)),
            ("appointment_date", format!("eq.{}", date)),
            ("start_time", format!("eq.{}", time_param(start_time))),
            ("end_time", format!("eq.{}", time_param(end_time))),
        ])
        .await
    }

    async fn list_for_doctor_between(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>> {
        self.fetch(vec![
            ("doctor_id", format!("eq.{}", doctor_id)),
            ("appointment_date", format!("gte.{}", from)),
            ("appointment_date", format!("lte.{}", to)),
        ])
        .await
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>> {
        let mut query = Vec::new();
        if let Some(patient_id) = &filter.patient_id {
            query.push(("patient_id", format!("eq.{}", patient_id)));
        }
        if let Some(doctor_id) = &filter.doctor_id {
            query.push(("doctor_id", format!("eq.{}", doctor_id)));
        }
        if let Some(from) = filter.from_date {
            query.push(("appointment_date", format!("gte.{}", from)));
        }
        if let Some(to) = filter.to_date {
            query.push(("appointment_date", format!("lte.{}", to)));
        }
        if let Some(status) = filter.status {
            query.push(("status", format!("eq.{}", status)));
        }

        self.fetch(query).await
    }

    async fn compare_and_update(
        &self,
        appointment: Appointment,
        expected_version: i64,
    ) -> Result<Option<Appointment>> {
        let query = [
            ("id", format!("eq.{}", appointment.id)),
            ("version", format!("eq.{}", expected_version)),
        ];
        let body = serde_json::to_value(AppointmentRow::from(&appointment))?;
        let updated = self.write(Method::PATCH, &query, body).await?;
        if updated.is_empty() {
            debug!(
                "Conditional update of appointment {} at version {} matched no row",
                appointment.id, expected_version
            );
        }
        Ok(updated.into_iter().next())
    }
}

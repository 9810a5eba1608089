use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use shared_config::{AppConfig, DataBackend};
use shared_database::SupabaseClient;

use crate::models::{Appointment, AppointmentFilter};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryAppointmentRepository;
pub use supabase::SupabaseAppointmentRepository;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment>;

    async fn get(&self, appointment_id: &str) -> Result<Option<Appointment>>;

    /// Appointments of a doctor on exactly this slot, any status.
    async fn find_by_slot(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Vec<Appointment>>;

    /// Appointments of a doctor dated within `[from, to]`.
    async fn list_for_doctor_between(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>>;

    /// Filtered listing ordered by date, then start time.
    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>>;

    /// Stores `appointment` only if the stored row is still at
    /// `expected_version`. `None` means the row changed or vanished.
    async fn compare_and_update(
        &self,
        appointment: Appointment,
        expected_version: i64,
    ) -> Result<Option<Appointment>>;
}

pub fn build_repository(config: &AppConfig) -> Arc<dyn AppointmentRepository> {
    match config.data_backend {
        DataBackend::Supabase => Arc::new(SupabaseAppointmentRepository::new(Arc::new(
            SupabaseClient::new(config),
        ))),
        DataBackend::Memory => Arc::new(InMemoryAppointmentRepository::default()),
    }
}

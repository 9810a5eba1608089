use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use shared_config::{AppConfig, DataBackend};
use shared_database::SupabaseClient;

use crate::models::{Availability, DayOfWeek, Doctor};

pub mod memory;
pub mod supabase;

pub use memory::{InMemoryAvailabilityRepository, InMemoryDoctorDirectory};
pub use supabase::{SupabaseAvailabilityRepository, SupabaseDoctorDirectory};

/// Lookup of doctors owned by the profile service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn find_doctor(&self, doctor_id: &str) -> Result<Option<Doctor>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Every template of a doctor, active or not, ordered by day then start.
    async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<Availability>>;

    /// Active templates of a doctor for one weekday, ordered by start.
    async fn list_active_for_day(
        &self,
        doctor_id: &str,
        day_of_week: DayOfWeek,
    ) -> Result<Vec<Availability>>;

    async fn get(&self, availability_id: &str) -> Result<Option<Availability>>;

    async fn insert(&self, availability: Availability) -> Result<Availability>;

    async fn insert_many(&self, availabilities: Vec<Availability>) -> Result<Vec<Availability>>;

    /// Replaces the stored row. `None` when the id no longer exists.
    async fn update(&self, availability: Availability) -> Result<Option<Availability>>;

    /// `false` when nothing was deleted.
    async fn delete(&self, availability_id: &str) -> Result<bool>;
}

/// Repositories for the configured backend.
pub fn build_repositories(
    config: &AppConfig,
) -> (Arc<dyn DoctorDirectory>, Arc<dyn AvailabilityRepository>) {
    match config.data_backend {
        DataBackend::Supabase => {
            let client = Arc::new(SupabaseClient::new(config));
            (
                Arc::new(SupabaseDoctorDirectory::new(client.clone())),
                Arc::new(SupabaseAvailabilityRepository::new(client)),
            )
        }
        DataBackend::Memory => {
            let doctors = match config.memory_doctors_file.as_deref() {
                Some(path) => load_doctors(path).unwrap_or_else(|e| {
                    warn!("Could not seed doctors from {}: {:#}", path, e);
                    Vec::new()
                }),
                None => Vec::new(),
            };
            info!("In-memory doctor directory seeded with {} doctors", doctors.len());
            (
                Arc::new(InMemoryDoctorDirectory::with_doctors(doctors)),
                Arc::new(InMemoryAvailabilityRepository::default()),
            )
        }
    }
}

/// Reads a JSON array of doctor rows, same shape as the `doctors` table.
pub fn load_doctors(path: &str) -> Result<Vec<Doctor>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed_file(contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("doctors-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn memory_config(file: Option<String>) -> AppConfig {
        AppConfig {
            data_backend: DataBackend::Memory,
            memory_doctors_file: file,
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn memory_backend_serves_seeded_doctors() {
        let path = seed_file(
            &json!([{
                "id": "doc-1",
                "first_name": "Amara",
                "last_name": "Okafor",
                "specialization": "Cardiology",
                "consultation_fee": 120.0,
                "is_verified": true
            }])
            .to_string(),
        );

        let (doctors, _) = build_repositories(&memory_config(Some(path.clone())));
        let doctor = doctors.find_doctor("doc-1").await.unwrap().unwrap();
        assert!(doctor.is_verified);
        assert_eq!(doctor.consultation_fee, Some(120.0));

        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn unreadable_seed_leaves_directory_empty() {
        let (doctors, _) =
            build_repositories(&memory_config(Some("/nonexistent/doctors.json".to_string())));
        assert!(doctors.find_doctor("doc-1").await.unwrap().is_none());

        let bad = seed_file("not json");
        assert!(load_doctors(&bad).is_err());
        std::fs::remove_file(bad).unwrap();
    }
}

use std::env;
use std::str::FromStr;
use tracing::warn;

/// Which persistence backend the services talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBackend {
    Supabase,
    Memory,
}

impl FromStr for DataBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" | "postgrest" => Ok(DataBackend::Supabase),
            "memory" | "in-memory" | "in_memory" => Ok(DataBackend::Memory),
            other => Err(format!("unknown data backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub data_backend: DataBackend,
    pub server_port: u16,
    /// Offset of the clinic's wall clock from UTC. Slot start instants are
    /// compared against "now" in this offset.
    pub clinic_utc_offset_minutes: i32,
    pub max_slot_range_days: i64,
    pub enforce_single_confirmation: bool,
    /// JSON array of doctor rows loaded into the in-memory directory.
    pub memory_doctors_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: String::new(),
            data_backend: DataBackend::Supabase,
            server_port: 3000,
            clinic_utc_offset_minutes: 0,
            max_slot_range_days: 90,
            enforce_single_confirmation: false,
            memory_doctors_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            data_backend: parse_var("DATA_BACKEND", defaults.data_backend),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            clinic_utc_offset_minutes: parse_var(
                "CLINIC_UTC_OFFSET_MINUTES",
                defaults.clinic_utc_offset_minutes,
            ),
            max_slot_range_days: parse_var("MAX_SLOT_RANGE_DAYS", defaults.max_slot_range_days),
            enforce_single_confirmation: parse_var(
                "ENFORCE_SINGLE_CONFIRMATION",
                defaults.enforce_single_confirmation,
            ),
            memory_doctors_file: env::var("MEMORY_DOCTORS_FILE").ok(),
        };

        if config.data_backend == DataBackend::Supabase && !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if config.data_backend == DataBackend::Memory && config.memory_doctors_file.is_none() {
            warn!("MEMORY_DOCTORS_FILE not set, in-memory doctor directory starts empty");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

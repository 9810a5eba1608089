use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

/// Read-only view of a doctor as the scheduling core needs it. Profile
/// management lives elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: Option<String>,
    pub consultation_fee: Option<f64>,
    pub is_verified: bool,
}

// ==============================================================================
// DAY OF WEEK
// ==============================================================================

/// Weekday numbered Sunday = 0 through Saturday = 6.
///
/// Decodes from either the number or the day name and always encodes as the
/// number, which is what existing clients and the `day_of_week` column use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayOfWeek {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(index).ok()?).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<u64>() {
            return Self::from_index(index)
                .ok_or_else(|| format!("day of week must be between 0 and 6, got {}", index));
        }

        Self::ALL
            .iter()
            .copied()
            .find(|day| day.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown day of week: {}", trimmed))
    }
}

impl Serialize for DayOfWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index())
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DayOfWeekVisitor;

        impl Visitor<'_> for DayOfWeekVisitor {
            type Value = DayOfWeek;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a day number 0-6 (Sunday = 0) or a day name")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<DayOfWeek, E> {
                DayOfWeek::from_index(v)
                    .ok_or_else(|| E::custom(format!("day of week out of range: {}", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<DayOfWeek, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(format!("day of week out of range: {}", v)))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<DayOfWeek, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DayOfWeekVisitor)
    }
}

// ==============================================================================
// AVAILABILITY TEMPLATES
// ==============================================================================

/// Recurring weekly window during which a doctor sees patients. Each active
/// template yields one bookable slot per matching date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub id: String,
    pub doctor_id: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Availability {
    /// Half-open overlap: `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        times_overlap(self.start_time, self.end_time, start, end)
    }
}

pub fn times_overlap(s1: NaiveTime, e1: NaiveTime, s2: NaiveTime, e2: NaiveTime) -> bool {
    s1 < e2 && s2 < e1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAvailabilityRequest {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvailabilityRequest {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: Option<bool>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Availability not found")]
    NotFound,

    #[error("Doctor not found or not verified")]
    DoctorNotFound,

    #[error("Start time must be before end time")]
    InvalidTimeRange,

    #[error("This time slot overlaps with existing availability")]
    Overlap,

    #[error("{0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AvailabilityError {
    fn from(e: anyhow::Error) -> Self {
        AvailabilityError::DatabaseError(e.to_string())
    }
}

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};

use appointment_cell::models::*;
use appointment_cell::repository::InMemoryAppointmentRepository;
use appointment_cell::services::AppointmentBookingService;
use appointment_cell::AppointmentRepository;
use doctor_cell::models::Doctor;
use doctor_cell::repository::InMemoryDoctorDirectory;
use shared_models::auth::Role;
use shared_utils::clock::FixedClock;

const DOCTOR: &str = "doc-1";
const PATIENT: &str = "pat-1";

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

/// Monday 2025-01-06, 08:00 clinic time.
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

fn tomorrow() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()
}

struct Fixture {
    doctors: Arc<InMemoryDoctorDirectory>,
    appointments: Arc<InMemoryAppointmentRepository>,
    service: AppointmentBookingService,
}

async fn fixture_with(enforce_single_confirmation: bool) -> Fixture {
    let doctors = Arc::new(InMemoryDoctorDirectory::default());
    doctors
        .upsert(Doctor {
            id: DOCTOR.to_string(),
            first_name: "Amara".to_string(),
            last_name: "Okafor".to_string(),
            specialization: Some("Cardiology".to_string()),
            consultation_fee: Some(120.0),
            is_verified: true,
        })
        .await;
    doctors
        .upsert(Doctor {
            id: "doc-unverified".to_string(),
            first_name: "Lee".to_string(),
            last_name: "Park".to_string(),
            specialization: None,
            consultation_fee: Some(90.0),
            is_verified: false,
        })
        .await;

    let appointments = Arc::new(InMemoryAppointmentRepository::default());
    let clock = FixedClock::at(today().and_hms_opt(8, 0, 0).unwrap());
    let service = AppointmentBookingService::new(doctors.clone(), appointments.clone(), Arc::new(clock))
        .with_single_confirmation(enforce_single_confirmation);

    Fixture {
        doctors,
        appointments,
        service,
    }
}

async fn fixture() -> Fixture {
    fixture_with(false).await
}

fn request(date: NaiveDate, start: u32, end: u32) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        doctor_id: DOCTOR.to_string(),
        appointment_date: date,
        start_time: t(start),
        end_time: t(end),
        reason: Some("Check-up".to_string()),
    }
}

fn doctor() -> Actor {
    Actor::new(DOCTOR, Role::Doctor)
}

fn patient() -> Actor {
    Actor::new(PATIENT, Role::Patient)
}

#[tokio::test]
async fn test_booking_creates_scheduled_appointment_with_fee_snapshot() {
    let f = fixture().await;
    let created = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    assert_eq!(created.status, AppointmentStatus::Scheduled);
    assert_eq!(created.fee, Some(120.0));
    assert_eq!(created.patient_id, PATIENT);
    assert_eq!(created.version, 0);
    assert_eq!(created.reason.as_deref(), Some("Check-up"));
}

#[tokio::test]
async fn test_fee_change_does_not_touch_existing_appointments() {
    let f = fixture().await;
    let created = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    assert!(f.doctors.set_consultation_fee(DOCTOR, Some(300.0)).await);

    let reloaded = f.service.get_appointment(&created.id, &patient()).await.unwrap();
    assert_eq!(reloaded.fee, Some(120.0));

    let later = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 11, 12))
        .await
        .unwrap();
    assert_eq!(later.fee, Some(300.0));
}

#[tokio::test]
async fn test_unknown_or_unverified_doctor_is_not_found() {
    let f = fixture().await;

    let mut unknown = request(tomorrow(), 9, 10);
    unknown.doctor_id = "nobody".to_string();
    assert_matches!(
        f.service.create_appointment(PATIENT, unknown).await,
        Err(AppointmentError::DoctorNotFound)
    );

    let mut unverified = request(tomorrow(), 9, 10);
    unverified.doctor_id = "doc-unverified".to_string();
    assert_matches!(
        f.service.create_appointment(PATIENT, unverified).await,
        Err(AppointmentError::DoctorNotFound)
    );
}

#[tokio::test]
async fn test_booking_in_the_past_or_now_fails() {
    let f = fixture().await;

    assert_matches!(
        f.service
            .create_appointment(PATIENT, request(today(), 8, 9))
            .await,
        Err(AppointmentError::NotInFuture)
    );
    assert_matches!(
        f.service
            .create_appointment(PATIENT, request(today(), 7, 8))
            .await,
        Err(AppointmentError::NotInFuture)
    );

    // Later the same day is fine.
    f.service
        .create_appointment(PATIENT, request(today(), 9, 10))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_inverted_time_range_is_rejected() {
    let f = fixture().await;
    assert_matches!(
        f.service
            .create_appointment(PATIENT, request(tomorrow(), 10, 9))
            .await,
        Err(AppointmentError::InvalidTimeRange)
    );
}

#[tokio::test]
async fn test_scheduled_hold_does_not_block_second_booking() {
    // Overbooking at the Scheduled stage is current behaviour: both holds
    // succeed and coexist until one of them is confirmed.
    let f = fixture().await;
    let first = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    let second = f
        .service
        .create_appointment("pat-2", request(tomorrow(), 9, 10))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    let holds = f
        .appointments
        .find_by_slot(DOCTOR, tomorrow(), t(9), t(10))
        .await
        .unwrap();
    assert_eq!(holds.len(), 2);
    assert!(holds.iter().all(|a| a.status == AppointmentStatus::Scheduled));
}

#[tokio::test]
async fn test_confirmed_appointment_blocks_the_slot() {
    let f = fixture().await;
    let first = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    f.service
        .update_status(&first.id, &doctor(), AppointmentStatus::Confirmed, None)
        .await
        .unwrap();

    let result = f
        .service
        .create_appointment("pat-2", request(tomorrow(), 9, 10))
        .await;
    assert_matches!(result, Err(AppointmentError::SlotUnavailable));
    assert_eq!(
        result.unwrap_err().to_string(),
        "The selected time slot is not available"
    );

    // A different window on the same day is unaffected.
    f.service
        .create_appointment("pat-2", request(tomorrow(), 9, 11))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancelled_appointment_frees_the_slot() {
    let f = fixture().await;
    let first = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    f.service
        .update_status(&first.id, &doctor(), AppointmentStatus::Confirmed, None)
        .await
        .unwrap();
    f.service
        .cancel_appointment(&first.id, &patient(), "Travelling".to_string())
        .await
        .unwrap();

    f.service
        .create_appointment("pat-2", request(tomorrow(), 9, 10))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_status_walk_to_completion() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    let mut version = appt.version;
    for status in [
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
    ] {
        let updated = f
            .service
            .update_status(&appt.id, &doctor(), status, None)
            .await
            .unwrap();
        assert_eq!(updated.status, status);
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.version, version + 1);
        version = updated.version;
    }

    let reopened = f
        .service
        .update_status(&appt.id, &doctor(), AppointmentStatus::Scheduled, None)
        .await;
    assert_matches!(
        reopened,
        Err(AppointmentError::InvalidStatusTransition {
            current: AppointmentStatus::Completed,
            requested: AppointmentStatus::Scheduled
        })
    );

    let admin = Actor::new("admin-1", Role::Admin);
    let reopened = f
        .service
        .update_status(&appt.id, &admin, AppointmentStatus::Scheduled, None)
        .await
        .unwrap();
    assert_eq!(reopened.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_cancellation_reason_defaults_to_role() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    let cancelled = f
        .service
        .update_status(&appt.id, &doctor(), AppointmentStatus::Cancelled, None)
        .await
        .unwrap();

    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("Cancelled by Doctor")
    );
    assert!(cancelled.cancelled_at.is_some());
}

#[tokio::test]
async fn test_strangers_cannot_touch_appointments() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    let other_patient = Actor::new("pat-2", Role::Patient);
    let other_doctor = Actor::new("doc-2", Role::Doctor);

    assert_matches!(
        f.service.get_appointment(&appt.id, &other_patient).await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        f.service
            .update_status(&appt.id, &other_doctor, AppointmentStatus::Confirmed, None)
            .await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        f.service.get_appointment("missing", &patient()).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_listing_is_scoped_and_ordered() {
    let f = fixture().await;
    f.service
        .create_appointment(PATIENT, request(tomorrow(), 14, 15))
        .await
        .unwrap();
    f.service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    f.service
        .create_appointment("pat-2", request(today(), 10, 11))
        .await
        .unwrap();

    let mine = f
        .service
        .list_appointments(&patient(), AppointmentQuery::default())
        .await
        .unwrap();
    let starts: Vec<NaiveTime> = mine.iter().map(|a| a.start_time).collect();
    assert_eq!(starts, vec![t(9), t(14)]);

    let all_for_doctor = f
        .service
        .list_appointments(&doctor(), AppointmentQuery::default())
        .await
        .unwrap();
    assert_eq!(all_for_doctor.len(), 3);
    assert_eq!(all_for_doctor[0].appointment_date, today());

    let filtered = f
        .service
        .list_appointments(
            &doctor(),
            AppointmentQuery {
                from_date: Some(tomorrow()),
                to_date: None,
                status: Some(AppointmentStatus::Scheduled),
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);
}

#[tokio::test]
async fn test_single_confirmation_is_opt_in() {
    // Default: two holds may both be confirmed.
    let f = fixture().await;
    let a = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    let b = f
        .service
        .create_appointment("pat-2", request(tomorrow(), 9, 10))
        .await
        .unwrap();
    f.service
        .update_status(&a.id, &doctor(), AppointmentStatus::Confirmed, None)
        .await
        .unwrap();
    f.service
        .update_status(&b.id, &doctor(), AppointmentStatus::Confirmed, None)
        .await
        .unwrap();

    // Enforced: the first confirmation wins.
    let f = fixture_with(true).await;
    let a = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    let b = f
        .service
        .create_appointment("pat-2", request(tomorrow(), 9, 10))
        .await
        .unwrap();
    f.service
        .update_status(&a.id, &doctor(), AppointmentStatus::Confirmed, None)
        .await
        .unwrap();
    assert_matches!(
        f.service
            .update_status(&b.id, &doctor(), AppointmentStatus::Confirmed, None)
            .await,
        Err(AppointmentError::SlotUnavailable)
    );

    let b_after = f.service.get_appointment(&b.id, &doctor()).await.unwrap();
    assert_eq!(b_after.status, AppointmentStatus::Scheduled);
    // The losing hold can still be cancelled.
    f.service
        .update_status(&b.id, &doctor(), AppointmentStatus::Cancelled, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_cancellation_reason_is_stored_as_given() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    let cancelled = f
        .service
        .update_status(
            &appt.id,
            &patient(),
            AppointmentStatus::Cancelled,
            Some(String::new()),
        )
        .await
        .unwrap();

    assert_eq!(cancelled.cancellation_reason.as_deref(), Some(""));
}

#[tokio::test]
async fn test_admin_reopen_clears_cancellation() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    f.service
        .cancel_appointment(&appt.id, &patient(), "Travelling".to_string())
        .await
        .unwrap();

    let admin = Actor::new("admin-1", Role::Admin);
    let reopened = f
        .service
        .update_status(&appt.id, &admin, AppointmentStatus::Scheduled, None)
        .await
        .unwrap();

    assert_eq!(reopened.status, AppointmentStatus::Scheduled);
    assert!(reopened.cancelled_at.is_none());
    assert!(reopened.cancellation_reason.is_none());
}

#[tokio::test]
async fn test_doctor_reschedules_and_adds_notes() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    let edited = f
        .service
        .update_appointment(
            &appt.id,
            &doctor(),
            UpdateAppointmentRequest {
                start_time: Some(t(11)),
                end_time: Some(t(12)),
                notes: Some("Bring previous lab results".to_string()),
                ..UpdateAppointmentRequest::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.appointment_date, tomorrow());
    assert_eq!(edited.start_time, t(11));
    assert_eq!(edited.end_time, t(12));
    assert_eq!(edited.notes.as_deref(), Some("Bring previous lab results"));
    assert_eq!(edited.reason.as_deref(), Some("Check-up"));
    assert_eq!(edited.status, AppointmentStatus::Scheduled);
    assert_eq!(edited.version, appt.version + 1);
    assert!(edited.updated_at.is_some());
}

#[tokio::test]
async fn test_only_assigned_doctor_or_admin_may_edit() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();
    let notes = || UpdateAppointmentRequest {
        notes: Some("n".to_string()),
        ..UpdateAppointmentRequest::default()
    };

    assert_matches!(
        f.service.update_appointment(&appt.id, &patient(), notes()).await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        f.service
            .update_appointment(&appt.id, &Actor::new("doc-2", Role::Doctor), notes())
            .await,
        Err(AppointmentError::Forbidden(_))
    );

    let admin = Actor::new("admin-1", Role::Admin);
    let edited = f.service.update_appointment(&appt.id, &admin, notes()).await.unwrap();
    assert_eq!(edited.notes.as_deref(), Some("n"));
}

#[tokio::test]
async fn test_moved_window_is_checked_like_a_booking() {
    let f = fixture().await;
    let held = f
        .service
        .create_appointment("pat-2", request(tomorrow(), 11, 12))
        .await
        .unwrap();
    f.service
        .update_status(&held.id, &doctor(), AppointmentStatus::Confirmed, None)
        .await
        .unwrap();
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    let window = |date: NaiveDate, start: u32, end: u32| UpdateAppointmentRequest {
        appointment_date: Some(date),
        start_time: Some(t(start)),
        end_time: Some(t(end)),
        ..UpdateAppointmentRequest::default()
    };

    assert_matches!(
        f.service
            .update_appointment(&appt.id, &doctor(), window(tomorrow(), 11, 12))
            .await,
        Err(AppointmentError::SlotUnavailable)
    );
    assert_matches!(
        f.service
            .update_appointment(&appt.id, &doctor(), window(tomorrow(), 12, 11))
            .await,
        Err(AppointmentError::InvalidTimeRange)
    );
    assert_matches!(
        f.service
            .update_appointment(&appt.id, &doctor(), window(today(), 7, 8))
            .await,
        Err(AppointmentError::NotInFuture)
    );

    let unchanged = f.service.get_appointment(&appt.id, &doctor()).await.unwrap();
    assert_eq!(unchanged.start_time, t(9));
    assert_eq!(unchanged.version, appt.version);
}

#[tokio::test]
async fn test_edit_with_status_follows_transition_rules() {
    let f = fixture().await;
    let appt = f
        .service
        .create_appointment(PATIENT, request(tomorrow(), 9, 10))
        .await
        .unwrap();

    assert_matches!(
        f.service
            .update_appointment(
                &appt.id,
                &doctor(),
                UpdateAppointmentRequest {
                    status: Some(AppointmentStatus::Completed),
                    ..UpdateAppointmentRequest::default()
                },
            )
            .await,
        Err(AppointmentError::InvalidStatusTransition {
            current: AppointmentStatus::Scheduled,
            requested: AppointmentStatus::Completed
        })
    );

    let cancelled = f
        .service
        .update_appointment(
            &appt.id,
            &doctor(),
            UpdateAppointmentRequest {
                status: Some(AppointmentStatus::Cancelled),
                notes: Some("Patient called".to_string()),
                ..UpdateAppointmentRequest::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("Cancelled by Doctor")
    );
    assert_eq!(cancelled.notes.as_deref(), Some("Patient called"));
}

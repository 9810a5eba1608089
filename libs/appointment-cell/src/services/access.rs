use shared_models::auth::Role;

use crate::models::{Actor, Appointment, AppointmentError, AppointmentFilter, AppointmentQuery};

/// Patients reach their own appointments, doctors the ones assigned to them,
/// admins every appointment.
pub fn can_access(actor: &Actor, appointment: &Appointment) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Doctor => appointment.doctor_id == actor.user_id,
        Role::Patient => appointment.patient_id == actor.user_id,
    }
}

pub fn authorize(actor: &Actor, appointment: &Appointment) -> Result<(), AppointmentError> {
    if can_access(actor, appointment) {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden(
            "Not authorized to access this appointment".to_string(),
        ))
    }
}

/// Store filter for a listing, narrowed to what the actor may see.
pub fn scoped_filter(actor: &Actor, query: AppointmentQuery) -> AppointmentFilter {
    let mut filter = AppointmentFilter {
        from_date: query.from_date,
        to_date: query.to_date,
        status: query.status,
        ..AppointmentFilter::default()
    };
    match actor.role {
        Role::Patient => filter.patient_id = Some(actor.user_id.clone()),
        Role::Doctor => filter.doctor_id = Some(actor.user_id.clone()),
        Role::Admin => {}
    }
    filter
}

//! Per-doctor practice summary.

use crate::access::{self, Caller, ListScope, Resource};
use crate::db::{self, Database};
use crate::error::{ClinicError, Result};
use crate::models::AppointmentStatus;
use serde::Serialize;

/// How many distinct diagnoses the summary ranks.
const COMMON_DIAGNOSES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisCount {
    pub diagnosis: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAnalytics {
    pub total_appointments: u64,
    pub completed_appointments: u64,
    pub total_diagnoses: u64,
    /// Most frequent diagnosis texts, most frequent first.
    pub common_diagnoses: Vec<DiagnosisCount>,
}

/// Summarises the calling doctor's own practice.
///
/// # Errors
///
/// `Forbidden` for any caller who is not a doctor.
pub fn doctor_analytics(database: &Database, caller: &Caller) -> Result<DoctorAnalytics> {
    let doctor_id = match access::list_scope(caller, Resource::Analytics)? {
        ListScope::Doctor(id) => id,
        _ => return Err(ClinicError::forbidden("Only doctors have practice analytics")),
    };
    let conn = database.connect()?;
    let common_diagnoses =
        db::diagnoses::most_common_for_doctor(&conn, doctor_id, COMMON_DIAGNOSES)?
            .into_iter()
            .map(|(diagnosis, count)| DiagnosisCount { diagnosis, count })
            .collect();

    Ok(DoctorAnalytics {
        total_appointments: db::appointments::count_for_doctor(&conn, doctor_id, None)?,
        completed_appointments: db::appointments::count_for_doctor(
            &conn,
            doctor_id,
            Some(AppointmentStatus::Completed),
        )?,
        total_diagnoses: db::diagnoses::count_for_doctor(&conn, doctor_id)?,
        common_diagnoses,
    })
}

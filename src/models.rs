//! Data models for the clinic ledger.
//!
//! Directory records ([`User`], [`StaffProfile`]) are owned by the clinic's
//! staff directory and only read by the scheduling core. [`Appointment`],
//! [`Diagnosis`] and [`Prescription`] form the clinical chain of custody.

use crate::error::ClinicError;
use crate::slots::TimeSlot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// A stored or submitted label that does not name a known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl From<UnknownVariant> for ClinicError {
    fn from(err: UnknownVariant) -> Self {
        ClinicError::Validation(err.to_string())
    }
}

/// Parses a calendar day. Accepts a bare `YYYY-MM-DD` or any ISO-8601 timestamp
/// starting with one, which is what browser clients usually send.
pub fn parse_day(text: &str) -> Result<Date, ClinicError> {
    let text = text.trim();
    let head = text.get(..10).unwrap_or(text);
    Date::parse(head, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ClinicError::validation(format!("Invalid date '{text}', expected YYYY-MM-DD")))
}

/// Formats a calendar day as `YYYY-MM-DD`.
pub fn format_day(day: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        day.year(),
        u8::from(day.month()),
        day.day()
    )
}

/// Serde adapter for `YYYY-MM-DD` calendar days.
pub mod day_format {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(day: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_day(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_day(&text).map_err(de::Error::custom)
    }

    pub mod option {
        use serde::{de, Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(
            day: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match day {
                Some(day) => serializer.serialize_some(&crate::models::format_day(*day)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(text) if !text.trim().is_empty() => crate::models::parse_day(&text)
                    .map(Some)
                    .map_err(de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

/// The role a directory user plays in the clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Receptionist,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// A person known to the clinic directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The identity fields shown next to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Employment status of a staff member. Only `Active` doctors take bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StaffStatus {
    #[default]
    Active,
    Inactive,
    OnLeave,
}

impl StaffStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StaffStatus::Active => "active",
            StaffStatus::Inactive => "inactive",
            StaffStatus::OnLeave => "on-leave",
        }
    }
}

impl FromStr for StaffStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StaffStatus::Active),
            "inactive" => Ok(StaffStatus::Inactive),
            "on-leave" => Ok(StaffStatus::OnLeave),
            other => Err(UnknownVariant::new("staff status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub degree: String,
    pub institution: String,
    pub year: Option<i32>,
}

/// Professional details attached to a doctor or receptionist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffProfile {
    pub user_id: i64,
    pub role: Role,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<Qualification>,
    /// Years of practice.
    pub experience: Option<u32>,
    pub consultation_fee: Option<f64>,
    pub department: Option<String>,
    #[serde(default)]
    pub status: StaffStatus,
    #[serde(default)]
    pub is_verified: bool,
}

/// A doctor as listed in the bookable directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListing {
    pub user: UserSummary,
    pub profile: StaffProfile,
}

/// Lifecycle of an appointment.
///
/// `Scheduled` and `Completed` occupy the doctor's slot; `Cancelled` and
/// `NoShow` release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    pub fn occupies_slot(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Completed
        )
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    /// Only a scheduled appointment may move, and only to a terminal status.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        self == AppointmentStatus::Scheduled && next.is_terminal()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no-show" => Ok(AppointmentStatus::NoShow),
            other => Err(UnknownVariant::new("appointment status", other)),
        }
    }
}

/// A booked consultation between a patient and a doctor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    /// The receptionist who booked on the patient's behalf, if any.
    pub receptionist_id: Option<i64>,
    /// Start of the consultation (the slot start on the booked day, UTC).
    #[serde(with = "time::serde::rfc3339")]
    pub appointment_date: OffsetDateTime,
    pub time_slot: TimeSlot,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub diagnosis_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Appointment {
    /// The calendar day the appointment falls on.
    pub fn day(&self) -> Date {
        self.appointment_date.date()
    }
}

/// Vital signs captured during a consultation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub temperature: Option<f64>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<u32>,
    pub respiratory_rate: Option<u32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Routine,
    Urgent,
    Emergency,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Routine => "routine",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        }
    }
}

impl FromStr for Urgency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "routine" => Ok(Urgency::Routine),
            "urgent" => Ok(Urgency::Urgent),
            "emergency" => Ok(Urgency::Emergency),
            other => Err(UnknownVariant::new("urgency", other)),
        }
    }
}

/// The treating doctor's findings for exactly one appointment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub id: i64,
    pub appointment_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub symptoms: String,
    pub vitals: Vitals,
    pub observations: Option<String>,
    /// Advisory text; informational only.
    pub ai_analysis: Option<String>,
    pub diagnosis: String,
    pub icd10_code: Option<String>,
    pub treatment_plan: Option<String>,
    #[serde(with = "day_format::option")]
    pub follow_up_date: Option<Date>,
    pub urgency: Urgency,
    pub referral_needed: bool,
    pub referral_details: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// How often a medicine is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "Once daily")]
    OnceDaily,
    #[serde(rename = "Twice daily")]
    TwiceDaily,
    #[serde(rename = "Thrice daily")]
    ThriceDaily,
    #[serde(rename = "Every 4 hours")]
    Every4Hours,
    #[serde(rename = "Every 6 hours")]
    Every6Hours,
    #[serde(rename = "Every 8 hours")]
    Every8Hours,
}

/// One line of a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub name: String,
    /// e.g. `"500mg"`.
    pub dosage: String,
    pub frequency: Frequency,
    /// e.g. `"7 days"`.
    pub duration: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    #[default]
    Active,
    Expired,
    Completed,
}

impl PrescriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Expired => "expired",
            PrescriptionStatus::Completed => "completed",
        }
    }
}

impl FromStr for PrescriptionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PrescriptionStatus::Active),
            "expired" => Ok(PrescriptionStatus::Expired),
            "completed" => Ok(PrescriptionStatus::Completed),
            other => Err(UnknownVariant::new("prescription status", other)),
        }
    }
}

/// Medicines issued by a doctor, optionally tied to an appointment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub medicines: Vec<Medicine>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry_date: OffsetDateTime,
    pub status: PrescriptionStatus,
    pub pdf_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

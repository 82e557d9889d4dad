//! Appointment ledger.
//!
//! Owns appointment records: booking under the no-double-booking and
//! future-date rules, role-scoped listing, and status changes afterwards.
//!
//! Double booking is prevented twice over. Booking runs its conflict check and
//! insert inside one `IMMEDIATE` transaction, which serialises writers, and the
//! schema's partial unique index on `(doctor_id, appointment_day, time_slot)`
//! rejects any second slot-occupying row that slips past the check.

use crate::access::{self, Action, Caller, Owned, Ownership, Resource};
use crate::clock::Clock;
use crate::db::{self, directory, Database};
use crate::error::{is_unique_violation, ClinicError, Result};
use crate::models::{Appointment, AppointmentStatus, Role, StaffStatus};
use crate::slots::{self, TimeSlot};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::Arc;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

const SLOT_TAKEN: &str = "This time slot is already booked";

/// Input to [`AppointmentLedger::book`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub day: Date,
    pub time_slot: TimeSlot,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
}

/// Optional narrowing for [`AppointmentLedger::list`]. The default applies no
/// filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub day: Option<Date>,
}

#[derive(Clone)]
pub struct AppointmentLedger {
    db: Database,
    clock: Arc<dyn Clock>,
}

fn not_found() -> ClinicError {
    ClinicError::not_found("Appointment not found")
}

fn trimmed(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

impl AppointmentLedger {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Books a slot with a doctor.
    ///
    /// Patients may only book for themselves; receptionists may book for any
    /// patient and are recorded on the appointment.
    ///
    /// # Errors
    ///
    /// * `Forbidden` if the caller may not book for this patient.
    /// * `Validation` if the slot start is not strictly in the future, or the
    ///   doctor is not currently active.
    /// * `NotFound` if the patient or doctor is not in the directory.
    /// * `Conflict` if the doctor's slot is already occupied that day.
    pub fn book(&self, caller: &Caller, request: BookingRequest) -> Result<Appointment> {
        let receptionist_id = (caller.role == Role::Receptionist).then_some(caller.id);
        access::authorize(
            caller,
            Resource::Appointment,
            Action::Create,
            &Ownership {
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                receptionist_id,
            },
        )?;

        let now = self.clock.now();
        let starts_at = request.time_slot.starts_on(request.day);
        if starts_at <= now {
            return Err(ClinicError::validation(
                "Appointment date must be in the future",
            ));
        }

        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        directory::find_user(&tx, request.patient_id)?
            .filter(|user| user.role == Role::Patient)
            .ok_or_else(|| ClinicError::not_found("Patient not found"))?;
        directory::find_user(&tx, request.doctor_id)?
            .filter(|user| user.role == Role::Doctor)
            .ok_or_else(|| ClinicError::not_found("Doctor not found"))?;
        if let Some(profile) = directory::find_staff_profile(&tx, request.doctor_id)? {
            if profile.status != StaffStatus::Active {
                return Err(ClinicError::validation(format!(
                    "Doctor is {} and not accepting appointments",
                    profile.status.as_str()
                )));
            }
        }

        if db::appointments::slot_taken(&tx, request.doctor_id, request.day, request.time_slot)? {
            warn!(
                doctor = request.doctor_id,
                day = %request.day,
                slot = %request.time_slot,
                "slot conflict"
            );
            return Err(ClinicError::conflict(SLOT_TAKEN));
        }

        let draft = Appointment {
            id: 0,
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            receptionist_id,
            appointment_date: starts_at,
            time_slot: request.time_slot,
            reason: trimmed(request.reason),
            symptoms: trimmed(request.symptoms),
            notes: None,
            status: AppointmentStatus::Scheduled,
            diagnosis_id: None,
            created_at: now,
            updated_at: now,
        };
        let id = db::appointments::insert(&tx, &draft).map_err(|err| {
            if is_unique_violation(&err) {
                ClinicError::conflict(SLOT_TAKEN)
            } else {
                ClinicError::from(err)
            }
        })?;
        let appointment = db::appointments::find(&tx, id)?.ok_or_else(not_found)?;
        tx.commit()?;

        info!(
            appointment = appointment.id,
            patient = appointment.patient_id,
            doctor = appointment.doctor_id,
            slot = %appointment.time_slot,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Lists the appointments the caller may see, earliest first.
    pub fn list(&self, caller: &Caller, filter: AppointmentFilter) -> Result<Vec<Appointment>> {
        let scope = access::list_scope(caller, Resource::Appointment)?;
        let conn = self.db.connect()?;
        let appointments = db::appointments::list(&conn, scope, &filter)?;
        debug!(caller = caller.id, count = appointments.len(), "listed appointments");
        Ok(appointments)
    }

    /// Retrieves one appointment.
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist, `Forbidden` unless the caller is its
    /// patient or doctor, or a receptionist or admin.
    pub fn get(&self, caller: &Caller, appointment_id: i64) -> Result<Appointment> {
        let conn = self.db.connect()?;
        let appointment = load(&conn, appointment_id)?;
        access::authorize(
            caller,
            Resource::Appointment,
            Action::Read,
            &appointment.ownership(),
        )?;
        Ok(appointment)
    }

    /// Moves a scheduled appointment to `completed`, `cancelled` or `no-show`.
    /// Only the appointment's doctor may do this, and terminal statuses are
    /// final.
    ///
    /// The check and the write share one `IMMEDIATE` transaction, so a
    /// concurrent cancellation is either seen here or waits for this one.
    pub fn update_status(
        &self,
        caller: &Caller,
        appointment_id: i64,
        status: AppointmentStatus,
    ) -> Result<Appointment> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let appointment = load(&tx, appointment_id)?;
        access::authorize(
            caller,
            Resource::Appointment,
            Action::UpdateStatus,
            &appointment.ownership(),
        )?;

        if !appointment.status.can_transition_to(status) {
            return Err(ClinicError::validation(format!(
                "Cannot change appointment status from {} to {}",
                appointment.status, status
            )));
        }

        self.write_status(&tx, appointment_id, status)?;
        let updated = load(&tx, appointment_id)?;
        tx.commit()?;
        info!(appointment = appointment_id, %status, "appointment status updated");
        Ok(updated)
    }

    /// Cancels an appointment on behalf of its patient, its doctor or the
    /// receptionist who booked it. Cancelling releases the slot.
    pub fn cancel(&self, caller: &Caller, appointment_id: i64) -> Result<Appointment> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let appointment = load(&tx, appointment_id)?;
        access::authorize(
            caller,
            Resource::Appointment,
            Action::Cancel,
            &appointment.ownership(),
        )?;

        self.write_status(&tx, appointment_id, AppointmentStatus::Cancelled)?;
        let cancelled = load(&tx, appointment_id)?;
        tx.commit()?;
        info!(appointment = appointment_id, by = caller.id, "appointment cancelled");
        Ok(cancelled)
    }

    /// The doctor's free slots on `day`, in catalog order. Always read fresh.
    pub fn available_slots(&self, doctor_id: i64, day: Date) -> Result<Vec<TimeSlot>> {
        let conn = self.db.connect()?;
        let occupied = db::appointments::occupied_slots(&conn, doctor_id, day)?;
        Ok(slots::available_slots(&occupied))
    }

    fn write_status(
        &self,
        conn: &Connection,
        appointment_id: i64,
        status: AppointmentStatus,
    ) -> Result<()> {
        db::appointments::set_status(conn, appointment_id, status, self.clock.now()).map_err(
            |err| {
                if is_unique_violation(&err) {
                    ClinicError::conflict(SLOT_TAKEN)
                } else {
                    ClinicError::from(err)
                }
            },
        )?;
        Ok(())
    }
}

fn load(conn: &Connection, appointment_id: i64) -> Result<Appointment> {
    db::appointments::find(conn, appointment_id)?.ok_or_else(not_found)
}

/// Records `diagnosis_id` on the appointment, as part of the caller's
/// transaction.
///
/// # Errors
///
/// `Conflict` if the appointment already points at a diagnosis; the link is
/// written once and never replaced.
pub(crate) fn link_diagnosis(
    conn: &Connection,
    appointment_id: i64,
    diagnosis_id: i64,
    now: OffsetDateTime,
) -> Result<()> {
    match db::appointments::link_diagnosis(conn, appointment_id, diagnosis_id, now)? {
        0 => Err(ClinicError::conflict("This appointment already has a diagnosis")),
        _ => Ok(()),
    }
}

//! Appointment queries.

use super::{instant_at, parsed_at, unix};
use crate::access::ListScope;
use crate::appointments::AppointmentFilter;
use crate::models::{format_day, Appointment, AppointmentStatus};
use crate::slots::TimeSlot;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use time::{Date, OffsetDateTime};

const COLUMNS: &str = "id, patient_id, doctor_id, receptionist_id, appointment_date, time_slot, \
     reason, symptoms, notes, status, diagnosis_id, created_at, updated_at";

/// Statuses that hold on to a doctor's slot, as an SQL list.
const OCCUPYING: &str = "('scheduled', 'completed')";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        receptionist_id: row.get(3)?,
        appointment_date: instant_at(row, 4)?,
        time_slot: parsed_at(row, 5)?,
        reason: row.get(6)?,
        symptoms: row.get(7)?,
        notes: row.get(8)?,
        status: parsed_at(row, 9)?,
        diagnosis_id: row.get(10)?,
        created_at: instant_at(row, 11)?,
        updated_at: instant_at(row, 12)?,
    })
}

/// Inserts a new appointment and returns its id. The `id`, `diagnosis_id`
/// and `updated_at` fields of `appointment` are ignored.
///
/// # Errors
///
/// Fails with a UNIQUE constraint violation if the doctor's slot is already
/// occupied on that day.
pub fn insert(conn: &Connection, appointment: &Appointment) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO appointments (patient_id, doctor_id, receptionist_id, appointment_date, \
         appointment_day, time_slot, reason, symptoms, notes, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            appointment.patient_id,
            appointment.doctor_id,
            appointment.receptionist_id,
            unix(appointment.appointment_date),
            format_day(appointment.day()),
            appointment.time_slot.as_str(),
            appointment.reason,
            appointment.symptoms,
            appointment.notes,
            appointment.status.as_str(),
            unix(appointment.created_at),
            unix(appointment.created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Retrieves a single appointment by id.
pub fn find(conn: &Connection, appointment_id: i64) -> rusqlite::Result<Option<Appointment>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM appointments WHERE id = ?"))?;
    stmt.query_row(params![appointment_id], from_row).optional()
}

/// Whether `slot` on `day` is held by a scheduled or completed appointment.
pub fn slot_taken(
    conn: &Connection,
    doctor_id: i64,
    day: Date,
    slot: TimeSlot,
) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!(
        "SELECT EXISTS (SELECT 1 FROM appointments WHERE doctor_id = ? AND appointment_day = ? \
         AND time_slot = ? AND status IN {OCCUPYING})"
    ))?;
    stmt.query_row(params![doctor_id, format_day(day), slot.as_str()], |row| {
        row.get(0)
    })
}

/// The slots a doctor has occupied on `day`.
pub fn occupied_slots(
    conn: &Connection,
    doctor_id: i64,
    day: Date,
) -> rusqlite::Result<Vec<TimeSlot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT time_slot FROM appointments WHERE doctor_id = ? AND appointment_day = ? \
         AND status IN {OCCUPYING}"
    ))?;
    let slots = stmt
        .query_map(params![doctor_id, format_day(day)], |row| parsed_at(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(slots)
}

/// Lists appointments visible under `scope`, earliest first.
pub fn list(
    conn: &Connection,
    scope: ListScope,
    filter: &AppointmentFilter,
) -> rusqlite::Result<Vec<Appointment>> {
    let mut sql = format!("SELECT {COLUMNS} FROM appointments WHERE 1 = 1");
    let mut values: Vec<Value> = Vec::new();

    match scope {
        ListScope::Patient(id) => {
            sql.push_str(" AND patient_id = ?");
            values.push(Value::Integer(id));
        }
        ListScope::Doctor(id) => {
            sql.push_str(" AND doctor_id = ?");
            values.push(Value::Integer(id));
        }
        ListScope::All => {}
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(day) = filter.day {
        sql.push_str(" AND appointment_day = ?");
        values.push(Value::Text(format_day(day)));
    }
    sql.push_str(" ORDER BY appointment_date ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let appointments = stmt
        .query_map(params_from_iter(values), from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(appointments)
}

/// Overwrites the status. Returns the number of rows touched.
///
/// # Errors
///
/// Moving an appointment back into a slot-occupying status fails with a
/// UNIQUE constraint violation when the slot has been rebooked meanwhile.
pub fn set_status(
    conn: &Connection,
    appointment_id: i64,
    status: AppointmentStatus,
    now: OffsetDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE appointments SET status = ?, updated_at = ? WHERE id = ?",
        params![status.as_str(), unix(now), appointment_id],
    )
}

/// Points an appointment at its diagnosis, only if it has none yet. Returns
/// the number of rows touched, so `0` means the link already existed.
pub fn link_diagnosis(
    conn: &Connection,
    appointment_id: i64,
    diagnosis_id: i64,
    now: OffsetDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE appointments SET diagnosis_id = ?, updated_at = ? \
         WHERE id = ? AND diagnosis_id IS NULL",
        params![diagnosis_id, unix(now), appointment_id],
    )
}

/// Counts a doctor's appointments, optionally restricted to one status.
pub fn count_for_doctor(
    conn: &Connection,
    doctor_id: i64,
    status: Option<AppointmentStatus>,
) -> rusqlite::Result<u64> {
    let count: i64 = match status {
        Some(status) => conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE doctor_id = ? AND status = ?",
            params![doctor_id, status.as_str()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE doctor_id = ?",
            params![doctor_id],
            |row| row.get(0),
        )?,
    };
    Ok(count.max(0) as u64)
}

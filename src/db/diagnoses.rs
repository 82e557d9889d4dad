//! Diagnosis queries.

use super::{day_at, instant_at, json_at, parsed_at, unix};
use crate::access::ListScope;
use crate::models::{format_day, Diagnosis};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, appointment_id, patient_id, doctor_id, symptoms, vitals, observations, \
     ai_analysis, diagnosis, icd10_code, treatment_plan, follow_up_date, urgency, \
     referral_needed, referral_details, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Diagnosis> {
    Ok(Diagnosis {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        patient_id: row.get(2)?,
        doctor_id: row.get(3)?,
        symptoms: row.get(4)?,
        vitals: json_at(row, 5)?,
        observations: row.get(6)?,
        ai_analysis: row.get(7)?,
        diagnosis: row.get(8)?,
        icd10_code: row.get(9)?,
        treatment_plan: row.get(10)?,
        follow_up_date: day_at(row, 11)?,
        urgency: parsed_at(row, 12)?,
        referral_needed: row.get(13)?,
        referral_details: row.get(14)?,
        created_at: instant_at(row, 15)?,
        updated_at: instant_at(row, 16)?,
    })
}

fn vitals_json(diagnosis: &Diagnosis) -> rusqlite::Result<String> {
    serde_json::to_string(&diagnosis.vitals)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Inserts a diagnosis and returns its id. The `id` field is ignored.
///
/// # Errors
///
/// Fails with a UNIQUE constraint violation if the appointment already has a
/// diagnosis.
pub fn insert(conn: &Connection, diagnosis: &Diagnosis) -> rusqlite::Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO diagnoses ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS.trim_start_matches("id, ")
        ),
        params![
            diagnosis.appointment_id,
            diagnosis.patient_id,
            diagnosis.doctor_id,
            diagnosis.symptoms,
            vitals_json(diagnosis)?,
            diagnosis.observations,
            diagnosis.ai_analysis,
            diagnosis.diagnosis,
            diagnosis.icd10_code,
            diagnosis.treatment_plan,
            diagnosis.follow_up_date.map(format_day),
            diagnosis.urgency.as_str(),
            diagnosis.referral_needed,
            diagnosis.referral_details,
            unix(diagnosis.created_at),
            unix(diagnosis.updated_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Retrieves a single diagnosis by id.
pub fn find(conn: &Connection, diagnosis_id: i64) -> rusqlite::Result<Option<Diagnosis>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM diagnoses WHERE id = ?"))?;
    stmt.query_row(params![diagnosis_id], from_row).optional()
}

/// Writes back every amendable field of `diagnosis`.
pub fn update(conn: &Connection, diagnosis: &Diagnosis) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE diagnoses SET symptoms = ?, vitals = ?, observations = ?, diagnosis = ?, \
         icd10_code = ?, treatment_plan = ?, follow_up_date = ?, urgency = ?, \
         referral_needed = ?, referral_details = ?, updated_at = ? WHERE id = ?",
        params![
            diagnosis.symptoms,
            vitals_json(diagnosis)?,
            diagnosis.observations,
            diagnosis.diagnosis,
            diagnosis.icd10_code,
            diagnosis.treatment_plan,
            diagnosis.follow_up_date.map(format_day),
            diagnosis.urgency.as_str(),
            diagnosis.referral_needed,
            diagnosis.referral_details,
            unix(diagnosis.updated_at),
            diagnosis.id,
        ],
    )
}

/// Lists diagnoses visible under `scope`, newest first.
pub fn list(conn: &Connection, scope: ListScope) -> rusqlite::Result<Vec<Diagnosis>> {
    let mut sql = format!("SELECT {COLUMNS} FROM diagnoses");
    let mut values: Vec<Value> = Vec::new();
    match scope {
        ListScope::Patient(id) => {
            sql.push_str(" WHERE patient_id = ?");
            values.push(Value::Integer(id));
        }
        ListScope::Doctor(id) => {
            sql.push_str(" WHERE doctor_id = ?");
            values.push(Value::Integer(id));
        }
        ListScope::All => {}
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let diagnoses = stmt
        .query_map(params_from_iter(values), from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(diagnoses)
}

pub fn count_for_doctor(conn: &Connection, doctor_id: i64) -> rusqlite::Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM diagnoses WHERE doctor_id = ?",
        params![doctor_id],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// The doctor's most frequent diagnosis texts with their counts, most frequent
/// first.
pub fn most_common_for_doctor(
    conn: &Connection,
    doctor_id: i64,
    limit: u32,
) -> rusqlite::Result<Vec<(String, u64)>> {
    let mut stmt = conn.prepare(
        "SELECT diagnosis, COUNT(*) AS occurrences FROM diagnoses WHERE doctor_id = ? \
         GROUP BY diagnosis ORDER BY occurrences DESC, diagnosis ASC LIMIT ?",
    )?;
    let rows = stmt
        .query_map(params![doctor_id, limit], |row| {
            let count: i64 = row.get(1)?;
            Ok((row.get(0)?, count.max(0) as u64))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

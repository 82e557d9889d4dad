//! Prescription queries.

use super::{instant_at, json_at, parsed_at, unix};
use crate::access::ListScope;
use crate::models::{Prescription, PrescriptionStatus};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, patient_id, doctor_id, appointment_id, medicines, diagnosis, notes, \
     issued_date, expiry_date, status, pdf_url, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        appointment_id: row.get(3)?,
        medicines: json_at(row, 4)?,
        diagnosis: row.get(5)?,
        notes: row.get(6)?,
        issued_date: instant_at(row, 7)?,
        expiry_date: instant_at(row, 8)?,
        status: parsed_at(row, 9)?,
        pdf_url: row.get(10)?,
        created_at: instant_at(row, 11)?,
        updated_at: instant_at(row, 12)?,
    })
}

fn medicines_json(prescription: &Prescription) -> rusqlite::Result<String> {
    serde_json::to_string(&prescription.medicines)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Inserts a prescription and returns its id. The `id` field is ignored.
pub fn insert(conn: &Connection, prescription: &Prescription) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO prescriptions (patient_id, doctor_id, appointment_id, medicines, diagnosis, \
         notes, issued_date, expiry_date, status, pdf_url, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            prescription.patient_id,
            prescription.doctor_id,
            prescription.appointment_id,
            medicines_json(prescription)?,
            prescription.diagnosis,
            prescription.notes,
            unix(prescription.issued_date),
            unix(prescription.expiry_date),
            prescription.status.as_str(),
            prescription.pdf_url,
            unix(prescription.created_at),
            unix(prescription.updated_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Retrieves a single prescription by id.
pub fn find(conn: &Connection, prescription_id: i64) -> rusqlite::Result<Option<Prescription>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM prescriptions WHERE id = ?"))?;
    stmt.query_row(params![prescription_id], from_row)
        .optional()
}

/// Writes back the amendable fields of `prescription`.
pub fn update(conn: &Connection, prescription: &Prescription) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE prescriptions SET medicines = ?, diagnosis = ?, notes = ?, status = ?, \
         updated_at = ? WHERE id = ?",
        params![
            medicines_json(prescription)?,
            prescription.diagnosis,
            prescription.notes,
            prescription.status.as_str(),
            unix(prescription.updated_at),
            prescription.id,
        ],
    )
}

pub fn delete(conn: &Connection, prescription_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM prescriptions WHERE id = ?",
        params![prescription_id],
    )
}

/// Lists prescriptions visible under `scope`, most recently issued first.
pub fn list(
    conn: &Connection,
    scope: ListScope,
    status: Option<PrescriptionStatus>,
) -> rusqlite::Result<Vec<Prescription>> {
    let mut sql = format!("SELECT {COLUMNS} FROM prescriptions WHERE 1 = 1");
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
    if let Some(status) = status {
        sql.push_str(" AND status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    sql.push_str(" ORDER BY issued_date DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let prescriptions = stmt
        .query_map(params_from_iter(values), from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(prescriptions)
}

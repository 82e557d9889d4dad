//! Directory queries: users and staff profiles.
//!
//! The scheduling core only reads from here. Writes exist for registration and
//! demo seeding.

use super::{instant_at, json_at, parsed_at, unix};
use crate::models::{DoctorListing, Role, StaffProfile, StaffStatus, User, UserSummary};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use time::OffsetDateTime;

const USER_COLUMNS: &str = "id, name, email, role, is_active, created_at";

const PROFILE_COLUMNS: &str = "user_id, role, specialization, license_number, qualifications, \
     experience, consultation_fee, department, status, is_verified";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: parsed_at(row, 3)?,
        is_active: row.get(4)?,
        created_at: instant_at(row, 5)?,
    })
}

fn profile_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<StaffProfile> {
    Ok(StaffProfile {
        user_id: row.get(offset)?,
        role: parsed_at(row, offset + 1)?,
        specialization: row.get(offset + 2)?,
        license_number: row.get(offset + 3)?,
        qualifications: json_at(row, offset + 4)?,
        experience: row.get(offset + 5)?,
        consultation_fee: row.get(offset + 6)?,
        department: row.get(offset + 7)?,
        status: parsed_at(row, offset + 8)?,
        is_verified: row.get(offset + 9)?,
    })
}

/// Inserts a user and returns the new id.
pub fn create_user(
    conn: &Connection,
    name: &str,
    email: &str,
    role: Role,
    now: OffsetDateTime,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (name, email, role, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        params![name, email, role.as_str(), unix(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Retrieves a single user by id.
pub fn find_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))?;
    stmt.query_row(params![user_id], user_from_row).optional()
}

/// Looks up a user by e-mail address.
pub fn find_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))?;
    stmt.query_row(params![email], user_from_row).optional()
}

/// Flags a user account as active or deactivated.
pub fn set_user_active(conn: &Connection, user_id: i64, active: bool) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE users SET is_active = ? WHERE id = ?",
        params![active, user_id],
    )
}

/// Attaches a staff profile to an existing doctor or receptionist.
pub fn create_staff_profile(conn: &Connection, profile: &StaffProfile) -> rusqlite::Result<()> {
    let qualifications = serde_json::to_string(&profile.qualifications)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        &format!(
            "INSERT INTO staff_profiles ({PROFILE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            profile.user_id,
            profile.role.as_str(),
            profile.specialization,
            profile.license_number,
            qualifications,
            profile.experience,
            profile.consultation_fee,
            profile.department,
            profile.status.as_str(),
            profile.is_verified,
        ],
    )?;
    Ok(())
}

/// Retrieves the staff profile attached to `user_id`, if any.
pub fn find_staff_profile(
    conn: &Connection,
    user_id: i64,
) -> rusqlite::Result<Option<StaffProfile>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROFILE_COLUMNS} FROM staff_profiles WHERE user_id = ?"
    ))?;
    stmt.query_row(params![user_id], |row| profile_from_row(row, 0))
        .optional()
}

/// Changes a staff member's employment status.
pub fn set_staff_status(
    conn: &Connection,
    user_id: i64,
    status: StaffStatus,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE staff_profiles SET status = ? WHERE user_id = ?",
        params![status.as_str(), user_id],
    )
}

/// Filters for [`list_doctors`].
#[derive(Debug, Clone, Default)]
pub struct DoctorQuery {
    /// Case-insensitive substring of the specialization.
    pub specialization: Option<String>,
    pub status: Option<StaffStatus>,
}

/// Lists doctors with their profiles, ordered by name.
pub fn list_doctors(
    conn: &Connection,
    query: &DoctorQuery,
) -> rusqlite::Result<Vec<DoctorListing>> {
    let mut sql = format!(
        "SELECT u.id, u.name, u.email, {} FROM staff_profiles p \
         JOIN users u ON u.id = p.user_id WHERE p.role = 'doctor'",
        PROFILE_COLUMNS
            .split(", ")
            .map(|column| format!("p.{}", column.trim()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut values: Vec<Value> = Vec::new();

    if let Some(status) = query.status {
        sql.push_str(" AND p.status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(specialization) = query.specialization.as_deref().filter(|s| !s.is_empty()) {
        sql.push_str(" AND lower(p.specialization) LIKE ?");
        values.push(Value::Text(format!("%{}%", specialization.to_lowercase())));
    }
    sql.push_str(" ORDER BY u.name, u.id");

    let mut stmt = conn.prepare(&sql)?;
    let doctors = stmt
        .query_map(params_from_iter(values), |row| {
            Ok(DoctorListing {
                user: UserSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                },
                profile: profile_from_row(row, 3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(doctors)
}

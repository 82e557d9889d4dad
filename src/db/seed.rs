//! Demo directory data for local development.

use super::directory::{create_staff_profile, create_user};
use super::Database;
use crate::models::{Qualification, Role, StaffProfile, StaffStatus};
use anyhow::{Context, Result};
use rusqlite::params;
use time::OffsetDateTime;

impl Database {
    /// Populates an empty directory with an admin, two patients, two doctors and
    /// a receptionist. Does nothing if any user already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or an insert fails.
    /// All inserts run in one transaction, so a failure leaves the directory
    /// empty.
    pub fn seed_demo_data(&self, now: OffsetDateTime) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM users", params![], |row| row.get(0))?;
        if count > 0 {
            tracing::debug!(users = count, "directory already populated, skipping seed");
            return Ok(());
        }

        create_user(&tx, "Admin User", "admin@clinic.com", Role::Admin, now)?;
        create_user(&tx, "John Doe", "patient@clinic.com", Role::Patient, now)?;
        create_user(&tx, "Jane Smith", "patient2@clinic.com", Role::Patient, now)?;

        let doctors = [
            ("Dr. Sarah Wilson", "doctor@clinic.com", "General Medicine", "MED-1001", 10, 500.0),
            ("Dr. Michael Chen", "doctor2@clinic.com", "Cardiology", "MED-1002", 15, 800.0),
        ];
        for (name, email, specialization, license, experience, fee) in doctors {
            let user_id = create_user(&tx, name, email, Role::Doctor, now)?;
            create_staff_profile(
                &tx,
                &StaffProfile {
                    user_id,
                    role: Role::Doctor,
                    specialization: Some(specialization.to_string()),
                    license_number: Some(license.to_string()),
                    qualifications: vec![Qualification {
                        degree: "MBBS".to_string(),
                        institution: "City Medical College".to_string(),
                        year: Some(2010),
                    }],
                    experience: Some(experience),
                    consultation_fee: Some(fee),
                    department: None,
                    status: StaffStatus::Active,
                    is_verified: true,
                },
            )
            .with_context(|| format!("Failed to create staff profile for {email}"))?;
        }

        let receptionist_id = create_user(
            &tx,
            "Emily Brown",
            "receptionist@clinic.com",
            Role::Receptionist,
            now,
        )?;
        create_staff_profile(
            &tx,
            &StaffProfile {
                user_id: receptionist_id,
                role: Role::Receptionist,
                specialization: None,
                license_number: None,
                qualifications: Vec::new(),
                experience: None,
                consultation_fee: None,
                department: Some("Front Desk".to_string()),
                status: StaffStatus::Active,
                is_verified: true,
            },
        )?;

        tx.commit().context("Failed to commit demo data")?;
        tracing::info!("seeded demo directory with 6 users");
        Ok(())
    }
}

//! Clinic ledger: appointment scheduling with slot-conflict avoidance and a
//! role-scoped chain of clinical records (appointment, diagnosis,
//! prescription) over SQLite.
//!
//! [`Clinic`] wires the appointment ledger and the record chain around one
//! [`Database`] and one [`Clock`]. The [`api`] module exposes it over HTTP.

pub mod access;
pub mod advisory;
pub mod analytics;
pub mod api;
pub mod appointments;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod records;
pub mod slots;
pub mod views;

pub use access::Caller;
pub use appointments::{AppointmentFilter, AppointmentLedger, BookingRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::directory::DoctorQuery;
pub use db::Database;
pub use error::{ClinicError, Result};
pub use records::RecordChain;

use advisory::{AdvisoryProvider, FormularyLookup};
use analytics::DoctorAnalytics;
use db::directory;
use models::{DoctorListing, Role, StaffProfile, StaffStatus, User};
use std::sync::Arc;
use tracing::info;

/// The clinic's operations, sharing one database and one clock.
#[derive(Clone)]
pub struct Clinic {
    db: Database,
    clock: Arc<dyn Clock>,
    pub appointments: AppointmentLedger,
    pub records: RecordChain,
}

impl Clinic {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            appointments: AppointmentLedger::new(db.clone(), Arc::clone(&clock)),
            records: RecordChain::new(db.clone(), Arc::clone(&clock)),
            db,
            clock,
        }
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn AdvisoryProvider>) -> Self {
        self.records = self.records.with_advisor(advisor);
        self
    }

    pub fn with_formulary(mut self, formulary: Arc<dyn FormularyLookup>) -> Self {
        self.records = self.records.with_formulary(formulary);
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Looks a user up in the directory.
    pub fn user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.db.connect()?;
        Ok(directory::find_user(&conn, user_id)?)
    }

    /// Lists doctors with their staff profiles, ordered by name.
    pub fn doctors(&self, query: &DoctorQuery) -> Result<Vec<DoctorListing>> {
        let conn = self.db.connect()?;
        Ok(directory::list_doctors(&conn, query)?)
    }

    /// Adds a user to the directory.
    ///
    /// # Errors
    ///
    /// `Validation` if the name or e-mail is blank, `Conflict` if the e-mail
    /// is already registered.
    pub fn register_user(&self, name: &str, email: &str, role: Role) -> Result<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(ClinicError::validation("Name and email are required"));
        }

        let conn = self.db.connect()?;
        if directory::find_user_by_email(&conn, &email)?.is_some() {
            return Err(ClinicError::conflict("A user with this email already exists"));
        }
        let id = directory::create_user(&conn, name, &email, role, self.clock.now())?;
        info!(user = id, %role, "user registered");
        directory::find_user(&conn, id)?
            .ok_or_else(|| ClinicError::not_found("User not found"))
    }

    /// Attaches a staff profile to a registered doctor or receptionist.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist, `Validation` if the profile's
    /// role is not the user's role or not a staff role, `Conflict` if the user
    /// already has a profile or the licence number is taken.
    pub fn register_staff(&self, profile: StaffProfile) -> Result<StaffProfile> {
        if !matches!(profile.role, Role::Doctor | Role::Receptionist) {
            return Err(ClinicError::validation(
                "Staff profiles are for doctors and receptionists",
            ));
        }
        let conn = self.db.connect()?;
        let user = directory::find_user(&conn, profile.user_id)?
            .ok_or_else(|| ClinicError::not_found("User not found"))?;
        if user.role != profile.role {
            return Err(ClinicError::validation(format!(
                "User {} is a {}, not a {}",
                user.id, user.role, profile.role
            )));
        }

        directory::create_staff_profile(&conn, &profile)?;
        info!(user = user.id, role = %profile.role, "staff profile created");
        directory::find_staff_profile(&conn, profile.user_id)?
            .ok_or_else(|| ClinicError::not_found("Staff profile not found"))
    }

    /// Changes a staff member's employment status. Only active doctors take
    /// new bookings.
    pub fn set_staff_status(&self, user_id: i64, status: StaffStatus) -> Result<()> {
        let conn = self.db.connect()?;
        match directory::set_staff_status(&conn, user_id, status)? {
            0 => Err(ClinicError::not_found("Staff profile not found")),
            _ => {
                info!(user = user_id, status = status.as_str(), "staff status changed");
                Ok(())
            }
        }
    }

    /// Activates or deactivates a directory account.
    pub fn set_user_active(&self, user_id: i64, active: bool) -> Result<()> {
        let conn = self.db.connect()?;
        match directory::set_user_active(&conn, user_id, active)? {
            0 => Err(ClinicError::not_found("User not found")),
            _ => Ok(()),
        }
    }

    /// The calling doctor's practice summary.
    pub fn doctor_analytics(&self, caller: &Caller) -> Result<DoctorAnalytics> {
        analytics::doctor_analytics(&self.db, caller)
    }
}

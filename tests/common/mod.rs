#![allow(dead_code)]

use clinic_ledger::db::directory;
use clinic_ledger::models::Role;
use clinic_ledger::slots::TimeSlot;
use clinic_ledger::{BookingRequest, Caller, Clinic, Database, FixedClock};
use std::sync::Arc;
use tempfile::TempDir;
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

/// The instant every test starts at.
pub const NOW: OffsetDateTime = datetime!(2026-10-17 12:00 UTC);
pub const TODAY: Date = date!(2026-10-17);
pub const TOMORROW: Date = date!(2026-10-18);

/// A clinic on a fresh temporary database, seeded with the demo directory.
pub struct Fixture {
    pub clinic: Clinic,
    pub clock: Arc<FixedClock>,
    pub admin: Caller,
    pub patient: Caller,
    pub other_patient: Caller,
    pub doctor: Caller,
    pub other_doctor: Caller,
    pub receptionist: Caller,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("clinic.db")).unwrap();
        db.seed_demo_data(NOW).unwrap();

        let conn = db.connect().unwrap();
        let caller = |email: &str| {
            let user = directory::find_user_by_email(&conn, email)
                .unwrap()
                .unwrap();
            Caller::new(user.id, user.role)
        };
        let admin = caller("admin@clinic.com");
        let patient = caller("patient@clinic.com");
        let other_patient = caller("patient2@clinic.com");
        let doctor = caller("doctor@clinic.com");
        let other_doctor = caller("doctor2@clinic.com");
        let receptionist = caller("receptionist@clinic.com");
        drop(conn);

        assert_eq!(doctor.role, Role::Doctor);
        assert_eq!(receptionist.role, Role::Receptionist);

        let clock = Arc::new(FixedClock::new(NOW));
        let clinic = Clinic::new(db, clock.clone());
        Self {
            clinic,
            clock,
            admin,
            patient,
            other_patient,
            doctor,
            other_doctor,
            receptionist,
            _dir: dir,
        }
    }

    /// A booking of `slot` tomorrow with the fixture's doctor.
    pub fn request(&self, patient: &Caller, slot: TimeSlot) -> BookingRequest {
        BookingRequest {
            patient_id: patient.id,
            doctor_id: self.doctor.id,
            day: TOMORROW,
            time_slot: slot,
            reason: Some("Checkup".to_string()),
            symptoms: Some("fever and cough".to_string()),
        }
    }
}

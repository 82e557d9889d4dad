mod common;

use clinic_ledger::advisory::{FormularyLookup, MedicineReference};
use clinic_ledger::models::{Qualification, Role, StaffProfile, StaffStatus};
use clinic_ledger::slots::TimeSlot;
use clinic_ledger::{BookingRequest, Caller, ClinicError, DoctorQuery};
use common::{Fixture, NOW, TOMORROW};
use std::sync::Arc;

fn doctor_profile(user_id: i64, license: &str) -> StaffProfile {
    StaffProfile {
        user_id,
        role: Role::Doctor,
        specialization: Some("Dermatology".to_string()),
        license_number: Some(license.to_string()),
        qualifications: vec![Qualification {
            degree: "MD".to_string(),
            institution: "City Medical School".to_string(),
            year: Some(2015),
        }],
        experience: Some(9),
        consultation_fee: Some(120.0),
        department: Some("Dermatology".to_string()),
        status: StaffStatus::Active,
        is_verified: true,
    }
}

#[test]
fn registered_doctors_join_the_directory_and_take_bookings() {
    let fx = Fixture::new();
    let user = fx
        .clinic
        .register_user(
            "  Dr. Amira Haddad ",
            "Amira.Haddad@Clinic.com",
            Role::Doctor,
        )
        .unwrap();
    assert_eq!(user.name, "Dr. Amira Haddad");
    assert_eq!(user.email, "amira.haddad@clinic.com");
    assert!(user.is_active);
    assert_eq!(user.created_at, NOW);

    let profile = fx
        .clinic
        .register_staff(doctor_profile(user.id, "LIC-DERM-01"))
        .unwrap();
    assert_eq!(profile.status, StaffStatus::Active);
    assert_eq!(profile.qualifications.len(), 1);

    let listed = fx
        .clinic
        .doctors(&DoctorQuery {
            specialization: Some("derma".to_string()),
            status: Some(StaffStatus::Active),
        })
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].user.id, user.id);

    let booked = fx
        .clinic
        .appointments
        .book(
            &fx.patient,
            BookingRequest {
                patient_id: fx.patient.id,
                doctor_id: user.id,
                day: TOMORROW,
                time_slot: TimeSlot::TwoPm,
                reason: None,
                symptoms: Some("rash".to_string()),
            },
        )
        .unwrap();
    assert_eq!(booked.doctor_id, user.id);
}

#[test]
fn registration_rejects_blank_and_duplicate_identities() {
    let fx = Fixture::new();
    assert!(matches!(
        fx.clinic.register_user("   ", "someone@clinic.com", Role::Patient),
        Err(ClinicError::Validation(_))
    ));
    assert!(matches!(
        fx.clinic.register_user("Someone", "", Role::Patient),
        Err(ClinicError::Validation(_))
    ));
    assert!(matches!(
        fx.clinic
            .register_user("Another Patient", "PATIENT@clinic.com", Role::Patient),
        Err(ClinicError::Conflict(_))
    ));
}

#[test]
fn staff_profiles_must_match_the_users_role() {
    let fx = Fixture::new();

    let mut profile = doctor_profile(fx.patient.id, "LIC-X-1");
    assert!(matches!(
        fx.clinic.register_staff(profile.clone()),
        Err(ClinicError::Validation(_))
    ));

    profile.user_id = fx.admin.id;
    profile.role = Role::Admin;
    assert!(matches!(
        fx.clinic.register_staff(profile.clone()),
        Err(ClinicError::Validation(_))
    ));

    assert!(matches!(
        fx.clinic.register_staff(doctor_profile(9_999, "LIC-X-2")),
        Err(ClinicError::NotFound(_))
    ));

    // The seeded doctor already carries a profile.
    assert!(matches!(
        fx.clinic.register_staff(doctor_profile(fx.doctor.id, "LIC-X-3")),
        Err(ClinicError::Conflict(_))
    ));
}

#[test]
fn staff_status_changes_gate_new_bookings() {
    let fx = Fixture::new();
    fx.clinic
        .set_staff_status(fx.other_doctor.id, StaffStatus::Inactive)
        .unwrap();

    let mut request = fx.request(&fx.patient, TimeSlot::NineAm);
    request.doctor_id = fx.other_doctor.id;
    assert!(matches!(
        fx.clinic.appointments.book(&fx.patient, request),
        Err(ClinicError::Validation(_))
    ));

    assert!(matches!(
        fx.clinic.set_staff_status(fx.patient.id, StaffStatus::Active),
        Err(ClinicError::NotFound(_))
    ));
}

struct SingleMedicine;

impl FormularyLookup for SingleMedicine {
    fn search(&self, query: &str) -> Vec<MedicineReference> {
        if query.is_empty() {
            return Vec::new();
        }
        vec![MedicineReference {
            id: 99,
            name: "Oseltamivir",
            dosages: &["75mg"],
            common_frequencies: &["Twice daily"],
        }]
    }
}

#[test]
fn formulary_can_be_replaced() {
    let fx = Fixture::new();
    let clinic = fx.clinic.clone().with_formulary(Arc::new(SingleMedicine));

    let found = clinic.records.search_medicines("flu");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Oseltamivir");
    assert!(clinic.records.search_medicines("").is_empty());

    // The clinic it was cloned from keeps the built-in list.
    assert!(fx.clinic.records.search_medicines("flu").is_empty());
}

#[test]
fn callers_are_resolved_from_the_directory() {
    let fx = Fixture::new();
    let user = fx.clinic.user(fx.receptionist.id).unwrap().unwrap();
    assert_eq!(Caller::new(user.id, user.role), fx.receptionist);
    assert!(fx.clinic.user(9_999).unwrap().is_none());
}

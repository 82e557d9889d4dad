mod common;

use clinic_ledger::models::{
    Appointment, AppointmentStatus, Frequency, Medicine, PrescriptionStatus, Urgency, Vitals,
};
use clinic_ledger::records::{DiagnosisUpdate, NewDiagnosis, NewPrescription, PrescriptionUpdate};
use clinic_ledger::slots::TimeSlot;
use clinic_ledger::ClinicError;
use common::{Fixture, NOW};
use time::Duration;

fn booked(fx: &Fixture, slot: TimeSlot) -> Appointment {
    fx.clinic
        .appointments
        .book(&fx.patient, fx.request(&fx.patient, slot))
        .unwrap()
}

fn diagnosis_for(appointment: &Appointment) -> NewDiagnosis {
    NewDiagnosis {
        appointment_id: appointment.id,
        diagnosis: Some("Influenza".to_string()),
        ..NewDiagnosis::default()
    }
}

fn amoxicillin() -> Medicine {
    Medicine {
        name: "Amoxicillin".to_string(),
        dosage: "500mg".to_string(),
        frequency: Frequency::ThriceDaily,
        duration: "7 days".to_string(),
        instructions: Some("After meals".to_string()),
    }
}

fn prescription_for(fx: &Fixture, appointment: Option<&Appointment>) -> NewPrescription {
    NewPrescription {
        patient_id: fx.patient.id,
        appointment_id: appointment.map(|a| a.id),
        medicines: vec![amoxicillin()],
        diagnosis: Some("Influenza".to_string()),
        notes: None,
    }
}

#[test]
fn diagnosis_links_back_onto_its_appointment() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);

    let diagnosis = fx
        .clinic
        .records
        .create_diagnosis(&fx.doctor, diagnosis_for(&appointment))
        .unwrap();

    assert_eq!(diagnosis.appointment_id, appointment.id);
    assert_eq!(diagnosis.patient_id, fx.patient.id);
    assert_eq!(diagnosis.doctor_id, fx.doctor.id);
    assert_eq!(diagnosis.urgency, Urgency::Routine);
    assert!(!diagnosis.referral_needed);

    let reloaded = fx
        .clinic
        .appointments
        .get(&fx.doctor, appointment.id)
        .unwrap();
    assert_eq!(reloaded.diagnosis_id, Some(diagnosis.id));
}

#[test]
fn symptoms_default_to_the_booking_and_feed_the_advisory() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);

    let diagnosis = fx
        .clinic
        .records
        .create_diagnosis(&fx.doctor, diagnosis_for(&appointment))
        .unwrap();
    assert_eq!(diagnosis.symptoms, "fever and cough");
    assert_eq!(
        diagnosis.ai_analysis.as_deref(),
        Some("Possible viral respiratory infection. Consider: COVID-19, Influenza, or common cold.")
    );
}

#[test]
fn an_appointment_takes_only_one_diagnosis() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);
    let records = &fx.clinic.records;

    let first = records
        .create_diagnosis(&fx.doctor, diagnosis_for(&appointment))
        .unwrap();
    let err = records
        .create_diagnosis(&fx.doctor, diagnosis_for(&appointment))
        .unwrap_err();
    assert!(matches!(err, ClinicError::Conflict(_)));

    let reloaded = fx
        .clinic
        .appointments
        .get(&fx.doctor, appointment.id)
        .unwrap();
    assert_eq!(reloaded.diagnosis_id, Some(first.id));
    assert_eq!(records.list_diagnoses(&fx.doctor).unwrap().len(), 1);
}

#[test]
fn only_the_treating_doctor_diagnoses() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);
    let records = &fx.clinic.records;

    for caller in [fx.other_doctor, fx.patient, fx.receptionist, fx.admin] {
        assert!(matches!(
            records.create_diagnosis(&caller, diagnosis_for(&appointment)),
            Err(ClinicError::Forbidden(_))
        ));
    }
    let missing = NewDiagnosis {
        appointment_id: 9_999,
        ..diagnosis_for(&appointment)
    };
    assert!(matches!(
        records.create_diagnosis(&fx.doctor, missing),
        Err(ClinicError::NotFound(_))
    ));

    // A refused attempt leaves the appointment unlinked.
    let reloaded = fx
        .clinic
        .appointments
        .get(&fx.doctor, appointment.id)
        .unwrap();
    assert_eq!(reloaded.diagnosis_id, None);
}

#[test]
fn diagnosis_text_is_required() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);
    let input = NewDiagnosis {
        diagnosis: Some("   ".to_string()),
        ..diagnosis_for(&appointment)
    };
    assert!(matches!(
        fx.clinic.records.create_diagnosis(&fx.doctor, input),
        Err(ClinicError::Validation(_))
    ));
}

#[test]
fn updates_merge_only_supplied_fields() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);
    let records = &fx.clinic.records;
    let created = records
        .create_diagnosis(
            &fx.doctor,
            NewDiagnosis {
                referral_needed: Some(true),
                observations: Some("Throat inflamed".to_string()),
                ..diagnosis_for(&appointment)
            },
        )
        .unwrap();

    assert!(matches!(
        records.update_diagnosis(&fx.other_doctor, created.id, DiagnosisUpdate::default()),
        Err(ClinicError::Forbidden(_))
    ));

    fx.clock.advance(Duration::minutes(30));
    let updated = records
        .update_diagnosis(
            &fx.doctor,
            created.id,
            DiagnosisUpdate {
                diagnosis: Some("Streptococcal pharyngitis".to_string()),
                observations: Some(String::new()),
                referral_needed: Some(false),
                vitals: Some(Vitals {
                    temperature: Some(38.4),
                    ..Vitals::default()
                }),
                ..DiagnosisUpdate::default()
            },
        )
        .unwrap();

    assert_eq!(updated.diagnosis, "Streptococcal pharyngitis");
    assert_eq!(updated.observations.as_deref(), Some("Throat inflamed"));
    assert!(!updated.referral_needed);
    assert_eq!(updated.vitals.temperature, Some(38.4));
    assert_eq!(updated.symptoms, created.symptoms);
    assert_eq!(updated.updated_at, NOW + Duration::minutes(30));
    assert_eq!(updated.created_at, NOW);
}

#[test]
fn diagnoses_are_visible_to_parties_and_elevated_roles() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);
    let records = &fx.clinic.records;
    let diagnosis = records
        .create_diagnosis(&fx.doctor, diagnosis_for(&appointment))
        .unwrap();

    for caller in [fx.patient, fx.doctor, fx.receptionist, fx.admin] {
        assert!(records.get_diagnosis(&caller, diagnosis.id).is_ok());
    }
    for caller in [fx.other_patient, fx.other_doctor] {
        assert!(matches!(
            records.get_diagnosis(&caller, diagnosis.id),
            Err(ClinicError::Forbidden(_))
        ));
    }
    assert!(records
        .list_diagnoses(&fx.other_patient)
        .unwrap()
        .is_empty());
    assert_eq!(records.list_diagnoses(&fx.patient).unwrap().len(), 1);
    assert_eq!(records.list_diagnoses(&fx.receptionist).unwrap().len(), 1);
}

#[test]
fn diagnoses_list_newest_first() {
    let fx = Fixture::new();
    let records = &fx.clinic.records;
    let first = booked(&fx, TimeSlot::NineAm);
    let second = booked(&fx, TimeSlot::TenAm);

    records
        .create_diagnosis(&fx.doctor, diagnosis_for(&first))
        .unwrap();
    fx.clock.advance(Duration::minutes(5));
    records
        .create_diagnosis(&fx.doctor, diagnosis_for(&second))
        .unwrap();

    let listed = records.list_diagnoses(&fx.doctor).unwrap();
    assert_eq!(
        listed.iter().map(|d| d.appointment_id).collect::<Vec<_>>(),
        [second.id, first.id]
    );
}

#[test]
fn prescriptions_expire_exactly_ninety_days_after_issue() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);

    let prescription = fx
        .clinic
        .records
        .create_prescription(&fx.doctor, prescription_for(&fx, Some(&appointment)))
        .unwrap();

    assert_eq!(prescription.issued_date, NOW);
    assert_eq!(prescription.expiry_date, NOW + Duration::days(90));
    assert_eq!(prescription.status, PrescriptionStatus::Active);
    assert_eq!(prescription.appointment_id, Some(appointment.id));
    assert_eq!(prescription.medicines, vec![amoxicillin()]);
}

#[test]
fn prescriptions_against_an_appointment_must_be_the_doctors_own() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);
    let records = &fx.clinic.records;

    assert!(matches!(
        records.create_prescription(&fx.other_doctor, prescription_for(&fx, Some(&appointment))),
        Err(ClinicError::Forbidden(_))
    ));
    assert!(matches!(
        records.create_prescription(&fx.receptionist, prescription_for(&fx, None)),
        Err(ClinicError::Forbidden(_))
    ));

    let mut wrong_patient = prescription_for(&fx, Some(&appointment));
    wrong_patient.patient_id = fx.other_patient.id;
    assert!(matches!(
        records.create_prescription(&fx.doctor, wrong_patient),
        Err(ClinicError::Validation(_))
    ));

    let mut missing = prescription_for(&fx, None);
    missing.appointment_id = Some(9_999);
    assert!(matches!(
        records.create_prescription(&fx.doctor, missing),
        Err(ClinicError::NotFound(_))
    ));

    // Without an appointment any doctor may prescribe.
    assert!(records
        .create_prescription(&fx.other_doctor, prescription_for(&fx, None))
        .is_ok());
}

#[test]
fn prescriptions_need_complete_medicines() {
    let fx = Fixture::new();
    let records = &fx.clinic.records;

    let mut empty = prescription_for(&fx, None);
    empty.medicines.clear();
    assert!(matches!(
        records.create_prescription(&fx.doctor, empty),
        Err(ClinicError::Validation(_))
    ));

    let mut no_duration = prescription_for(&fx, None);
    no_duration.medicines[0].duration = String::new();
    assert!(matches!(
        records.create_prescription(&fx.doctor, no_duration),
        Err(ClinicError::Validation(_))
    ));
}

#[test]
fn prescriptions_are_hidden_from_the_front_desk() {
    let fx = Fixture::new();
    let records = &fx.clinic.records;
    let prescription = records
        .create_prescription(&fx.doctor, prescription_for(&fx, None))
        .unwrap();

    assert!(records
        .get_prescription(&fx.patient, prescription.id)
        .is_ok());
    assert!(records
        .get_prescription(&fx.doctor, prescription.id)
        .is_ok());
    for caller in [fx.receptionist, fx.admin, fx.other_patient, fx.other_doctor] {
        assert!(matches!(
            records.get_prescription(&caller, prescription.id),
            Err(ClinicError::Forbidden(_))
        ));
    }
    assert!(matches!(
        records.list_prescriptions(&fx.receptionist, None),
        Err(ClinicError::Forbidden(_))
    ));
    assert!(matches!(
        records.get_prescription(&fx.patient, 9_999),
        Err(ClinicError::NotFound(_))
    ));
}

#[test]
fn prescription_lifecycle_is_owned_by_the_issuing_doctor() {
    let fx = Fixture::new();
    let records = &fx.clinic.records;
    let prescription = records
        .create_prescription(&fx.doctor, prescription_for(&fx, None))
        .unwrap();

    assert!(matches!(
        records.update_prescription(&fx.patient, prescription.id, PrescriptionUpdate::default()),
        Err(ClinicError::Forbidden(_))
    ));

    let updated = records
        .update_prescription(
            &fx.doctor,
            prescription.id,
            PrescriptionUpdate {
                notes: Some("Review in a week".to_string()),
                status: Some(PrescriptionStatus::Completed),
                ..PrescriptionUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.notes.as_deref(), Some("Review in a week"));
    assert_eq!(updated.status, PrescriptionStatus::Completed);
    assert_eq!(updated.medicines, prescription.medicines);
    assert_eq!(updated.expiry_date, prescription.expiry_date);

    let active = records
        .list_prescriptions(&fx.patient, Some(PrescriptionStatus::Active))
        .unwrap();
    assert!(active.is_empty());
    assert_eq!(
        records.list_prescriptions(&fx.patient, None).unwrap().len(),
        1
    );

    assert!(matches!(
        records.delete_prescription(&fx.other_doctor, prescription.id),
        Err(ClinicError::Forbidden(_))
    ));
    records
        .delete_prescription(&fx.doctor, prescription.id)
        .unwrap();
    assert!(matches!(
        records.get_prescription(&fx.doctor, prescription.id),
        Err(ClinicError::NotFound(_))
    ));
}

#[test]
fn only_the_patient_downloads_the_document() {
    let fx = Fixture::new();
    let records = &fx.clinic.records;
    let prescription = records
        .create_prescription(&fx.doctor, prescription_for(&fx, None))
        .unwrap();

    let url = records
        .prescription_pdf_url(
            &fx.patient,
            prescription.id,
            "https://clinic.example/api/v1/",
        )
        .unwrap();
    assert_eq!(
        url,
        format!(
            "https://clinic.example/api/v1/prescriptions/{}.pdf",
            prescription.id
        )
    );
    assert!(matches!(
        records.prescription_pdf_url(&fx.doctor, prescription.id, "https://clinic.example"),
        Err(ClinicError::Forbidden(_))
    ));
}

#[test]
fn doctor_analytics_counts_own_practice() {
    let fx = Fixture::new();
    let records = &fx.clinic.records;
    let ledger = &fx.clinic.appointments;

    let first = booked(&fx, TimeSlot::NineAm);
    let second = booked(&fx, TimeSlot::TenAm);
    booked(&fx, TimeSlot::ElevenAm);
    ledger
        .update_status(&fx.doctor, first.id, AppointmentStatus::Completed)
        .unwrap();
    records
        .create_diagnosis(&fx.doctor, diagnosis_for(&first))
        .unwrap();
    records
        .create_diagnosis(&fx.doctor, diagnosis_for(&second))
        .unwrap();

    let analytics = fx.clinic.doctor_analytics(&fx.doctor).unwrap();
    assert_eq!(analytics.total_appointments, 3);
    assert_eq!(analytics.completed_appointments, 1);
    assert_eq!(analytics.total_diagnoses, 2);
    assert_eq!(analytics.common_diagnoses.len(), 1);
    assert_eq!(analytics.common_diagnoses[0].diagnosis, "Influenza");
    assert_eq!(analytics.common_diagnoses[0].count, 2);

    for caller in [fx.patient, fx.receptionist, fx.admin] {
        assert!(matches!(
            fx.clinic.doctor_analytics(&caller),
            Err(ClinicError::Forbidden(_))
        ));
    }
}

#[test]
fn failed_diagnosis_insert_leaves_no_partial_chain() {
    let fx = Fixture::new();
    let appointment = booked(&fx, TimeSlot::NineAm);

    // A row bound to the appointment that was never linked back onto it.
    let conn = fx.clinic.database().connect().unwrap();
    conn.execute(
        "INSERT INTO diagnoses (appointment_id, patient_id, doctor_id, symptoms, diagnosis, \
         created_at, updated_at) VALUES (?, ?, ?, 'cough', 'Bronchitis', 0, 0)",
        rusqlite::params![appointment.id, fx.patient.id, fx.doctor.id],
    )
    .unwrap();
    let count_rows = || -> i64 {
        conn.query_row("SELECT COUNT(*) FROM diagnoses", [], |row| row.get(0))
            .unwrap()
    };
    let before = count_rows();

    assert!(matches!(
        fx.clinic
            .records
            .create_diagnosis(&fx.doctor, diagnosis_for(&appointment)),
        Err(ClinicError::Conflict(_))
    ));

    assert_eq!(count_rows(), before);
    let reloaded = fx
        .clinic
        .appointments
        .get(&fx.doctor, appointment.id)
        .unwrap();
    assert_eq!(reloaded.diagnosis_id, None);
    assert_eq!(reloaded.updated_at, appointment.updated_at);
}

struct EchoAdvisor;

impl clinic_ledger::advisory::AdvisoryProvider for EchoAdvisor {
    fn analyse(&self, symptoms: Option<&str>, _vitals: Option<&Vitals>) -> String {
        format!("echo: {}", symptoms.unwrap_or_default())
    }
}

#[test]
fn advisory_provider_can_be_replaced() {
    let fx = Fixture::new();
    let clinic = fx
        .clinic
        .clone()
        .with_advisor(std::sync::Arc::new(EchoAdvisor));
    let appointment = booked(&fx, TimeSlot::NineAm);

    let diagnosis = clinic
        .records
        .create_diagnosis(&fx.doctor, diagnosis_for(&appointment))
        .unwrap();
    assert_eq!(
        diagnosis.ai_analysis.as_deref(),
        Some("echo: fever and cough")
    );
}

use super::{non_blank, RecordChain};
use crate::access::{self, Action, Caller, Owned, Ownership, Resource};
use crate::db::{self, directory};
use crate::error::{ClinicError, Result};
use crate::models::{Medicine, Prescription, PrescriptionStatus, Role};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;
use tracing::{debug, info};

/// How long a prescription stays valid after it is issued.
pub const PRESCRIPTION_VALIDITY: Duration = Duration::days(90);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescription {
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    pub medicines: Vec<Medicine>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

/// A partial amendment. Absent or blank fields are left as stored, and an
/// empty medicine list does not replace the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionUpdate {
    pub medicines: Option<Vec<Medicine>>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub status: Option<PrescriptionStatus>,
}

impl PrescriptionUpdate {
    fn apply_to(self, record: &mut Prescription) -> Result<()> {
        if let Some(medicines) = self.medicines.filter(|m| !m.is_empty()) {
            validate_medicines(&medicines)?;
            record.medicines = medicines;
        }
        if let Some(diagnosis) = non_blank(self.diagnosis) {
            record.diagnosis = Some(diagnosis);
        }
        if let Some(notes) = non_blank(self.notes) {
            record.notes = Some(notes);
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        Ok(())
    }
}

fn validate_medicines(medicines: &[Medicine]) -> Result<()> {
    if medicines.is_empty() {
        return Err(ClinicError::validation("At least one medicine is required"));
    }
    for (index, medicine) in medicines.iter().enumerate() {
        let blank = [
            ("name", &medicine.name),
            ("dosage", &medicine.dosage),
            ("duration", &medicine.duration),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty());
        if let Some((field, _)) = blank {
            return Err(ClinicError::validation(format!(
                "Medicine {} is missing a {field}",
                index + 1
            )));
        }
    }
    Ok(())
}

fn not_found() -> ClinicError {
    ClinicError::not_found("Prescription not found")
}

fn load(conn: &Connection, prescription_id: i64) -> Result<Prescription> {
    db::prescriptions::find(conn, prescription_id)?.ok_or_else(not_found)
}

impl RecordChain {
    /// Issues a prescription valid for [`PRESCRIPTION_VALIDITY`].
    ///
    /// # Errors
    ///
    /// * `Forbidden` unless the caller is a doctor, and the appointment, when
    ///   given, is theirs.
    /// * `NotFound` if the appointment or the patient does not exist.
    /// * `Validation` if the appointment is for another patient, or the
    ///   medicine list is empty or has an entry without name, dosage or duration.
    pub fn create_prescription(
        &self,
        caller: &Caller,
        input: NewPrescription,
    ) -> Result<Prescription> {
        let conn = self.db.connect()?;

        let ownership = match input.appointment_id {
            Some(appointment_id) => {
                let appointment = db::appointments::find(&conn, appointment_id)?
                    .ok_or_else(|| ClinicError::not_found("Appointment not found"))?;
                access::authorize(
                    caller,
                    Resource::Prescription,
                    Action::Create,
                    &appointment.ownership(),
                )?;
                if appointment.patient_id != input.patient_id {
                    return Err(ClinicError::validation(
                        "The appointment belongs to a different patient",
                    ));
                }
                appointment.ownership()
            }
            None => {
                let ownership = Ownership {
                    patient_id: input.patient_id,
                    doctor_id: caller.id,
                    receptionist_id: None,
                };
                access::authorize(caller, Resource::Prescription, Action::Create, &ownership)?;
                ownership
            }
        };

        directory::find_user(&conn, input.patient_id)?
            .filter(|user| user.role == Role::Patient)
            .ok_or_else(|| ClinicError::not_found("Patient not found"))?;
        validate_medicines(&input.medicines)?;

        let now = self.clock.now();
        let draft = Prescription {
            id: 0,
            patient_id: ownership.patient_id,
            doctor_id: ownership.doctor_id,
            appointment_id: input.appointment_id,
            medicines: input.medicines,
            diagnosis: non_blank(input.diagnosis),
            notes: non_blank(input.notes),
            issued_date: now,
            expiry_date: now + PRESCRIPTION_VALIDITY,
            status: PrescriptionStatus::Active,
            pdf_url: None,
            created_at: now,
            updated_at: now,
        };
        let id = db::prescriptions::insert(&conn, &draft)?;
        let created = load(&conn, id)?;

        info!(
            prescription = created.id,
            patient = created.patient_id,
            doctor = created.doctor_id,
            medicines = created.medicines.len(),
            "prescription issued"
        );
        Ok(created)
    }

    pub fn update_prescription(
        &self,
        caller: &Caller,
        prescription_id: i64,
        update: PrescriptionUpdate,
    ) -> Result<Prescription> {
        let conn = self.db.connect()?;
        let mut record = load(&conn, prescription_id)?;
        access::authorize(
            caller,
            Resource::Prescription,
            Action::Update,
            &record.ownership(),
        )?;

        update.apply_to(&mut record)?;
        record.updated_at = self.clock.now();
        db::prescriptions::update(&conn, &record)?;

        info!(prescription = prescription_id, "prescription updated");
        load(&conn, prescription_id)
    }

    pub fn delete_prescription(&self, caller: &Caller, prescription_id: i64) -> Result<()> {
        let conn = self.db.connect()?;
        let record = load(&conn, prescription_id)?;
        access::authorize(
            caller,
            Resource::Prescription,
            Action::Delete,
            &record.ownership(),
        )?;

        db::prescriptions::delete(&conn, prescription_id)?;
        info!(prescription = prescription_id, "prescription deleted");
        Ok(())
    }

    /// Retrieves a prescription. Only its doctor and its patient can see it.
    pub fn get_prescription(&self, caller: &Caller, prescription_id: i64) -> Result<Prescription> {
        let conn = self.db.connect()?;
        let record = load(&conn, prescription_id)?;
        access::authorize(
            caller,
            Resource::Prescription,
            Action::Read,
            &record.ownership(),
        )?;
        Ok(record)
    }

    /// Lists the caller's prescriptions, most recently issued first.
    pub fn list_prescriptions(
        &self,
        caller: &Caller,
        status: Option<PrescriptionStatus>,
    ) -> Result<Vec<Prescription>> {
        let scope = access::list_scope(caller, Resource::Prescription)?;
        let conn = self.db.connect()?;
        let prescriptions = db::prescriptions::list(&conn, scope, status)?;
        debug!(caller = caller.id, count = prescriptions.len(), "listed prescriptions");
        Ok(prescriptions)
    }

    /// The download location of a prescription document, for its patient.
    /// No document is rendered; the URL is derived from `base_url`.
    pub fn prescription_pdf_url(
        &self,
        caller: &Caller,
        prescription_id: i64,
        base_url: &str,
    ) -> Result<String> {
        let conn = self.db.connect()?;
        let record = load(&conn, prescription_id)?;
        access::authorize(
            caller,
            Resource::Prescription,
            Action::Download,
            &record.ownership(),
        )?;
        Ok(format!(
            "{}/prescriptions/{}.pdf",
            base_url.trim_end_matches('/'),
            record.id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;

    fn medicine(name: &str, dosage: &str, duration: &str) -> Medicine {
        Medicine {
            name: name.to_string(),
            dosage: dosage.to_string(),
            frequency: Frequency::TwiceDaily,
            duration: duration.to_string(),
            instructions: None,
        }
    }

    #[test]
    fn medicines_must_be_present_and_complete() {
        assert!(validate_medicines(&[medicine("Ibuprofen", "400mg", "5 days")]).is_ok());
        assert!(matches!(
            validate_medicines(&[]),
            Err(ClinicError::Validation(_))
        ));

        let err = validate_medicines(&[
            medicine("Ibuprofen", "400mg", "5 days"),
            medicine("Paracetamol", " ", "3 days"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "Medicine 2 is missing a dosage");
    }

    #[test]
    fn validity_is_ninety_days() {
        assert_eq!(PRESCRIPTION_VALIDITY.whole_days(), 90);
    }
}

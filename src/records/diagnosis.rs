use super::{non_blank, RecordChain};
use crate::access::{self, Action, Caller, Owned, Resource};
use crate::appointments::link_diagnosis;
use crate::db;
use crate::error::{is_unique_violation, ClinicError, Result};
use crate::models::{day_format, Diagnosis, Urgency, Vitals};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use time::Date;
use tracing::{debug, info, warn};

/// Findings recorded by the treating doctor for one appointment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiagnosis {
    pub appointment_id: i64,
    /// Defaults to the symptoms given at booking.
    pub symptoms: Option<String>,
    pub vitals: Option<Vitals>,
    pub observations: Option<String>,
    pub diagnosis: Option<String>,
    pub icd10_code: Option<String>,
    pub treatment_plan: Option<String>,
    #[serde(default, with = "day_format::option")]
    pub follow_up_date: Option<Date>,
    pub urgency: Option<Urgency>,
    pub referral_needed: Option<bool>,
    pub referral_details: Option<String>,
}

/// A partial amendment. Blank strings leave the stored value in place;
/// `referral_needed` is applied whenever it is present, `false` included.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisUpdate {
    pub symptoms: Option<String>,
    pub vitals: Option<Vitals>,
    pub observations: Option<String>,
    pub diagnosis: Option<String>,
    pub icd10_code: Option<String>,
    pub treatment_plan: Option<String>,
    #[serde(default, with = "day_format::option")]
    pub follow_up_date: Option<Date>,
    pub urgency: Option<Urgency>,
    pub referral_needed: Option<bool>,
    pub referral_details: Option<String>,
}

impl DiagnosisUpdate {
    fn apply_to(self, record: &mut Diagnosis) {
        if let Some(symptoms) = non_blank(self.symptoms) {
            record.symptoms = symptoms;
        }
        if let Some(diagnosis) = non_blank(self.diagnosis) {
            record.diagnosis = diagnosis;
        }
        if let Some(vitals) = self.vitals {
            record.vitals = vitals;
        }
        if let Some(urgency) = self.urgency {
            record.urgency = urgency;
        }
        if let Some(referral_needed) = self.referral_needed {
            record.referral_needed = referral_needed;
        }
        if self.follow_up_date.is_some() {
            record.follow_up_date = self.follow_up_date;
        }
        for (field, value) in [
            (&mut record.observations, self.observations),
            (&mut record.icd10_code, self.icd10_code),
            (&mut record.treatment_plan, self.treatment_plan),
            (&mut record.referral_details, self.referral_details),
        ] {
            if let Some(value) = non_blank(value) {
                *field = Some(value);
            }
        }
    }
}

fn not_found() -> ClinicError {
    ClinicError::not_found("Diagnosis not found")
}

fn load(conn: &Connection, diagnosis_id: i64) -> Result<Diagnosis> {
    db::diagnoses::find(conn, diagnosis_id)?.ok_or_else(not_found)
}

impl RecordChain {
    /// Records the treating doctor's diagnosis and links it onto the
    /// appointment. The insert and the link commit together or not at all.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the appointment does not exist.
    /// * `Forbidden` unless the caller is the appointment's doctor.
    /// * `Validation` if the diagnosis text is blank or no symptoms are known.
    /// * `Conflict` if the appointment already has a diagnosis.
    pub fn create_diagnosis(&self, caller: &Caller, input: NewDiagnosis) -> Result<Diagnosis> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let appointment = db::appointments::find(&tx, input.appointment_id)?
            .ok_or_else(|| ClinicError::not_found("Appointment not found"))?;
        access::authorize(
            caller,
            Resource::Diagnosis,
            Action::Create,
            &appointment.ownership(),
        )?;

        if appointment.diagnosis_id.is_some() {
            warn!(appointment = appointment.id, "diagnosis already recorded");
            return Err(ClinicError::conflict("This appointment already has a diagnosis"));
        }

        let diagnosis = non_blank(input.diagnosis)
            .ok_or_else(|| ClinicError::validation("Diagnosis is required"))?;
        let symptoms = non_blank(input.symptoms)
            .or_else(|| non_blank(appointment.symptoms.clone()))
            .ok_or_else(|| ClinicError::validation("Symptoms are required"))?;
        let vitals = input.vitals.unwrap_or_default();
        let analysis = self.advisor.analyse(Some(&symptoms), Some(&vitals));

        let now = self.clock.now();
        let draft = Diagnosis {
            id: 0,
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            symptoms,
            vitals,
            observations: non_blank(input.observations),
            ai_analysis: Some(analysis),
            diagnosis,
            icd10_code: non_blank(input.icd10_code),
            treatment_plan: non_blank(input.treatment_plan),
            follow_up_date: input.follow_up_date,
            urgency: input.urgency.unwrap_or_default(),
            referral_needed: input.referral_needed.unwrap_or(false),
            referral_details: non_blank(input.referral_details),
            created_at: now,
            updated_at: now,
        };

        let id = db::diagnoses::insert(&tx, &draft).map_err(|err| {
            if is_unique_violation(&err) {
                ClinicError::conflict("This appointment already has a diagnosis")
            } else {
                ClinicError::from(err)
            }
        })?;
        link_diagnosis(&tx, appointment.id, id, now)?;
        let created = load(&tx, id)?;
        tx.commit()?;

        info!(
            diagnosis = created.id,
            appointment = created.appointment_id,
            doctor = created.doctor_id,
            "diagnosis recorded"
        );
        Ok(created)
    }

    /// Amends a diagnosis. Only its doctor may do this.
    pub fn update_diagnosis(
        &self,
        caller: &Caller,
        diagnosis_id: i64,
        update: DiagnosisUpdate,
    ) -> Result<Diagnosis> {
        let conn = self.db.connect()?;
        let mut record = load(&conn, diagnosis_id)?;
        access::authorize(
            caller,
            Resource::Diagnosis,
            Action::Update,
            &record.ownership(),
        )?;

        update.apply_to(&mut record);
        record.updated_at = self.clock.now();
        db::diagnoses::update(&conn, &record)?;

        info!(diagnosis = diagnosis_id, "diagnosis updated");
        load(&conn, diagnosis_id)
    }

    /// Retrieves a diagnosis for its doctor, its patient, or the front desk
    /// and admins.
    pub fn get_diagnosis(&self, caller: &Caller, diagnosis_id: i64) -> Result<Diagnosis> {
        let conn = self.db.connect()?;
        let record = load(&conn, diagnosis_id)?;
        access::authorize(
            caller,
            Resource::Diagnosis,
            Action::Read,
            &record.ownership(),
        )?;
        Ok(record)
    }

    /// Lists the diagnoses the caller may see, newest first.
    pub fn list_diagnoses(&self, caller: &Caller) -> Result<Vec<Diagnosis>> {
        let scope = access::list_scope(caller, Resource::Diagnosis)?;
        let conn = self.db.connect()?;
        let diagnoses = db::diagnoses::list(&conn, scope)?;
        debug!(caller = caller.id, count = diagnoses.len(), "listed diagnoses");
        Ok(diagnoses)
    }
}

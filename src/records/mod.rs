//! Clinical record chain.
//!
//! Diagnoses are bound one-to-one to an appointment and linked back onto it;
//! prescriptions are issued by a doctor, optionally against one of their
//! appointments. Every operation loads its target first, reports a missing
//! record as `NotFound`, and only then asks the access guard.

mod diagnosis;
mod prescription;

pub use diagnosis::{DiagnosisUpdate, NewDiagnosis};
pub use prescription::{NewPrescription, PrescriptionUpdate, PRESCRIPTION_VALIDITY};

use crate::advisory::{
    AdvisoryProvider, FormularyLookup, MedicineReference, RuleTableAdvisor, StaticFormulary,
};
use crate::clock::Clock;
use crate::db::Database;
use crate::models::Vitals;
use std::sync::Arc;

#[derive(Clone)]
pub struct RecordChain {
    db: Database,
    clock: Arc<dyn Clock>,
    advisor: Arc<dyn AdvisoryProvider>,
    formulary: Arc<dyn FormularyLookup>,
}

impl RecordChain {
    /// Builds a chain using the built-in rule table and medicine list.
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            advisor: Arc::new(RuleTableAdvisor),
            formulary: Arc::new(StaticFormulary),
        }
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn AdvisoryProvider>) -> Self {
        self.advisor = advisor;
        self
    }

    pub fn with_formulary(mut self, formulary: Arc<dyn FormularyLookup>) -> Self {
        self.formulary = formulary;
        self
    }

    /// Stateless advisory text for the given findings. Nothing is stored.
    pub fn analyse(&self, symptoms: Option<&str>, vitals: Option<&Vitals>) -> String {
        self.advisor.analyse(symptoms, vitals)
    }

    /// Searches the medicine reference by name.
    pub fn search_medicines(&self, query: &str) -> Vec<MedicineReference> {
        self.formulary.search(query)
    }
}

/// Trims optional free text, treating blank input as absent.
fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

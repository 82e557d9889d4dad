//! Advisory collaborators: the diagnosis-assist text and the medicine reference.
//!
//! Both sit behind narrow traits so a real assistant or formulary can be wired
//! in without touching the record chain. The shipped implementations are a
//! fixed keyword rule table and a three-entry medicine list.

use crate::models::Vitals;
use serde::Serialize;

/// Produces advisory text for a doctor from symptoms and vitals.
pub trait AdvisoryProvider: Send + Sync {
    fn analyse(&self, symptoms: Option<&str>, vitals: Option<&Vitals>) -> String;
}

const FEVER_COUGH: &str =
    "Possible viral respiratory infection. Consider: COVID-19, Influenza, or common cold.";
const HIGH_BLOOD_PRESSURE: &str =
    "Patient shows elevated blood pressure. Monitor closely. Consider lifestyle changes and consultation with cardiologist.";
const FEVER_HEADACHE: &str =
    "Symptoms suggest possible migraine or fever-related headache. Recommend hydration and pain management.";
const FALLBACK: &str =
    "Based on the symptoms and vitals provided, further investigation is recommended.";

/// Keyword rule table. Rules are only consulted when symptoms are given, and the
/// first match wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleTableAdvisor;

impl AdvisoryProvider for RuleTableAdvisor {
    fn analyse(&self, symptoms: Option<&str>, vitals: Option<&Vitals>) -> String {
        let Some(symptoms) = symptoms.filter(|s| !s.is_empty()) else {
            return FALLBACK.to_string();
        };
        let symptoms = symptoms.to_lowercase();
        let blood_pressure = vitals.and_then(|v| v.blood_pressure.as_deref());

        let analysis = if symptoms.contains("fever") && symptoms.contains("cough") {
            FEVER_COUGH
        } else if blood_pressure.is_some_and(|bp| bp.contains("160")) {
            HIGH_BLOOD_PRESSURE
        } else if symptoms.contains("fever") && symptoms.contains("headache") {
            FEVER_HEADACHE
        } else {
            FALLBACK
        };
        analysis.to_string()
    }
}

/// A medicine in the reference catalog, with suggested dosages and frequencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineReference {
    pub id: u32,
    pub name: &'static str,
    pub dosages: &'static [&'static str],
    pub common_frequencies: &'static [&'static str],
}

/// Looks medicines up by name.
pub trait FormularyLookup: Send + Sync {
    fn search(&self, query: &str) -> Vec<MedicineReference>;
}

const REFERENCE_MEDICINES: &[MedicineReference] = &[
    MedicineReference {
        id: 1,
        name: "Amoxicillin",
        dosages: &["250mg", "500mg", "1000mg"],
        common_frequencies: &["Twice daily", "Thrice daily"],
    },
    MedicineReference {
        id: 2,
        name: "Ibuprofen",
        dosages: &["200mg", "400mg", "600mg"],
        common_frequencies: &["Every 4 hours", "Every 6 hours"],
    },
    MedicineReference {
        id: 3,
        name: "Paracetamol",
        dosages: &["250mg", "500mg", "1000mg"],
        common_frequencies: &["Every 4 hours", "Every 6 hours"],
    },
];

/// The built-in reference list. Matching is a case-insensitive substring test
/// on the medicine name; an empty query matches everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticFormulary;

impl FormularyLookup for StaticFormulary {
    fn search(&self, query: &str) -> Vec<MedicineReference> {
        let needle = query.trim().to_lowercase();
        REFERENCE_MEDICINES
            .iter()
            .filter(|m| m.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

//! Canonical flat records written to the staging tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of `staging_patient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub case_id: String,
    pub sex: String,
    /// ISO calendar date, always `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub deceased: Option<bool>,
    pub date_of_death: Option<String>,
    pub facility_id: String,
}

impl PatientRecord {
    /// Deduplication key.
    pub fn key(&self) -> String {
        self.case_id.clone()
    }
}

/// Resolved value of an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConceptValue {
    Text(String),
    Number(serde_json::Number),
    Boolean(bool),
    Null,
}

impl ConceptValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form stored in the `concept_value` column.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Null => None,
        }
    }
}

impl fmt::Display for ConceptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("null"),
        }
    }
}

/// One row of `staging_patient_obs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub patient_id: String,
    pub encounter_id: String,
    pub concept_code: String,
    pub concept_name: String,
    pub concept_value: ConceptValue,
    pub effective_date: Option<String>,
}

/// Which fields identify an observation within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKey {
    /// `(encounter_id, concept_code)`
    #[default]
    EncounterConcept,
    /// `(patient_id, encounter_id, concept_code)`
    PatientEncounterConcept,
}

impl ObservationRecord {
    /// Deduplication key under the given key policy.
    pub fn key(&self, policy: ObservationKey) -> (Option<String>, String, String) {
        let patient = match policy {
            ObservationKey::EncounterConcept => None,
            ObservationKey::PatientEncounterConcept => Some(self.patient_id.clone()),
        };
        (patient, self.encounter_id.clone(), self.concept_code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obs(patient: &str, encounter: &str, code: &str) -> ObservationRecord {
        ObservationRecord {
            patient_id: patient.into(),
            encounter_id: encounter.into(),
            concept_code: code.into(),
            concept_name: "Weight".into(),
            concept_value: ConceptValue::Null,
            effective_date: None,
        }
    }

    #[test]
    fn test_concept_value_text() {
        assert_eq!(ConceptValue::Text("high".into()).to_text(), Some("high".into()));
        let n: serde_json::Number = serde_json::from_value(json!(98.6)).unwrap();
        assert_eq!(ConceptValue::Number(n).to_text(), Some("98.6".into()));
        assert_eq!(ConceptValue::Boolean(false).to_text(), Some("false".into()));
        assert_eq!(ConceptValue::Null.to_text(), None);
        assert_eq!(ConceptValue::Null.to_string(), "null");
    }

    #[test]
    fn test_observation_key_policies() {
        let a = obs("p1", "e1", "5089-8");
        let b = obs("p2", "e1", "5089-8");
        assert_eq!(
            a.key(ObservationKey::EncounterConcept),
            b.key(ObservationKey::EncounterConcept)
        );
        assert_ne!(
            a.key(ObservationKey::PatientEncounterConcept),
            b.key(ObservationKey::PatientEncounterConcept)
        );
    }

    #[test]
    fn test_observation_key_has_no_concatenation_collision() {
        let a = obs("p1", "ab", "c");
        let b = obs("p1", "a", "bc");
        assert_ne!(
            a.key(ObservationKey::EncounterConcept),
            b.key(ObservationKey::EncounterConcept)
        );
    }
}

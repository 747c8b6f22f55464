use serde_json::Value;

use super::{present, present_str, resource_label};
use crate::error::{CoreError, Result};
use crate::record::{ConceptValue, ObservationRecord};
use crate::reference::reference_id;

/// Scalar `value[x]` members, in resolution order.
const SCALAR_VALUES: [&str; 5] = [
    "valueString",
    "valueBoolean",
    "valueInteger",
    "valueTime",
    "valueDateTime",
];

/// Normalizes a raw Observation resource.
///
/// `code.coding[0]`, `subject.reference` and `encounter.reference` are
/// required; a record without them is a `MalformedRecord` naming the
/// missing path. A reference without an id segment is an
/// `InvalidReference`.
pub fn normalize_observation(raw: &Value) -> Result<ObservationRecord> {
    let label = resource_label(raw, "Observation");
    let missing = |path: &str| CoreError::malformed(label.clone(), path);

    let coding = present(raw, "code")
        .and_then(|code| present(code, "coding"))
        .and_then(|coding| coding.get(0))
        .filter(|c| c.is_object())
        .ok_or_else(|| missing("code.coding[0]"))?;

    let concept_code = present_str(coding, "code").ok_or_else(|| missing("code.coding[0].code"))?;
    // Fall back to the concept text when the coding has no display
    let concept_name = present_str(coding, "display")
        .or_else(|| present(raw, "code").and_then(|code| present_str(code, "text")))
        .ok_or_else(|| missing("code.coding[0].display"))?;

    let patient_id = present(raw, "subject")
        .and_then(|s| present_str(s, "reference"))
        .ok_or_else(|| missing("subject.reference"))
        .and_then(reference_id)?;

    let encounter_id = present(raw, "encounter")
        .and_then(|e| present_str(e, "reference"))
        .ok_or_else(|| missing("encounter.reference"))
        .and_then(reference_id)?;

    Ok(ObservationRecord {
        patient_id,
        encounter_id,
        concept_code: concept_code.to_string(),
        concept_name: concept_name.to_string(),
        concept_value: resolve_value(raw),
        effective_date: present_str(raw, "effectiveDateTime").map(str::to_string),
    })
}

/// Resolves `value[x]`: coded concept display, then quantity value, then
/// the first present scalar.
fn resolve_value(raw: &Value) -> ConceptValue {
    if let Some(concept) = present(raw, "valueCodeableConcept") {
        let display = present(concept, "coding")
            .and_then(|coding| coding.get(0))
            .and_then(|c| present_str(c, "display"))
            .or_else(|| present_str(concept, "text"));
        return display
            .map(|d| ConceptValue::Text(d.to_string()))
            .unwrap_or(ConceptValue::Null);
    }

    if let Some(quantity) = present(raw, "valueQuantity") {
        return present(quantity, "value")
            .map(scalar)
            .unwrap_or(ConceptValue::Null);
    }

    SCALAR_VALUES
        .iter()
        .find_map(|key| present(raw, key))
        .map(scalar)
        .unwrap_or(ConceptValue::Null)
}

fn scalar(value: &Value) -> ConceptValue {
    match value {
        Value::String(s) => ConceptValue::Text(s.clone()),
        Value::Number(n) => ConceptValue::Number(n.clone()),
        Value::Bool(b) => ConceptValue::Boolean(*b),
        _ => ConceptValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "resourceType": "Observation",
            "id": "o1",
            "code": {"coding": [{"system": "http://loinc.org", "code": "8310-5", "display": "Body temperature"}]},
            "subject": {"reference": "Patient/p1"},
            "encounter": {"reference": "Encounter/e1"},
            "effectiveDateTime": "2023-04-02T08:30:00+03:00"
        })
    }

    fn number(v: Value) -> ConceptValue {
        ConceptValue::Number(serde_json::from_value(v).unwrap())
    }

    #[test]
    fn test_identity_fields() {
        let record = normalize_observation(&base()).unwrap();
        assert_eq!(record.patient_id, "p1");
        assert_eq!(record.encounter_id, "e1");
        assert_eq!(record.concept_code, "8310-5");
        assert_eq!(record.concept_name, "Body temperature");
        assert_eq!(
            record.effective_date.as_deref(),
            Some("2023-04-02T08:30:00+03:00")
        );
        assert_eq!(record.concept_value, ConceptValue::Null);
    }

    #[test]
    fn test_quantity_without_concept() {
        let mut raw = base();
        raw["valueQuantity"] = json!({"value": 98.6, "unit": "degF"});
        let record = normalize_observation(&raw).unwrap();
        assert_eq!(record.concept_value, number(json!(98.6)));
    }

    #[test]
    fn test_concept_beats_quantity_and_scalars() {
        let mut raw = base();
        raw["valueQuantity"] = json!({"value": 12});
        raw["valueString"] = json!("twelve");
        raw["valueCodeableConcept"] = json!({"coding": [{"code": "POS", "display": "Positive"}]});
        let record = normalize_observation(&raw).unwrap();
        assert_eq!(record.concept_value, ConceptValue::Text("Positive".into()));
    }

    #[test]
    fn test_quantity_beats_scalars() {
        let mut raw = base();
        raw["valueString"] = json!("ignored");
        raw["valueQuantity"] = json!({"value": 0});
        let record = normalize_observation(&raw).unwrap();
        assert_eq!(record.concept_value, number(json!(0)));
    }

    #[test]
    fn test_scalar_order() {
        let mut raw = base();
        raw["valueDateTime"] = json!("2023-01-01");
        raw["valueInteger"] = json!(3);
        raw["valueBoolean"] = json!(true);
        assert_eq!(
            normalize_observation(&raw).unwrap().concept_value,
            ConceptValue::Boolean(true)
        );

        raw["valueString"] = json!("text");
        assert_eq!(
            normalize_observation(&raw).unwrap().concept_value,
            ConceptValue::Text("text".into())
        );
    }

    #[test]
    fn test_falsy_values_are_preserved() {
        let mut raw = base();
        raw["valueBoolean"] = json!(false);
        raw["valueInteger"] = json!(7);
        assert_eq!(
            normalize_observation(&raw).unwrap().concept_value,
            ConceptValue::Boolean(false)
        );

        let mut raw = base();
        raw["valueInteger"] = json!(0);
        assert_eq!(normalize_observation(&raw).unwrap().concept_value, number(json!(0)));

        let mut raw = base();
        raw["valueString"] = json!("");
        raw["valueTime"] = json!("10:00:00");
        assert_eq!(
            normalize_observation(&raw).unwrap().concept_value,
            ConceptValue::Text(String::new())
        );
    }

    #[test]
    fn test_null_members_are_absent() {
        let mut raw = base();
        raw["valueCodeableConcept"] = Value::Null;
        raw["valueTime"] = json!("10:00:00");
        assert_eq!(
            normalize_observation(&raw).unwrap().concept_value,
            ConceptValue::Text("10:00:00".into())
        );
    }

    #[test]
    fn test_concept_name_falls_back_to_code_text() {
        let mut raw = base();
        raw["code"] = json!({"coding": [{"code": "X1"}], "text": "Local test"});
        let record = normalize_observation(&raw).unwrap();
        assert_eq!(record.concept_name, "Local test");
    }

    #[test]
    fn test_missing_structure_names_path() {
        let cases = [
            ("code", "code.coding[0]"),
            ("subject", "subject.reference"),
            ("encounter", "encounter.reference"),
        ];
        for (member, path) in cases {
            let mut raw = base();
            raw.as_object_mut().unwrap().remove(member);
            match normalize_observation(&raw) {
                Err(CoreError::MalformedRecord { resource, path: p }) => {
                    assert_eq!(resource, "Observation/o1");
                    assert_eq!(p, path);
                }
                other => panic!("expected malformed record, got {other:?}"),
            }
        }

        let mut raw = base();
        raw["code"] = json!({"coding": []});
        assert!(normalize_observation(&raw).is_err());
    }

    #[test]
    fn test_reference_ids_ignore_type_case_and_trailing_segments() {
        let mut raw = base();
        raw["subject"] = json!({"reference": "patient/p1"});
        raw["encounter"] = json!({"reference": "Encounter/e1/extra"});
        let record = normalize_observation(&raw).unwrap();
        assert_eq!(record.patient_id, "p1");
        assert_eq!(record.encounter_id, "e1");
    }

    #[test]
    fn test_reference_without_id_is_record_error() {
        let mut raw = base();
        raw["subject"] = json!({"reference": "#contained"});
        let err = normalize_observation(&raw).unwrap_err();
        assert!(matches!(err, CoreError::InvalidReference(_)));
        assert!(err.is_record_error());
    }
}

use serde_json::Value;
use tracing::debug;

use super::{present, present_str, resource_label};
use crate::error::{CoreError, Result};
use crate::record::PatientRecord;
use crate::reference::reference_id;

/// Normalizes a raw Patient resource.
///
/// Returns `Ok(None)` when a required field is missing or invalid; such
/// records are excluded rather than reported as errors. Only a value that
/// is not a JSON object at all is malformed.
pub fn normalize_patient(raw: &Value) -> Result<Option<PatientRecord>> {
    if !raw.is_object() {
        return Err(CoreError::malformed("Patient", "resource"));
    }

    let case_id = present_str(raw, "id").filter(|s| !s.is_empty());
    let sex = present_str(raw, "gender").filter(|s| !s.is_empty());
    let date_of_birth = present_str(raw, "birthDate").map(normalize_birth_date);
    let deceased = present(raw, "deceasedBoolean").and_then(Value::as_bool);
    let date_of_death = present_str(raw, "deceasedDateTime").map(str::to_string);
    let facility_id = present(raw, "managingOrganization")
        .and_then(|org| present_str(org, "reference"))
        .and_then(|reference| match reference_id(reference) {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(
                    resource = %resource_label(raw, "Patient"),
                    error = %e,
                    "Unusable managing organization reference"
                );
                None
            }
        });

    let (Some(case_id), Some(sex), Some(date_of_birth), Some(facility_id)) =
        (case_id, sex, date_of_birth, facility_id)
    else {
        debug!(
            resource = %resource_label(raw, "Patient"),
            "Dropping patient with missing required fields"
        );
        return Ok(None);
    };

    if date_of_birth.chars().count() != 10 {
        debug!(
            resource = %resource_label(raw, "Patient"),
            birth_date = %date_of_birth,
            "Dropping patient with unusable birth date"
        );
        return Ok(None);
    }

    Ok(Some(PatientRecord {
        case_id: case_id.to_string(),
        sex: sex.to_string(),
        date_of_birth,
        deceased,
        date_of_death,
        facility_id,
    }))
}

/// Year-only birth dates become the first of January of that year.
fn normalize_birth_date(birth_date: &str) -> String {
    if birth_date.chars().count() == 4 {
        format!("{birth_date}-01-01")
    } else {
        birth_date.to_string()
    }
}

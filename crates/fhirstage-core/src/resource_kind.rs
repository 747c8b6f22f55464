use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Resource kinds that have a staging pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Patient,
    Observation,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Patient, ResourceKind::Observation];

    /// FHIR resource type name, used as the endpoint path segment.
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Patient => "Patient",
            Self::Observation => "Observation",
        }
    }

    /// Command-line selector for this kind.
    pub fn selector(&self) -> &'static str {
        match self {
            Self::Patient => "patients",
            Self::Observation => "observations",
        }
    }

    /// Destination staging table.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Patient => "staging_patient",
            Self::Observation => "staging_patient_obs",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patients" | "patient" => Ok(Self::Patient),
            "observations" | "observation" | "obs" => Ok(Self::Observation),
            _ => Err(CoreError::unknown_resource_kind(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_parse() {
        assert_eq!("patients".parse::<ResourceKind>().unwrap(), ResourceKind::Patient);
        assert_eq!("obs".parse::<ResourceKind>().unwrap(), ResourceKind::Observation);
        assert_eq!(
            "Observations".parse::<ResourceKind>().unwrap(),
            ResourceKind::Observation
        );
        assert!("encounters".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_kind_metadata() {
        assert_eq!(ResourceKind::Patient.resource_type(), "Patient");
        assert_eq!(ResourceKind::Patient.table(), "staging_patient");
        assert_eq!(ResourceKind::Observation.table(), "staging_patient_obs");
        assert_eq!(ResourceKind::Observation.to_string(), "Observation");
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Numeric organization (tenant) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub u32);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrgId {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.parse::<u32>() {
            Ok(value) if value > 0 && raw.bytes().all(|b| b.is_ascii_digit()) => Ok(Self(value)),
            _ => Err(ValidationError::InvalidOrgId(raw.to_string())),
        }
    }
}

/// Cluster identifier. Only string equality matters, but every accepted
/// value is UUID shaped (`8-4-4-4-12` hexadecimal groups).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterName(String);

impl ClusterName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if is_uuid_shaped(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidClusterName(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClusterName {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for ClusterName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_uuid_shaped(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidClusterName(value))
        }
    }
}

impl From<ClusterName> for String {
    fn from(value: ClusterName) -> Self {
        value.0
    }
}

fn is_uuid_shaped(raw: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];
    let mut parts = raw.split('-');
    for expected_len in GROUPS {
        match parts.next() {
            Some(part) if part.len() == expected_len => {
                if !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    parts.next().is_none()
}

// ---------------------------------------------------------------------------
// Report payloads
// ---------------------------------------------------------------------------

/// Pre-serialized report document. The JSON text is kept verbatim and is
/// only checked for well-formedness on construction.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ClusterReport(Box<RawValue>);

impl ClusterReport {
    pub fn from_json(raw: String) -> Result<Self, serde_json::Error> {
        RawValue::from_string(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for ClusterReport {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ClusterReport {}

// ---------------------------------------------------------------------------
// Upgrade risk prediction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeRiskPrediction {
    pub upgrade_recommended: bool,
    pub upgrade_risks_predictors: UpgradeRisksPredictors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpgradeRisksPredictors {
    pub alerts: Vec<Alert>,
    pub operator_conditions: Vec<OperatorCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub name: String,
    pub namespace: String,
    pub severity: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorCondition {
    pub name: String,
    pub condition: String,
    pub reason: String,
    pub url: String,
}

impl UpgradeRiskPrediction {
    /// Prediction with no risk predictors; the mock answers this for every
    /// cluster.
    pub fn recommended() -> Self {
        Self {
            upgrade_recommended: true,
            upgrade_risks_predictors: UpgradeRisksPredictors::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid cluster name '{0}': expected UUID format")]
    InvalidClusterName(String),
    #[error("invalid organization ID '{0}': expected a positive integer")]
    InvalidOrgId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uuid_shaped_cluster_names() {
        for raw in [
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a266",
            "ffffffff-ffff-ffff-ffff-000000000fff",
            "CCCCCCCC-cccc-cccc-cccc-000000000001",
        ] {
            let name = ClusterName::parse(raw).unwrap();
            assert_eq!(name.as_str(), raw);
        }
    }

    #[test]
    fn rejects_cluster_names_that_are_not_uuid_shaped() {
        for raw in [
            "",
            "foobarbaz",
            "abcdefghijklmnopqrstuvwyz",
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a26",
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a2666",
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a26g",
            "34c3ecc5-624a-49a5-bab8-4fdc5e51-a266",
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a266-",
        ] {
            assert_eq!(
                ClusterName::parse(raw),
                Err(ValidationError::InvalidClusterName(raw.to_string()))
            );
        }
    }

    #[test]
    fn cluster_name_deserialization_applies_format_check() {
        let ok: Vec<ClusterName> =
            serde_json::from_str(r#"["74ae54aa-6577-4e80-85e7-697cb646ff37"]"#).unwrap();
        assert_eq!(ok[0].as_str(), "74ae54aa-6577-4e80-85e7-697cb646ff37");

        let err = serde_json::from_str::<Vec<ClusterName>>(r#"["not-a-cluster"]"#).unwrap_err();
        assert!(err.to_string().contains("expected UUID format"));
    }

    #[test]
    fn parses_org_ids() {
        assert_eq!("11789772".parse::<OrgId>(), Ok(OrgId(11789772)));
        assert_eq!("1".parse::<OrgId>(), Ok(OrgId(1)));
        for raw in ["", "0", "foobar", "-1", "+5", "4294967296"] {
            assert_eq!(
                raw.parse::<OrgId>(),
                Err(ValidationError::InvalidOrgId(raw.to_string()))
            );
        }
    }

    #[test]
    fn report_keeps_json_text_verbatim() {
        let report = ClusterReport::from_json("{\"report\": {\"data\": []}}\n".to_string()).unwrap();
        assert_eq!(report.as_str(), "{\"report\": {\"data\": []}}");

        #[derive(Serialize)]
        struct Wrapper<'a> {
            r: &'a ClusterReport,
        }
        let wrapped = serde_json::to_string(&Wrapper { r: &report }).unwrap();
        assert_eq!(wrapped, r#"{"r":{"report": {"data": []}}}"#);
    }

    #[test]
    fn report_rejects_malformed_json() {
        assert!(ClusterReport::from_json("{\"report\":".to_string()).is_err());
    }

    #[test]
    fn recommended_prediction_serializes_with_empty_predictors() {
        let body = serde_json::to_string(&UpgradeRiskPrediction::recommended()).unwrap();
        assert_eq!(
            body,
            r#"{"upgrade_recommended":true,"upgrade_risks_predictors":{"alerts":[],"operator_conditions":[]}}"#
        );
    }
}

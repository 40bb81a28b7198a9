//! Synthetic failure clusters.
//!
//! A cluster name starting with [`FAILING_CLUSTER_PREFIX`] asks the mock to
//! fail with the HTTP status written in its last three characters, e.g.
//! `ffffffff-ffff-ffff-ffff-000000000404` answers 404. Such names never reach
//! the fixture store and behave the same for every organization.

use std::fmt;

use schema::ClusterName;

pub const FAILING_CLUSTER_PREFIX: &str = "ffffffff-ffff-ffff-ffff-";

const STATUS_SUFFIX_LEN: usize = 3;

/// Final HTTP status code requested by a failing cluster name (200..=599).
/// Informational codes are not final responses and are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntheticStatus(u16);

impl SyntheticStatus {
    pub fn new(code: u16) -> Option<Self> {
        (200..=599).contains(&code).then_some(Self(code))
    }

    pub fn code(self) -> u16 {
        self.0
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl fmt::Display for SyntheticStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Normal,
    Failing(SyntheticStatus),
    Malformed,
}

pub fn classify_failure(cluster: &ClusterName) -> FailureClass {
    let Some(segment) = cluster.as_str().strip_prefix(FAILING_CLUSTER_PREFIX) else {
        return FailureClass::Normal;
    };
    match decode_status_suffix(segment) {
        Some(status) => FailureClass::Failing(status),
        None => FailureClass::Malformed,
    }
}

fn decode_status_suffix(segment: &str) -> Option<SyntheticStatus> {
    let start = segment.len().checked_sub(STATUS_SUFFIX_LEN)?;
    let suffix = segment.get(start..)?;
    // u16::from_str would also accept a leading '+'
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<u16>().ok().and_then(SyntheticStatus::new)
}

use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};
use schema::ClusterName;
use thiserror::Error;

use crate::failure::FAILING_CLUSTER_PREFIX;

/// Length of one rotation window; an hour holds four of them.
pub const ROTATION_PERIOD_MINUTES: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RotationError {
    #[error("rotating cluster {0} has no backing clusters")]
    EmptyCandidates(ClusterName),
    #[error("rotating cluster {0} is defined more than once")]
    DuplicateEntry(ClusterName),
    #[error("rotating cluster {0} collides with the synthetic failure prefix")]
    ReservedName(ClusterName),
}

/// Maps "changing" cluster names to the ordered clusters whose reports they
/// cycle through. Repeating a backing cluster gives it more windows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationTable {
    entries: HashMap<ClusterName, Vec<ClusterName>>,
}

impl RotationTable {
    pub fn new(
        entries: impl IntoIterator<Item = (ClusterName, Vec<ClusterName>)>,
    ) -> Result<Self, RotationError> {
        let mut out = HashMap::new();
        for (cluster, candidates) in entries {
            if cluster.as_str().starts_with(FAILING_CLUSTER_PREFIX) {
                return Err(RotationError::ReservedName(cluster));
            }
            if candidates.is_empty() {
                return Err(RotationError::EmptyCandidates(cluster));
            }
            if out.contains_key(&cluster) {
                return Err(RotationError::DuplicateEntry(cluster));
            }
            out.insert(cluster, candidates);
        }
        Ok(Self { entries: out })
    }

    pub fn candidates(&self, cluster: &ClusterName) -> Option<&[ClusterName]> {
        self.entries.get(cluster).map(Vec::as_slice)
    }

    /// Backing cluster for `cluster` at `now`; identity for names that do
    /// not rotate.
    pub fn resolve<'a>(&'a self, cluster: &'a ClusterName, now: DateTime<Utc>) -> &'a ClusterName {
        match self.candidates(cluster) {
            Some(candidates) => select_candidate(candidates, now.minute()),
            None => cluster,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn rotation_bucket(minute_of_hour: u32, candidate_count: usize) -> usize {
    (minute_of_hour / ROTATION_PERIOD_MINUTES) as usize % candidate_count.max(1)
}

/// `candidates` must not be empty; [`RotationTable::new`] guarantees it.
pub(crate) fn select_candidate(candidates: &[ClusterName], minute_of_hour: u32) -> &ClusterName {
    let index = rotation_bucket(minute_of_hour, candidates.len());
    let chosen = &candidates[index];
    tracing::debug!(
        minute = minute_of_hour,
        index,
        cluster = %chosen,
        "changing cluster resolved"
    );
    chosen
}

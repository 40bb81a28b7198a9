use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use schema::{ClusterName, ClusterReport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read report for cluster {cluster} from '{}': {source}", .path.display())]
    Io {
        cluster: ClusterName,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report for cluster {cluster} in '{}' is not valid JSON: {source}", .path.display())]
    InvalidJson {
        cluster: ClusterName,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cluster {0} is listed more than once")]
    DuplicateCluster(ClusterName),
}

impl StoreError {
    pub fn cluster(&self) -> &ClusterName {
        match self {
            Self::Io { cluster, .. }
            | Self::InvalidJson { cluster, .. }
            | Self::DuplicateCluster(cluster) => cluster,
        }
    }
}

/// File name holding the report of one cluster inside the data directory.
pub fn report_file_name(cluster: &ClusterName) -> String {
    format!("report_{cluster}.json")
}

/// Immutable cluster -> report mapping populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    reports: HashMap<ClusterName, ClusterReport>,
}

impl FixtureStore {
    /// Reads `report_<cluster>.json` for every listed cluster. The first
    /// missing or malformed file aborts the whole load.
    pub fn load_from_dir(
        dir: impl AsRef<Path>,
        clusters: &[ClusterName],
    ) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let mut reports = HashMap::with_capacity(clusters.len());
        for cluster in clusters {
            if reports.contains_key(cluster) {
                return Err(StoreError::DuplicateCluster(cluster.clone()));
            }
            let path = dir.join(report_file_name(cluster));
            let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                cluster: cluster.clone(),
                path: path.clone(),
                source,
            })?;
            let report =
                ClusterReport::from_json(raw).map_err(|source| StoreError::InvalidJson {
                    cluster: cluster.clone(),
                    path: path.clone(),
                    source,
                })?;
            tracing::trace!(cluster = %cluster, path = %path.display(), "fixture report loaded");
            reports.insert(cluster.clone(), report);
        }
        tracing::info!(
            dir = %dir.display(),
            reports = reports.len(),
            "fixture store initialized"
        );
        Ok(Self { reports })
    }

    pub fn from_reports(
        reports: impl IntoIterator<Item = (ClusterName, ClusterReport)>,
    ) -> Result<Self, StoreError> {
        let mut out = HashMap::new();
        for (cluster, report) in reports {
            if out.contains_key(&cluster) {
                return Err(StoreError::DuplicateCluster(cluster));
            }
            out.insert(cluster, report);
        }
        Ok(Self { reports: out })
    }

    pub fn lookup(&self, cluster: &ClusterName) -> Option<&ClusterReport> {
        self.reports.get(cluster)
    }

    pub fn contains(&self, cluster: &ClusterName) -> bool {
        self.reports.contains_key(cluster)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

pub mod clock;
pub mod failure;
pub mod rotation;

use auth::{AccessError, NO_PERMISSIONS_MESSAGE, OrgCatalog};
use chrono::{DateTime, Timelike, Utc};
use schema::{ClusterName, ClusterReport, OrgId, UpgradeRiskPrediction};
use store::FixtureStore;
use thiserror::Error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use failure::{FAILING_CLUSTER_PREFIX, FailureClass, SyntheticStatus, classify_failure};
pub use rotation::{ROTATION_PERIOD_MINUTES, RotationError, RotationTable, rotation_bucket};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{}", NO_PERMISSIONS_MESSAGE)]
    Unauthorized { org_id: OrgId },
    #[error("Item with ID {0} was not found in the storage")]
    NotFound(ClusterName),
    #[error("cluster {cluster} requested synthetic failure with status {status}")]
    SyntheticFailure {
        cluster: ClusterName,
        status: SyntheticStatus,
    },
    #[error("cluster {0} has a synthetic failure prefix but no valid status suffix")]
    MalformedIdentifier(ClusterName),
}

impl From<AccessError> for ResolveError {
    fn from(value: AccessError) -> Self {
        match value {
            AccessError::Denied { org_id } => Self::Unauthorized { org_id },
        }
    }
}

/// How one cluster name is handled, decided once per lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterClass<'a> {
    Ordinary,
    Rotating(&'a [ClusterName]),
    Failing(SyntheticStatus),
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResolution<'a> {
    /// Requested names (not rotated backing names) with their reports.
    pub found: Vec<(ClusterName, &'a ClusterReport)>,
    pub errored: Vec<(ClusterName, ResolveError)>,
}

impl BatchResolution<'_> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            found: Vec::with_capacity(capacity),
            errored: Vec::new(),
        }
    }
}

/// Read-only resolution engine over the organization catalog, the rotation
/// table and the fixture store. Every lookup is a pure function of its
/// inputs and `now`, so one instance can serve any number of threads.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    catalog: OrgCatalog,
    rotation: RotationTable,
    store: FixtureStore,
}

impl ResolutionEngine {
    pub fn new(catalog: OrgCatalog, rotation: RotationTable, store: FixtureStore) -> Self {
        Self {
            catalog,
            rotation,
            store,
        }
    }

    pub fn catalog(&self) -> &OrgCatalog {
        &self.catalog
    }

    pub fn rotation(&self) -> &RotationTable {
        &self.rotation
    }

    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    pub fn classify(&self, cluster: &ClusterName) -> ClusterClass<'_> {
        match classify_failure(cluster) {
            FailureClass::Failing(status) => ClusterClass::Failing(status),
            FailureClass::Malformed => ClusterClass::Malformed,
            FailureClass::Normal => match self.rotation.candidates(cluster) {
                Some(candidates) => ClusterClass::Rotating(candidates),
                None => ClusterClass::Ordinary,
            },
        }
    }

    pub fn list_clusters(&self, org_id: OrgId) -> Result<&[ClusterName], ResolveError> {
        Ok(self.catalog.list_clusters(org_id)?)
    }

    /// Report lookup without an organization.
    pub fn resolve_cluster(
        &self,
        cluster: &ClusterName,
        now: DateTime<Utc>,
    ) -> Result<&ClusterReport, ResolveError> {
        self.resolve_classified(cluster, self.classify(cluster), now)
    }

    /// Report lookup on behalf of an organization. Organizations outside the
    /// catalog own nothing, so their fixture lookups all miss; synthetic
    /// failure names behave the same for every permitted organization.
    pub fn resolve_for_org(
        &self,
        org_id: OrgId,
        cluster: &ClusterName,
        now: DateTime<Utc>,
    ) -> Result<&ClusterReport, ResolveError> {
        self.catalog.require_permitted(org_id)?;
        match self.classify(cluster) {
            ClusterClass::Ordinary | ClusterClass::Rotating(_)
                if !self.catalog.is_known(org_id) =>
            {
                Err(ResolveError::NotFound(cluster.clone()))
            }
            class => self.resolve_classified(cluster, class, now),
        }
    }

    /// Resolves every name independently, keeping input order and
    /// duplicates. A denied organization fails the whole batch.
    pub fn resolve_all(
        &self,
        org_id: Option<OrgId>,
        clusters: &[ClusterName],
        now: DateTime<Utc>,
    ) -> Result<BatchResolution<'_>, ResolveError> {
        if let Some(org_id) = org_id {
            self.catalog.require_permitted(org_id)?;
        }
        let mut out = BatchResolution::with_capacity(clusters.len());
        for cluster in clusters {
            let outcome = match org_id {
                Some(org_id) => self.resolve_for_org(org_id, cluster, now),
                None => self.resolve_cluster(cluster, now),
            };
            match outcome {
                Ok(report) => out.found.push((cluster.clone(), report)),
                Err(err) => out.errored.push((cluster.clone(), err)),
            }
        }
        tracing::debug!(
            requested = clusters.len(),
            found = out.found.len(),
            errored = out.errored.len(),
            "batch resolved"
        );
        Ok(out)
    }

    fn resolve_classified(
        &self,
        cluster: &ClusterName,
        class: ClusterClass<'_>,
        now: DateTime<Utc>,
    ) -> Result<&ClusterReport, ResolveError> {
        let backing = match class {
            ClusterClass::Failing(status) => {
                return Err(ResolveError::SyntheticFailure {
                    cluster: cluster.clone(),
                    status,
                });
            }
            ClusterClass::Malformed => {
                return Err(ResolveError::MalformedIdentifier(cluster.clone()));
            }
            ClusterClass::Rotating(candidates) => {
                rotation::select_candidate(candidates, now.minute())
            }
            ClusterClass::Ordinary => cluster,
        };
        self.store
            .lookup(backing)
            .ok_or_else(|| ResolveError::NotFound(cluster.clone()))
    }

    /// Every well-formed name gets the canned "recommended" prediction;
    /// synthetic failure names fail exactly as their report lookups do.
    pub fn predict_upgrade_risks(
        &self,
        cluster: &ClusterName,
    ) -> Result<UpgradeRiskPrediction, ResolveError> {
        match self.classify(cluster) {
            ClusterClass::Failing(status) => Err(ResolveError::SyntheticFailure {
                cluster: cluster.clone(),
                status,
            }),
            ClusterClass::Malformed => Err(ResolveError::MalformedIdentifier(cluster.clone())),
            ClusterClass::Ordinary | ClusterClass::Rotating(_) => {
                Ok(UpgradeRiskPrediction::recommended())
            }
        }
    }

    /// Batch over every cluster the organization owns.
    pub fn resolve_organization(
        &self,
        org_id: OrgId,
        now: DateTime<Utc>,
    ) -> Result<BatchResolution<'_>, ResolveError> {
        let clusters = self.list_clusters(org_id)?;
        self.resolve_all(Some(org_id), clusters, now)
    }
}

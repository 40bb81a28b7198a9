use std::collections::HashMap;

use schema::{ClusterName, OrgId};
use thiserror::Error;

pub const NO_PERMISSIONS_MESSAGE: &str =
    "You have no permissions to get or change info about this organization";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgAccess {
    Permitted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub org_id: OrgId,
    pub access: OrgAccess,
    pub clusters: Vec<ClusterName>,
    /// Whether the organization appears in the public organization list.
    pub listed: bool,
}

impl Organization {
    pub fn permitted(org_id: OrgId, clusters: Vec<ClusterName>) -> Self {
        Self {
            org_id,
            access: OrgAccess::Permitted,
            clusters,
            listed: true,
        }
    }

    pub fn denied(org_id: OrgId) -> Self {
        Self {
            org_id,
            access: OrgAccess::Denied,
            clusters: Vec::new(),
            listed: true,
        }
    }

    /// Keeps the organization usable but out of the organization list.
    pub fn unlisted(mut self) -> Self {
        self.listed = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("{}", NO_PERMISSIONS_MESSAGE)]
    Denied { org_id: OrgId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("organization {0} is defined more than once")]
    DuplicateOrganization(OrgId),
}

/// Fixed organization table. Built once at startup, read-only afterwards.
///
/// Organizations missing from the catalog are valid tenants that own no
/// clusters; only entries marked [`OrgAccess::Denied`] are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgCatalog {
    organizations: Vec<Organization>,
    index: HashMap<OrgId, usize>,
}

impl OrgCatalog {
    pub fn new(organizations: Vec<Organization>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(organizations.len());
        for (position, organization) in organizations.iter().enumerate() {
            if index.insert(organization.org_id, position).is_some() {
                return Err(CatalogError::DuplicateOrganization(organization.org_id));
            }
        }
        Ok(Self {
            organizations,
            index,
        })
    }

    pub fn authorize(&self, org_id: OrgId) -> OrgAccess {
        self.get(org_id)
            .map(|organization| organization.access)
            .unwrap_or(OrgAccess::Permitted)
    }

    pub fn require_permitted(&self, org_id: OrgId) -> Result<(), AccessError> {
        match self.authorize(org_id) {
            OrgAccess::Permitted => Ok(()),
            OrgAccess::Denied => Err(AccessError::Denied { org_id }),
        }
    }

    pub fn list_clusters(&self, org_id: OrgId) -> Result<&[ClusterName], AccessError> {
        self.require_permitted(org_id)?;
        Ok(self
            .get(org_id)
            .map(|organization| organization.clusters.as_slice())
            .unwrap_or(&[]))
    }

    pub fn is_known(&self, org_id: OrgId) -> bool {
        self.index.contains_key(&org_id)
    }

    /// Listed organization IDs in definition order.
    pub fn listed_organization_ids(&self) -> Vec<OrgId> {
        self.organizations
            .iter()
            .filter(|organization| organization.listed)
            .map(|organization| organization.org_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organizations.is_empty()
    }

    fn get(&self, org_id: OrgId) -> Option<&Organization> {
        self.index
            .get(&org_id)
            .map(|position| &self.organizations[*position])
    }
}

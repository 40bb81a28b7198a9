//! Built-in organizations, rotation entries and the fixture cluster set.

use auth::{CatalogError, OrgCatalog, Organization};
use resolver::{RotationError, RotationTable};
use schema::{ClusterName, OrgId, ValidationError};
use thiserror::Error;

/// Organization whose every request is refused.
pub const DENIED_ORG_ID: OrgId = OrgId(11940171);

const ORG_11789772_CLUSTERS: &[&str] = &[
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a266",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a267",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a268",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a269",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a26a",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a26b",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a26c",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a26d",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a26e",
    "34c3ecc5-624a-49a5-bab8-4fdc5e51a26f",
    "74ae54aa-6577-4e80-85e7-697cb646ff37",
    "a7467445-8d6a-43cc-b82c-7007664bdf69",
    "ee7d2bf4-8933-4a3a-8634-3328fe806e08",
    "eeeeeeee-eeee-eeee-eeee-000000000001",
];

const ORG_1_CLUSTERS: &[&str] = &[
    "00000001-624a-49a5-bab8-4fdc5e51a266",
    "00000001-624a-49a5-bab8-4fdc5e51a267",
    "00000001-624a-49a5-bab8-4fdc5e51a268",
    "00000001-624a-49a5-bab8-4fdc5e51a269",
    "00000001-624a-49a5-bab8-4fdc5e51a26a",
    "00000001-624a-49a5-bab8-4fdc5e51a26b",
    "00000001-624a-49a5-bab8-4fdc5e51a26c",
    "00000001-624a-49a5-bab8-4fdc5e51a26d",
    "00000001-624a-49a5-bab8-4fdc5e51a26e",
    "00000001-624a-49a5-bab8-4fdc5e51a26f",
    "00000001-6577-4e80-85e7-697cb646ff37",
    "00000001-8933-4a3a-8634-3328fe806e08",
    "00000001-8d6a-43cc-b82c-7007664bdf69",
    "00000001-eeee-eeee-eeee-000000000001",
];

const ORG_2_CLUSTERS: &[&str] = &[
    "00000002-624a-49a5-bab8-4fdc5e51a266",
    "00000002-6577-4e80-85e7-697cb646ff37",
    "00000002-8933-4a3a-8634-3328fe806e08",
];

const ORG_3_CLUSTERS: &[&str] = &[
    "00000003-8933-4a3a-8634-3328fe806e08",
    "00000003-8d6a-43cc-b82c-7007664bdf69",
    "00000003-eeee-eeee-eeee-000000000001",
];

/// Changing clusters and the reports they cycle through, one per 15 minute
/// window. Repeats weight a backing cluster.
const CHANGING_CLUSTERS: &[(&str, &[&str])] = &[
    (
        "cccccccc-cccc-cccc-cccc-000000000001",
        &[
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a266",
            "74ae54aa-6577-4e80-85e7-697cb646ff37",
            "a7467445-8d6a-43cc-b82c-7007664bdf69",
        ],
    ),
    (
        "cccccccc-cccc-cccc-cccc-000000000002",
        &[
            "74ae54aa-6577-4e80-85e7-697cb646ff37",
            "a7467445-8d6a-43cc-b82c-7007664bdf69",
            "ee7d2bf4-8933-4a3a-8634-3328fe806e08",
        ],
    ),
    (
        "cccccccc-cccc-cccc-cccc-000000000003",
        &[
            "ee7d2bf4-8933-4a3a-8634-3328fe806e08",
            "ee7d2bf4-8933-4a3a-8634-3328fe806e08",
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a266",
        ],
    ),
    (
        "cccccccc-cccc-cccc-cccc-000000000004",
        &[
            "eeeeeeee-eeee-eeee-eeee-000000000001",
            "eeeeeeee-eeee-eeee-eeee-000000000001",
            "34c3ecc5-624a-49a5-bab8-4fdc5e51a266",
        ],
    ),
];

#[derive(Debug, Error)]
pub enum CatalogBuildError {
    #[error("built-in cluster name is invalid: {0}")]
    InvalidName(#[from] ValidationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Rotation(#[from] RotationError),
}

/// Only 11789772 and the denied organization are listed; the small test
/// organizations answer cluster and report requests without being listed.
pub fn builtin_catalog() -> Result<OrgCatalog, CatalogBuildError> {
    let organizations = vec![
        Organization::permitted(OrgId(11789772), parse_all(ORG_11789772_CLUSTERS)?),
        Organization::denied(DENIED_ORG_ID),
        Organization::permitted(OrgId(1), parse_all(ORG_1_CLUSTERS)?).unlisted(),
        Organization::permitted(OrgId(2), parse_all(ORG_2_CLUSTERS)?).unlisted(),
        Organization::permitted(OrgId(3), parse_all(ORG_3_CLUSTERS)?).unlisted(),
    ];
    Ok(OrgCatalog::new(organizations)?)
}

pub fn builtin_rotation_table() -> Result<RotationTable, CatalogBuildError> {
    let mut entries = Vec::with_capacity(CHANGING_CLUSTERS.len());
    for (cluster, candidates) in CHANGING_CLUSTERS {
        entries.push((ClusterName::parse(cluster)?, parse_all(candidates)?));
    }
    Ok(RotationTable::new(entries)?)
}

/// Every cluster with a report on disk: the union of all organization
/// cluster lists, first occurrence wins.
pub fn fixture_clusters() -> Result<Vec<ClusterName>, CatalogBuildError> {
    let mut out: Vec<ClusterName> = Vec::new();
    for raw in ORG_11789772_CLUSTERS
        .iter()
        .chain(ORG_1_CLUSTERS)
        .chain(ORG_2_CLUSTERS)
        .chain(ORG_3_CLUSTERS)
    {
        let cluster = ClusterName::parse(raw)?;
        if !out.contains(&cluster) {
            out.push(cluster);
        }
    }
    Ok(out)
}

fn parse_all(raw: &[&str]) -> Result<Vec<ClusterName>, ValidationError> {
    raw.iter().map(|name| ClusterName::parse(name)).collect()
}

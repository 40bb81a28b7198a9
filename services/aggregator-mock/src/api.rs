use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use resolver::{BatchResolution, ResolveError};
use schema::{ClusterName, ClusterReport, OrgId, UpgradeRiskPrediction};
use serde::{Deserialize, Serialize};

pub const STATUS_OK: &str = "ok";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse<'a> {
    pub status: &'a str,
}

impl StatusResponse<'static> {
    pub fn ok() -> Self {
        Self { status: STATUS_OK }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfoResponse<'a> {
    pub info: ServiceInfo<'a>,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo<'a> {
    pub name: &'static str,
    pub version: &'static str,
    pub api_prefix: &'a str,
    pub fixtures: usize,
    pub organizations: usize,
    pub changing_clusters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationsResponse {
    pub organizations: Vec<OrgId>,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterListResponse<'a> {
    pub clusters: &'a [ClusterName],
    pub status: &'static str,
}

/// Body of the batch report request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterListRequest {
    pub clusters: Vec<ClusterName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportsResponse<'a> {
    pub clusters: Vec<&'a ClusterName>,
    pub errors: Vec<&'a ClusterName>,
    pub reports: BTreeMap<&'a ClusterName, &'a ClusterReport>,
    pub generated_at: String,
    pub status: &'static str,
}

impl<'a> ReportsResponse<'a> {
    pub fn from_batch(batch: &'a BatchResolution<'a>, generated_at: DateTime<Utc>) -> Self {
        Self {
            clusters: batch.found.iter().map(|(cluster, _)| cluster).collect(),
            errors: batch.errored.iter().map(|(cluster, _)| cluster).collect(),
            reports: batch
                .found
                .iter()
                .map(|(cluster, report)| (cluster, *report))
                .collect(),
            generated_at: format_timestamp(generated_at),
            status: STATUS_OK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeRisksResponse {
    pub meta: UpgradeRisksMeta,
    pub upgrade_recommendation: UpgradeRiskPrediction,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeRisksMeta {
    pub last_checked_at: String,
}

impl UpgradeRisksResponse {
    pub fn new(prediction: UpgradeRiskPrediction, checked_at: DateTime<Utc>) -> Self {
        Self {
            meta: UpgradeRisksMeta {
                last_checked_at: format_timestamp(checked_at),
            },
            upgrade_recommendation: prediction,
            status: STATUS_OK,
        }
    }
}

pub const PREDICTION_STATUS_NO_DATA: &str = "No data for the cluster";

/// Answer of the multi-cluster upgrade-risks endpoint, one entry per
/// requested name in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionsResponse<'a> {
    pub predictions: Vec<ClusterPrediction<'a>>,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterPrediction<'a> {
    pub cluster_id: &'a ClusterName,
    pub prediction_status: &'static str,
    #[serde(flatten)]
    pub prediction: Option<UpgradeRiskPrediction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<String>,
}

impl<'a> ClusterPrediction<'a> {
    /// Errored lookups become "no data" entries instead of failing the batch.
    pub fn from_outcome(
        cluster_id: &'a ClusterName,
        outcome: Result<UpgradeRiskPrediction, ResolveError>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        match outcome {
            Ok(prediction) => Self {
                cluster_id,
                prediction_status: STATUS_OK,
                prediction: Some(prediction),
                last_checked_at: Some(format_timestamp(checked_at)),
            },
            Err(err) => {
                tracing::debug!(cluster = %cluster_id, error = %err, "no upgrade prediction");
                Self {
                    cluster_id,
                    prediction_status: PREDICTION_STATUS_NO_DATA,
                    prediction: None,
                    last_checked_at: None,
                }
            }
        }
    }
}

/// RFC 3339 in UTC with a `Z` suffix and whole seconds.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

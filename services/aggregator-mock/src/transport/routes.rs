use resolver::ResolveError;
use schema::{ClusterName, OrgId};

use super::{HttpRequest, HttpResponse, http::reason_phrase, request::request_path};
use crate::{
    MockRuntime,
    api::{
        ClusterListRequest, ClusterListResponse, ClusterPrediction, OrganizationsResponse,
        PredictionsResponse, ReportsResponse, STATUS_OK, ServiceInfo, ServiceInfoResponse,
        StatusResponse, UpgradeRisksResponse,
    },
};

const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Route<'a> {
    Health,
    Main,
    Info,
    Organizations,
    OrganizationClusters { org: &'a str },
    OrganizationReport { org: &'a str, cluster: &'a str },
    ClusterReport { cluster: &'a str },
    ClustersBatch,
    OrganizationBatch { org: &'a str },
    UpgradeRisks { cluster: &'a str },
    UpgradeRisksBatch,
}

impl Route<'_> {
    fn allowed_methods(self) -> &'static [&'static str] {
        match self {
            Self::OrganizationReport { .. } | Self::ClusterReport { .. } => &["GET", "OPTIONS"],
            Self::ClustersBatch => &["GET", "POST", "OPTIONS"],
            Self::UpgradeRisksBatch => &["POST"],
            _ => &["GET"],
        }
    }
}

/// Maps a request path onto a route. Paths under `api_prefix` may carry one
/// trailing slash; empty inner segments never match.
pub(super) fn match_route<'a>(api_prefix: &str, path: &'a str) -> Option<Route<'a>> {
    if path == HEALTH_PATH {
        return Some(Route::Health);
    }
    let rest = match path.strip_prefix(api_prefix) {
        Some(rest) => rest,
        None if path == api_prefix.trim_end_matches('/') => "",
        None => return None,
    };
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let segments: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    };
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }

    let route = match segments[..] {
        [] => Route::Main,
        ["info"] => Route::Info,
        ["organizations"] => Route::Organizations,
        ["organizations", org, "clusters"] => Route::OrganizationClusters { org },
        ["report", org, cluster] => Route::OrganizationReport { org, cluster },
        ["report", cluster] => Route::ClusterReport { cluster },
        ["clusters", cluster, "report"] => Route::ClusterReport { cluster },
        ["clusters"] => Route::ClustersBatch,
        ["clusters", org] => Route::OrganizationBatch { org },
        ["cluster", cluster, "upgrade-risks-prediction"] => Route::UpgradeRisks { cluster },
        ["upgrade-risks-prediction"] => Route::UpgradeRisksBatch,
        _ => return None,
    };
    Some(route)
}

pub(super) fn handle_request(runtime: &MockRuntime, request: &HttpRequest) -> HttpResponse {
    let path = request_path(&request.target);
    let response = route_request(runtime, request, path);
    tracing::debug!(
        method = %request.method,
        path,
        status = response.status,
        "request handled"
    );
    response
}

fn route_request(runtime: &MockRuntime, request: &HttpRequest, path: &str) -> HttpResponse {
    let Some(route) = match_route(runtime.api_prefix(), path) else {
        return HttpResponse::not_found(&format!("no endpoint at {path}"));
    };
    if !route.allowed_methods().contains(&request.method.as_str()) {
        return HttpResponse::method_not_allowed(&format!(
            "method {} is not allowed for {path}",
            request.method
        ));
    }
    if request.method == "OPTIONS" {
        return HttpResponse::ok_json("{}".to_string());
    }

    let result = match route {
        Route::Health | Route::Main => Ok(HttpResponse::serialized(200, &StatusResponse::ok())),
        Route::Info => Ok(service_info(runtime)),
        Route::Organizations => Ok(organizations(runtime)),
        Route::OrganizationClusters { org } => organization_clusters(runtime, org),
        Route::OrganizationReport { org, cluster } => organization_report(runtime, org, cluster),
        Route::ClusterReport { cluster } => cluster_report(runtime, cluster),
        Route::ClustersBatch => clusters_batch(runtime, request),
        Route::OrganizationBatch { org } => organization_batch(runtime, org),
        Route::UpgradeRisks { cluster } => upgrade_risks(runtime, cluster),
        Route::UpgradeRisksBatch => upgrade_risks_batch(runtime, request),
    };
    match result {
        Ok(response) | Err(response) => response,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type RouteResult = Result<HttpResponse, HttpResponse>;

fn service_info(runtime: &MockRuntime) -> HttpResponse {
    let engine = runtime.engine();
    HttpResponse::serialized(
        200,
        &ServiceInfoResponse {
            info: ServiceInfo {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
                api_prefix: runtime.api_prefix(),
                fixtures: engine.store().len(),
                organizations: engine.catalog().len(),
                changing_clusters: engine.rotation().len(),
            },
            status: STATUS_OK,
        },
    )
}

fn organizations(runtime: &MockRuntime) -> HttpResponse {
    HttpResponse::serialized(
        200,
        &OrganizationsResponse {
            organizations: runtime.engine().catalog().listed_organization_ids(),
            status: STATUS_OK,
        },
    )
}

fn organization_clusters(runtime: &MockRuntime, org: &str) -> RouteResult {
    let org_id = parse_org_id(org)?;
    let clusters = runtime
        .engine()
        .list_clusters(org_id)
        .map_err(|err| resolve_error_response(&err))?;
    Ok(HttpResponse::serialized(
        200,
        &ClusterListResponse {
            clusters,
            status: STATUS_OK,
        },
    ))
}

fn organization_report(runtime: &MockRuntime, org: &str, cluster: &str) -> RouteResult {
    let org_id = parse_org_id(org)?;
    let cluster = parse_cluster(cluster)?;
    let report = runtime
        .engine()
        .resolve_for_org(org_id, &cluster, runtime.now())
        .map_err(|err| resolve_error_response(&err))?;
    Ok(HttpResponse::ok_json(report.as_str().to_string()))
}

fn cluster_report(runtime: &MockRuntime, cluster: &str) -> RouteResult {
    let cluster = parse_cluster(cluster)?;
    let report = runtime
        .engine()
        .resolve_cluster(&cluster, runtime.now())
        .map_err(|err| resolve_error_response(&err))?;
    Ok(HttpResponse::ok_json(report.as_str().to_string()))
}

/// GET and POST share this handler; both read the cluster list from the body.
fn clusters_batch(runtime: &MockRuntime, request: &HttpRequest) -> RouteResult {
    let body = parse_cluster_list(request)?;
    let now = runtime.now();
    let batch = runtime
        .engine()
        .resolve_all(None, &body.clusters, now)
        .map_err(|err| resolve_error_response(&err))?;
    Ok(HttpResponse::serialized(
        200,
        &ReportsResponse::from_batch(&batch, now),
    ))
}

fn organization_batch(runtime: &MockRuntime, org: &str) -> RouteResult {
    let org_id = parse_org_id(org)?;
    let now = runtime.now();
    let batch = runtime
        .engine()
        .resolve_organization(org_id, now)
        .map_err(|err| resolve_error_response(&err))?;
    Ok(HttpResponse::serialized(
        200,
        &ReportsResponse::from_batch(&batch, now),
    ))
}

/// Canned "upgrade recommended" answer. Synthetic failure names still fail.
fn upgrade_risks(runtime: &MockRuntime, cluster: &str) -> RouteResult {
    let cluster = parse_cluster(cluster)?;
    let prediction = runtime
        .engine()
        .predict_upgrade_risks(&cluster)
        .map_err(|err| resolve_error_response(&err))?;
    Ok(HttpResponse::serialized(
        200,
        &UpgradeRisksResponse::new(prediction, runtime.now()),
    ))
}

fn upgrade_risks_batch(runtime: &MockRuntime, request: &HttpRequest) -> RouteResult {
    let body = parse_cluster_list(request)?;
    let now = runtime.now();
    let engine = runtime.engine();
    let predictions = body
        .clusters
        .iter()
        .map(|cluster| {
            ClusterPrediction::from_outcome(cluster, engine.predict_upgrade_risks(cluster), now)
        })
        .collect();
    Ok(HttpResponse::serialized(
        200,
        &PredictionsResponse {
            predictions,
            status: STATUS_OK,
        },
    ))
}

// ---------------------------------------------------------------------------
// Request parsing and error mapping
// ---------------------------------------------------------------------------

fn parse_org_id(raw: &str) -> Result<OrgId, HttpResponse> {
    raw.parse::<OrgId>()
        .map_err(|err| HttpResponse::bad_request(&err.to_string()))
}

fn parse_cluster(raw: &str) -> Result<ClusterName, HttpResponse> {
    ClusterName::parse(raw).map_err(|err| HttpResponse::bad_request(&err.to_string()))
}

/// A declared content type must be JSON; a missing one is accepted.
fn parse_cluster_list(request: &HttpRequest) -> Result<ClusterListRequest, HttpResponse> {
    if let Some(content_type) = request.header("content-type")
        && !content_type.to_ascii_lowercase().contains("json")
    {
        return Err(HttpResponse::bad_request(
            "content-type must be application/json for the cluster list",
        ));
    }
    serde_json::from_slice(&request.body)
        .map_err(|err| HttpResponse::bad_request(&format!("invalid request body: {err}")))
}

fn resolve_error_response(err: &ResolveError) -> HttpResponse {
    match err {
        ResolveError::Unauthorized { .. } => HttpResponse::forbidden(&err.to_string()),
        ResolveError::NotFound(_) => HttpResponse::not_found(&err.to_string()),
        ResolveError::MalformedIdentifier(_) => HttpResponse::bad_request(&err.to_string()),
        ResolveError::SyntheticFailure { cluster, status } => {
            tracing::debug!(cluster = %cluster, status = status.code(), "synthetic failure");
            let message = if status.is_success() {
                STATUS_OK
            } else {
                reason_phrase(status.code())
            };
            HttpResponse::error_with_status(status.code(), message)
        }
    }
}

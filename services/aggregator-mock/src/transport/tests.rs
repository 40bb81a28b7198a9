use std::sync::Arc;

use auth::{NO_PERMISSIONS_MESSAGE, OrgCatalog, Organization};
use resolver::{FixedClock, ResolutionEngine, RotationTable};
use schema::{ClusterName, ClusterReport, OrgId};
use serde_json::Value;
use store::FixtureStore;

use super::routes::{Route, match_route};
use super::server_runtime::resolve_http_queue_capacity;
use super::*;

const PREFIX: &str = "/api/insights-results-aggregator/v2/";
const KNOWN_1: &str = "34c3ecc5-624a-49a5-bab8-4fdc5e51a266";
const KNOWN_2: &str = "74ae54aa-6577-4e80-85e7-697cb646ff37";
const KNOWN_3: &str = "a7467445-8d6a-43cc-b82c-7007664bdf69";
const CHANGING: &str = "cccccccc-cccc-cccc-cccc-000000000001";
const UNKNOWN: &str = "bbbbbbbb-bbbb-bbbb-bbbb-cccccccccccc";
const DENIED_ORG: u32 = 11940171;

fn cluster(raw: &str) -> ClusterName {
    ClusterName::parse(raw).unwrap()
}

fn report_for(raw: &str) -> ClusterReport {
    ClusterReport::from_json(format!(r#"{{"report":{{"cluster":"{raw}"}},"status":"ok"}}"#))
        .unwrap()
}

fn sample_runtime_at(minute: u32) -> MockRuntime {
    let catalog = OrgCatalog::new(vec![
        Organization::permitted(
            OrgId(11789772),
            vec![cluster(KNOWN_1), cluster(KNOWN_2), cluster(KNOWN_3)],
        ),
        Organization::denied(OrgId(DENIED_ORG)),
        Organization::permitted(OrgId(2), vec![cluster(KNOWN_2), cluster(UNKNOWN)]).unlisted(),
    ])
    .unwrap();
    let rotation = RotationTable::new([(
        cluster(CHANGING),
        vec![cluster(KNOWN_1), cluster(KNOWN_2), cluster(KNOWN_3)],
    )])
    .unwrap();
    let store = FixtureStore::from_reports(
        [KNOWN_1, KNOWN_2, KNOWN_3].map(|raw| (cluster(raw), report_for(raw))),
    )
    .unwrap();
    MockRuntime::new(
        ResolutionEngine::new(catalog, rotation, store),
        Arc::new(FixedClock::at_minute(minute).unwrap()),
        PREFIX,
    )
}

fn sample_runtime() -> MockRuntime {
    sample_runtime_at(0)
}

fn request(method: &str, path: &str, body: &str) -> HttpRequest {
    HttpRequest::new(method, path).with_body(body.as_bytes().to_vec())
}

fn get(runtime: &MockRuntime, path: &str) -> HttpResponse {
    handle_request(runtime, &request("GET", path, ""))
}

fn json_body(response: &HttpResponse) -> Value {
    serde_json::from_str(&response.body).unwrap()
}

#[test]
fn match_route_resolves_every_endpoint() {
    assert_eq!(match_route(PREFIX, "/health"), Some(Route::Health));
    assert_eq!(match_route(PREFIX, PREFIX), Some(Route::Main));
    assert_eq!(
        match_route(PREFIX, "/api/insights-results-aggregator/v2"),
        Some(Route::Main)
    );
    assert_eq!(match_route(PREFIX, &format!("{PREFIX}info")), Some(Route::Info));
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}organizations/")),
        Some(Route::Organizations)
    );
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}organizations/1/clusters")),
        Some(Route::OrganizationClusters { org: "1" })
    );
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}report/1/{KNOWN_1}")),
        Some(Route::OrganizationReport {
            org: "1",
            cluster: KNOWN_1
        })
    );
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}report/{KNOWN_1}")),
        Some(Route::ClusterReport { cluster: KNOWN_1 })
    );
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}clusters/{KNOWN_1}/report")),
        Some(Route::ClusterReport { cluster: KNOWN_1 })
    );
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}clusters")),
        Some(Route::ClustersBatch)
    );
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}clusters/7")),
        Some(Route::OrganizationBatch { org: "7" })
    );
    assert_eq!(
        match_route(
            PREFIX,
            &format!("{PREFIX}cluster/{KNOWN_1}/upgrade-risks-prediction")
        ),
        Some(Route::UpgradeRisks { cluster: KNOWN_1 })
    );
    assert_eq!(
        match_route(PREFIX, &format!("{PREFIX}upgrade-risks-prediction")),
        Some(Route::UpgradeRisksBatch)
    );
}

#[test]
fn match_route_rejects_foreign_and_malformed_paths() {
    assert_eq!(match_route(PREFIX, "/v1/report"), None);
    assert_eq!(match_route(PREFIX, &format!("{PREFIX}report//{KNOWN_1}")), None);
    assert_eq!(match_route(PREFIX, &format!("{PREFIX}unknown")), None);
    assert_eq!(match_route(PREFIX, "/api/insights-results-aggregator/v2x"), None);
}

#[test]
fn health_and_main_endpoints_report_ok() {
    let runtime = sample_runtime();
    for path in ["/health", PREFIX] {
        let response = get(&runtime, path);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"status":"ok"}"#);
    }
}

#[test]
fn info_endpoint_describes_loaded_tables() {
    let runtime = sample_runtime();
    let response = get(&runtime, &format!("{PREFIX}info"));
    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["info"]["name"], "aggregator-mock");
    assert_eq!(body["info"]["api_prefix"], PREFIX);
    assert_eq!(body["info"]["fixtures"], 3);
    assert_eq!(body["info"]["organizations"], 3);
    assert_eq!(body["info"]["changing_clusters"], 1);
}

#[test]
fn organizations_endpoint_lists_only_listed_organizations() {
    let runtime = sample_runtime();
    let response = get(&runtime, &format!("{PREFIX}organizations"));
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        r#"{"organizations":[11789772,11940171],"status":"ok"}"#
    );

    let unlisted = get(&runtime, &format!("{PREFIX}organizations/2/clusters"));
    assert_eq!(unlisted.status, 200);
    assert_eq!(json_body(&unlisted)["clusters"], serde_json::json!([KNOWN_2, UNKNOWN]));
}

#[test]
fn organization_clusters_follow_access_rules() {
    let runtime = sample_runtime();

    let response = get(&runtime, &format!("{PREFIX}organizations/11789772/clusters"));
    assert_eq!(response.status, 200);
    assert_eq!(
        json_body(&response)["clusters"],
        serde_json::json!([KNOWN_1, KNOWN_2, KNOWN_3])
    );

    let unknown = get(&runtime, &format!("{PREFIX}organizations/42/clusters"));
    assert_eq!(unknown.status, 200);
    assert_eq!(unknown.body, r#"{"clusters":[],"status":"ok"}"#);

    let denied = get(&runtime, &format!("{PREFIX}organizations/{DENIED_ORG}/clusters"));
    assert_eq!(denied.status, 403);
    assert_eq!(json_body(&denied)["status"], NO_PERMISSIONS_MESSAGE);

    let invalid = get(&runtime, &format!("{PREFIX}organizations/abc/clusters"));
    assert_eq!(invalid.status, 400);
}

#[test]
fn report_endpoints_return_payload_verbatim() {
    let runtime = sample_runtime();
    let expected = report_for(KNOWN_2);
    for path in [
        format!("{PREFIX}report/11789772/{KNOWN_2}"),
        format!("{PREFIX}report/{KNOWN_2}"),
        format!("{PREFIX}clusters/{KNOWN_2}/report"),
    ] {
        let response = get(&runtime, &path);
        assert_eq!(response.status, 200, "{path}");
        assert_eq!(response.body, expected.as_str(), "{path}");
    }
}

#[test]
fn report_errors_map_to_status_codes() {
    let runtime = sample_runtime();

    let missing = get(&runtime, &format!("{PREFIX}report/11789772/{UNKNOWN}"));
    assert_eq!(missing.status, 404);
    assert!(json_body(&missing)["status"].as_str().unwrap().contains(UNKNOWN));

    let denied = get(&runtime, &format!("{PREFIX}report/{DENIED_ORG}/{KNOWN_1}"));
    assert_eq!(denied.status, 403);
    assert_eq!(json_body(&denied)["status"], NO_PERMISSIONS_MESSAGE);

    let bad_name = get(&runtime, &format!("{PREFIX}report/11789772/not-a-uuid"));
    assert_eq!(bad_name.status, 400);

    let bad_org = get(&runtime, &format!("{PREFIX}report/0/{KNOWN_1}"));
    assert_eq!(bad_org.status, 400);
}

#[test]
fn synthetic_failure_names_answer_with_their_status() {
    let runtime = sample_runtime();
    for (suffix, status, message) in [
        ("200", 200, "ok"),
        ("400", 400, "Bad Request"),
        ("404", 404, "Not Found"),
        ("500", 500, "Internal Server Error"),
        ("503", 503, "Service Unavailable"),
    ] {
        let failing = format!("ffffffff-ffff-ffff-ffff-000000000{suffix}");
        for path in [
            format!("{PREFIX}report/{failing}"),
            format!("{PREFIX}report/11789772/{failing}"),
            format!("{PREFIX}report/42/{failing}"),
        ] {
            let response = get(&runtime, &path);
            assert_eq!(response.status, status, "{path}");
            assert_eq!(json_body(&response)["status"], message, "{path}");
        }
    }
}

#[test]
fn malformed_failure_suffix_is_a_bad_request() {
    let runtime = sample_runtime();
    for suffix in ["fff", "100", "101", "199"] {
        let response = get(
            &runtime,
            &format!("{PREFIX}report/ffffffff-ffff-ffff-ffff-000000000{suffix}"),
        );
        assert_eq!(response.status, 400, "{suffix}");
    }
}

#[test]
fn no_content_and_not_modified_are_rendered_without_body() {
    let runtime = sample_runtime();
    for (code, status_line) in [
        (204, "HTTP/1.1 204 No Content\r\n"),
        (304, "HTTP/1.1 304 Not Modified\r\n"),
    ] {
        let raw = format!(
            "GET {PREFIX}report/ffffffff-ffff-ffff-ffff-000000000{code} HTTP/1.1\r\nHost: localhost\r\n\r\n"
        );
        let response =
            String::from_utf8(handle_http_request_bytes(&runtime, raw.as_bytes()).unwrap()).unwrap();
        assert!(response.starts_with(status_line), "{response}");
        assert!(!response.contains("Content-Length"), "{response}");
        assert!(!response.contains("Content-Type"), "{response}");
        assert!(response.ends_with("\r\n\r\n"), "{response}");
    }
}

#[test]
fn changing_cluster_follows_the_clock() {
    for (minute, expected) in [(0, KNOWN_1), (15, KNOWN_2), (30, KNOWN_3), (45, KNOWN_1)] {
        let runtime = sample_runtime_at(minute);
        let response = get(&runtime, &format!("{PREFIX}report/11789772/{CHANGING}"));
        assert_eq!(response.status, 200);
        assert_eq!(response.body, report_for(expected).as_str(), "minute {minute}");
    }
}

#[test]
fn batch_post_reports_found_and_errored_in_request_order() {
    let runtime = sample_runtime();
    let body = format!(r#"{{"clusters":["{KNOWN_3}","{UNKNOWN}","{KNOWN_1}","{KNOWN_3}"]}}"#);
    let response = handle_request(
        &runtime,
        &request("POST", &format!("{PREFIX}clusters"), &body),
    );
    assert_eq!(response.status, 200);

    let body = json_body(&response);
    assert_eq!(
        body["clusters"],
        serde_json::json!([KNOWN_3, KNOWN_1, KNOWN_3])
    );
    assert_eq!(body["errors"], serde_json::json!([UNKNOWN]));
    assert_eq!(body["reports"].as_object().map(|map| map.len()), Some(2));
    assert_eq!(body["reports"][KNOWN_1]["report"]["cluster"], KNOWN_1);
    assert_eq!(body["generated_at"], "2024-01-01T12:00:00Z");
    assert_eq!(body["status"], "ok");
}

#[test]
fn batch_reports_malformed_failure_name_as_error() {
    let runtime = sample_runtime();
    let malformed = "ffffffff-ffff-ffff-ffff-000000000fff";
    let body = format!(r#"{{"clusters":["{KNOWN_2}","{malformed}","{KNOWN_1}"]}}"#);
    let response = handle_request(
        &runtime,
        &request("POST", &format!("{PREFIX}clusters"), &body),
    );
    assert_eq!(response.status, 200);

    let body = json_body(&response);
    assert_eq!(body["clusters"], serde_json::json!([KNOWN_2, KNOWN_1]));
    assert_eq!(body["errors"], serde_json::json!([malformed]));
    assert!(body["reports"].get(malformed).is_none());
}

#[test]
fn batch_get_reads_cluster_list_like_post() {
    let runtime = sample_runtime();
    let body = format!(r#"{{"clusters":["{KNOWN_1}","{UNKNOWN}"]}}"#);
    let response = handle_request(
        &runtime,
        &request("GET", &format!("{PREFIX}clusters"), &body),
    );
    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["clusters"], serde_json::json!([KNOWN_1]));
    assert_eq!(body["errors"], serde_json::json!([UNKNOWN]));

    let empty = get(&runtime, &format!("{PREFIX}clusters"));
    assert_eq!(empty.status, 400);
}

#[test]
fn batch_post_rejects_invalid_bodies() {
    let runtime = sample_runtime();
    for body in ["", "not json", r#"{"items":[]}"#, r#"{"clusters":["not-a-uuid"]}"#] {
        let response = handle_request(
            &runtime,
            &request("POST", &format!("{PREFIX}clusters"), body),
        );
        assert_eq!(response.status, 400, "{body}");
    }
}

#[test]
fn batch_post_requires_json_content_type_when_declared() {
    let runtime = sample_runtime();
    let body = format!(r#"{{"clusters":["{KNOWN_1}"]}}"#);
    let mut form = request("POST", &format!("{PREFIX}clusters"), &body);
    form.insert_header("Content-Type", "application/x-www-form-urlencoded");
    assert_eq!(handle_request(&runtime, &form).status, 400);

    let mut json = form.clone();
    json.insert_header("content-type", "application/json; charset=utf-8");
    assert_eq!(handle_request(&runtime, &json).status, 200);
}

#[test]
fn organization_batch_covers_every_owned_cluster() {
    let runtime = sample_runtime();

    let response = get(&runtime, &format!("{PREFIX}clusters/2"));
    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["clusters"], serde_json::json!([KNOWN_2]));
    assert_eq!(body["errors"], serde_json::json!([UNKNOWN]));

    let unknown = json_body(&get(&runtime, &format!("{PREFIX}clusters/42")));
    assert_eq!(unknown["clusters"], serde_json::json!([]));
    assert_eq!(unknown["errors"], serde_json::json!([]));

    let denied = get(&runtime, &format!("{PREFIX}clusters/{DENIED_ORG}"));
    assert_eq!(denied.status, 403);
}

#[test]
fn upgrade_risks_prediction_is_canned() {
    let runtime = sample_runtime();
    let response = get(
        &runtime,
        &format!("{PREFIX}cluster/{UNKNOWN}/upgrade-risks-prediction"),
    );
    assert_eq!(response.status, 200);
    let body = json_body(&response);
    assert_eq!(body["upgrade_recommendation"]["upgrade_recommended"], true);
    assert_eq!(body["meta"]["last_checked_at"], "2024-01-01T12:00:00Z");

    let failing = get(
        &runtime,
        &format!("{PREFIX}cluster/ffffffff-ffff-ffff-ffff-000000000503/upgrade-risks-prediction"),
    );
    assert_eq!(failing.status, 503);
}

#[test]
fn multi_cluster_upgrade_risks_answer_each_name_in_order() {
    let runtime = sample_runtime();
    let failing = "ffffffff-ffff-ffff-ffff-000000000503";
    let body = format!(r#"{{"clusters":["{UNKNOWN}","{failing}","{CHANGING}"]}}"#);
    let response = handle_request(
        &runtime,
        &request("POST", &format!("{PREFIX}upgrade-risks-prediction"), &body),
    );
    assert_eq!(response.status, 200);

    let body = json_body(&response);
    assert_eq!(body["status"], "ok");
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0]["cluster_id"], UNKNOWN);
    assert_eq!(predictions[0]["prediction_status"], "ok");
    assert_eq!(predictions[0]["upgrade_recommended"], true);
    assert_eq!(predictions[0]["last_checked_at"], "2024-01-01T12:00:00Z");
    assert_eq!(predictions[1]["cluster_id"], failing);
    assert_eq!(predictions[1]["prediction_status"], "No data for the cluster");
    assert!(predictions[1].get("upgrade_recommended").is_none());
    assert_eq!(predictions[2]["cluster_id"], CHANGING);

    let invalid = handle_request(
        &runtime,
        &request("POST", &format!("{PREFIX}upgrade-risks-prediction"), "{}"),
    );
    assert_eq!(invalid.status, 400);
}

#[test]
fn unknown_paths_and_wrong_methods_are_rejected() {
    let runtime = sample_runtime();
    assert_eq!(get(&runtime, "/v1/nothing").status, 404);
    let put = handle_request(&runtime, &request("PUT", &format!("{PREFIX}clusters"), ""));
    assert_eq!(put.status, 405);
    assert_eq!(
        get(&runtime, &format!("{PREFIX}upgrade-risks-prediction")).status,
        405
    );
    let delete = handle_request(
        &runtime,
        &request("DELETE", &format!("{PREFIX}report/{KNOWN_1}"), ""),
    );
    assert_eq!(delete.status, 405);
}

#[test]
fn options_on_report_endpoints_returns_empty_object() {
    let runtime = sample_runtime();
    for path in [format!("{PREFIX}report/{KNOWN_1}"), format!("{PREFIX}clusters")] {
        let response = handle_request(&runtime, &request("OPTIONS", &path, ""));
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{}");
    }
}

#[test]
fn raw_request_bytes_round_through_the_router() {
    let runtime = sample_runtime();
    let raw = format!("GET {PREFIX}report/{KNOWN_1}?verbose=1 HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let response = String::from_utf8(handle_http_request_bytes(&runtime, raw.as_bytes()).unwrap())
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with(report_for(KNOWN_1).as_str()));

    let truncated =
        b"POST /api/insights-results-aggregator/v2/clusters HTTP/1.1\r\nContent-Length: 10\r\n\r\n{}";
    assert!(handle_http_request_bytes(&runtime, truncated).is_err());
}

#[test]
fn queue_capacity_scales_with_workers() {
    assert_eq!(resolve_http_queue_capacity(0), 64);
    assert_eq!(resolve_http_queue_capacity(4), 256);
}

#[test]
fn rendered_status_line_uses_actual_code() {
    let text = super::http::render_response_text(&HttpResponse::json(418, "{}".to_string()));
    assert!(text.starts_with("HTTP/1.1 418 I'm a teapot\r\n"));
    let text = super::http::render_response_text(&HttpResponse::json(599, "{}".to_string()));
    assert!(text.starts_with("HTTP/1.1 599 Server Error\r\n"));
    let text = super::http::render_response_text(&HttpResponse::json(204, "{}".to_string()));
    assert_eq!(text, "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n");
}

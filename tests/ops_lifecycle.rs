//! End-to-end lifecycle tests against a mocked control-plane backend.
//!
//! These drive the scope resolver, paginated collector, operation poller,
//! and batch executor over real HTTP using wiremock, with the same
//! response decoding the CLI uses.

use cloudctl::gcp::client::{parse_list_page, parse_operation};
use cloudctl::ops::batch::{execute_batch, BatchOptions, Outcome};
use cloudctl::ops::collector::{collect, CollectMode, ListPage};
use cloudctl::ops::error::OpsError;
use cloudctl::ops::poller::{poll_to_completion, OperationData, OperationHandle, PollConfig};
use cloudctl::ops::scope::{resolve_scopes, ResourceRef, Scope, ScopeKind};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "test-project";

fn zonal_path(zone: &str, tail: &str) -> String {
    format!("/compute/v1/projects/{PROJECT}/zones/{zone}/{tail}")
}

async fn get_page(
    http: &reqwest::Client,
    base: &str,
    scope: &Scope,
    collection: &str,
    token: Option<&str>,
) -> Result<ListPage, OpsError> {
    let mut url = format!(
        "{base}/compute/v1/projects/{PROJECT}/zones/{}/{collection}",
        scope.name()
    );
    if let Some(token) = token {
        url.push_str(&format!("?pageToken={token}"));
    }
    let response = http.get(&url).send().await.map_err(OpsError::transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(OpsError::transport(std::io::Error::other(format!(
            "status {status}"
        ))));
    }
    let body: Value = response.json().await.map_err(OpsError::transport)?;
    Ok(parse_list_page(body))
}

async fn lookup_zones(http: &reqwest::Client, base: &str) -> Result<Vec<String>, OpsError> {
    let url = format!("{base}/compute/v1/projects/{PROJECT}/zones");
    let response = http.get(&url).send().await.map_err(OpsError::transport)?;
    let body: Value = response.json().await.map_err(OpsError::transport)?;
    Ok(parse_list_page(body)
        .items
        .iter()
        .filter_map(|z| z.get("name").and_then(|n| n.as_str()))
        .map(str::to_string)
        .collect())
}

fn zone_listing(names: &[&str]) -> Value {
    json!({
        "items": names.iter().map(|n| json!({"name": n, "status": "UP"})).collect::<Vec<_>>()
    })
}

/// Pagination and multi-scope merging over the wire.
mod collection_tests {
    use super::*;

    /// Three pages of ten items each come back as exactly thirty items in
    /// page order.
    #[tokio::test]
    async fn pagination_round_trip_three_pages() {
        let server = MockServer::start().await;
        let zone = "us-central1-a";

        for (page, token, next) in [
            (0, None, Some("t-2")),
            (1, Some("t-2"), Some("t-3")),
            (2, Some("t-3"), None),
        ] {
            let items: Vec<Value> = (0..10)
                .map(|i| json!({"name": format!("disk-{:02}", page * 10 + i)}))
                .collect();
            let mut body = json!({ "items": items });
            if let Some(next) = next {
                body["nextPageToken"] = json!(next);
            }
            let mut mock = Mock::given(method("GET")).and(path(zonal_path(zone, "disks")));
            mock = match token {
                Some(token) => mock.and(query_param("pageToken", token)),
                None => mock.and(query_param_is_missing("pageToken")),
            };
            mock.respond_with(ResponseTemplate::new(200).set_body_json(&body))
                .mount(&server)
                .await;
        }

        let http = reqwest::Client::new();
        let base = server.uri();
        let scope_set = resolve_scopes(ScopeKind::Zonal, &[zone.to_string()], || async {
            Ok(vec![zone.to_string()])
        })
        .await
        .unwrap();

        let out = collect(&scope_set, CollectMode::Strict, |scope, token| {
            let http = &http;
            let base = &base;
            async move { get_page(http, base, &scope, "disks", token.as_deref()).await }
        })
        .await
        .unwrap();

        assert_eq!(out.items.len(), 30);
        for (i, item) in out.items.iter().enumerate() {
            assert_eq!(item["name"], format!("disk-{i:02}"));
        }
    }

    /// Two zones' listings merge into the union, grouped by zone.
    #[tokio::test]
    async fn multi_zone_listing_is_the_union() {
        let server = MockServer::start().await;

        for (zone, names) in [
            ("us-central1-a", vec!["vm-a1", "vm-a2"]),
            ("us-central1-b", vec!["vm-b1"]),
        ] {
            let items: Vec<Value> = names.iter().map(|n| json!({"name": n})).collect();
            Mock::given(method("GET"))
                .and(path(zonal_path(zone, "instances")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(format!("/compute/v1/projects/{PROJECT}/zones")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(zone_listing(&["us-central1-a", "us-central1-b"])),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let base = server.uri();

        // "All zones" resolution through the backend lookup.
        let scope_set = resolve_scopes(ScopeKind::Zonal, &[], || async {
            lookup_zones(&http, &base).await
        })
        .await
        .unwrap();
        assert_eq!(scope_set.len(), 2);

        let out = collect(&scope_set, CollectMode::Strict, |scope, token| {
            let http = &http;
            let base = &base;
            async move { get_page(http, base, &scope, "instances", token.as_deref()).await }
        })
        .await
        .unwrap();

        let names: Vec<&str> = out
            .items
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["vm-a1", "vm-a2", "vm-b1"]);
    }

    /// An unknown zone fails resolution by name before any list call goes
    /// out.
    #[tokio::test]
    async fn unknown_zone_fails_before_any_list_call() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/compute/v1/projects/{PROJECT}/zones")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(zone_listing(&["us-central1-a"])),
            )
            .mount(&server)
            .await;
        // The listing endpoint must never be touched.
        Mock::given(method("GET"))
            .and(path(zonal_path("zone-does-not-exist", "instances")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(0)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let base = server.uri();
        let err = resolve_scopes(
            ScopeKind::Zonal,
            &["zone-does-not-exist".to_string()],
            || async { lookup_zones(&http, &base).await },
        )
        .await
        .unwrap_err();

        match err {
            OpsError::UnknownScope { scope, .. } => assert_eq!(scope, "zone-does-not-exist"),
            other => panic!("expected UnknownScope, got {other:?}"),
        }
    }
}

/// Batch deletes with operation polling over the wire.
mod batch_tests {
    use super::*;

    fn operation_body(name: &str, status: &str) -> Value {
        json!({
            "kind": "compute#operation",
            "name": name,
            "status": status,
            "operationType": "delete"
        })
    }

    async fn delete_target(
        http: &reqwest::Client,
        base: &str,
        target: &ResourceRef,
    ) -> Result<OperationData, OpsError> {
        let url = format!(
            "{base}/compute/v1/projects/{PROJECT}/zones/{}/instances/{}",
            target.scope.name(),
            target.name
        );
        let response = http.delete(&url).send().await.map_err(OpsError::transport)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OpsError::NotFound {
                resource: target.to_string(),
            });
        }
        if !status.is_success() {
            return Err(OpsError::transport(std::io::Error::other(format!(
                "status {status}"
            ))));
        }
        let body: Value = response.json().await.map_err(OpsError::transport)?;
        Ok(parse_operation(&body))
    }

    async fn poll_operation(
        http: &reqwest::Client,
        base: &str,
        handle: &OperationHandle,
    ) -> Result<OperationData, OpsError> {
        let url = format!(
            "{base}/compute/v1/projects/{PROJECT}/zones/{}/operations/{}",
            handle.scope.name(),
            handle.operation
        );
        let response = http.get(&url).send().await.map_err(OpsError::transport)?;
        let body: Value = response.json().await.map_err(OpsError::transport)?;
        Ok(parse_operation(&body))
    }

    /// Five targets: one 404s synchronously, one ends in a terminal error,
    /// three succeed. Every target is reported and the batch is a failure
    /// overall.
    #[tokio::test]
    async fn mixed_outcome_batch_reports_every_target() {
        let server = MockServer::start().await;
        let zone = "us-central1-a";

        for vm in ["vm-1", "vm-2", "vm-4", "vm-5"] {
            Mock::given(method("DELETE"))
                .and(path(zonal_path(zone, &format!("instances/{vm}"))))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(operation_body(&format!("operation-{vm}"), "PENDING")),
                )
                .mount(&server)
                .await;
        }
        Mock::given(method("DELETE"))
            .and(path(zonal_path(zone, "instances/vm-3")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "The resource 'vm-3' was not found"}
            })))
            .mount(&server)
            .await;

        for vm in ["vm-1", "vm-2", "vm-4"] {
            Mock::given(method("GET"))
                .and(path(zonal_path(zone, &format!("operations/operation-{vm}"))))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(operation_body(&format!("operation-{vm}"), "DONE")),
                )
                .mount(&server)
                .await;
        }
        let mut failed_op = operation_body("operation-vm-5", "DONE");
        failed_op["error"] = json!({
            "errors": [{"code": "INTERNAL_ERROR", "message": "backend fault"}]
        });
        Mock::given(method("GET"))
            .and(path(zonal_path(zone, "operations/operation-vm-5")))
            .respond_with(ResponseTemplate::new(200).set_body_json(&failed_op))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let base = server.uri();
        let cancel = CancellationToken::new();
        let targets: Vec<ResourceRef> = (1..=5)
            .map(|i| {
                ResourceRef::new(
                    "instances",
                    &format!("vm-{i}"),
                    Scope::Zone(zone.to_string()),
                )
            })
            .collect();

        let opts = BatchOptions {
            concurrency: 5,
            poll: PollConfig {
                interval: Duration::from_millis(20),
                timeout: Duration::from_secs(10),
            },
            wait: true,
        };

        let result = execute_batch(
            targets.clone(),
            &opts,
            &cancel,
            |target| {
                let http = &http;
                let base = &base;
                async move { delete_target(http, base, &target).await }
            },
            |handle| {
                let http = &http;
                let base = &base;
                async move { poll_operation(http, base, &handle).await }
            },
        )
        .await;

        assert_eq!(result.len(), 5);
        assert_eq!(result.succeeded(), 3);
        assert_eq!(result.failed(), 2);
        assert!(result.has_failures());

        match result.outcome_for(&targets[2]).unwrap() {
            Outcome::Failed(OpsError::NotFound { resource }) => {
                assert!(resource.contains("vm-3"))
            }
            other => panic!("vm-3 should be a synchronous NotFound, got {other:?}"),
        }
        match result.outcome_for(&targets[4]).unwrap() {
            Outcome::Failed(OpsError::BackendOperation { code, .. }) => {
                assert_eq!(code, "INTERNAL_ERROR")
            }
            other => panic!("vm-5 should carry the backend cause, got {other:?}"),
        }
    }

    /// An operation that never terminates times out locally, and nothing
    /// but GET polls ever reaches the backend - no cancellation call.
    #[tokio::test]
    async fn timeout_sends_no_cancellation_upstream() {
        let server = MockServer::start().await;
        let zone = "us-central1-a";

        Mock::given(method("GET"))
            .and(path(zonal_path(zone, "operations/operation-stuck")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(operation_body("operation-stuck", "RUNNING")),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let base = server.uri();
        let cancel = CancellationToken::new();
        let handle = OperationHandle {
            operation: "operation-stuck".to_string(),
            scope: Scope::Zone(zone.to_string()),
            target: ResourceRef::new("instances", "vm-stuck", Scope::Zone(zone.to_string())),
        };

        let err = poll_to_completion(
            &handle,
            OperationData::in_flight("operation-stuck", cloudctl::ops::OperationStatus::Running),
            PollConfig {
                interval: Duration::from_millis(30),
                timeout: Duration::from_millis(200),
            },
            &cancel,
            |h| {
                let http = &http;
                let base = &base;
                async move { poll_operation(http, base, &h).await }
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OpsError::Timeout { .. }));

        let requests = server.received_requests().await.unwrap();
        assert!(!requests.is_empty());
        assert!(
            requests.iter().all(|r| r.method == wiremock::http::Method::GET),
            "timeout must not issue any mutating/cancelling call"
        );
    }
}

//! End-to-end gateway behaviour over real sockets.

use std::time::Duration;

use axum::http::StatusCode;
use namespace_gateway::config::schema::{
    GatewayConfig, NamespaceConfig, RouteConfig, TransportOverride,
};
use serde_json::Value;

mod common;

use common::{client, namespace, rewrite, route, start_echo_backend, start_gateway, TestGateway};

async fn standard_gateway() -> TestGateway {
    let backend = start_echo_backend().await;
    let dead = common::dead_address().await;

    let strict = NamespaceConfig {
        routes: vec![
            rewrite("/wildcard-rewrite/*", "/any"),
            rewrite("/not-terminated/", "/any"),
            rewrite("/terminated/hi/{$}", "/any"),
            rewrite("/versioned", "/v2/*"),
            RouteConfig {
                methods: vec!["GET".into()],
                ..route("/only-get")
            },
        ],
        ..namespace("strict", &["/strict", "strict.com"], backend)
    };

    let testns1 = NamespaceConfig {
        routes: vec![
            RouteConfig {
                methods: vec!["GET".into()],
                ..route("/only-get")
            },
            rewrite("/users/{id}/posts", "/v2/posts/{id}"),
            rewrite("/swap/{a}/{b}/{$}", "/swapped/{b}/{a}"),
            route("/"),
        ],
        ..namespace("testns1", &["testns1.com", "/testns1"], backend)
    };

    let config = GatewayConfig {
        namespaces: vec![
            testns1,
            strict,
            NamespaceConfig {
                no_rewrite_path: true,
                ..namespace("norewrite", &["/norewrite"], backend)
            },
            NamespaceConfig {
                retain_host: true,
                ..namespace("retain", &["retain.com"], backend)
            },
            NamespaceConfig {
                transport: Some(TransportOverride {
                    response_timeout_ms: Some(200),
                    ..Default::default()
                }),
                ..namespace("slow", &["/slow-ns"], backend)
            },
            namespace("dead", &["/dead"], dead),
            namespace("root", &[], backend),
        ],
        ..Default::default()
    };

    start_gateway(config).await
}

async fn echo(gateway: &TestGateway, host: &str, path: &str) -> Value {
    let response = client()
        .get(gateway.url(path))
        .header("host", host)
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(response.status(), StatusCode::OK, "GET {host}{path}");
    response.json().await.unwrap()
}

#[tokio::test]
async fn forwards_every_method() {
    let gateway = standard_gateway().await;
    let client = client();

    for method in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
        let response = client
            .request(method.parse().unwrap(), gateway.url("/anything"))
            .header("host", "testns1.com")
            .body(if method == "GET" { "" } else { "payload" })
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{method}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["method"], method);
        assert_eq!(body["path"], "/anything");
        if method != "GET" {
            assert_eq!(body["body"], "payload");
        }
    }

    let trace = client
        .request(reqwest::Method::TRACE, gateway.url("/anything"))
        .header("host", "testns1.com")
        .send()
        .await
        .unwrap();
    assert_eq!(trace.status(), StatusCode::OK);
    let body: Value = trace.json().await.unwrap();
    assert_eq!(body["method"], "TRACE");

    // a successful CONNECT response has no body, so the method comes back in a header
    let connect = client
        .request(reqwest::Method::CONNECT, gateway.url("/anything"))
        .header("host", "testns1.com")
        .send()
        .await
        .unwrap();
    assert_eq!(connect.status(), StatusCode::OK);
    assert_eq!(connect.headers()["x-echo-method"], "CONNECT");
}

#[tokio::test]
async fn resolves_namespace_by_host_or_prefix() {
    let gateway = standard_gateway().await;

    let by_host = echo(&gateway, "testns1.com", "/get").await;
    assert_eq!(by_host["path"], "/get");

    let by_host_with_port = echo(&gateway, "TESTNS1.com:8888", "/get").await;
    assert_eq!(by_host_with_port["path"], "/get");

    let by_prefix = echo(&gateway, "localhost", "/testns1/get").await;
    assert_eq!(by_prefix["path"], "/get");

    let bare_prefix = echo(&gateway, "localhost", "/testns1").await;
    assert_eq!(bare_prefix["path"], "/");
}

#[tokio::test]
async fn passthrough_keeps_original_path() {
    let gateway = standard_gateway().await;

    let root = echo(&gateway, "localhost", "/").await;
    assert_eq!(root["path"], "/");

    let get = echo(&gateway, "localhost", "/get").await;
    assert_eq!(get["path"], "/get");

    let lookalike = echo(&gateway, "localhost", "/testns1foo/bar").await;
    assert_eq!(lookalike["path"], "/testns1foo/bar");
}

#[tokio::test]
async fn wildcard_rewrite_appends_capture() {
    let gateway = standard_gateway().await;

    let body = echo(&gateway, "localhost", "/strict/wildcard-rewrite/a/huhh").await;
    assert_eq!(body["path"], "/any/a/huhh");

    let by_host = echo(&gateway, "strict.com", "/wildcard-rewrite/a/huhh").await;
    assert_eq!(by_host["path"], "/any/a/huhh");
}

#[tokio::test]
async fn encoded_slash_is_preserved() {
    let gateway = standard_gateway().await;

    let body = echo(&gateway, "localhost", "/strict/wildcard-rewrite/hi%2Fworld/next").await;
    assert_eq!(body["path"], "/any/hi%2Fworld/next");

    let body = echo(&gateway, "testns1.com", "/a%2Fb/c").await;
    assert_eq!(body["path"], "/a%2Fb/c");
}

#[tokio::test]
async fn non_terminated_route_accepts_any_suffix() {
    let gateway = standard_gateway().await;

    for path in ["/not-terminated", "/not-terminated/", "/not-terminated/a/b/c/d"] {
        let body = echo(&gateway, "strict.com", path).await;
        assert_eq!(body["path"], "/any", "{path}");
    }

    let placeholder = echo(&gateway, "strict.com", "/versioned/users/42").await;
    assert_eq!(placeholder["path"], "/v2/users/42");
}

#[tokio::test]
async fn terminated_route_rejects_deeper_paths() {
    let gateway = standard_gateway().await;

    for path in ["/terminated/hi", "/terminated/hi/"] {
        let body = echo(&gateway, "strict.com", path).await;
        assert_eq!(body["path"], "/any", "{path}");
    }

    for path in ["/terminated/hi/a", "/terminated/hi/a/b/c/"] {
        let response = client()
            .get(gateway.url(path))
            .header("host", "strict.com")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn query_string_passes_through_unchanged() {
    let gateway = standard_gateway().await;

    let body = echo(
        &gateway,
        "testns1.com",
        "/get?hi=1&hi=2&hi=3&empty=&encoded=a%20b%26c",
    )
    .await;

    assert_eq!(body["query"], "hi=1&hi=2&hi=3&empty=&encoded=a%20b%26c");
    assert_eq!(body["args"]["hi"], serde_json::json!(["1", "2", "3"]));
    assert_eq!(body["args"]["empty"], serde_json::json!([""]));
    assert_eq!(body["args"]["encoded"], serde_json::json!(["a b&c"]));
}

#[tokio::test]
async fn named_segments_rewrite_raw() {
    let gateway = standard_gateway().await;

    let body = echo(&gateway, "testns1.com", "/users/a%2Fb/posts").await;
    assert_eq!(body["path"], "/v2/posts/a%2Fb");

    let body = echo(&gateway, "localhost", "/testns1/swap/one/t%2Fwo/").await;
    assert_eq!(body["path"], "/swapped/t%2Fwo/one");
}

#[tokio::test]
async fn method_filter_does_not_fall_back_to_catch_all() {
    let gateway = standard_gateway().await;
    let client = client();

    for method in [reqwest::Method::POST, reqwest::Method::DELETE] {
        let rejected = client
            .request(method.clone(), gateway.url("/only-get"))
            .header("host", "testns1.com")
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(rejected.headers()["allow"], "GET, HEAD");
    }

    let other = echo(&gateway, "testns1.com", "/only-get-not").await;
    assert_eq!(other["path"], "/only-get-not");
}

#[tokio::test]
async fn method_filter_returns_405() {
    let gateway = standard_gateway().await;
    let client = client();

    let ok = client
        .get(gateway.url("/strict/only-get"))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let head = client
        .head(gateway.url("/strict/only-get"))
        .send()
        .await
        .unwrap();
    assert_eq!(head.status(), StatusCode::OK);

    let rejected = client
        .post(gateway.url("/strict/only-get"))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(rejected.headers()["allow"], "GET, HEAD");
}

#[tokio::test]
async fn redirects_are_relayed_not_followed() {
    let gateway = standard_gateway().await;

    let response = client()
        .get(gateway.url("/redirect-to"))
        .header("host", "testns1.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "/get");
}

#[tokio::test]
async fn default_header_policy() {
    let gateway = standard_gateway().await;

    let body = echo(&gateway, "testns1.com", "/headers").await;
    assert_eq!(body["headers"]["accept-encoding"], "gzip");
    assert!(body["headers"].get("x-forwarded-for").is_none());
    let host = body["headers"]["host"].as_str().unwrap_or_default();
    assert!(host.starts_with("127.0.0.1:"), "backend saw host {host}");

    let response = client()
        .get(gateway.url("/headers"))
        .header("host", "testns1.com")
        .header("accept-encoding", "br")
        .header("x-forwarded-for", "203.0.113.9")
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["headers"]["accept-encoding"], "br");
    assert!(body["headers"].get("x-forwarded-for").is_none());
}

#[tokio::test]
async fn retain_host_forwards_client_host() {
    let gateway = standard_gateway().await;

    let body = echo(&gateway, "retain.com", "/headers").await;
    assert_eq!(body["headers"]["host"], "retain.com");
}

#[tokio::test]
async fn no_rewrite_path_forwards_original_path() {
    let gateway = standard_gateway().await;

    let body = echo(&gateway, "localhost", "/norewrite/x/y?z=1").await;
    assert_eq!(body["path"], "/norewrite/x/y");
    assert_eq!(body["query"], "z=1");
}

#[tokio::test]
async fn upstream_failures_surface_as_errors() {
    let gateway = standard_gateway().await;
    let client = client();

    let refused = client.get(gateway.url("/dead/x")).send().await.unwrap();
    assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);

    let slow = client.get(gateway.url("/slow-ns/slow")).send().await.unwrap();
    assert_eq!(slow.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn unknown_namespace_is_404_without_passthrough() {
    let backend = start_echo_backend().await;
    let gateway = start_gateway(GatewayConfig {
        namespaces: vec![namespace("only", &["/only"], backend)],
        ..Default::default()
    })
    .await;

    let response = client().get(gateway.url("/elsewhere")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forwarded_headers_when_enabled() {
    let backend = start_echo_backend().await;
    let mut config = GatewayConfig {
        namespaces: vec![namespace("root", &[], backend)],
        ..Default::default()
    };
    config.headers.forwarded_for = true;
    let gateway = start_gateway(config).await;

    let body = echo(&gateway, "public.example.com", "/headers").await;
    assert_eq!(body["headers"]["x-forwarded-for"], "127.0.0.1");
    assert_eq!(body["headers"]["x-forwarded-host"], "public.example.com");
    assert_eq!(body["headers"]["x-forwarded-proto"], "http");
}

#[tokio::test]
async fn hot_reload_swaps_routing_snapshot() {
    let backend = start_echo_backend().await;
    let gateway = start_gateway(GatewayConfig {
        namespaces: vec![namespace("first", &["/first"], backend)],
        ..Default::default()
    })
    .await;
    let client = client();

    let before = client.get(gateway.url("/fresh/x")).send().await.unwrap();
    assert_eq!(before.status(), StatusCode::NOT_FOUND);

    gateway
        .updates
        .send(GatewayConfig {
            namespaces: vec![namespace("fresh", &["/fresh"], backend)],
            ..Default::default()
        })
        .unwrap();

    let mut status = StatusCode::NOT_FOUND;
    for _ in 0..50 {
        status = client
            .get(gateway.url("/fresh/x"))
            .send()
            .await
            .unwrap()
            .status();
        if status == StatusCode::OK {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let backend = start_echo_backend().await;
    let gateway = start_gateway(GatewayConfig {
        namespaces: vec![namespace("root", &[], backend)],
        ..Default::default()
    })
    .await;
    let client = client();

    assert!(client.get(gateway.url("/")).send().await.is_ok());

    gateway.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let fresh = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    assert!(fresh.get(gateway.url("/")).send().await.is_err());
}

//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use namespace_gateway::config::schema::{GatewayConfig, NamespaceConfig, RouteConfig};
use namespace_gateway::{HttpServer, Shutdown};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start an echo backend on an ephemeral port.
///
/// Every request is answered with a JSON description of what arrived and an
/// `x-echo-method` header, except:
/// - `/redirect-to` answers 302 with `Location: /get`
/// - `/slow` waits two seconds before answering
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    if path == "/redirect-to" {
        return (StatusCode::FOUND, [(header::LOCATION, "/get")]).into_response();
    }
    if path == "/slow" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    let method = request.method().to_string();
    let url = request.uri().to_string();
    let query = request.uri().query().map(str::to_string);

    let mut args: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(q) = &query {
        for (key, value) in url::form_urlencoded::parse(q.as_bytes()) {
            args.entry(key.into_owned()).or_default().push(value.into_owned());
        }
    }

    let mut headers = serde_json::Map::new();
    for (name, value) in request.headers() {
        headers.insert(
            name.as_str().to_string(),
            Value::String(value.to_str().unwrap_or_default().to_string()),
        );
    }

    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    let echoed_method = method.clone();
    let body = Json(json!({
        "method": method,
        "path": path,
        "url": url,
        "query": query,
        "args": args,
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }));
    ([("x-echo-method", echoed_method)], body).into_response()
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A running gateway and the handles controlling it.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(mut config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestGateway {
        addr,
        shutdown,
        updates,
    }
}

/// Client that never follows redirects and ignores system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub fn route(pattern: &str) -> RouteConfig {
    RouteConfig {
        pattern: pattern.into(),
        ..Default::default()
    }
}

pub fn rewrite(pattern: &str, target: &str) -> RouteConfig {
    RouteConfig {
        rewrite: Some(target.into()),
        ..route(pattern)
    }
}

pub fn namespace(name: &str, mounts: &[&str], backend: SocketAddr) -> NamespaceConfig {
    NamespaceConfig {
        name: name.into(),
        mounts: mounts.iter().map(|m| m.to_string()).collect(),
        backend: format!("http://{backend}"),
        routes: vec![route("/")],
        ..Default::default()
    }
}

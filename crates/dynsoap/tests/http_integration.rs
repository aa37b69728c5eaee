// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metadata fetching and calls over real HTTP, against a local server that
//! answers each request with a canned response.

use dynsoap::config::{Config, HttpConfig};
use dynsoap::discovery::{DiscoveryError, HttpFetcher, MetadataFetcher};
use dynsoap::proxy::{CallTransport, HttpCallTransport, TransportError};
use dynsoap::{default_sink, Discoverer};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

const FAULT: &str = "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\"><s:Body>\
<s:Fault><faultcode>s:Client</faultcode><faultstring>bad input</faultstring></s:Fault>\
</s:Body></s:Envelope>";

struct CannedServer {
    base: Url,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    /// Serve `respond(path)` to every connection until the test ends.
    async fn start(respond: fn(&str) -> String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                seen.lock().push(request);
                let _ = stream.write_all(respond(&path).as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        Self {
            base: Url::parse(&format!("http://{}/", addr)).expect("base url"),
            requests,
        }
    }

    fn url(&self, path: &str) -> Url {
        self.base.join(path).expect("join")
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// Read one request: the head, then `content-length` bytes of body.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + length {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut text = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in headers {
        text.push_str(&format!("{}: {}\r\n", name, value));
    }
    text.push_str("\r\n");
    text.push_str(body);
    text
}

fn metadata_routes(path: &str) -> String {
    match path {
        "/loop" => response("302 Found", &[("Location", "/loop")], ""),
        "/nowhere" => response("302 Found", &[], ""),
        "/busy" => response("503 Service Unavailable", &[], "try later"),
        "/moved" => response("301 Moved Permanently", &[("Location", "/svc?wsdl")], ""),
        "/svc?wsdl" => response(
            "200 OK",
            &[("Content-Type", "text/xml")],
            "<wsdl:definitions xmlns:wsdl=\"http://schemas.xmlsoap.org/wsdl/\"/>",
        ),
        _ => response("404 Not Found", &[], "<html>Not Found</html>"),
    }
}

fn call_routes(path: &str) -> String {
    match path {
        "/fault" => response("500 Internal Server Error", &[("Content-Type", "text/xml")], FAULT),
        "/busy" => response("503 Service Unavailable", &[], ""),
        _ => response("404 Not Found", &[], ""),
    }
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&HttpConfig::default()).expect("client")
}

#[tokio::test]
async fn test_redirect_loop_is_unresolvable() {
    let server = CannedServer::start(metadata_routes).await;
    let err = fetcher().fetch(&server.url("loop")).await.unwrap_err();
    assert!(
        matches!(err, DiscoveryError::RedirectUnresolvable { .. }),
        "{:?}",
        err
    );
    // The first request plus `max_redirects` follows, and no more.
    assert!(server.requests().len() <= HttpConfig::default().max_redirects + 1);
}

#[tokio::test]
async fn test_redirect_without_location_is_unresolvable() {
    let server = CannedServer::start(metadata_routes).await;
    let err = fetcher().fetch(&server.url("nowhere")).await.unwrap_err();
    assert!(
        matches!(
            err,
            DiscoveryError::RedirectUnresolvable { ref reason, .. } if reason.contains("302")
        ),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_unavailable_service_is_unreachable() {
    let server = CannedServer::start(metadata_routes).await;
    let err = fetcher().fetch(&server.url("busy")).await.unwrap_err();
    assert!(
        matches!(err, DiscoveryError::Unreachable { ref reason, .. } if reason.contains("503")),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_redirect_is_followed_to_final_location() {
    let server = CannedServer::start(metadata_routes).await;
    let doc = fetcher().fetch(&server.url("moved")).await.expect("fetch");
    assert_eq!(doc.url, server.url("svc?wsdl"));
    assert_eq!(doc.status, 200);
    assert!(doc.body.contains("definitions"));
}

#[tokio::test]
async fn test_not_found_is_passed_to_caller() {
    let server = CannedServer::start(metadata_routes).await;
    let doc = fetcher().fetch(&server.url("svc")).await.expect("fetch");
    assert_eq!(doc.status, 404);
    assert!(!doc.is_success());
}

#[tokio::test]
async fn test_discovery_of_missing_service_is_unreachable() {
    let server = CannedServer::start(metadata_routes).await;
    let discoverer = Discoverer::http(&Config::default(), default_sink()).expect("client");
    let address = server.url("missing");

    let err = discoverer.discover(address.as_str()).await.unwrap_err();
    assert_eq!(
        err,
        DiscoveryError::Unreachable {
            uri: address.to_string(),
            reason: "HTTP 404".into(),
        }
    );
    // The address itself, then the `?wsdl` form.
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_fault_body_is_returned_with_server_error() {
    let server = CannedServer::start(call_routes).await;
    let transport = HttpCallTransport::new(&HttpConfig::default()).expect("client");

    let body = transport
        .call(server.url("fault").as_str(), "urn:t/Add", "<request/>".to_string())
        .await
        .expect("fault body");
    assert!(body.contains("<faultstring>bad input</faultstring>"));

    let request = server.requests().pop().expect("one request");
    let lower = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /fault "));
    assert!(lower.contains("soapaction: \"urn:t/add\""));
    assert!(lower.contains("content-type: text/xml; charset=utf-8"));
    assert!(request.ends_with("<request/>"));
}

#[tokio::test]
async fn test_unavailable_endpoint_reports_status() {
    let server = CannedServer::start(call_routes).await;
    let transport = HttpCallTransport::new(&HttpConfig::default()).expect("client");
    let address = server.url("busy");

    let err = transport
        .call(address.as_str(), "urn:t/Add", "<request/>".to_string())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TransportError::Status {
            address: address.to_string(),
            status: 503,
        }
    );
}

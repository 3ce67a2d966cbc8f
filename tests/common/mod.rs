//! In-process stand-in for the OSV API.
//!
//! Serves `/v1/query`, `/v1/querybatch` and `/v1/vulns/{id}` on a loopback
//! port from its own runtime thread, so both async and blocking clients can
//! talk to it. Knows a single vulnerable package (`PyPI:django@1.4.2`) and
//! one vulnerable commit.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const KNOWN_ID: &str = "GHSA-2gwj-7jmv-h26r";
pub const SECOND_ID: &str = "PYSEC-2012-8";
pub const VULNERABLE_COMMIT: &str = "6879efc2c1596d11a6a6ad296f80063b558d5e0f";

/// Package name whose batch answer drops one result entry.
pub const SHORT_CHANGED: &str = "short-changed";

/// Vulnerability ID answered with a body lacking `id` and `modified`.
pub const MALFORMED_ID: &str = "MALFORMED-1";

#[derive(Default)]
pub struct Stats {
    requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct FixtureServer {
    addr: SocketAddr,
    stats: Arc<Stats>,
}

impl FixtureServer {
    pub fn start() -> Self {
        Self::start_with_delay(Duration::ZERO)
    }

    /// Every response is held back by `delay`.
    pub fn start_with_delay(delay: Duration) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(Stats::default());

        let server_stats = stats.clone();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let listener = TcpListener::from_std(listener).unwrap();
                while let Ok((stream, _)) = listener.accept().await {
                    let stats = server_stats.clone();
                    tokio::spawn(async move {
                        let _ = handle(stream, stats, delay).await;
                    });
                }
            });
        });

        Self { addr, stats }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> usize {
        self.stats.requests.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }
}

async fn handle(mut stream: TcpStream, stats: Arc<Stats>, delay: Duration) -> std::io::Result<()> {
    let Some((method, path, body)) = read_request(&mut stream).await? else {
        return Ok(());
    };

    stats.requests.fetch_add(1, Ordering::SeqCst);
    let current = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_in_flight.fetch_max(current, Ordering::SeqCst);

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let (status, body) = route(&method, &path, &body);

    stats.in_flight.fetch_sub(1, Ordering::SeqCst);

    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        _ => "Not Found",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Method, path and body of one request.
type Request = (String, String, Vec<u8>);

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<Request>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(Some((method, path, buf[header_end..].to_vec())))
}

fn route(method: &str, path: &str, body: &[u8]) -> (u16, String) {
    match (method, path) {
        ("POST", "/v1/query") => match serde_json::from_slice::<Value>(body) {
            Ok(query) if is_vulnerable(&query) => (
                200,
                json!({"vulns": [vulnerability(KNOWN_ID), vulnerability(SECOND_ID)]}).to_string(),
            ),
            Ok(_) => (200, "{}".to_string()),
            Err(_) => bad_request(),
        },
        ("POST", "/v1/querybatch") => match serde_json::from_slice::<Value>(body) {
            Ok(batch) => {
                let queries = batch["queries"].as_array().cloned().unwrap_or_default();
                let mut results: Vec<Value> = queries
                    .iter()
                    .map(|query| {
                        if is_vulnerable(query) {
                            json!({"vulns": [
                                {"id": KNOWN_ID, "modified": "2024-02-16T08:12:34.123456Z"},
                                {"id": SECOND_ID, "modified": "2021-07-15T02:22:10Z"}
                            ]})
                        } else {
                            json!({})
                        }
                    })
                    .collect();
                if queries
                    .iter()
                    .any(|q| q["package"]["name"] == SHORT_CHANGED)
                {
                    results.pop();
                }
                (200, json!({ "results": results }).to_string())
            }
            Err(_) => bad_request(),
        },
        ("GET", path) if path.starts_with("/v1/vulns/") => {
            let id = &path["/v1/vulns/".len()..];
            if id == MALFORMED_ID {
                (200, json!({"summary": "record without id"}).to_string())
            } else if id.starts_with("GHSA-") || id.starts_with("PYSEC-") {
                (200, vulnerability(id).to_string())
            } else {
                (404, json!({"code": 5, "message": "Bug not found."}).to_string())
            }
        }
        _ => (404, json!({"code": 5, "message": "Not found."}).to_string()),
    }
}

fn bad_request() -> (u16, String) {
    (400, json!({"code": 3, "message": "Invalid query."}).to_string())
}

fn is_vulnerable(query: &Value) -> bool {
    let vulnerable_version =
        query["package"]["name"] == "django" && query["version"] == "1.4.2";
    vulnerable_version || query["commit"] == VULNERABLE_COMMIT
}

fn vulnerability(id: &str) -> Value {
    json!({
        "schema_version": "1.6.0",
        "id": id,
        "modified": "2024-02-16T08:12:34.123456Z",
        "published": "2022-05-17T03:52:17Z",
        "aliases": ["CVE-2012-4520"],
        "summary": "Django allows arbitrary URL generation via the Host header",
        "affected": [{
            "package": {"ecosystem": "PyPI", "name": "django", "purl": "pkg:pypi/django"},
            "ranges": [{
                "type": "ECOSYSTEM",
                "events": [{"introduced": "1.4"}, {"fixed": "1.4.3"}]
            }],
            "versions": ["1.4", "1.4.1", "1.4.2"]
        }],
        "references": [{
            "type": "WEB",
            "url": "https://www.djangoproject.com/weblog/2012/oct/17/security/"
        }]
    })
}

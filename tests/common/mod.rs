//! Shared test fixtures: mock API implementations with call recording,
//! a scripted HTTP server for client tests, and a baseline config.

#![allow(dead_code)]

use bytes::Bytes;
use gluesync::config::Config;
use gluesync::error::ApiError;
use gluesync::sync::{GatewayApi, TorrentApi};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Baseline config for controller/prober tests; tests override what they need
pub fn test_config() -> Config {
    Config {
        gluetun_url: "http://gluetun.test".into(),
        gluetun_api_key: None,
        gluetun_username: None,
        gluetun_password: None,
        qbittorrent_url: "http://qbt.test".into(),
        qbittorrent_username: None,
        qbittorrent_password: None,
        qbittorrent_verify_ssl: true,
        startup_check_delay: Duration::ZERO,
        startup_check_interval: Duration::from_secs(1),
        startup_max_attempts: 3,
        poll_interval: Duration::from_secs(30),
        verify_delay: Duration::from_secs(2),
        verify_max_attempts: 3,
        request_timeout: Duration::from_secs(5),
        log_level: "info".into(),
        health_enabled: false,
        health_port: 8081,
    }
}

/// Scripted gateway: pops results in order, repeating the last one forever
#[derive(Clone)]
pub struct MockGateway {
    script: Arc<Mutex<VecDeque<Result<u16, ApiError>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockGateway {
    pub fn always(result: Result<u16, ApiError>) -> Self {
        Self::sequence(vec![result])
    }

    pub fn sequence(results: Vec<Result<u16, ApiError>>) -> Self {
        assert!(!results.is_empty());
        Self {
            script: Arc::new(Mutex::new(results.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GatewayApi for MockGateway {
    async fn forwarded_port(&self) -> Result<u16, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

#[derive(Debug, Default)]
struct TorrentInner {
    port: u16,
    apply_updates: bool,
    get_failures_remaining: usize,
    get_error: Option<ApiError>,
    get_error_after_set: Option<ApiError>,
    set_error: Option<ApiError>,
    login_calls: usize,
    get_calls: usize,
    set_calls: Vec<u16>,
}

/// Mock torrent client. Clones share state so tests can inspect calls after
/// handing ownership to the controller.
#[derive(Debug, Clone)]
pub struct MockTorrent {
    inner: Arc<Mutex<TorrentInner>>,
}

impl MockTorrent {
    /// Listening on `port`; set-port requests take effect
    pub fn with_port(port: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TorrentInner {
                port,
                apply_updates: true,
                ..Default::default()
            })),
        }
    }

    /// Acknowledges set-port requests but the port never actually changes
    pub fn stubborn(port: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TorrentInner {
                port,
                apply_updates: false,
                ..Default::default()
            })),
        }
    }

    /// The first `n` port reads fail as unreachable, then reads succeed
    pub fn unready_for(self, n: usize) -> Self {
        self.inner.lock().unwrap().get_failures_remaining = n;
        self
    }

    /// Every port read fails with `err`
    pub fn failing_get(self, err: ApiError) -> Self {
        self.inner.lock().unwrap().get_error = Some(err);
        self
    }

    /// Port reads fail with `err` once a set-port request has been issued
    pub fn get_fails_after_set(self, err: ApiError) -> Self {
        self.inner.lock().unwrap().get_error_after_set = Some(err);
        self
    }

    /// Every port write fails with `err`
    pub fn failing_set(self, err: ApiError) -> Self {
        self.inner.lock().unwrap().set_error = Some(err);
        self
    }

    pub fn port(&self) -> u16 {
        self.inner.lock().unwrap().port
    }

    pub fn login_calls(&self) -> usize {
        self.inner.lock().unwrap().login_calls
    }

    pub fn get_calls(&self) -> usize {
        self.inner.lock().unwrap().get_calls
    }

    pub fn set_calls(&self) -> Vec<u16> {
        self.inner.lock().unwrap().set_calls.clone()
    }
}

impl TorrentApi for MockTorrent {
    async fn login(&mut self) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.login_calls += 1;
        Ok(())
    }

    async fn listening_port(&mut self) -> Result<u16, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.get_calls += 1;
        if let Some(err) = &inner.get_error {
            return Err(err.clone());
        }
        if inner.get_failures_remaining > 0 {
            inner.get_failures_remaining -= 1;
            return Err(ApiError::Unreachable("connection refused".into()));
        }
        Ok(inner.port)
    }

    async fn set_listening_port(&mut self, port: u16) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.set_calls.push(port);
        if let Some(err) = &inner.set_error {
            return Err(err.clone());
        }
        if inner.apply_updates {
            inner.port = port;
        }
        // Reads start failing now, if configured to.
        if let Some(err) = inner.get_error_after_set.take() {
            inner.get_error = Some(err);
        }
        Ok(())
    }
}

/// A request as seen by the scripted HTTP server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    /// Header names lowercased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted HTTP server handle
pub struct TestServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Spawn an HTTP server whose responder maps (request index, request) to
/// (status, body). The index is global across the server's lifetime.
pub async fn spawn_http<F>(respond: F) -> TestServer
where
    F: Fn(usize, &Recorded) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();
    let counter = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let log = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let io = TokioIo::new(stream);
            let log = log.clone();
            let counter = counter.clone();
            let respond = respond.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let log = log.clone();
                    let counter = counter.clone();
                    let respond = respond.clone();
                    async move {
                        let method = req.method().to_string();
                        let path = req.uri().path().to_string();
                        let headers = req
                            .headers()
                            .iter()
                            .map(|(n, v)| {
                                (
                                    n.as_str().to_lowercase(),
                                    v.to_str().unwrap_or_default().to_string(),
                                )
                            })
                            .collect();
                        let body = req.into_body().collect().await.unwrap().to_bytes();
                        let recorded = Recorded {
                            method,
                            path,
                            headers,
                            body: String::from_utf8_lossy(&body).to_string(),
                        };

                        let index = counter.fetch_add(1, Ordering::SeqCst);
                        let (status, body) = respond(index, &recorded);
                        log.lock().unwrap().push(recorded);

                        let response = Response::builder()
                            .status(StatusCode::from_u16(status).unwrap())
                            .body(Full::new(Bytes::from(body)))
                            .unwrap();
                        Ok::<_, Infallible>(response)
                    }
                });

                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    TestServer { addr, requests }
}

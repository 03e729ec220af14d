//! Health endpoint HTTP server
//!
//! Serves `GET /health` from the shared health state. The handler reads a
//! snapshot and answers; it never triggers a sync cycle or an external call,
//! so a request can never block on the length of a cycle.

use crate::health::{render, HealthState};
use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Bind the endpoint socket.
///
/// Called from startup so a port conflict fails the process immediately
/// instead of leaving it running without a health socket.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind health endpoint to {addr}"))?;

    info!("health endpoint listening on {addr}");
    Ok(listener)
}

/// Serve health requests on an already-bound listener
pub async fn serve(listener: TcpListener, state: HealthState) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("health endpoint accept failed")?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { handle(req, state).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("health connection error from {peer}: {e}");
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    state: HealthState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::GET || req.uri().path() != "/health" {
        debug!("health endpoint: {} {} -> 404", req.method(), req.uri());
        return Ok(plain_response(StatusCode::NOT_FOUND, Bytes::new()));
    }

    let snapshot = state.snapshot().await;
    let (code, body) = render(&snapshot);
    debug!("health check -> {code}");

    Ok(json_response(code, Bytes::from(body)))
}

fn json_response(code: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(code)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .body(Full::new(body))
        .expect("static response parts are valid")
}

fn plain_response(code: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(code)
        .body(Full::new(body))
        .expect("static response parts are valid")
}

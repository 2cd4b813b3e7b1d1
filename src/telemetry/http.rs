//! Tiny on-demand HTTP probe.
//!
//! `GET /v1/metrics` samples synchronously through the shared [`Sampler`]
//! and returns the sample as JSON. It does not touch the series the driver
//! renders from.

use crate::telemetry::error::{Result, TelemetryError};
use crate::telemetry::sampler::Sampler;
use log::{debug, info, warn};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

/// Liveness message for `GET /`.
pub const GREETING: &str = "smi-viz telemetry probe";

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Status code and JSON body for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: serde_json::Value,
}

impl ApiResponse {
    fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }
}

/// Maps a request to a response. The query string is ignored.
pub fn route(method: &Method, url: &str, sampler: &dyn Sampler) -> ApiResponse {
    let path = url.split('?').next().unwrap_or_default();
    match (method, path) {
        (Method::Get, "/") => ApiResponse::new(200, json!({ "message": GREETING })),
        (Method::Get, "/v1/metrics") => match sampler.sample() {
            Ok(sample) => match serde_json::to_value(&sample) {
                Ok(body) => ApiResponse::new(200, body),
                Err(e) => ApiResponse::new(500, json!({ "error": e.to_string() })),
            },
            Err(e) => ApiResponse::new(503, json!({ "error": e.to_string() })),
        },
        (_, "/" | "/v1/metrics") => {
            ApiResponse::new(405, json!({ "error": format!("method {} not allowed", method) }))
        }
        _ => ApiResponse::new(404, json!({ "error": format!("no route for {}", path) })),
    }
}

/// Handle to the probe thread.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    thread: JoinHandle<()>,
}

impl ApiServer {
    /// Binds `bind` and serves requests on a dedicated thread until
    /// `shutdown` is set.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Http`] if the address cannot be bound, or
    /// [`TelemetryError::Io`] if the thread cannot be spawned.
    pub fn spawn(bind: &str, sampler: Arc<dyn Sampler>, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let server = Server::http(bind)
            .map_err(|e| TelemetryError::Http(format!("cannot bind {}: {}", bind, e)))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| TelemetryError::Http(format!("{} is not an IP listener", bind)))?;

        let thread = thread::Builder::new()
            .name("smi-viz-http".to_string())
            .spawn(move || serve(&server, sampler.as_ref(), &shutdown))?;

        info!("http probe listening on {}", addr);
        Ok(Self { addr, thread })
    }

    /// Bound address; useful when binding port 0.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits for the probe thread to observe shutdown.
    pub fn join(self) {
        if self.thread.join().is_err() {
            warn!("http probe thread panicked");
        }
    }
}

fn serve(server: &Server, sampler: &dyn Sampler, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::Relaxed) {
        match server.recv_timeout(RECV_TIMEOUT) {
            Ok(Some(request)) => handle(request, sampler),
            Ok(None) => {}
            Err(e) => {
                warn!("http probe stopped: {}", e);
                return;
            }
        }
    }
    debug!("http probe shut down");
}

fn handle(request: Request, sampler: &dyn Sampler) {
    let reply = route(request.method(), request.url(), sampler);
    debug!("{} {} -> {}", request.method(), request.url(), reply.status);

    let mut response = Response::from_string(reply.body.to_string()).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response = response.with_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!("failed to answer http request: {}", e);
    }
}

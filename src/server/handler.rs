// src/server/handler.rs
use crate::controller::Controller;
use crate::metrics::MetricsRegistry;
use hyper::{header, Body, Method, Request, Response, StatusCode};
use std::sync::Arc;
use tower::Service;

/// Read-only view of the controller: never triggers a sweep.
#[derive(Clone)]
pub struct StatusHandler {
    controller: Arc<Controller>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl StatusHandler {
    pub fn new(controller: Arc<Controller>, metrics: Option<Arc<MetricsRegistry>>) -> Self {
        Self {
            controller,
            metrics,
        }
    }

    pub async fn respond(&self, req: Request<Body>) -> Result<Response<Body>, hyper::http::Error> {
        if req.method() != Method::GET {
            return plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        match req.uri().path() {
            "/report" => {
                let report = self.controller.current_report().await;
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(Body::from(report))
            }
            "/status" => {
                let state = self.controller.snapshot().await;
                let summary = state.last_summary.as_ref();
                let body = serde_json::json!({
                    "phase": format!("{:?}", state.phase()),
                    "paused": state.paused,
                    "sweep_in_flight": state.sweep_in_flight,
                    "sweeps_completed": state.sweeps_completed,
                    "last_sweep_time": state.last_sweep_time,
                    "all_healthy": summary.map(|s| s.all_healthy),
                    "status": summary.map(|s| s.status_line()),
                    "failing": summary.map(|s| s.failing_names()).unwrap_or_default(),
                });
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
            }
            "/metrics" => match &self.metrics {
                Some(registry) => match registry.gather() {
                    Ok(metrics) => Response::builder()
                        .status(StatusCode::OK)
                        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                        .body(Body::from(metrics)),
                    Err(e) => {
                        tracing::error!("Failed to encode metrics: {}", e);
                        plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                    }
                },
                None => plain(StatusCode::NOT_FOUND, "Not Found"),
            },
            _ => plain(StatusCode::NOT_FOUND, "Not Found"),
        }
    }
}

fn plain(status: StatusCode, message: &'static str) -> Result<Response<Body>, hyper::http::Error> {
    Response::builder().status(status).body(Body::from(message))
}

impl Service<Request<Body>> for StatusHandler {
    type Response = Response<Body>;
    type Error = hyper::http::Error;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { handler.respond(req).await })
    }
}

// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::service::{make_service_fn, service_fn};
use hyper::{header, Body, Request, Response, Server, StatusCode};
use site_checker::health::HealthSummary;
use site_checker::notify::SweepObserver;
use site_checker::probe::{ProbeOutcome, Prober, Target};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

/// Tracks how many requests are open at once.
#[derive(Clone, Default)]
pub struct InFlight {
    current: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl InFlight {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

/// Local HTTP backend. Routes:
/// `/ok`, `/status/{code}`, `/delay/{ms}/{code}`, `/redirect`, `/broken`, `/hang`.
pub struct TestServer {
    pub addr: SocketAddr,
    pub in_flight: InFlight,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let in_flight = InFlight::default();
        let tracker = in_flight.clone();

        let make_service = make_service_fn(move |_| {
            let tracker = tracker.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let tracker = tracker.clone();
                    async move {
                        tracker.enter();
                        let response = route(req).await;
                        tracker.exit();
                        Ok::<_, Infallible>(response)
                    }
                }))
            }
        });

        let server = Server::bind(&([127, 0, 0, 1], 0).into()).serve(make_service);
        let addr = server.local_addr();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.with_graceful_shutdown(async {
            let _ = rx.await;
        }));

        Self {
            addr,
            in_flight,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serves the same routes over TLS with a freshly generated self-signed
/// certificate for `localhost` and `127.0.0.1`. `in_flight` only counts
/// requests that got past the handshake.
pub struct TlsTestServer {
    pub addr: SocketAddr,
    pub in_flight: InFlight,
    accept_task: tokio::task::JoinHandle<()>,
}

impl TlsTestServer {
    pub async fn start() -> Self {
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let params =
            rcgen::CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let server_cert = rustls::pki_types::CertificateDer::from(cert.der().to_vec());
        let server_key =
            rustls::pki_types::PrivateKeyDer::try_from(key_pair.serialize_der()).unwrap();
        let config = rustls::ServerConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![server_cert], server_key)
        .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let in_flight = InFlight::default();
        let tracker = in_flight.clone();

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    // A client that rejects the certificate aborts here.
                    let Ok(stream) = acceptor.accept(stream).await else {
                        return;
                    };
                    let service = service_fn(move |req| {
                        let tracker = tracker.clone();
                        async move {
                            tracker.enter();
                            let response = route(req).await;
                            tracker.exit();
                            Ok::<_, Infallible>(response)
                        }
                    });
                    let _ = hyper::server::conn::Http::new()
                        .serve_connection(stream, service)
                        .await;
                });
            }
        });

        Self {
            addr,
            in_flight,
            accept_task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://{}{}", self.addr, path)
    }
}

impl Drop for TlsTestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn route(req: Request<Body>) -> Response<Body> {
    let segments: Vec<&str> = req.uri().path().trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        ["ok"] => respond(200, "OK"),
        ["status", code] => respond(code.parse().unwrap_or(500), "status"),
        ["delay", ms, code] => {
            sleep(Duration::from_millis(ms.parse().unwrap_or(0))).await;
            respond(code.parse().unwrap_or(500), "delayed")
        }
        ["redirect"] => Response::builder()
            .status(StatusCode::FOUND)
            .header(header::LOCATION, "/ok")
            .body(Body::empty())
            .unwrap(),
        ["broken"] => {
            let stream = futures::stream::unfold(0u8, |step| async move {
                match step {
                    0 => Some((Ok::<_, std::io::Error>(Bytes::from_static(b"partial")), 1)),
                    1 => {
                        sleep(Duration::from_millis(50)).await;
                        Some((
                            Err(std::io::Error::new(std::io::ErrorKind::Other, "stream aborted")),
                            2,
                        ))
                    }
                    _ => None,
                }
            });
            Response::builder()
                .status(StatusCode::OK)
                .body(Body::wrap_stream(stream))
                .unwrap()
        }
        ["hang"] => {
            sleep(Duration::from_secs(30)).await;
            respond(200, "late")
        }
        _ => respond(404, "Not Found"),
    }
}

fn respond(code: u16, body: &'static str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .body(Body::from(body))
        .unwrap()
}

pub fn target(name: &str, url: impl Into<String>) -> Target {
    Target::new(name, url, Duration::from_secs(5))
}

/// Prober that answers from a script instead of the network. Targets named
/// `panic` make the probe task panic.
pub struct ScriptedProber {
    pub delay: Duration,
    pub in_flight: InFlight,
}

impl ScriptedProber {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: InFlight::default(),
        }
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, target: &Target) -> ProbeOutcome {
        if target.name == "panic" {
            panic!("scripted probe panic");
        }

        self.in_flight.enter();
        sleep(self.delay).await;
        self.in_flight.exit();

        let status = target
            .url
            .rsplit('/')
            .next()
            .and_then(|code| code.parse().ok())
            .unwrap_or(200);
        ProbeOutcome::from_status(target.clone(), status, self.delay)
    }
}

/// Records every summary and whether two callbacks ever overlapped.
#[derive(Default)]
pub struct RecordingObserver {
    pub summaries: Mutex<Vec<HealthSummary>>,
    busy: AtomicBool,
    pub overlaps: AtomicUsize,
}

impl RecordingObserver {
    pub fn count(&self) -> usize {
        self.summaries.lock().unwrap().len()
    }
}

#[async_trait]
impl SweepObserver for RecordingObserver {
    async fn on_sweep_complete(&self, summary: &HealthSummary) {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        sleep(Duration::from_millis(5)).await;
        self.summaries.lock().unwrap().push(summary.clone());
        self.busy.store(false, Ordering::SeqCst);
    }
}

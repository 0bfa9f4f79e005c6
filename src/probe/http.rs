// src/probe/http.rs
use super::outcome::{ProbeError, ProbeOutcome, Target};
use async_trait::async_trait;
use reqwest::{redirect, Client, Response};
use std::time::Instant;
use tracing::debug;
use url::Url;

/// Identifies the checker to the probed endpoints.
pub const DEFAULT_USER_AGENT: &str = "SiteChecker/1.0";

/// Upper bound on body bytes read to confirm the connection is live.
pub const BODY_READ_LIMIT: usize = 4096;

const MAX_REDIRECTS: usize = 10;

/// Executes a single health probe. Implementations must never panic or
/// return early without an outcome: every failure is folded into the
/// returned `ProbeOutcome`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target) -> ProbeOutcome;
}

pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Certificate verification stays at reqwest's default (enforced).
    pub fn new(user_agent: &str, follow_redirects: bool) -> reqwest::Result<Self> {
        let policy = if follow_redirects {
            redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(policy)
            .build()?;

        Ok(Self { client })
    }

    fn parse_url(raw: &str) -> Result<Url, ProbeError> {
        let url = Url::parse(raw).map_err(|e| ProbeError::RequestConstruction(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ProbeError::RequestConstruction(format!(
                "unsupported URL scheme '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: &Target) -> ProbeOutcome {
        let start = Instant::now();

        let request = Self::parse_url(&target.url).and_then(|url| {
            self.client
                .get(url)
                .timeout(target.timeout)
                .build()
                .map_err(|e| ProbeError::RequestConstruction(e.to_string()))
        });
        let request = match request {
            Ok(request) => request,
            Err(error) => {
                debug!(site = %target.name, %error, "probe request rejected");
                return ProbeOutcome::from_error(target.clone(), error, 0, start.elapsed());
            }
        };

        let mut response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_builder() {
                    ProbeError::RequestConstruction(e.to_string())
                } else if e.is_timeout() {
                    ProbeError::Connection(format!("timed out after {:?}", target.timeout))
                } else {
                    ProbeError::Connection(e.to_string())
                };
                debug!(site = %target.name, %error, "probe failed");
                return ProbeOutcome::from_error(target.clone(), error, 0, start.elapsed());
            }
        };

        let status = response.status();
        let read = drain_body(&mut response, BODY_READ_LIMIT).await;
        // Release the connection whether or not the read succeeded.
        drop(response);
        let elapsed = start.elapsed();

        if let Err(e) = read {
            let error = ProbeError::ResponseRead(e.to_string());
            debug!(site = %target.name, status = status.as_u16(), %error, "probe body read failed");
            return ProbeOutcome::from_error(target.clone(), error, status.as_u16(), elapsed);
        }

        debug!(
            site = %target.name,
            status = status.as_u16(),
            reason = status.canonical_reason().unwrap_or(""),
            ?elapsed,
            "probe complete"
        );

        ProbeOutcome::from_status(target.clone(), status.as_u16(), elapsed)
    }
}

/// Reads at most `limit` bytes (rounded up to the chunk that crosses it).
/// A clean end of stream before the limit is not an error.
async fn drain_body(response: &mut Response, limit: usize) -> reqwest::Result<usize> {
    let mut read = 0;
    while read < limit {
        match response.chunk().await? {
            Some(chunk) => read += chunk.len(),
            None => break,
        }
    }
    Ok(read)
}

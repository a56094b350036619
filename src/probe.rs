// File: probe.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::ConfigParameter;
use crate::error::ScanError;
use crate::getstate::ProbeStats;
use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use log::{debug, trace, warn};
use reqwest::header::{HeaderMap, SET_COOKIE};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Get,
    Post,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Get => "GET",
            ProbeMethod::Post => "POST",
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeBody {
    Empty,
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

/// One outbound HTTP exchange, fully described before it is sent.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: ProbeMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: ProbeBody,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub follow_redirects: bool,
}

impl ProbeRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: ProbeMethod::Get,
            url: url.into(),
            query: Vec::new(),
            body: ProbeBody::Empty,
            headers: Vec::new(),
            timeout,
            follow_redirects: true,
        }
    }

    pub fn post(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: ProbeMethod::Post,
            ..Self::get(url, timeout)
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_form(mut self, form: Vec<(String, String)>) -> Self {
        self.body = ProbeBody::Form(form);
        self
    }

    pub fn with_json(mut self, value: serde_json::Value) -> Self {
        self.body = ProbeBody::Json(value);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// The URL with its query string, as it would appear on the wire.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        match reqwest::Url::parse(&self.url) {
            Ok(mut url) => {
                url.query_pairs_mut().extend_pairs(self.query.iter());
                url.to_string()
            }
            Err(_) => self.url.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeResponse {
    url: String,
    status: u16,
    headers: HeaderMap,
    body: String,
    elapsed: Duration,
}

impl ProbeResponse {
    pub fn new(url: String, status: u16, headers: HeaderMap, body: String, elapsed: Duration) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            elapsed,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Connect,
    Body,
    Other,
}

#[derive(Debug, Clone)]
pub struct ProbeFailure {
    pub kind: FailureKind,
    pub message: String,
    pub elapsed: Duration,
}

impl ProbeFailure {
    fn from_reqwest(error: &reqwest::Error, elapsed: Duration) -> Self {
        let kind = if error.is_timeout() {
            FailureKind::Timeout
        } else if error.is_connect() {
            FailureKind::Connect
        } else if error.is_body() || error.is_decode() {
            FailureKind::Body
        } else {
            FailureKind::Other
        };
        Self {
            kind,
            message: error.to_string(),
            elapsed,
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Completed(ProbeResponse),
    Failed(ProbeFailure),
}

impl ProbeOutcome {
    pub fn response(&self) -> Option<&ProbeResponse> {
        match self {
            ProbeOutcome::Completed(response) => Some(response),
            ProbeOutcome::Failed(_) => None,
        }
    }

    pub fn into_response(self) -> Option<ProbeResponse> {
        match self {
            ProbeOutcome::Completed(response) => Some(response),
            ProbeOutcome::Failed(_) => None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            ProbeOutcome::Completed(response) => response.elapsed(),
            ProbeOutcome::Failed(failure) => failure.elapsed,
        }
    }
}

/// Sends probes. Implementations never panic or error past this boundary:
/// every transport problem comes back as `ProbeOutcome::Failed`.
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    async fn execute(&self, request: &ProbeRequest) -> ProbeOutcome;

    /// A fresh executor with its own cookie jar, for scans that need
    /// session continuity. Dropped by the caller when the scan ends.
    fn session(&self) -> Result<Box<dyn ProbeExecutor>, ScanError>;
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct HttpProbeExecutor {
    client: reqwest::Client,
    no_redirect_client: reqwest::Client,
    rate_limiter: Option<Arc<DirectLimiter>>,
    stats: Arc<ProbeStats>,
    user_agent: String,
}

impl HttpProbeExecutor {
    pub fn new(config: &ConfigParameter) -> Result<Self, ScanError> {
        let (client, no_redirect_client) = Self::build_clients(config.user_agent(), false)?;
        let rate_limiter = config
            .rate_limit()
            .and_then(NonZeroU32::new)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));

        Ok(Self {
            client,
            no_redirect_client,
            rate_limiter,
            stats: Arc::new(ProbeStats::new()),
            user_agent: config.user_agent().to_string(),
        })
    }

    fn build_clients(
        user_agent: &str,
        cookie_store: bool,
    ) -> Result<(reqwest::Client, reqwest::Client), ScanError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(true)
            .cookie_store(cookie_store)
            .build()?;
        let no_redirect_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .cookie_store(cookie_store)
            .build()?;
        Ok((client, no_redirect_client))
    }

    pub fn stats(&self) -> Arc<ProbeStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl ProbeExecutor for HttpProbeExecutor {
    async fn execute(&self, request: &ProbeRequest) -> ProbeOutcome {
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.until_ready().await;
        }

        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };
        let method = match request.method {
            ProbeMethod::Get => reqwest::Method::GET,
            ProbeMethod::Post => reqwest::Method::POST,
        };

        let mut builder = client.request(method, &request.url).timeout(request.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            ProbeBody::Empty => builder,
            ProbeBody::Form(form) => builder.form(form),
            ProbeBody::Json(value) => builder.json(value),
        };

        trace!("Probe {} {} (timeout={:?})", request.method, request.full_url(), request.timeout);
        let start = Instant::now();

        match builder.send().await {
            Ok(resp) => {
                let url = resp.url().to_string();
                let status = resp.status().as_u16();
                let headers = resp.headers().clone();
                match resp.text().await {
                    Ok(body) => {
                        self.stats.add_completed();
                        let elapsed = start.elapsed();
                        debug!("{} {} -> {} in {:?}", request.method, url, status, elapsed);
                        ProbeOutcome::Completed(ProbeResponse::new(url, status, headers, body, elapsed))
                    }
                    Err(e) => {
                        self.stats.add_failure();
                        warn!("Failed to read body from {}: {}", url, e);
                        ProbeOutcome::Failed(ProbeFailure::from_reqwest(&e, start.elapsed()))
                    }
                }
            }
            Err(e) => {
                self.stats.add_failure();
                warn!("Probe {} {} failed: {}", request.method, request.url, e);
                ProbeOutcome::Failed(ProbeFailure::from_reqwest(&e, start.elapsed()))
            }
        }
    }

    fn session(&self) -> Result<Box<dyn ProbeExecutor>, ScanError> {
        let (client, no_redirect_client) = Self::build_clients(&self.user_agent, true)?;
        Ok(Box::new(HttpProbeExecutor {
            client,
            no_redirect_client,
            rate_limiter: self.rate_limiter.clone(),
            stats: Arc::clone(&self.stats),
            user_agent: self.user_agent.clone(),
        }))
    }
}

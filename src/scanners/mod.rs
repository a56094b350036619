// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

pub mod auth_failures;
pub mod broken_access;
pub mod command_injection;
pub mod crypto_failures;
pub mod csrf;
pub mod dependencies;
pub mod directory_enum;
pub mod logging_monitor;
pub mod nosql_injection;
pub mod security_misconfig;
pub mod sql_injection;
pub mod ssrf;
pub mod xss;

use crate::config::{Effective, ScanOptions};
use crate::probe::{ProbeExecutor, ProbeOutcome, ProbeRequest, ProbeResponse};
use crate::result::{Finding, TimeBasedResult, VulnClass};
use crate::signatures::SignatureMatcher;
use crate::target::{substitute, InjectionPoints, Target};
use crate::vulndb::VulnerabilitySource;
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

/// Everything one class scan may read. Nothing in here is mutated.
pub struct ScanContext<'a> {
    pub executor: &'a dyn ProbeExecutor,
    pub target: &'a Target,
    pub settings: &'a Effective,
    pub options: &'a ScanOptions,
    pub vuln_source: &'a dyn VulnerabilitySource,
}

impl<'a> ScanContext<'a> {
    pub fn get(&self, url: impl Into<String>) -> ProbeRequest {
        ProbeRequest::get(url, self.settings.timeout)
    }

    pub fn post(&self, url: impl Into<String>) -> ProbeRequest {
        ProbeRequest::post(url, self.settings.timeout)
    }

    /// Sends one probe; transport failures are logged and yield `None`.
    pub async fn send(&self, request: &ProbeRequest) -> Option<ProbeResponse> {
        match self.executor.execute(request).await {
            ProbeOutcome::Completed(response) => Some(response),
            ProbeOutcome::Failed(failure) => {
                warn!("Skipping probe {} {}: {}", request.method, request.full_url(), failure);
                None
            }
        }
    }
}

/// Raw scanner output before aggregation.
#[derive(Debug, Default)]
pub struct ClassReport {
    pub findings: Vec<Finding>,
    pub time_based: Option<TimeBasedResult>,
}

impl ClassReport {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            time_based: None,
        }
    }

    pub fn with_time_based(mut self, time_based: TimeBasedResult) -> Self {
        self.time_based = Some(time_based);
        self
    }
}

#[async_trait]
pub trait Scanner: Send + Sync {
    fn class(&self) -> VulnClass;

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport;
}

pub fn for_class(class: VulnClass) -> Box<dyn Scanner> {
    match class {
        VulnClass::SqlInjection => Box::new(sql_injection::SqlInjection),
        VulnClass::Xss => Box::new(xss::Xss),
        VulnClass::CommandInjection => Box::new(command_injection::CommandInjection),
        VulnClass::NosqlInjection => Box::new(nosql_injection::NosqlInjection),
        VulnClass::Csrf => Box::new(csrf::Csrf),
        VulnClass::DirectoryEnum => Box::new(directory_enum::DirectoryEnum),
        VulnClass::BrokenAccess => Box::new(broken_access::BrokenAccess),
        VulnClass::CryptoFailures => Box::new(crypto_failures::CryptoFailures),
        VulnClass::SecurityMisconfig => Box::new(security_misconfig::SecurityMisconfig),
        VulnClass::VulnerableDependencies => Box::new(dependencies::Dependencies),
        VulnClass::AuthFailures => Box::new(auth_failures::AuthFailures),
        VulnClass::LoggingMonitoring => Box::new(logging_monitor::LoggingMonitor),
        VulnClass::Ssrf => Box::new(ssrf::Ssrf),
    }
}

/// Classifies one reflected-parameter probe.
pub(crate) type Classifier = fn(param: &str, payload: &str, response: &ProbeResponse) -> Finding;

/// The shared query-parameter loop: every injection point against the first
/// `max_tests` payloads, one GET each.
pub(crate) async fn probe_parameters<'p>(
    ctx: &ScanContext<'_>,
    points: &InjectionPoints,
    payloads: impl Iterator<Item = &'p str> + Clone,
    classify: Classifier,
) -> Vec<Finding> {
    let base_url = ctx.target.base_url();
    let mut findings = Vec::new();

    for param in points.keys() {
        for payload in payloads.clone().take(ctx.settings.max_tests) {
            let request = ctx.get(&base_url).with_query(substitute(points, param, payload));
            if let Some(response) = ctx.send(&request).await {
                let finding = classify(param, payload, &response)
                    .with_payload(payload)
                    .with_method(request.method.as_str())
                    .with_status(response.status());
                debug!("{}={:?} -> vulnerable={}", param, payload, finding.vulnerable);
                findings.push(finding);
            }
        }
    }

    findings
}

/// Classifies purely on elapsed time against the configured threshold.
pub(crate) fn classify_delay(payload: &str, outcome: &ProbeOutcome, threshold: Duration, evidence: &str) -> TimeBasedResult {
    match outcome {
        ProbeOutcome::Completed(response) if response.elapsed() > threshold => TimeBasedResult {
            payload: payload.to_string(),
            vulnerable: true,
            evidence: Some(format!("{} ({} ms)", evidence, response.elapsed().as_millis())),
            note: None,
        },
        ProbeOutcome::Completed(_) => TimeBasedResult {
            payload: payload.to_string(),
            vulnerable: false,
            evidence: None,
            note: None,
        },
        ProbeOutcome::Failed(failure) => TimeBasedResult {
            payload: payload.to_string(),
            vulnerable: false,
            evidence: None,
            note: Some(format!("Request failed: {}", failure.message)),
        },
    }
}

/// One GET with `payload` in the first injection point, under the longer
/// time-based timeout.
pub(crate) async fn time_based_parameter(
    ctx: &ScanContext<'_>,
    points: &InjectionPoints,
    payload: &str,
    evidence: &str,
) -> Option<TimeBasedResult> {
    let param = points.keys().next()?;
    let request = ProbeRequest::get(ctx.target.base_url(), ctx.settings.time_based_timeout)
        .with_query(substitute(points, param, payload));
    let outcome = ctx.executor.execute(&request).await;
    Some(classify_delay(payload, &outcome, ctx.settings.time_threshold, evidence))
}

/// Signature hits as a comma-separated evidence string, or `None`.
pub(crate) fn describe_hits(matcher: &SignatureMatcher, body: &str, echoed: &str) -> Option<String> {
    let hits = matcher.find_hits_excluding(body, echoed);
    if hits.is_empty() {
        return None;
    }
    let patterns: Vec<&str> = hits.iter().map(|h| h.pattern).collect();
    Some(patterns.join(", "))
}

/// True when two bodies differ by more than a trivial amount: another
/// status, a length change above 5%, or for equal lengths more than 5% of
/// bytes changed. Equal-length bodies under 64 bytes count any change.
pub(crate) fn differs_from_baseline(baseline: &ProbeResponse, response: &ProbeResponse) -> bool {
    if baseline.status() != response.status() {
        return true;
    }
    let (a, b) = (baseline.body().len(), response.body().len());
    let larger = a.max(b) as f64;
    if larger == 0.0 {
        return false;
    }
    if a != b {
        return (a as f64 - b as f64).abs() / larger > 0.05;
    }
    let changed = baseline
        .body()
        .bytes()
        .zip(response.body().bytes())
        .filter(|(x, y)| x != y)
        .count();
    changed > 0 && (larger < 64.0 || changed as f64 / larger > 0.05)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::ConfigParameter;
    use crate::vulndb::VulnTable;

    /// Runs one scanner against a test executor.
    pub async fn run_scanner(
        scanner: &dyn Scanner,
        executor: &dyn ProbeExecutor,
        url: &str,
        options: ScanOptions,
    ) -> ClassReport {
        let target = Target::parse(url).unwrap();
        let settings = Effective::resolve(&ConfigParameter::new(), &options);
        let vuln_source = VulnTable::builtin();
        let ctx = ScanContext {
            executor,
            target: &target,
            settings: &settings,
            options: &options,
            vuln_source: &vuln_source,
        };
        scanner.run(&ctx).await
    }

    /// Value of `name` in the probe's query, if present.
    pub fn query_value<'r>(request: &'r ProbeRequest, name: &str) -> Option<&'r str> {
        request
            .query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

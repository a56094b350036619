// File: ssrf.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{classify_delay, differs_from_baseline, ClassReport, ScanContext, Scanner};
use crate::payloads::{is_metadata_payload, SSRF_PAYLOADS, SSRF_TIME_BASED};
use crate::probe::{FailureKind, ProbeOutcome, ProbeRequest, ProbeResponse};
use crate::result::{Finding, Severity, TimeBasedResult, VulnClass};
use crate::signatures::SSRF_INDICATORS;
use crate::target::{substitute, InjectionPoints};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Url;

const DEFAULT_PARAM: (&str, &str) = ("url", "https://example.com/");
const CLOUD_PLATFORMS: &[&str] = &["aws", "azure", "gcp"];

pub struct Ssrf;

fn payload_host(payload: &str) -> String {
    Url::parse(payload)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| payload.to_string())
}

/// Platform indicators present in `response` but neither in the payload
/// itself nor in the baseline page.
fn platform_hits(payload: &str, response: &ProbeResponse, baseline: Option<&ProbeResponse>) -> Vec<(&'static str, &'static str)> {
    let already = baseline.map(|b| b.body().to_lowercase()).unwrap_or_default();
    SSRF_INDICATORS
        .find_hits_excluding(response.body(), payload)
        .into_iter()
        .filter(|hit| !already.contains(hit.pattern))
        .map(|hit| (hit.name, hit.pattern))
        .collect()
}

pub fn classify(param: &str, payload: &str, response: &ProbeResponse, baseline: Option<&ProbeResponse>) -> Finding {
    let hits = platform_hits(payload, response, baseline);
    if !hits.is_empty() {
        let mut platforms: Vec<&str> = hits.iter().map(|(name, _)| *name).collect();
        platforms.sort_unstable();
        platforms.dedup();
        let severity = if platforms.iter().any(|p| CLOUD_PLATFORMS.contains(p)) {
            Severity::Critical
        } else {
            Severity::High
        };
        let patterns: Vec<&str> = hits.iter().map(|(_, pattern)| *pattern).collect();
        return Finding::vulnerable(
            param,
            severity,
            format!("Possible SSRF: {} indicators ({})", platforms.join("/"), patterns.join(", ")),
        );
    }

    if response.is_redirect() {
        if let Some(location) = response.location() {
            let host = payload_host(payload);
            return if location.contains(&host) {
                Finding::vulnerable(param, Severity::Medium, format!("Redirects to internal destination {}", location))
            } else {
                Finding::vulnerable(param, Severity::Low, format!("Redirects to {}", location))
            };
        }
    }

    if response.status() == 403 && is_metadata_payload(payload) {
        return Finding::vulnerable(param, Severity::Low, "Metadata endpoint request blocked (403)");
    }

    if response.status() == 200 {
        match baseline {
            Some(baseline) if differs_from_baseline(baseline, response) => {
                return Finding::vulnerable(param, Severity::Low, "Response differs from baseline for internal URL")
            }
            Some(_) => {}
            None => {
                return Finding::vulnerable(param, Severity::Low, "Internal URL accepted (no baseline available)")
            }
        }
    }

    Finding::clean(param, "No sign of server-side fetch")
}

/// A timeout past the threshold counts: the server hung on the unroutable address.
fn classify_time_based(outcome: &ProbeOutcome, ctx: &ScanContext<'_>) -> TimeBasedResult {
    match outcome {
        ProbeOutcome::Failed(failure)
            if failure.kind == FailureKind::Timeout && failure.elapsed > ctx.settings.time_threshold =>
        {
            TimeBasedResult {
                payload: SSRF_TIME_BASED.to_string(),
                vulnerable: true,
                evidence: Some(format!(
                    "Request to unroutable address timed out after {} ms",
                    failure.elapsed.as_millis()
                )),
                note: None,
            }
        }
        _ => classify_delay(
            SSRF_TIME_BASED,
            outcome,
            ctx.settings.time_threshold,
            "Significant response delay fetching unroutable address",
        ),
    }
}

impl Ssrf {
    fn request(&self, ctx: &ScanContext<'_>, points: &InjectionPoints, param: &str, value: &str) -> ProbeRequest {
        ctx.get(ctx.target.base_url())
            .with_query(substitute(points, param, value))
            .without_redirects()
    }
}

#[async_trait]
impl Scanner for Ssrf {
    fn class(&self) -> VulnClass {
        VulnClass::Ssrf
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let points = ctx.target.resolve(DEFAULT_PARAM, &ctx.settings.extra_params);
        info!("Testing {} parameters of {} for SSRF", points.len(), ctx.target.as_str());
        let mut findings = Vec::new();

        for (param, values) in &points {
            let original = values.first().map(String::as_str).unwrap_or(DEFAULT_PARAM.1);
            let baseline = ctx.send(&self.request(ctx, &points, param, original)).await;

            for payload in SSRF_PAYLOADS.iter().take(ctx.settings.max_tests) {
                let Some(response) = ctx.send(&self.request(ctx, &points, param, payload)).await else {
                    continue;
                };
                let finding = classify(param, payload, &response, baseline.as_ref())
                    .with_payload(payload)
                    .with_method("GET")
                    .with_status(response.status());
                debug!("{}={} -> vulnerable={}", param, payload, finding.vulnerable);
                findings.push(finding);
            }
        }

        let report = ClassReport::new(findings);
        let Some(first) = points.keys().next() else {
            return report;
        };
        let request = ProbeRequest::get(ctx.target.base_url(), ctx.settings.time_based_timeout)
            .with_query(substitute(&points, first, SSRF_TIME_BASED))
            .without_redirects();
        let outcome = ctx.executor.execute(&request).await;
        report.with_time_based(classify_time_based(&outcome, ctx))
    }
}

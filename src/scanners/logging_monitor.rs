// File: logging_monitor.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{ClassReport, ScanContext, Scanner};
use crate::payloads::NONEXISTENT_PATH;
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::ERROR_DISCLOSURE;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

const REPORTING_HEADERS: &[&str] = &["Report-To", "Reporting-Endpoints", "NEL"];

pub struct LoggingMonitor;

fn reports_violations(response: &ProbeResponse) -> bool {
    REPORTING_HEADERS.iter().any(|h| response.has_header(h))
        || response
            .header("content-security-policy")
            .is_some_and(|csp| csp.contains("report-uri") || csp.contains("report-to"))
}

/// Error text and 5xx status in any response.
fn error_findings(url: &str, response: &ProbeResponse) -> Vec<Finding> {
    let mut findings: Vec<Finding> = ERROR_DISCLOSURE
        .find_hits(response.body())
        .into_iter()
        .map(|hit| {
            Finding::vulnerable(
                url,
                Severity::Medium,
                format!("Exposed sensitive error message: {}", hit.pattern),
            )
        })
        .collect();
    if response.status() == 500 {
        findings.push(Finding::vulnerable(url, Severity::Medium, "Server error (HTTP 500) returned to client"));
    }
    findings
}

pub fn page_findings(url: &str, page: &ProbeResponse) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !page.has_header("x-content-type-options") {
        findings.push(Finding::vulnerable(
            url,
            Severity::Low,
            "Missing security header: X-Content-Type-Options",
        ));
    }
    if !reports_violations(page) {
        findings.push(Finding::vulnerable(url, Severity::Low, "No security violation reporting configured"));
    }
    findings.extend(error_findings(url, page));
    findings
}

/// Judges the answer to a request for a path that cannot exist.
pub fn missing_path_findings(url: &str, response: &ProbeResponse, slow_threshold: Duration) -> Vec<Finding> {
    let mut findings = Vec::new();
    if response.elapsed() > slow_threshold {
        findings.push(Finding::vulnerable(
            url,
            Severity::Low,
            format!("Slow response to nonexistent path ({} ms)", response.elapsed().as_millis()),
        ));
    }
    if response.status() == 200 {
        findings.push(Finding::vulnerable(
            url,
            Severity::Low,
            "Nonexistent path answered with 200 (soft 404)",
        ));
    }
    findings.extend(error_findings(url, response));
    findings
        .into_iter()
        .map(|f| f.with_payload(NONEXISTENT_PATH).with_status(response.status()))
        .collect()
}

#[async_trait]
impl Scanner for LoggingMonitor {
    fn class(&self) -> VulnClass {
        VulnClass::LoggingMonitoring
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let url = ctx.target.as_str();
        let mut findings = Vec::new();

        match ctx.send(&ctx.get(url)).await {
            Some(page) => findings.extend(page_findings(url, &page)),
            None => findings.push(Finding::incomplete(url, "Logging check incomplete: failed to fetch page")),
        }

        let missing = ctx.target.join_path(NONEXISTENT_PATH);
        if let Some(response) = ctx.send(&ctx.get(&missing)).await {
            debug!("{} -> {} in {:?}", missing, response.status(), response.elapsed());
            findings.extend(missing_path_findings(&missing, &response, ctx.settings.slow_response_threshold));
        }

        ClassReport::new(findings)
    }
}

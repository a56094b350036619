// File: broken_access.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{classify_delay, differs_from_baseline, ClassReport, ScanContext, Scanner};
use crate::payloads::{ACCESS_TIME_BASED, FORCED_BROWSING_PATHS, IDOR_TESTS};
use crate::probe::{ProbeRequest, ProbeResponse};
use crate::result::{Finding, Severity, TimeBasedResult, VulnClass};
use crate::signatures::ACCESS_INDICATORS;
use async_trait::async_trait;

const IDOR_CONTROL_VALUE: &str = "0";

pub struct BrokenAccess;

fn classify_forced(url: &str, response: &ProbeResponse) -> Option<Finding> {
    let finding = match response.status() {
        200 => {
            let indicators = ACCESS_INDICATORS.find_matches(response.body());
            if indicators.is_empty() {
                Finding::clean(url, "Accessible, no privileged content markers")
            } else {
                Finding::vulnerable(
                    url,
                    Severity::High,
                    format!("Potential forced browsing: {}", indicators.join(", ")),
                )
            }
        }
        401 | 403 => Finding::clean(url, "protected"),
        300..=399 => Finding::clean(
            url,
            format!("Redirects to {}", response.location().unwrap_or("(no Location header)")),
        ),
        _ => return None,
    };
    Some(finding.with_status(response.status()))
}

fn classify_idor(param: &str, response: &ProbeResponse, baseline: Option<&ProbeResponse>) -> Finding {
    if response.status() != 200 || response.body().to_lowercase().contains("error") {
        return Finding::clean(param, format!("Object reference rejected (status {})", response.status()));
    }
    match baseline {
        Some(baseline) if differs_from_baseline(baseline, response) => Finding::vulnerable(
            param,
            Severity::Medium,
            "Potential IDOR vulnerability: object returned for guessed identifier",
        ),
        Some(_) => Finding::clean(param, "Response identical to control identifier"),
        None => Finding::vulnerable(param, Severity::Low, "Potential IDOR vulnerability (no baseline available)"),
    }
}

fn with_param(ctx: &ScanContext<'_>, name: &str, value: &str) -> ProbeRequest {
    let mut query: Vec<(String, String)> = ctx.target.query_pairs().into_iter().filter(|(k, _)| k != name).collect();
    query.push((name.to_string(), value.to_string()));
    ctx.get(ctx.target.base_url()).with_query(query).without_redirects()
}

async fn time_based(ctx: &ScanContext<'_>) -> TimeBasedResult {
    let (path, query) = ACCESS_TIME_BASED.split_once('?').unwrap_or((ACCESS_TIME_BASED, ""));
    let pairs: Vec<(String, String)> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let request = ProbeRequest::get(ctx.target.join_path(path), ctx.settings.time_based_timeout)
        .with_query(pairs)
        .without_redirects();
    let outcome = ctx.executor.execute(&request).await;
    classify_delay(
        ACCESS_TIME_BASED,
        &outcome,
        ctx.settings.time_threshold,
        "Significant response delay on admin endpoint",
    )
}

#[async_trait]
impl Scanner for BrokenAccess {
    fn class(&self) -> VulnClass {
        VulnClass::BrokenAccess
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let mut findings = Vec::new();

        for path in FORCED_BROWSING_PATHS.iter().take(ctx.settings.max_tests) {
            let url = ctx.target.join_path(path);
            let request = ctx.get(&url).without_redirects();
            if let Some(response) = ctx.send(&request).await {
                if let Some(finding) = classify_forced(&url, &response) {
                    findings.push(finding.with_payload(path).with_method("GET"));
                }
            }
        }

        for (param, value) in IDOR_TESTS.iter().take(ctx.settings.max_tests) {
            let baseline = ctx.send(&with_param(ctx, param, IDOR_CONTROL_VALUE)).await;
            let request = with_param(ctx, param, value);
            if let Some(response) = ctx.send(&request).await {
                let payload = format!("{}={}", param, value);
                findings.push(
                    classify_idor(param, &response, baseline.as_ref())
                        .with_payload(&payload)
                        .with_method("GET")
                        .with_status(response.status()),
                );
            }
        }

        ClassReport::new(findings).with_time_based(time_based(ctx).await)
    }
}

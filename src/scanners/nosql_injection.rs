// File: nosql_injection.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{classify_delay, describe_hits, differs_from_baseline, ClassReport, ScanContext, Scanner};
use crate::payloads::{NOSQL_BASELINE, NOSQL_PAYLOADS, NOSQL_TIME_BASED};
use crate::probe::{ProbeMethod, ProbeRequest, ProbeResponse};
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::NOSQL_ERRORS;
use crate::target::{substitute, InjectionPoints};
use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};

pub struct NosqlInjection;

/// A JSON fragment when the payload parses, the raw string otherwise.
fn structured(payload: &str) -> Value {
    serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.to_string()))
}

fn json_body(points: &InjectionPoints, param: &str, value: Value) -> Value {
    let mut body = Map::new();
    for (name, values) in points {
        if name == param {
            body.insert(name.clone(), value.clone());
        } else if let Some(first) = values.first() {
            body.insert(name.clone(), Value::String(first.clone()));
        }
    }
    if !body.contains_key("password") {
        body.insert("password".to_string(), Value::String("test".to_string()));
    }
    Value::Object(body)
}

fn build(ctx: &ScanContext<'_>, method: ProbeMethod, points: &InjectionPoints, param: &str, payload: &str) -> ProbeRequest {
    match method {
        ProbeMethod::Get => ctx.get(ctx.target.base_url()).with_query(substitute(points, param, payload)),
        ProbeMethod::Post => ctx
            .post(ctx.target.base_url())
            .with_json(json_body(points, param, structured(payload))),
    }
}

fn classify(param: &str, payload: &str, response: &ProbeResponse, baseline: Option<&ProbeResponse>) -> Finding {
    if let Some(markers) = describe_hits(&NOSQL_ERRORS, response.body(), payload) {
        return Finding::vulnerable(param, Severity::High, format!("NoSQL error markers in response: {}", markers));
    }
    if response.status() != 200 {
        return Finding::clean(param, format!("Payload answered with status {}", response.status()));
    }
    match baseline {
        Some(baseline) if differs_from_baseline(baseline, response) => Finding::vulnerable(
            param,
            Severity::Medium,
            "Operator payload accepted with a response differing from the baseline",
        ),
        Some(_) => Finding::clean(param, "Response identical to baseline"),
        None => Finding::vulnerable(param, Severity::Low, "Operator payload accepted (no baseline available)"),
    }
}

#[async_trait]
impl Scanner for NosqlInjection {
    fn class(&self) -> VulnClass {
        VulnClass::NosqlInjection
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let points = ctx.target.resolve(("username", "admin"), &ctx.settings.extra_params);
        let mut findings = Vec::new();

        for param in points.keys() {
            for method in [ProbeMethod::Get, ProbeMethod::Post] {
                let baseline = ctx.send(&build(ctx, method, &points, param, NOSQL_BASELINE)).await;
                if baseline.is_none() {
                    debug!("No {} baseline for {}, falling back to status-only rule", method, param);
                }

                for payload in NOSQL_PAYLOADS.iter().take(ctx.settings.max_tests) {
                    let request = build(ctx, method, &points, param, payload);
                    if let Some(response) = ctx.send(&request).await {
                        findings.push(
                            classify(param, payload, &response, baseline.as_ref())
                                .with_payload(payload)
                                .with_method(method.as_str())
                                .with_status(response.status()),
                        );
                    }
                }
            }
        }

        let mut report = ClassReport::new(findings);
        if let Some(param) = points.keys().next() {
            let request = ProbeRequest::post(ctx.target.base_url(), ctx.settings.time_based_timeout)
                .with_json(json_body(&points, param, structured(NOSQL_TIME_BASED)));
            let outcome = ctx.executor.execute(&request).await;
            report = report.with_time_based(classify_delay(
                NOSQL_TIME_BASED,
                &outcome,
                ctx.settings.time_threshold,
                "Significant response delay (possible $where injection)",
            ));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanOptions;
    use crate::probe::mock::*;
    use crate::probe::ProbeBody;
    use crate::scanners::testing::{query_value, run_scanner};
    use pretty_assertions::assert_eq;

    fn injected_value(request: &ProbeRequest) -> Option<String> {
        match &request.body {
            ProbeBody::Json(body) => body.get("username").map(|v| v.to_string()),
            _ => query_value(request, "username").map(str::to_string),
        }
    }

    #[test]
    fn test_payload_becomes_structured_value() {
        assert_eq!(structured(r#"{"$ne": ""}"#), serde_json::json!({"$ne": ""}));
        assert_eq!(structured("plain"), Value::String("plain".to_string()));
    }

    #[test]
    fn test_json_body_keeps_other_points() {
        let mut points = InjectionPoints::new();
        points.insert("username".to_string(), vec!["admin".to_string()]);
        points.insert("tenant".to_string(), vec!["acme".to_string()]);
        let body = json_body(&points, "username", serde_json::json!({"$gt": ""}));
        assert_eq!(
            body,
            serde_json::json!({"username": {"$gt": ""}, "tenant": "acme", "password": "test"})
        );
    }

    #[tokio::test]
    async fn test_identical_responses_are_clean() {
        let executor = ScriptedExecutor::new(|_| respond(200, "{\"ok\": false}"));
        let report = run_scanner(&NosqlInjection, &executor, "http://t.local/login", ScanOptions::default()).await;

        assert_eq!(report.findings.len(), NOSQL_PAYLOADS.len() * 2);
        assert!(report.findings.iter().all(|f| !f.vulnerable));
    }

    #[tokio::test]
    async fn test_response_differing_from_baseline_is_medium() {
        let executor = ScriptedExecutor::new(|request| {
            let value = injected_value(request).unwrap_or_default();
            if value.contains("$ne") {
                respond(200, "{\"users\": [{\"name\": \"admin\", \"email\": \"admin@t.local\"}]}")
            } else {
                respond(200, "{\"users\": []}")
            }
        });
        let report = run_scanner(&NosqlInjection, &executor, "http://t.local/login", ScanOptions::default()).await;

        let hits: Vec<_> = report.findings.iter().filter(|f| f.vulnerable).collect();
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|f| f.severity == Severity::Medium));
        assert!(hits.iter().any(|f| f.method.as_deref() == Some("POST")));
    }

    #[tokio::test]
    async fn test_mongo_error_is_high() {
        let executor = ScriptedExecutor::new(|_| respond(500, "MongoServerError: unknown operator: $gt"));
        let report = run_scanner(&NosqlInjection, &executor, "http://t.local/login", ScanOptions::default()).await;
        assert!(report.findings.iter().all(|f| f.vulnerable && f.severity == Severity::High));
    }

    #[tokio::test]
    async fn test_missing_baseline_falls_back_to_low() {
        let executor = ScriptedExecutor::new(|request| {
            if injected_value(request).unwrap_or_default().contains(NOSQL_BASELINE) {
                connection_refused()
            } else {
                respond(200, "ok")
            }
        });
        let report = run_scanner(&NosqlInjection, &executor, "http://t.local/login", ScanOptions::default()).await;
        assert!(report.findings.iter().all(|f| f.vulnerable && f.severity == Severity::Low));
    }

    #[tokio::test]
    async fn test_where_sleep_is_time_based() {
        let executor = ScriptedExecutor::new(|request| {
            if injected_value(request).unwrap_or_default().contains("$where") {
                respond_after(200, "ok", std::time::Duration::from_millis(4500))
            } else {
                respond(200, "ok")
            }
        });
        let report = run_scanner(&NosqlInjection, &executor, "http://t.local/login", ScanOptions::default()).await;
        assert!(report.time_based.unwrap().vulnerable);
    }
}

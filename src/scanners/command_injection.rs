// File: command_injection.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{describe_hits, probe_parameters, time_based_parameter, ClassReport, ScanContext, Scanner};
use crate::payloads::{command_payloads, COMMAND_TIME_BASED};
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::COMMAND_OUTPUT;
use async_trait::async_trait;

pub struct CommandInjection;

fn classify(param: &str, payload: &str, response: &ProbeResponse) -> Finding {
    match describe_hits(&COMMAND_OUTPUT, response.body(), payload) {
        Some(markers) => Finding::vulnerable(
            param,
            Severity::Critical,
            format!("Command output markers in response: {}", markers),
        ),
        None => Finding::clean(param, "No command output in response"),
    }
}

#[async_trait]
impl Scanner for CommandInjection {
    fn class(&self) -> VulnClass {
        VulnClass::CommandInjection
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let points = ctx.target.resolve(("input", "test"), &ctx.settings.extra_params);
        let findings = probe_parameters(ctx, &points, command_payloads(), classify).await;
        let time_based = time_based_parameter(
            ctx,
            &points,
            COMMAND_TIME_BASED,
            "Significant response delay (possible blind command injection)",
        )
        .await;

        ClassReport {
            findings,
            time_based,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanOptions;
    use crate::probe::mock::*;
    use crate::scanners::testing::{query_value, run_scanner};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_unix_and_windows_families_are_both_tried() {
        let executor = ScriptedExecutor::new(|_| respond(200, "ok"));
        let options = ScanOptions {
            max_tests: 20,
            ..ScanOptions::default()
        };
        let report = run_scanner(&CommandInjection, &executor, "http://t.local/ping", options).await;
        assert_eq!(report.findings.len(), 14);
        let payloads: Vec<_> = report.findings.iter().filter_map(|f| f.payload.clone()).collect();
        assert!(payloads.contains(&";id".to_string()));
        assert!(payloads.contains(&"& dir".to_string()));
    }

    #[tokio::test]
    async fn test_id_output_is_critical() {
        let executor = ScriptedExecutor::new(|request| match query_value(request, "input") {
            Some(";id") => respond(200, "uid=33(www-data) gid=33(www-data) groups=33(www-data)"),
            _ => respond(200, "pong"),
        });
        let report = run_scanner(&CommandInjection, &executor, "http://t.local/ping", ScanOptions::default()).await;
        let hit = report.findings.iter().find(|f| f.vulnerable).unwrap();
        assert_eq!(hit.severity, Severity::Critical);
        assert_eq!(hit.payload.as_deref(), Some(";id"));
    }

    #[tokio::test]
    async fn test_executed_echo_canary_is_critical() {
        let executor = ScriptedExecutor::new(|request| match query_value(request, "input") {
            Some(";echo VULN''_CANARY") => respond(200, "pinging test\nVULN_CANARY\n"),
            _ => respond(200, "pong"),
        });
        let report = run_scanner(&CommandInjection, &executor, "http://t.local/ping", ScanOptions::default()).await;

        let hits: Vec<_> = report.findings.iter().filter(|f| f.vulnerable).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::Critical);
        assert!(hits[0].evidence.contains("vuln_canary"));
    }

    #[tokio::test]
    async fn test_reflected_input_is_not_output() {
        let executor = ScriptedExecutor::new(|request| {
            let input = query_value(request, "input").unwrap_or_default();
            respond(200, &format!("You searched for: {}", input))
        });
        let options = ScanOptions {
            max_tests: 20,
            ..ScanOptions::default()
        };
        let report = run_scanner(&CommandInjection, &executor, "http://t.local/ping", options).await;
        assert!(report.findings.iter().all(|f| !f.vulnerable));
    }

    #[tokio::test]
    async fn test_sleep_payload_delay() {
        let executor = ScriptedExecutor::new(|request| {
            if query_value(request, "input") == Some(COMMAND_TIME_BASED) {
                respond_after(200, "pong", std::time::Duration::from_millis(5100))
            } else {
                respond(200, "pong")
            }
        });
        let report = run_scanner(&CommandInjection, &executor, "http://t.local/ping", ScanOptions::default()).await;
        assert!(report.time_based.unwrap().vulnerable);
    }
}

// File: xss.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{probe_parameters, ClassReport, ScanContext, Scanner};
use crate::payloads::XSS_PAYLOADS;
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::XSS_MARKERS;
use async_trait::async_trait;

/// Present in every payload and in no ordinary page.
const PAYLOAD_CORE: &str = "alert('xss')";

pub struct Xss;

fn classify(param: &str, payload: &str, response: &ProbeResponse) -> Finding {
    let body = response.body();
    if body.contains(payload) {
        return Finding::vulnerable(param, Severity::High, "Reflected script detected in response");
    }

    let lower = body.to_lowercase();
    if lower.contains(&payload.to_lowercase()) || lower.contains(PAYLOAD_CORE) {
        let markers = XSS_MARKERS.find_matches(body);
        let evidence = if markers.is_empty() {
            "Payload reflected in altered form".to_string()
        } else {
            format!("Payload reflected in altered form ({})", markers.join(", "))
        };
        return Finding::vulnerable(param, Severity::Medium, evidence);
    }

    Finding::clean(param, "Payload not reflected")
}

#[async_trait]
impl Scanner for Xss {
    fn class(&self) -> VulnClass {
        VulnClass::Xss
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let points = ctx.target.resolve(("q", "test"), &ctx.settings.extra_params);
        let findings = probe_parameters(ctx, &points, XSS_PAYLOADS.iter().copied(), classify).await;
        ClassReport::new(findings)
    }
}

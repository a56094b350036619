// File: csrf.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{ClassReport, ScanContext, Scanner};
use crate::html::{extract_forms, FormInfo};
use crate::payloads::CSRF_HEADERS;
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::CSRF_REJECTION;
use async_trait::async_trait;
use log::{debug, info};

pub struct Csrf;

fn cookie_name(set_cookie: &str) -> &str {
    set_cookie.split(';').next().and_then(|pair| pair.split('=').next()).unwrap_or("").trim()
}

fn form_findings(forms: &[FormInfo]) -> Vec<Finding> {
    forms
        .iter()
        .filter(|form| form.is_state_changing() && !form.has_csrf_token())
        .map(|form| {
            Finding::vulnerable(&form.action, Severity::Medium, "Missing CSRF token in form submission.")
                .with_method(&form.method)
        })
        .collect()
}

fn header_findings(response: &ProbeResponse, url: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    if !CSRF_HEADERS.iter().any(|header| response.has_header(header)) {
        findings.push(Finding::vulnerable(
            url,
            Severity::Low,
            "No CSRF protection headers found in HTTP response.",
        ));
    }

    for cookie in response.set_cookies() {
        if !cookie.to_lowercase().contains("samesite") {
            findings.push(Finding::vulnerable(
                url,
                Severity::Low,
                format!("Cookie '{}' set without SameSite attribute", cookie_name(cookie)),
            ));
        }
    }

    findings
}

#[async_trait]
impl Scanner for Csrf {
    fn class(&self) -> VulnClass {
        VulnClass::Csrf
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let url = ctx.target.as_str();
        info!("Scanning {} for CSRF vulnerabilities", url);

        let page = match ctx.send(&ctx.get(url)).await {
            Some(page) => page,
            None => return ClassReport::new(vec![Finding::incomplete(url, "Failed to fetch page")]),
        };
        if page.status() != 200 {
            return ClassReport::new(vec![Finding::incomplete(
                url,
                format!("Failed to fetch page. Status code: {}", page.status()),
            )]);
        }

        let forms = extract_forms(page.body(), page.url());
        debug!("Found {} forms on {}", forms.len(), url);

        let mut findings = form_findings(&forms);
        findings.extend(header_findings(&page, url));

        let protected = forms.iter().filter(|f| f.is_state_changing() && f.has_csrf_token());
        for form in protected.take(ctx.settings.max_tests) {
            let request = ctx.post(&form.action).with_form(form.fields_without_token());
            let Some(response) = ctx.send(&request).await else {
                continue;
            };
            let finding = if response.is_success() && !CSRF_REJECTION.is_match(response.body()) {
                Finding::vulnerable(&form.action, Severity::High, "Form submission accepted without its CSRF token")
            } else {
                Finding::clean(&form.action, "Submission without token rejected")
            };
            findings.push(finding.with_method("POST").with_status(response.status()));
        }

        ClassReport::new(findings)
    }
}

// File: security_misconfig.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{ClassReport, ScanContext, Scanner};
use crate::payloads::{ADMIN_PATHS, SECURITY_HEADERS, SENSITIVE_PATHS};
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::LISTING_AND_DEBUG;
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

const PROBE_ORIGIN: &str = "https://evil.securiscan.test";

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(\.\d+)+").expect("valid regex"));

pub struct SecurityMisconfig;

pub fn header_findings(url: &str, https: bool, response: &ProbeResponse) -> Vec<Finding> {
    let mut findings = Vec::new();

    for header in SECURITY_HEADERS {
        if response.has_header(header) {
            continue;
        }
        let severity = if *header == "Strict-Transport-Security" && https {
            Severity::Medium
        } else {
            Severity::Low
        };
        findings.push(Finding::vulnerable(url, severity, format!("Missing security header: {}", header)));
    }

    if let Some(xfo) = response.header("x-frame-options") {
        let value = xfo.trim().to_uppercase();
        if value != "DENY" && value != "SAMEORIGIN" {
            findings.push(Finding::vulnerable(url, Severity::Low, format!("Weak X-Frame-Options value: {}", xfo)));
        }
    }
    if let Some(xcto) = response.header("x-content-type-options") {
        if !xcto.trim().eq_ignore_ascii_case("nosniff") {
            findings.push(Finding::vulnerable(
                url,
                Severity::Low,
                format!("Weak X-Content-Type-Options value: {}", xcto),
            ));
        }
    }

    if response.header("access-control-allow-origin").map(str::trim) == Some("*") {
        findings.push(Finding::vulnerable(
            url,
            Severity::Medium,
            "Wildcard CORS policy: Access-Control-Allow-Origin: *",
        ));
    }

    for header in ["server", "x-powered-by"] {
        if let Some(value) = response.header(header) {
            if VERSION_PATTERN.is_match(value) {
                findings.push(Finding::vulnerable(
                    url,
                    Severity::Low,
                    format!("Version disclosure in {} header: {}", header, value),
                ));
            }
        }
    }

    findings
}

pub fn body_findings(url: &str, response: &ProbeResponse) -> Vec<Finding> {
    LISTING_AND_DEBUG
        .find_matches(response.body())
        .into_iter()
        .map(|marker| {
            let evidence = if marker == "directory listing" {
                "Directory listing enabled".to_string()
            } else {
                format!("Debug information exposed: {}", marker)
            };
            Finding::vulnerable(url, Severity::Medium, evidence)
        })
        .collect()
}

fn redirects_to_https(response: &ProbeResponse) -> bool {
    response.is_redirect() && response.location().is_some_and(|l| l.starts_with("https://"))
}

impl SecurityMisconfig {
    async fn check_cors_reflection(&self, ctx: &ScanContext<'_>) -> Option<Finding> {
        let url = ctx.target.as_str();
        let request = ctx.get(url).with_header("Origin", PROBE_ORIGIN);
        let response = ctx.send(&request).await?;
        if response.header("access-control-allow-origin") != Some(PROBE_ORIGIN) {
            return None;
        }
        let credentials = response
            .header("access-control-allow-credentials")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
        let evidence = if credentials {
            "Arbitrary Origin reflected in CORS policy with credentials allowed"
        } else {
            "Arbitrary Origin reflected in CORS policy"
        };
        Some(Finding::vulnerable(url, Severity::High, evidence).with_payload(PROBE_ORIGIN))
    }

    async fn check_https_redirect(&self, ctx: &ScanContext<'_>) -> Option<Finding> {
        let plain_url = if ctx.target.is_https() {
            ctx.target.with_scheme("http")?
        } else {
            ctx.target.as_str().to_string()
        };
        let response = ctx.send(&ctx.get(&plain_url).without_redirects()).await?;
        let finding = if redirects_to_https(&response) {
            Finding::clean(&plain_url, "HTTP redirects to HTTPS")
        } else {
            Finding::vulnerable(&plain_url, Severity::Medium, "No redirect from HTTP to HTTPS")
        };
        Some(finding.with_status(response.status()))
    }

    async fn check_exposed_paths(&self, ctx: &ScanContext<'_>) -> Vec<Finding> {
        let admin = ADMIN_PATHS
            .iter()
            .take(ctx.settings.max_tests)
            .map(|path| (*path, Severity::Medium, "Exposed admin panel"));
        let sensitive = SENSITIVE_PATHS.iter().take(ctx.settings.max_tests).map(|(path, critical)| {
            let severity = if *critical { Severity::High } else { Severity::Medium };
            (*path, severity, "Exposed sensitive file")
        });

        let mut findings = Vec::new();
        for (path, severity, evidence) in admin.chain(sensitive) {
            let url = ctx.target.join_path(path);
            let Some(response) = ctx.send(&ctx.get(&url).without_redirects()).await else {
                continue;
            };
            debug!("{} -> {}", url, response.status());
            if response.status() == 200 {
                findings.push(
                    Finding::vulnerable(&url, severity, evidence)
                        .with_payload(path)
                        .with_status(200),
                );
            }
        }
        findings
    }
}

#[async_trait]
impl Scanner for SecurityMisconfig {
    fn class(&self) -> VulnClass {
        VulnClass::SecurityMisconfig
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let url = ctx.target.as_str();
        let mut findings = Vec::new();

        match ctx.send(&ctx.get(url)).await {
            Some(page) => {
                findings.extend(header_findings(url, ctx.target.is_https(), &page));
                findings.extend(body_findings(url, &page));
            }
            None => findings.push(Finding::incomplete(url, "Header check incomplete: failed to fetch page")),
        }

        findings.extend(self.check_cors_reflection(ctx).await);
        findings.extend(self.check_https_redirect(ctx).await);
        findings.extend(self.check_exposed_paths(ctx).await);

        ClassReport::new(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanOptions;
    use crate::probe::mock::*;
    use crate::scanners::testing::run_scanner;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const HARDENED: &[(&str, &str)] = &[
        ("content-security-policy", "default-src 'self'"),
        ("x-frame-options", "DENY"),
        ("x-content-type-options", "nosniff"),
        ("strict-transport-security", "max-age=31536000"),
        ("referrer-policy", "no-referrer"),
    ];

    #[test]
    fn test_hardened_headers_produce_nothing() {
        let response = respond_with_headers(200, "ok", HARDENED, Duration::from_millis(1)).into_response().unwrap();
        assert!(header_findings("https://t.local/", true, &response).is_empty());
    }

    #[test]
    fn test_missing_and_weak_headers() {
        let response = respond_with_headers(
            200,
            "ok",
            &[
                ("x-frame-options", "ALLOWALL"),
                ("access-control-allow-origin", "*"),
                ("server", "Apache/2.4.41 (Ubuntu)"),
            ],
            Duration::from_millis(1),
        )
        .into_response()
        .unwrap();
        let findings = header_findings("https://t.local/", true, &response);
        let evidence: Vec<&str> = findings.iter().map(|f| f.evidence.as_str()).collect();

        assert!(evidence.contains(&"Missing security header: Content-Security-Policy"));
        assert!(!evidence.contains(&"Missing security header: X-Frame-Options"));
        assert!(evidence.contains(&"Weak X-Frame-Options value: ALLOWALL"));
        assert!(evidence.iter().any(|e| e.starts_with("Wildcard CORS")));
        assert!(evidence.iter().any(|e| e.starts_with("Version disclosure in server")));
        let hsts = findings.iter().find(|f| f.evidence.ends_with("Strict-Transport-Security")).unwrap();
        assert_eq!(hsts.severity, Severity::Medium);
    }

    #[test]
    fn test_directory_listing_marker() {
        let response = respond(200, "<html><title>Index of /files</title>").into_response().unwrap();
        let findings = body_findings("http://t.local/files/", &response);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].evidence, "Directory listing enabled");
    }

    #[tokio::test]
    async fn test_full_scan_against_misconfigured_host() {
        let executor = ScriptedExecutor::new(|request| {
            let url = request.url.as_str();
            let reflected = request.headers.iter().any(|(k, _)| k == "Origin");
            if url.ends_with("/.env") {
                respond(200, "DB_PASSWORD=x")
            } else if url.ends_with("/wp-admin") {
                respond(200, "login")
            } else if url == "http://t.local/" && reflected {
                respond_with_headers(
                    200,
                    "ok",
                    &[
                        ("access-control-allow-origin", PROBE_ORIGIN),
                        ("access-control-allow-credentials", "true"),
                    ],
                    Duration::from_millis(1),
                )
            } else if url == "http://t.local/" {
                respond(200, "Traceback (most recent call last):")
            } else {
                respond(404, "")
            }
        });
        let report = run_scanner(&SecurityMisconfig, &executor, "http://t.local/", ScanOptions::default()).await;

        let find = |needle: &str| report.findings.iter().find(|f| f.evidence.contains(needle)).cloned();
        assert_eq!(find("credentials allowed").unwrap().severity, Severity::High);
        assert_eq!(find("No redirect from HTTP").unwrap().severity, Severity::Medium);
        assert_eq!(find("Debug information").unwrap().severity, Severity::Medium);
        let exposed: Vec<_> = report.findings.iter().filter(|f| f.evidence.starts_with("Exposed")).collect();
        assert_eq!(exposed.len(), 2);
        assert!(exposed.iter().any(|f| f.severity == Severity::High && f.location.ends_with("/.env")));
    }

    #[tokio::test]
    async fn test_https_redirect_detected() {
        let executor = ScriptedExecutor::new(|request| {
            if request.url.starts_with("http://") && !request.follow_redirects {
                respond_with_headers(301, "", &[("location", "https://t.local/")], Duration::from_millis(1))
            } else {
                respond(404, "")
            }
        });
        let report = run_scanner(&SecurityMisconfig, &executor, "http://t.local/", ScanOptions::default()).await;
        let redirect = report.findings.iter().find(|f| f.evidence == "HTTP redirects to HTTPS").unwrap();
        assert!(!redirect.vulnerable);
    }
}

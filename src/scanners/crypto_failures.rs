// File: crypto_failures.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{ClassReport, ScanContext, Scanner};
use crate::content_analyzer::ContentAnalyzer;
use crate::html::extract_forms;
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::tls_analyzer::{HandshakeError, TlsAnalyzer, TlsSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};

const EXPIRY_WARNING_DAYS: i64 = 30;

pub struct CryptoFailures;

/// A refused modern handshake means the server only speaks legacy TLS.
pub fn assess_handshake_error(url: &str, error: &HandshakeError) -> Finding {
    match error {
        HandshakeError::Incompatible(detail) => Finding::vulnerable(
            url,
            Severity::High,
            format!("Weak TLS version or cipher: no TLS 1.2/1.3 handshake possible ({})", detail),
        ),
        HandshakeError::Failed(detail) => Finding::incomplete(url, format!("TLS check incomplete: {}", detail)),
    }
}

/// Findings for one completed handshake, judged at `now`.
pub fn assess_session(url: &str, session: &TlsSession, now: DateTime<Utc>) -> Vec<Finding> {
    let mut findings = Vec::new();

    if TlsAnalyzer::is_weak_protocol(&session.tls_version) {
        findings.push(Finding::vulnerable(
            url,
            Severity::High,
            format!("Weak TLS version detected: {}", session.tls_version),
        ));
    }
    if TlsAnalyzer::is_weak_cipher(&session.cipher_suite) {
        findings.push(Finding::vulnerable(
            url,
            Severity::High,
            format!("Weak cipher suite negotiated: {}", session.cipher_suite),
        ));
    }

    let Some(cert) = &session.certificate else {
        findings.push(Finding::incomplete(url, "Certificate check incomplete: certificate could not be decoded"));
        return findings;
    };

    let days_left = cert.days_until_expiry(now);
    if cert.is_expired(now) {
        findings.push(Finding::vulnerable(
            url,
            Severity::High,
            format!("Certificate expired on {}", cert.valid_to.format("%Y-%m-%d")),
        ));
    } else if days_left < EXPIRY_WARNING_DAYS {
        findings.push(Finding::vulnerable(
            url,
            Severity::Medium,
            format!("Certificate expires in {} days", days_left),
        ));
    }
    if cert.is_self_signed {
        findings.push(Finding::vulnerable(
            url,
            Severity::Medium,
            format!("Self-signed certificate: {}", cert.subject),
        ));
    }
    if TlsAnalyzer::is_weak_signature(&cert.signature_algorithm) {
        findings.push(Finding::vulnerable(
            url,
            Severity::Medium,
            format!("Weak certificate signature algorithm: {}", cert.signature_algorithm),
        ));
    }

    if findings.is_empty() {
        findings.push(Finding::clean(
            url,
            format!(
                "{} with {}; certificate valid for {} more days",
                session.tls_version, session.cipher_suite, days_left
            ),
        ));
    }
    findings
}

/// Secrets, insecure cookies and password forms in the fetched page.
pub fn assess_page(url: &str, https: bool, page: &ProbeResponse) -> Vec<Finding> {
    let mut findings = Vec::new();

    for secret in ContentAnalyzer::find_secrets(page) {
        findings.push(Finding::vulnerable(
            url,
            Severity::High,
            format!("{}: {} ({})", secret.category, secret.description, secret.masked),
        ));
    }

    if https {
        for cookie in page.set_cookies() {
            let attributes = cookie.to_lowercase();
            if !attributes.split(';').any(|a| a.trim() == "secure") {
                let name = cookie.split('=').next().unwrap_or("").trim();
                findings.push(Finding::vulnerable(
                    url,
                    Severity::Medium,
                    format!("Cookie '{}' set without Secure attribute", name),
                ));
            }
        }
    } else {
        for form in extract_forms(page.body(), page.url()) {
            if form.has_password() {
                findings.push(
                    Finding::vulnerable(&form.action, Severity::High, "Password form served over plain HTTP")
                        .with_method(&form.method),
                );
            }
        }
    }

    findings
}

#[async_trait]
impl Scanner for CryptoFailures {
    fn class(&self) -> VulnClass {
        VulnClass::CryptoFailures
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let url = ctx.target.as_str();
        let https = ctx.target.is_https();
        let mut findings = Vec::new();

        if https {
            match TlsAnalyzer::handshake(ctx.target.host(), ctx.target.port(), ctx.settings.handshake_timeout).await {
                Ok(session) => {
                    debug!("{} negotiated {} / {}", url, session.tls_version, session.cipher_suite);
                    findings.extend(assess_session(url, &session, Utc::now()));
                }
                Err(e) => {
                    warn!("TLS handshake with {} failed: {}", url, e);
                    findings.push(assess_handshake_error(url, &e));
                }
            }
        } else {
            findings.push(Finding::vulnerable(url, Severity::High, "Site does not use HTTPS"));
        }

        match ctx.send(&ctx.get(url)).await {
            Some(page) => findings.extend(assess_page(url, https, &page)),
            None => findings.push(Finding::incomplete(url, "Content check incomplete: failed to fetch page")),
        }

        ClassReport::new(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanOptions;
    use crate::probe::mock::*;
    use crate::scanners::testing::run_scanner;
    use crate::tls_analyzer::Certificate;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn session(version: &str, cipher: &str, valid_to: DateTime<Utc>, self_signed: bool) -> TlsSession {
        TlsSession {
            tls_version: version.to_string(),
            cipher_suite: cipher.to_string(),
            certificate: Some(Certificate {
                subject: "CN=t.local".to_string(),
                issuer: if self_signed { "CN=t.local" } else { "CN=Some CA" }.to_string(),
                serial_number: "01".to_string(),
                signature_algorithm: "sha256WithRSAEncryption".to_string(),
                valid_from: valid_to - Duration::days(365),
                valid_to,
                subject_alternative_names: vec!["t.local".to_string()],
                is_self_signed: self_signed,
            }),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_healthy_session_is_clean() {
        let s = session("TLS 1.3", "TLS13_AES_256_GCM_SHA384", now() + Duration::days(200), false);
        let findings = assess_session("https://t.local/", &s, now());
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].vulnerable);
    }

    #[test]
    fn test_weak_session_findings() {
        let s = session("TLS 1.0", "TLS_RSA_WITH_RC4_128_SHA", now() - Duration::days(3), true);
        let findings = assess_session("https://t.local/", &s, now());
        let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::High, Severity::High, Severity::High, Severity::Medium]
        );
        assert!(findings[2].evidence.starts_with("Certificate expired"));
    }

    #[test]
    fn test_expiring_soon_is_medium() {
        let s = session("TLS 1.2", "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", now() + Duration::days(10), false);
        let findings = assess_session("https://t.local/", &s, now());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_legacy_only_server_is_weak_tls() {
        let alert = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            tokio_rustls::rustls::Error::AlertReceived(tokio_rustls::rustls::AlertDescription::ProtocolVersion),
        );
        let error = HandshakeError::from_connect(alert);
        assert!(matches!(error, HandshakeError::Incompatible(_)));

        let finding = assess_handshake_error("https://t.local/", &error);
        assert!(finding.vulnerable);
        assert_eq!(finding.severity, Severity::High);
        assert!(finding.evidence.starts_with("Weak TLS version or cipher"));
    }

    #[test]
    fn test_reset_connection_is_incomplete_not_weak() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset by peer");
        let finding = assess_handshake_error("https://t.local/", &HandshakeError::from_connect(reset));
        assert!(!finding.vulnerable);
        assert_eq!(finding.severity, Severity::Unknown);
    }

    #[tokio::test]
    async fn test_plain_http_site() {
        let page = r#"<form action="/login" method="post"><input type="password" name="pw"></form>
                      <!-- API_KEY=sk_live_0123456789 -->"#;
        let executor = ScriptedExecutor::new(move |_| respond(200, page));
        let report = run_scanner(&CryptoFailures, &executor, "http://t.local/", ScanOptions::default()).await;

        let evidence: Vec<&str> = report.findings.iter().map(|f| f.evidence.as_str()).collect();
        assert_eq!(evidence[0], "Site does not use HTTPS");
        assert!(evidence.iter().any(|e| e.starts_with("Secret Assignment")));
        assert!(evidence.iter().any(|e| *e == "Password form served over plain HTTP"));
        assert!(report.findings.iter().all(|f| f.severity == Severity::High));
    }

    #[tokio::test]
    async fn test_handshake_failure_is_recorded_not_fatal() {
        let executor = ScriptedExecutor::new(|_| {
            respond_with_headers(200, "ok", &[("set-cookie", "sid=1; HttpOnly")], std::time::Duration::from_millis(5))
        });
        let report = run_scanner(&CryptoFailures, &executor, "https://127.0.0.1:9/", ScanOptions::default()).await;

        assert_eq!(report.findings[0].severity, Severity::Unknown);
        assert!(report.findings[0].evidence.starts_with("TLS check incomplete"));
        assert!(report.findings.iter().any(|f| f.evidence.contains("without Secure")));
    }
}

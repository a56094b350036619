// File: result.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
            Severity::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnClass {
    SqlInjection,
    Xss,
    CommandInjection,
    NosqlInjection,
    Csrf,
    DirectoryEnum,
    BrokenAccess,
    CryptoFailures,
    SecurityMisconfig,
    VulnerableDependencies,
    AuthFailures,
    LoggingMonitoring,
    Ssrf,
}

impl VulnClass {
    pub const ALL: [VulnClass; 13] = [
        VulnClass::SqlInjection,
        VulnClass::Xss,
        VulnClass::CommandInjection,
        VulnClass::NosqlInjection,
        VulnClass::Csrf,
        VulnClass::DirectoryEnum,
        VulnClass::BrokenAccess,
        VulnClass::CryptoFailures,
        VulnClass::SecurityMisconfig,
        VulnClass::VulnerableDependencies,
        VulnClass::AuthFailures,
        VulnClass::LoggingMonitoring,
        VulnClass::Ssrf,
    ];

    pub fn action(&self) -> &'static str {
        match self {
            VulnClass::SqlInjection => "check_sql",
            VulnClass::Xss => "check_xss",
            VulnClass::CommandInjection => "check_command_injection",
            VulnClass::NosqlInjection => "check_nosql_injection",
            VulnClass::Csrf => "check_csrf",
            VulnClass::DirectoryEnum => "directory_enum",
            VulnClass::BrokenAccess => "check_broken_access",
            VulnClass::CryptoFailures => "check_crypto_failures",
            VulnClass::SecurityMisconfig => "check_security_misconfig",
            VulnClass::VulnerableDependencies => "check_dependencies",
            VulnClass::AuthFailures => "check_auth_failures",
            VulnClass::LoggingMonitoring => "check_logging_failures",
            VulnClass::Ssrf => "check_ssrf",
        }
    }

    /// Human label used in notes and audit records.
    pub fn label(&self) -> &'static str {
        match self {
            VulnClass::SqlInjection => "SQL injection",
            VulnClass::Xss => "XSS",
            VulnClass::CommandInjection => "command injection",
            VulnClass::NosqlInjection => "NoSQL injection",
            VulnClass::Csrf => "CSRF",
            VulnClass::DirectoryEnum => "exposed directory",
            VulnClass::BrokenAccess => "broken access control",
            VulnClass::CryptoFailures => "cryptographic failure",
            VulnClass::SecurityMisconfig => "security misconfiguration",
            VulnClass::VulnerableDependencies => "vulnerable dependency",
            VulnClass::AuthFailures => "authentication failure",
            VulnClass::LoggingMonitoring => "logging and monitoring",
            VulnClass::Ssrf => "SSRF",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            VulnClass::SqlInjection => "sql",
            VulnClass::Xss => "xss",
            VulnClass::CommandInjection => "command-injection",
            VulnClass::NosqlInjection => "nosql",
            VulnClass::Csrf => "csrf",
            VulnClass::DirectoryEnum => "directory-enum",
            VulnClass::BrokenAccess => "broken-access",
            VulnClass::CryptoFailures => "crypto",
            VulnClass::SecurityMisconfig => "misconfig",
            VulnClass::VulnerableDependencies => "dependencies",
            VulnClass::AuthFailures => "auth",
            VulnClass::LoggingMonitoring => "logging",
            VulnClass::Ssrf => "ssrf",
        }
    }

    pub fn clean_note(&self) -> String {
        format!("No {} vulnerabilities found.", self.label())
    }
}

impl fmt::Display for VulnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for VulnClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        VulnClass::ALL
            .iter()
            .find(|class| class.slug() == wanted || class.action().replace('_', "-") == wanted)
            .copied()
            .ok_or_else(|| format!("unknown vulnerability class: {}", s))
    }
}

/// One classification decision derived from one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    pub vulnerable: bool,
    pub evidence: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl Finding {
    pub fn vulnerable(location: impl Into<String>, severity: Severity, evidence: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            payload: None,
            vulnerable: true,
            evidence: evidence.into(),
            severity,
            method: None,
            status: None,
        }
    }

    pub fn clean(location: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            payload: None,
            vulnerable: false,
            evidence: evidence.into(),
            severity: Severity::Info,
            method: None,
            status: None,
        }
    }

    /// A check that could not complete.
    pub fn incomplete(location: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            severity: Severity::Unknown,
            ..Self::clean(location, evidence)
        }
    }

    pub fn with_payload(mut self, payload: &str) -> Self {
        self.payload = Some(payload.to_string());
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBasedResult {
    pub payload: String,
    pub vulnerable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub action: String,
    pub class: VulnClass,
    pub url: String,
    #[serde(rename = "vulnerabilities")]
    pub findings: Vec<Finding>,
    pub time_based_test: Option<TimeBasedResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ScanResult {
    pub fn is_vulnerable(&self) -> bool {
        self.findings.iter().any(|f| f.vulnerable)
            || self.time_based_test.as_ref().is_some_and(|t| t.vulnerable)
    }

    pub fn vulnerable_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.vulnerable)
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.vulnerable_findings()
            .map(|f| f.severity)
            .filter(|s| *s != Severity::Unknown)
            .max()
    }
}

/// Wraps raw scanner output into the common envelope.
pub fn aggregate(
    class: VulnClass,
    url: &str,
    findings: Vec<Finding>,
    time_based_test: Option<TimeBasedResult>,
) -> ScanResult {
    let mut result = ScanResult {
        action: class.action().to_string(),
        class,
        url: url.to_string(),
        findings,
        time_based_test,
        note: None,
    };
    if !result.is_vulnerable() {
        result.note = Some(class.clean_note());
    }
    result
}

/// The minimal record a caller persists per confirmed vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub url: String,
    pub vulnerability_type: String,
    pub payload: String,
}

impl AuditRecord {
    pub fn from_result(result: &ScanResult) -> Vec<AuditRecord> {
        let label = result.class.label();
        let mut records: Vec<AuditRecord> = result
            .vulnerable_findings()
            .map(|finding| AuditRecord {
                url: result.url.clone(),
                vulnerability_type: label.to_string(),
                payload: finding
                    .payload
                    .clone()
                    .unwrap_or_else(|| format!("{}: {}", finding.location, finding.evidence)),
            })
            .collect();

        if let Some(time_based) = result.time_based_test.as_ref().filter(|t| t.vulnerable) {
            records.push(AuditRecord {
                url: result.url.clone(),
                vulnerability_type: format!("{} (time-based)", label),
                payload: time_based.payload.clone(),
            });
        }
        records
    }
}

// File: report.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::result::{Finding, ScanResult, Severity};
use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::path::Path;

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid regex"));

const RULE: &str = "===============================================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn render(results: &[ScanResult], format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(Self::render_text(results)),
            ReportFormat::Json => Self::render_json(results),
        }
    }

    pub fn render_json(results: &[ScanResult]) -> Result<String> {
        let json = match results {
            [single] => serde_json::to_string_pretty(single),
            many => serde_json::to_string_pretty(many),
        };
        json.context("Failed to serialize scan results to JSON")
    }

    fn format_severity(severity: Severity) -> ColoredString {
        match severity {
            Severity::Critical => "[CRITICAL]".red().bold(),
            Severity::High => "[HIGH]    ".red(),
            Severity::Medium => "[MEDIUM]  ".yellow(),
            Severity::Low => "[LOW]     ".blue(),
            Severity::Info => "[INFO]    ".dimmed(),
            Severity::Unknown => "[UNKNOWN] ".magenta(),
        }
    }

    fn format_finding(finding: &Finding) -> String {
        let mut line = format!("{} {}", Self::format_severity(finding.severity), finding.location);
        if let Some(method) = &finding.method {
            line.push_str(&format!(" {}", method));
        }
        if let Some(payload) = &finding.payload {
            line.push_str(&format!(" {:?}", payload));
        }
        line.push_str(&format!(" -> {}", finding.evidence));
        if let Some(status) = finding.status {
            line.push_str(&format!(" (status {})", status));
        }
        line
    }

    pub fn render_text(results: &[ScanResult]) -> String {
        let mut output = String::new();

        for result in results {
            output.push_str(RULE);
            output.push('\n');
            output.push_str(&format!(
                "{} SCAN  {}\n",
                result.class.label().to_uppercase().bold(),
                result.url
            ));
            output.push_str(RULE);
            output.push('\n');

            let mut findings: Vec<&Finding> = result.findings.iter().collect();
            findings.sort_by(|a, b| b.vulnerable.cmp(&a.vulnerable).then(b.severity.cmp(&a.severity)));
            for finding in findings {
                output.push_str(&Self::format_finding(finding));
                output.push('\n');
            }

            if let Some(time_based) = &result.time_based_test {
                let verdict = if time_based.vulnerable {
                    "VULNERABLE".red().bold()
                } else {
                    "not vulnerable".green()
                };
                output.push_str(&format!("Time-based test {:?}: {}", time_based.payload, verdict));
                if let Some(detail) = time_based.evidence.as_ref().or(time_based.note.as_ref()) {
                    output.push_str(&format!(" ({})", detail));
                }
                output.push('\n');
            }

            if let Some(note) = &result.note {
                output.push_str(&format!("{} {}\n", "✓".green().bold(), note));
            }

            let vulnerable = result.vulnerable_findings().count();
            output.push_str(&format!(
                "Summary: {} findings, {} vulnerable",
                result.findings.len(),
                vulnerable
            ));
            if let Some(severity) = result.highest_severity() {
                output.push_str(&format!(", highest severity {}", severity));
            }
            output.push_str("\n\n");
        }

        output
    }

    /// Text rendering with color codes removed, whatever the terminal setting.
    pub fn render_plain(results: &[ScanResult]) -> String {
        ANSI_ESCAPE.replace_all(&Self::render_text(results), "").into_owned()
    }

    pub fn write_report(results: &[ScanResult], path: &Path, format: ReportFormat) -> Result<()> {
        let rendered = match format {
            ReportFormat::Text => Self::render_plain(results),
            ReportFormat::Json => Self::render_json(results)?,
        };
        let mut file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        writeln!(file, "{}", rendered).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;

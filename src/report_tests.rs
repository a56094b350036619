// File: report_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#[cfg(test)]
mod tests {
    use crate::report::*;
    use crate::result::{aggregate, Finding, Severity, TimeBasedResult, VulnClass};
    use crate::result::ScanResult;
    use serde_json::Value;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_results() -> Vec<ScanResult> {
        vec![
            aggregate(
                VulnClass::SqlInjection,
                "http://t.local/?id=1",
                vec![
                    Finding::clean("id", "No SQL error signature").with_payload("' --"),
                    Finding::vulnerable("id", Severity::High, "sql syntax")
                        .with_payload("' OR '1'='1")
                        .with_method("GET")
                        .with_status(500),
                ],
                Some(TimeBasedResult {
                    payload: "' OR IF(1=1, SLEEP(5), 0) --".to_string(),
                    vulnerable: false,
                    evidence: None,
                    note: Some("Request failed: timeout".to_string()),
                }),
            ),
            aggregate(VulnClass::Xss, "http://t.local/?q=test", vec![], None),
        ]
    }

    #[test]
    #[serial]
    fn test_render_text() {
        colored::control::set_override(false);
        let text = ReportGenerator::render_text(&create_test_results());

        assert!(text.contains("SQL INJECTION SCAN  http://t.local/?id=1"));
        assert!(text.contains("[HIGH]     id GET \"' OR '1'='1\" -> sql syntax (status 500)"));
        assert!(text.contains("Time-based test \"' OR IF(1=1, SLEEP(5), 0) --\": not vulnerable (Request failed: timeout)"));
        assert!(text.contains("Summary: 2 findings, 1 vulnerable, highest severity High"));
        assert!(text.contains("✓ No XSS vulnerabilities found."));

        let high = text.find("[HIGH]").unwrap();
        let info = text.find("[INFO]").unwrap();
        assert!(high < info);
        colored::control::unset_override();
    }

    #[test]
    fn test_render_json_single_and_many() {
        let results = create_test_results();

        let single: Value = serde_json::from_str(&ReportGenerator::render_json(&results[..1]).unwrap()).unwrap();
        assert_eq!(single["action"], "check_sql");
        assert_eq!(single["vulnerabilities"].as_array().unwrap().len(), 2);
        assert_eq!(single["vulnerabilities"][1]["severity"], "High");
        assert!(single.get("note").is_none());

        let many: Value = serde_json::from_str(&ReportGenerator::render_json(&results).unwrap()).unwrap();
        assert_eq!(many.as_array().unwrap().len(), 2);
        assert_eq!(many[1]["note"], "No XSS vulnerabilities found.");
        assert!(many[1]["time_based_test"].is_null());
    }

    #[test]
    #[serial]
    fn test_write_report() {
        let temp_dir = TempDir::new().unwrap();
        let text_path = temp_dir.path().join("report.txt");
        let json_path = temp_dir.path().join("report.json");
        let results = create_test_results();

        colored::control::set_override(true);
        ReportGenerator::write_report(&results, &text_path, ReportFormat::Text).unwrap();
        ReportGenerator::write_report(&results, &json_path, ReportFormat::Json).unwrap();

        assert!(colored::control::SHOULD_COLORIZE.should_colorize());
        assert!(ReportGenerator::render_text(&results).contains('\u{1b}'));
        colored::control::unset_override();

        let text = fs::read_to_string(&text_path).unwrap();
        assert!(!text.contains('\u{1b}'));
        assert!(text.contains("XSS SCAN"));

        let json: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_write_report_to_missing_directory_fails() {
        let result = ReportGenerator::write_report(
            &create_test_results(),
            std::path::Path::new("/nonexistent/securiscan/report.json"),
            ReportFormat::Json,
        );
        assert!(result.is_err());
    }
}

// File: dependencies.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{ClassReport, ScanContext, Scanner};
use crate::html::{extract_scripts, ScriptRef};
use crate::result::{Finding, Severity, VulnClass};
use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

const LIBRARIES: &str = "jquery|react|vue|bootstrap|angular|lodash|moment";

static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})(?:\.?js)?[-@/]v?(\d+\.\d+\.\d+)", LIBRARIES)).expect("valid regex")
});

static BANNER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})(?:\.?js)?\s+v?(\d+\.\d+\.\d+)", LIBRARIES)).expect("valid regex")
});

const INLINE_HINTS: &[(&str, &str)] = &[
    ("jQuery(", "jquery"),
    ("$(document)", "jquery"),
    ("React.createElement", "react"),
    ("ReactDOM.", "react"),
    ("new Vue(", "vue"),
    ("angular.module(", "angular"),
    ("_.debounce(", "lodash"),
    ("moment(", "moment"),
];

pub struct Dependencies;

fn capture(pattern: &Regex, haystack: &str) -> Option<(String, String)> {
    let caps = pattern.captures(haystack)?;
    Some((caps[1].to_lowercase(), caps[2].to_string()))
}

/// Library name and version from a script URL such as `jquery-3.3.1.min.js`.
pub fn detect_library(src: &str) -> Option<(String, String)> {
    capture(&FILENAME_PATTERN, src)
}

/// Library name and version from a license banner inside script content.
pub fn detect_banner(content: &str) -> Option<(String, String)> {
    capture(&BANNER_PATTERN, content)
}

/// Libraries an inline script appears to use, each once.
pub fn inline_libraries(code: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for (hint, library) in INLINE_HINTS {
        if code.contains(hint) && !found.contains(library) {
            found.push(*library);
        }
    }
    found
}

impl Dependencies {
    fn judge(&self, ctx: &ScanContext<'_>, src: &str, library: &str, version: &str) -> Finding {
        match ctx.vuln_source.lookup(library, version) {
            Some(advisory) => Finding::vulnerable(
                src,
                Severity::High,
                format!("{} {}: {}", library, version, advisory),
            ),
            None => Finding::clean(src, format!("{} {}: no known vulnerability", library, version)),
        }
    }
}

#[async_trait]
impl Scanner for Dependencies {
    fn class(&self) -> VulnClass {
        VulnClass::VulnerableDependencies
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let url = ctx.target.as_str();
        let Some(page) = ctx.send(&ctx.get(url)).await else {
            return ClassReport::new(vec![Finding::incomplete(url, "Dependency check incomplete: failed to fetch page")]);
        };

        let scripts = extract_scripts(page.body());
        info!("Found {} script tags on {}", scripts.len(), url);
        let base = Url::parse(page.url()).ok();

        let mut findings = Vec::new();
        let mut fetch_budget = ctx.settings.max_tests;

        for script in scripts {
            match script {
                ScriptRef::External(src) => {
                    if let Some((library, version)) = detect_library(&src) {
                        findings.push(self.judge(ctx, &src, &library, &version));
                        continue;
                    }

                    let absolute = base
                        .as_ref()
                        .and_then(|b| b.join(&src).ok())
                        .map(|u| u.to_string())
                        .unwrap_or_else(|| src.clone());
                    let banner = if fetch_budget > 0 {
                        fetch_budget -= 1;
                        ctx.send(&ctx.get(&absolute))
                            .await
                            .filter(|r| r.is_success())
                            .and_then(|r| detect_banner(r.body()))
                    } else {
                        None
                    };

                    match banner {
                        Some((library, version)) => {
                            debug!("{} identified by banner as {} {}", src, library, version);
                            findings.push(self.judge(ctx, &src, &library, &version));
                        }
                        None => findings.push(Finding::clean(&src, "Unknown or untracked script")),
                    }
                }
                ScriptRef::Inline(code) => {
                    for library in inline_libraries(&code) {
                        findings.push(Finding::clean(
                            url,
                            format!("{} unknown: detected in inline script", library),
                        ));
                    }
                }
            }
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
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("/libs/jquery-3.3.1.min.js", Some(("jquery", "3.3.1")))]
    #[case("https://cdn.example.com/ajax/libs/angular.js/1.6.9/angular.min.js", Some(("angular", "1.6.9")))]
    #[case("https://unpkg.com/lodash@4.17.4/lodash.js", Some(("lodash", "4.17.4")))]
    #[case("/static/Bootstrap-4.3.1.bundle.js", Some(("bootstrap", "4.3.1")))]
    #[case("/js/app.bundle.js", None)]
    fn test_detect_library(#[case] src: &str, #[case] expected: Option<(&str, &str)>) {
        let detected = detect_library(src);
        assert_eq!(
            detected.as_ref().map(|(l, v)| (l.as_str(), v.as_str())),
            expected
        );
    }

    #[test]
    fn test_detect_banner() {
        let content = "/*! jQuery v3.4.1 | (c) JS Foundation and other contributors */";
        assert_eq!(detect_banner(content), Some(("jquery".to_string(), "3.4.1".to_string())));
        assert_eq!(detect_banner("/*! Vue.js v2.6.0 */"), Some(("vue".to_string(), "2.6.0".to_string())));
    }

    #[test]
    fn test_inline_libraries() {
        let code = "jQuery(function(){}); $(document).ready(); new Vue({el: '#app'})";
        assert_eq!(inline_libraries(code), vec!["jquery", "vue"]);
    }

    #[tokio::test]
    async fn test_page_scripts_are_judged() {
        let page = r#"<html><head>
            <script src="/libs/jquery-3.3.1.min.js"></script>
            <script src="/libs/react-18.2.0.js"></script>
            <script src="/js/vendor.js"></script>
            <script src="/js/app.js"></script>
            <script>new Vue({el: '#app'})</script>
        </head></html>"#;
        let executor = ScriptedExecutor::new(move |request| {
            if request.url.ends_with("/js/vendor.js") {
                respond(200, "/*! jQuery v1.12.4 | (c) jQuery Foundation */")
            } else if request.url.ends_with("/js/app.js") {
                respond(200, "console.log('hi')")
            } else {
                respond(200, page)
            }
        });
        let report = run_scanner(&Dependencies, &executor, "http://t.local/", ScanOptions::default()).await;

        let by_location = |needle: &str| report.findings.iter().find(|f| f.location.ends_with(needle)).unwrap();
        let jquery = by_location("jquery-3.3.1.min.js");
        assert!(jquery.vulnerable);
        assert_eq!(jquery.severity, Severity::High);
        assert!(!by_location("react-18.2.0.js").vulnerable);
        assert_eq!(by_location("vendor.js").severity, Severity::High);
        assert_eq!(by_location("app.js").evidence, "Unknown or untracked script");
        assert!(report.findings.iter().any(|f| f.evidence == "vue unknown: detected in inline script"));

        let fetched: Vec<String> = executor.calls().iter().skip(1).map(|c| c.url.clone()).collect();
        assert_eq!(fetched, vec!["http://mock.local/js/vendor.js", "http://mock.local/js/app.js"]);
    }

    #[tokio::test]
    async fn test_fetch_budget_is_bounded_by_max_tests() {
        let page = r#"<script src="/a.js"></script><script src="/b.js"></script><script src="/c.js"></script>"#;
        let executor = ScriptedExecutor::new(move |_| respond(200, page));
        let options = ScanOptions {
            max_tests: 1,
            ..ScanOptions::default()
        };
        let report = run_scanner(&Dependencies, &executor, "http://t.local/", options).await;
        assert_eq!(executor.calls().len(), 2);
        assert_eq!(report.findings.len(), 3);
    }
}

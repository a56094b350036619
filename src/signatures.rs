// File: signatures.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use regex::Regex;

/// A signature that fired: the pattern text and the label it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub pattern: &'static str,
    pub name: &'static str,
}

/// Case-insensitive literal matching backed by Aho-Corasick, with optional
/// regexes for the shapes literals cannot express.
#[derive(Debug)]
pub struct SignatureMatcher {
    literal_matcher: Option<AhoCorasick>,
    literal_patterns: Vec<(&'static str, &'static str)>,
    regex_patterns: Vec<(Regex, &'static str, &'static str)>,
}

impl SignatureMatcher {
    pub fn new(
        literal_patterns: &[(&'static str, &'static str)],
        regex_patterns: &[(&'static str, &'static str)],
    ) -> Self {
        let literal_matcher = if literal_patterns.is_empty() {
            None
        } else {
            let patterns: Vec<&str> = literal_patterns.iter().map(|(pattern, _)| *pattern).collect();
            Some(
                AhoCorasickBuilder::new()
                    .ascii_case_insensitive(true)
                    .build(patterns)
                    .expect("Failed to build Aho-Corasick automaton"),
            )
        };

        let compiled_regex_patterns = regex_patterns
            .iter()
            .map(|(pattern, name)| {
                (
                    Regex::new(pattern).unwrap_or_else(|_| panic!("Invalid regex pattern: {}", pattern)),
                    *pattern,
                    *name,
                )
            })
            .collect();

        Self {
            literal_matcher,
            literal_patterns: literal_patterns.to_vec(),
            regex_patterns: compiled_regex_patterns,
        }
    }

    /// Every signature present in `content`, each reported once, literals first.
    pub fn find_hits(&self, content: &str) -> Vec<Hit> {
        let mut hits: Vec<Hit> = Vec::new();

        if let Some(ref matcher) = self.literal_matcher {
            for mat in matcher.find_overlapping_iter(content) {
                let (pattern, name) = self.literal_patterns[mat.pattern()];
                if !hits.iter().any(|h| h.pattern == pattern) {
                    hits.push(Hit { pattern, name });
                }
            }
        }

        for (regex, pattern, name) in &self.regex_patterns {
            if regex.is_match(content) {
                hits.push(Hit { pattern, name });
            }
        }

        hits
    }

    pub fn find_matches(&self, content: &str) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for hit in self.find_hits(content) {
            if !names.contains(&hit.name) {
                names.push(hit.name);
            }
        }
        names
    }

    pub fn find_first_match(&self, content: &str) -> Option<Hit> {
        if let Some(ref matcher) = self.literal_matcher {
            if let Some(mat) = matcher.find(content) {
                let (pattern, name) = self.literal_patterns[mat.pattern()];
                return Some(Hit { pattern, name });
            }
        }

        self.regex_patterns
            .iter()
            .find(|(regex, _, _)| regex.is_match(content))
            .map(|(_, pattern, name)| Hit { pattern, name })
    }

    pub fn is_match(&self, content: &str) -> bool {
        self.find_first_match(content).is_some()
    }

    /// Hits whose pattern does not already occur in `echoed`. Used where a
    /// page reflecting the probe input would otherwise match itself.
    pub fn find_hits_excluding(&self, content: &str, echoed: &str) -> Vec<Hit> {
        let echoed = echoed.to_lowercase();
        self.find_hits(content)
            .into_iter()
            .filter(|hit| !echoed.contains(&hit.pattern.to_lowercase()))
            .collect()
    }

    pub fn count_patterns(&self) -> (usize, usize) {
        (self.literal_patterns.len(), self.regex_patterns.len())
    }
}

#[macro_export]
macro_rules! signatures {
    (
        literals: [$($lit_pattern:expr => $lit_name:expr),* $(,)?]
        $(, regexes: [$($regex_pattern:expr => $regex_name:expr),* $(,)?])?
    ) => {
        $crate::signatures::SignatureMatcher::new(
            &[$( ($lit_pattern, $lit_name) ),*],
            &[$( $( ($regex_pattern, $regex_name) ),* )?]
        )
    };
}

#[macro_export]
macro_rules! lazy_signatures {
    (
        $vis:vis $name:ident,
        literals: [$($lit_pattern:expr => $lit_name:expr),* $(,)?]
        $(, regexes: [$($regex_pattern:expr => $regex_name:expr),* $(,)?])?
    ) => {
        $vis static $name: once_cell::sync::Lazy<$crate::signatures::SignatureMatcher> =
            once_cell::sync::Lazy::new(|| {
                $crate::signatures!(
                    literals: [$( $lit_pattern => $lit_name ),*]
                    $(, regexes: [$( $regex_pattern => $regex_name ),*])?
                )
            });
    };
}

lazy_signatures!(
    pub SQL_ERRORS,
    literals: [
        "sql syntax" => "sql syntax",
        "mysql" => "mysql",
        "syntax error" => "syntax error",
        "unclosed quotation mark" => "unclosed quotation mark",
        "odbc microsoft access" => "odbc microsoft access",
        "warning: mysql" => "warning: mysql",
        "quoted string not properly terminated" => "quoted string not properly terminated",
        "mariadb" => "mariadb",
        "pg_query" => "pg_query",
        "psql:" => "psql:",
        "error in your sql syntax" => "error in your sql syntax",
    ]
);

lazy_signatures!(
    pub XSS_MARKERS,
    literals: [
        "<script" => "script tag",
        "onerror=" => "onerror handler",
        "onload=" => "onload handler",
        "javascript:" => "javascript uri",
        "alert('xss')" => "alert call",
    ]
);

lazy_signatures!(
    pub COMMAND_OUTPUT,
    literals: [
        "vuln_canary" => "echo canary",
        "uid=" => "unix id output",
        "gid=" => "unix id output",
        "root:x:0:0" => "passwd file",
        "daemon:x:" => "passwd file",
        "1787569" => "arithmetic echo",
        "<dir>" => "windows dir listing",
        "directory of" => "windows dir listing",
        "volume serial number" => "windows dir listing",
        "nt authority\\" => "windows whoami",
        "windows ip configuration" => "windows ipconfig",
    ],
    regexes: [
        r"(?m)^[a-z_][a-z0-9_-]*\\[a-z0-9_-]+\s*$" => "windows whoami"
    ]
);

lazy_signatures!(
    pub NOSQL_ERRORS,
    literals: [
        "mongoerror" => "mongodb error",
        "mongoservererror" => "mongodb error",
        "mongodb" => "mongodb error",
        "bsonerror" => "bson error",
        "bsontypeerror" => "bson error",
        "cast to objectid failed" => "mongoose cast error",
        "unknown operator" => "operator rejected",
        "unknown top level operator" => "operator rejected",
        "e11000 duplicate key" => "mongodb error",
        "couchdb" => "couchdb error",
    ]
);

lazy_signatures!(
    pub SSRF_INDICATORS,
    literals: [
        "ami-id" => "aws",
        "instance-id" => "aws",
        "instance-type" => "aws",
        "iam/security-credentials" => "aws",
        "computemetadata" => "gcp",
        "metadata-flavor" => "gcp",
        "\"azenvironment\"" => "azure",
        "\"subscriptionid\"" => "azure",
        "\"vmid\"" => "azure",
        "root:x:0:0" => "local",
        "welcome to nginx" => "local",
        "apache2 ubuntu default page" => "local",
        "it works!" => "local",
        "intranet" => "internal",
        "router login" => "internal",
        "internal use only" => "internal",
    ]
);

lazy_signatures!(
    pub ACCESS_INDICATORS,
    literals: [
        "admin" => "admin",
        "dashboard" => "dashboard",
        "settings" => "settings",
        "configuration" => "configuration",
        "logout" => "logout",
        "manage users" => "user management",
        "control panel" => "control panel",
    ]
);

lazy_signatures!(
    pub LISTING_AND_DEBUG,
    literals: [
        "<title>index of /" => "directory listing",
        "parent directory</a>" => "directory listing",
        "directory listing for /" => "directory listing",
        "traceback (most recent call last)" => "debug traceback",
        "werkzeug debugger" => "debug mode",
        "whoops! there was an error" => "debug mode",
        "<title>phpinfo()" => "phpinfo exposed",
        "you're seeing this error because you have <code>debug = true</code>" => "debug mode",
    ],
    regexes: [
        r"(?i)(debug\s*[:=]\s*true|development\s*[:=]\s*true|env\s*[:=]\s*dev)" => "debug mode"
    ]
);

lazy_signatures!(
    pub ERROR_DISCLOSURE,
    literals: [
        "warning: mysql_" => "database warning",
        "fatal error" => "fatal error",
        "stack trace" => "stack trace",
        "invalid username or password" => "credential hint",
        "syntax error" => "syntax error",
        "traceback (most recent call last)" => "stack trace",
        "unhandled exception" => "unhandled exception",
        "exception in thread" => "stack trace",
    ],
    regexes: [
        r"\bat [a-zA-Z_$][\w$]*(\.[\w$]+)+\([\w$]+\.java:\d+\)" => "stack trace"
    ]
);

lazy_signatures!(
    pub LOGIN_FAILURE,
    literals: [
        "invalid" => "invalid",
        "incorrect" => "incorrect",
        "failed" => "failed",
        "wrong" => "wrong",
    ]
);

lazy_signatures!(
    pub LOCKOUT_MARKERS,
    literals: [
        "too many" => "throttled",
        "locked" => "account locked",
        "captcha" => "captcha",
        "try again later" => "throttled",
        "rate limit" => "throttled",
    ]
);

lazy_signatures!(
    pub CSRF_REJECTION,
    literals: [
        "csrf" => "csrf",
        "xsrf" => "csrf",
        "invalid token" => "token",
        "token mismatch" => "token",
        "forbidden" => "forbidden",
        "expired" => "expired",
    ]
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_literals_match_case_insensitively() {
        let matcher = SignatureMatcher::new(&[("sql syntax", "sql syntax")], &[]);
        assert!(matcher.is_match("You have an error: SQL SYNTAX ERROR near '1'"));
        assert!(!matcher.is_match("Welcome"));
    }

    #[test]
    fn test_regex_patterns() {
        let matcher = SignatureMatcher::new(&[], &[(r"Apache/\d+\.\d+", "Apache Version")]);
        assert_eq!(matcher.find_matches("Server: Apache/2.4.41"), vec!["Apache Version"]);
    }

    #[test]
    fn test_hits_reported_once() {
        let hits = SQL_ERRORS.find_hits("mysql said mysql said mysql");
        assert_eq!(hits.iter().filter(|h| h.pattern == "mysql").count(), 1);
    }

    #[test]
    fn test_overlapping_literals_all_reported() {
        let names = SQL_ERRORS.find_matches("You have an error in your SQL syntax");
        assert!(names.contains(&"sql syntax"));
        assert!(names.contains(&"error in your sql syntax"));
    }

    #[test]
    fn test_echoed_patterns_excluded() {
        let body = "fetched http://169.254.169.254/latest/meta-data/iam/security-credentials";
        let hits = SSRF_INDICATORS.find_hits_excluding(body, "http://169.254.169.254/latest/meta-data/iam/security-credentials");
        assert!(hits.is_empty());

        let body = "ami-id\ninstance-id\nhostname";
        let hits = SSRF_INDICATORS.find_hits_excluding(body, "http://169.254.169.254/latest/meta-data/");
        assert_eq!(hits[0].name, "aws");
    }

    #[test]
    fn test_ssrf_platforms() {
        assert_eq!(SSRF_INDICATORS.find_matches("{\"computeMetadata\": {}}"), vec!["gcp"]);
        assert_eq!(SSRF_INDICATORS.find_matches("{\"azEnvironment\":\"AzurePublicCloud\"}"), vec!["azure"]);
        assert_eq!(SSRF_INDICATORS.find_matches("root:x:0:0:root:/root:/bin/bash"), vec!["local"]);
    }

    #[test]
    fn test_command_output_markers() {
        assert!(COMMAND_OUTPUT.is_match("uid=33(www-data) gid=33(www-data)"));
        assert!(COMMAND_OUTPUT.is_match(" Directory of C:\\inetpub"));
        assert!(COMMAND_OUTPUT.is_match("VULN_CANARY\n"));
        assert!(!COMMAND_OUTPUT.is_match("<html>Search results</html>"));
    }

    #[test]
    fn test_count_patterns() {
        let (literals, regexes) = LISTING_AND_DEBUG.count_patterns();
        assert!(literals > 0);
        assert_eq!(regexes, 1);
    }

    #[test]
    fn test_macro_usage() {
        lazy_signatures!(
            TEST_PATTERNS,
            literals: [
                "Apache" => "Apache Server",
                "nginx" => "Nginx Server"
            ],
            regexes: [
                r"Apache/\d+" => "Apache Version"
            ]
        );

        let matches = TEST_PATTERNS.find_matches("Apache/2.4");
        assert!(matches.contains(&"Apache Server"));
        assert!(matches.contains(&"Apache Version"));
    }
}

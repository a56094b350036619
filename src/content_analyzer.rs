// File: content_analyzer.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::probe::ProbeResponse;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_ANALYZED_BYTES: usize = 5_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SecretFinding {
    pub category: &'static str,
    pub description: &'static str,
    pub masked: String,
    pub context: String,
}

static SECRET_PATTERNS: Lazy<Vec<(Regex, &str, &str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r#"(?i)api[_\s-]*key[_\s-]*[:=]\s*['"]([\w-]{10,})['"]"#).unwrap(),
            "API Key",
            "Potential API key found in page content",
        ),
        (
            Regex::new(r"(?i)\b(?:API_KEY|SECRET_KEY|SECRET)\s*=\s*[^\s<]{4,}").unwrap(),
            "Secret Assignment",
            "Secret assigned in page content",
        ),
        (
            Regex::new(r"AKIA[0-9A-Z]{16}").unwrap(),
            "AWS Access Key",
            "Potential AWS access key found",
        ),
        (
            Regex::new(r#"(?i)auth[_\-\s]*token[_\-\s]*[:=]\s*(?:'|")([\w\-\.]+)(?:'|")"#).unwrap(),
            "Auth Token",
            "Authentication token found in page content",
        ),
        (
            Regex::new(r"-----BEGIN\s+(RSA|DSA|EC|OPENSSH)?\s*PRIVATE\s+KEY-----").unwrap(),
            "Private Key",
            "Private key found in page content",
        ),
        (
            Regex::new(r"(?i)(?:mongodb|mysql|postgresql|postgres|jdbc:\w+)://[^\s<'\x22]+").unwrap(),
            "DB Connection String",
            "Database connection string found",
        ),
        (
            Regex::new(r"eyJ[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}").unwrap(),
            "JWT Token",
            "JSON Web Token found",
        ),
        (
            Regex::new(r"github_pat_[a-zA-Z0-9_]{59}").unwrap(),
            "GitHub PAT",
            "GitHub Personal Access Token found",
        ),
    ]
});

pub(crate) fn extract_context(content: &str, start: usize, end: usize, context_size: usize) -> String {
    let content_len = content.len();
    let mut context_start = start.saturating_sub(context_size);
    let mut context_end = (end + context_size).min(content_len);

    while !content.is_char_boundary(context_start) {
        context_start -= 1;
    }
    while !content.is_char_boundary(context_end) {
        context_end += 1;
    }

    match content.get(context_start..context_end) {
        Some(slice) => {
            let prefix = if context_start > 0 { "..." } else { "" };
            let suffix = if context_end < content_len { "..." } else { "" };
            format!("{}{}{}", prefix, slice, suffix)
        }
        None => "Context extraction failed".to_string(),
    }
}

pub(crate) fn mask(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

pub struct ContentAnalyzer;

impl ContentAnalyzer {
    /// Secrets exposed in a response body. Matched values are masked.
    pub fn find_secrets(response: &ProbeResponse) -> Vec<SecretFinding> {
        let mut findings = Vec::new();
        let content = response.body();

        if content.len() > MAX_ANALYZED_BYTES {
            warn!("Content too large for analysis: {} bytes", content.len());
            return findings;
        }

        debug!("Analyzing content of {}", response.url());

        for (pattern, category, description) in SECRET_PATTERNS.iter() {
            if let Some(m) = pattern.find(content) {
                let masked = mask(m.as_str());
                let context = extract_context(content, m.start(), m.end(), 30).replace(m.as_str(), &masked);
                findings.push(SecretFinding {
                    category,
                    description,
                    masked,
                    context,
                });
                info!("Found {} in {}", category, response.url());
            }
        }

        findings
    }
}

#[cfg(test)]
#[path = "content_analyzer_tests.rs"]
mod tests;

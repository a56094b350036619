// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::fmt;

#[derive(Debug)]
pub enum ScanError {
    InvalidTarget(String),
    UnsupportedScheme(String),
    Client(String),
    Store(String),
    Wordlist(std::io::Error),
    VulnDatabase(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(msg) => write!(f, "Invalid target URL: {}", msg),
            Self::UnsupportedScheme(scheme) => {
                write!(f, "Unsupported URL scheme '{}', expected http or https", scheme)
            }
            Self::Client(msg) => write!(f, "HTTP client error: {}", msg),
            Self::Store(msg) => write!(f, "Scan store error: {}", msg),
            Self::Wordlist(e) => write!(f, "Failed to load wordlist: {}", e),
            Self::VulnDatabase(msg) => write!(f, "Vulnerability database error: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wordlist(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(error: reqwest::Error) -> Self {
        Self::Client(error.to_string())
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(error: serde_json::Error) -> Self {
        Self::VulnDatabase(error.to_string())
    }
}

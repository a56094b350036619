// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::path::PathBuf;
use std::time::Duration;

/// Engine-wide settings shared by every scanner.
#[derive(Debug, Clone)]
pub struct ConfigParameter {
    timeout: u64,
    time_based_timeout: u64,
    handshake_timeout: u64,
    time_threshold_ms: u64,
    slow_response_ms: u64,
    concurrency: usize,
    rate_limit: Option<u32>,
    user_agent: String,
    wordlist_path: Option<PathBuf>,
    vuln_db_path: Option<PathBuf>,
}

impl Default for ConfigParameter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParameter {
    pub fn new() -> Self {
        Self {
            timeout: 5,
            time_based_timeout: 10,
            handshake_timeout: 10,
            time_threshold_ms: 4000,
            slow_response_ms: 3000,
            concurrency: 10,
            rate_limit: None,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            wordlist_path: None,
            vuln_db_path: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: u64) {
        self.timeout = timeout.max(1);
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn set_time_based_timeout(&mut self, timeout: u64) {
        self.time_based_timeout = timeout.max(1);
    }

    pub fn time_based_timeout(&self) -> u64 {
        self.time_based_timeout
    }

    pub fn set_handshake_timeout(&mut self, timeout: u64) {
        self.handshake_timeout = timeout.max(1);
    }

    pub fn handshake_timeout(&self) -> u64 {
        self.handshake_timeout
    }

    pub fn set_time_threshold(&mut self, threshold: Duration) {
        self.time_threshold_ms = threshold.as_millis() as u64;
    }

    pub fn time_threshold(&self) -> Duration {
        Duration::from_millis(self.time_threshold_ms)
    }

    pub fn set_slow_response_threshold(&mut self, threshold: Duration) {
        self.slow_response_ms = threshold.as_millis() as u64;
    }

    pub fn slow_response_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_response_ms)
    }

    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.concurrency = concurrency.max(1);
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn set_rate_limit(&mut self, rate_limit: Option<u32>) {
        self.rate_limit = rate_limit.filter(|r| *r > 0);
    }

    pub fn rate_limit(&self) -> Option<u32> {
        self.rate_limit
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        self.user_agent = user_agent;
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_wordlist_path(&mut self, path: Option<PathBuf>) {
        self.wordlist_path = path;
    }

    pub fn wordlist_path(&self) -> Option<&PathBuf> {
        self.wordlist_path.as_ref()
    }

    pub fn set_vuln_db_path(&mut self, path: Option<PathBuf>) {
        self.vuln_db_path = path;
    }

    pub fn vuln_db_path(&self) -> Option<&PathBuf> {
        self.vuln_db_path.as_ref()
    }
}

/// Per-invocation knobs passed to a single class scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_tests: usize,
    pub timeout: Option<u64>,
    pub extra_params: Vec<(String, String)>,
    pub time_threshold: Option<Duration>,
    pub concurrency: Option<usize>,
    pub wordlist: Option<Vec<String>>,
    pub extensions: Option<Vec<String>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_tests: 10,
            timeout: None,
            extra_params: Vec::new(),
            time_threshold: None,
            concurrency: None,
            wordlist: None,
            extensions: None,
        }
    }
}

/// Options merged with the engine config for one scan.
#[derive(Debug, Clone)]
pub struct Effective {
    pub max_tests: usize,
    pub timeout: Duration,
    pub time_based_timeout: Duration,
    pub handshake_timeout: Duration,
    pub time_threshold: Duration,
    pub slow_response_threshold: Duration,
    pub concurrency: usize,
    pub extra_params: Vec<(String, String)>,
}

impl Effective {
    pub fn resolve(config: &ConfigParameter, options: &ScanOptions) -> Self {
        let timeout = options.timeout.unwrap_or(config.timeout()).max(1);
        Self {
            max_tests: options.max_tests.max(1),
            timeout: Duration::from_secs(timeout),
            time_based_timeout: Duration::from_secs(config.time_based_timeout().max(timeout)),
            handshake_timeout: Duration::from_secs(config.handshake_timeout()),
            time_threshold: options.time_threshold.unwrap_or_else(|| config.time_threshold()),
            slow_response_threshold: config.slow_response_threshold(),
            concurrency: options.concurrency.unwrap_or(config.concurrency()).max(1),
            extra_params: options.extra_params.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

// File: engine.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::{ConfigParameter, Effective, ScanOptions};
use crate::error::ScanError;
use crate::getstate::ProbeStats;
use crate::probe::{HttpProbeExecutor, ProbeExecutor};
use crate::result::{aggregate, ScanResult, VulnClass};
use crate::scanners::{self, ScanContext};
use crate::store::ScanStore;
use crate::target::Target;
use crate::vulndb::{VulnTable, VulnerabilitySource};
use futures::future::join_all;
use log::{debug, info};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

/// Runs class scans against targets. Holds no per-scan state: every call
/// builds its own context and the only side effect besides network traffic
/// is the optional store.
pub struct Engine {
    executor: Arc<dyn ProbeExecutor>,
    config: ConfigParameter,
    vuln_source: Arc<dyn VulnerabilitySource>,
    store: Option<Arc<dyn ScanStore>>,
    stats: Option<Arc<ProbeStats>>,
}

macro_rules! scan_entry_points {
    ($($name:ident => $class:expr),+ $(,)?) => {
        $(
            pub async fn $name(&self, url: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
                self.scan($class, url, options).await
            }
        )+
    };
}

impl Engine {
    /// Engine backed by the reqwest executor. Loads the vulnerability
    /// database from the configured path, or uses the built-in table.
    pub fn new(config: ConfigParameter) -> Result<Self, ScanError> {
        let executor = HttpProbeExecutor::new(&config)?;
        let stats = executor.stats();
        let vuln_source: Arc<dyn VulnerabilitySource> = match config.vuln_db_path() {
            Some(path) => Arc::new(VulnTable::from_file(path)?),
            None => Arc::new(VulnTable::builtin()),
        };
        Ok(Self {
            executor: Arc::new(executor),
            config,
            vuln_source,
            store: None,
            stats: Some(stats),
        })
    }

    pub fn with_executor(config: ConfigParameter, executor: Arc<dyn ProbeExecutor>) -> Self {
        Self {
            executor,
            config,
            vuln_source: Arc::new(VulnTable::builtin()),
            store: None,
            stats: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ScanStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_vuln_source(mut self, vuln_source: Arc<dyn VulnerabilitySource>) -> Self {
        self.vuln_source = vuln_source;
        self
    }

    pub fn config(&self) -> &ConfigParameter {
        &self.config
    }

    pub fn stats(&self) -> Option<Arc<ProbeStats>> {
        self.stats.clone()
    }

    /// One class against one target. Only an invalid target, an unreadable
    /// wordlist or a failing store produce `Err`.
    pub async fn scan(&self, class: VulnClass, url: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let target = Target::parse(url)?;
        let options = self.with_wordlist(class, options).await?;
        let settings = Effective::resolve(&self.config, &options);

        let ctx = ScanContext {
            executor: self.executor.as_ref(),
            target: &target,
            settings: &settings,
            options: &options,
            vuln_source: self.vuln_source.as_ref(),
        };

        info!("Starting {} scan of {}", class.label(), target.as_str());
        let report = scanners::for_class(class).run(&ctx).await;
        let result = aggregate(class, target.as_str(), report.findings, report.time_based);
        info!(
            "Finished {} scan of {}: {} findings, {} vulnerable",
            class.label(),
            target.as_str(),
            result.findings.len(),
            result.vulnerable_findings().count()
        );

        if let Some(stats) = &self.stats {
            debug!(
                "Probe totals: {} completed, {} failed",
                stats.completed(),
                stats.failed()
            );
        }
        if let Some(store) = &self.store {
            store.record(&result)?;
        }

        Ok(result)
    }

    /// Every class against one target, concurrently. Results follow
    /// `VulnClass::ALL` order.
    pub async fn scan_all(&self, url: &str, options: &ScanOptions) -> Result<Vec<ScanResult>, ScanError> {
        Target::parse(url)?;
        join_all(VulnClass::ALL.iter().map(|class| self.scan(*class, url, options)))
            .await
            .into_iter()
            .collect()
    }

    scan_entry_points! {
        scan_sql_injection => VulnClass::SqlInjection,
        scan_xss => VulnClass::Xss,
        scan_command_injection => VulnClass::CommandInjection,
        scan_nosql_injection => VulnClass::NosqlInjection,
        scan_csrf => VulnClass::Csrf,
        scan_directory_enum => VulnClass::DirectoryEnum,
        scan_broken_access => VulnClass::BrokenAccess,
        scan_crypto_failures => VulnClass::CryptoFailures,
        scan_security_misconfig => VulnClass::SecurityMisconfig,
        scan_dependencies => VulnClass::VulnerableDependencies,
        scan_auth_failures => VulnClass::AuthFailures,
        scan_logging_monitoring => VulnClass::LoggingMonitoring,
        scan_ssrf => VulnClass::Ssrf,
    }

    async fn with_wordlist<'o>(&self, class: VulnClass, options: &'o ScanOptions) -> Result<Cow<'o, ScanOptions>, ScanError> {
        if class != VulnClass::DirectoryEnum || options.wordlist.is_some() {
            return Ok(Cow::Borrowed(options));
        }
        let Some(path) = self.config.wordlist_path() else {
            return Ok(Cow::Borrowed(options));
        };
        let mut loaded = options.clone();
        loaded.wordlist = Some(load_wordlist(path).await?);
        Ok(Cow::Owned(loaded))
    }
}

/// One word per line; blank lines and `#` comments are skipped.
pub async fn load_wordlist(path: &Path) -> Result<Vec<String>, ScanError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(ScanError::Wordlist)?;
    let words: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    debug!("Loaded {} words from {}", words.len(), path.display());
    Ok(words)
}

// File: store.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::ScanError;
use crate::result::{AuditRecord, ScanResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub timestamp: DateTime<Utc>,
    pub result: ScanResult,
}

/// Destination for finished scans. Injected into the engine by the caller.
pub trait ScanStore: Send + Sync {
    fn record(&self, result: &ScanResult) -> Result<(), ScanError>;

    fn history(&self) -> Result<Vec<ScanRecord>, ScanError>;

    fn audit_records(&self) -> Result<Vec<AuditRecord>, ScanError> {
        Ok(self
            .history()?
            .iter()
            .flat_map(|record| AuditRecord::from_result(&record.result))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ScanRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScanStore for MemoryStore {
    fn record(&self, result: &ScanResult) -> Result<(), ScanError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| ScanError::Store(format!("store lock poisoned: {}", e)))?;
        records.push(ScanRecord {
            timestamp: Utc::now(),
            result: result.clone(),
        });
        Ok(())
    }

    fn history(&self) -> Result<Vec<ScanRecord>, ScanError> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|e| ScanError::Store(format!("store lock poisoned: {}", e)))
    }
}

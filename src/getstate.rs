// File: getstate.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::sync::atomic::{AtomicUsize, Ordering};

/// Probe counters shared by every clone of an executor.
#[derive(Debug, Default)]
pub struct ProbeStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.completed() + self.failed()
    }
}

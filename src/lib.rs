// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_inception)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]
#![allow(clippy::useless_vec)]

pub mod cli;
pub mod config;
pub mod content_analyzer;
pub mod engine;
pub mod error;
pub mod getstate;
pub mod html;
pub mod payloads;
pub mod probe;
pub mod report;
pub mod result;
pub mod scanners;
pub mod signatures;
pub mod store;
pub mod target;
pub mod tls_analyzer;
pub mod vulndb;

pub use config::{ConfigParameter, ScanOptions};
pub use engine::Engine;
pub use error::ScanError;
pub use result::{Finding, ScanResult, Severity, VulnClass};


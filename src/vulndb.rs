// File: vulndb.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::ScanError;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Lookup of known-vulnerable client-side library versions.
pub trait VulnerabilitySource: Send + Sync {
    /// Advisory text when `library` at `version` is known to be vulnerable.
    fn lookup(&self, library: &str, version: &str) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Library name to version to advisory.
#[derive(Debug, Clone, Default)]
pub struct VulnTable {
    entries: HashMap<String, HashMap<String, String>>,
}

impl VulnTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (library, version, advisory) in [
            ("jquery", "3.3.1", "CVE-2019-11358 - prototype pollution in jQuery.extend"),
            ("jquery", "1.12.4", "CVE-2015-9251 - cross-site scripting via cross-domain ajax"),
            ("jquery", "2.2.4", "CVE-2015-9251 - cross-site scripting via cross-domain ajax"),
            ("jquery", "3.4.1", "CVE-2020-11022 - cross-site scripting in htmlPrefilter"),
            ("react", "16.0.0", "CVE-2018-6341 - cross-site scripting in server-side rendering"),
            ("vue", "2.6.0", "CVE-2024-9506 - ReDoS in parseHTML"),
            ("bootstrap", "4.3.1", "CVE-2019-8331 - XSS in tooltip data-template attribute"),
            ("bootstrap", "3.3.7", "CVE-2018-14041 - XSS in scrollspy data-target attribute"),
            ("angular", "1.6.9", "CVE-2019-10768 - prototype pollution in merge"),
            ("lodash", "4.17.4", "CVE-2018-3721 - prototype pollution"),
            ("moment", "2.19.2", "CVE-2017-18214 - regular expression denial of service"),
        ] {
            table.insert(library, version, advisory);
        }
        table
    }

    pub fn insert(&mut self, library: &str, version: &str, advisory: &str) {
        self.entries
            .entry(library.to_lowercase())
            .or_default()
            .insert(version.to_string(), advisory.to_string());
    }

    /// Parses `{"library": {"version": "advisory"}}`.
    pub fn from_json_str(raw: &str) -> Result<Self, ScanError> {
        let parsed: HashMap<String, HashMap<String, String>> = serde_json::from_str(raw)?;
        let mut table = Self::default();
        for (library, versions) in parsed {
            for (version, advisory) in versions {
                table.insert(&library, &version, &advisory);
            }
        }
        Ok(table)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ScanError::VulnDatabase(format!("{}: {}", path.display(), e)))?;
        let table = Self::from_json_str(&raw)?;
        debug!("Loaded {} vulnerable versions from {}", table.len(), path.display());
        Ok(table)
    }
}

impl VulnerabilitySource for VulnTable {
    fn lookup(&self, library: &str, version: &str) -> Option<String> {
        self.entries
            .get(&library.to_lowercase())
            .and_then(|versions| versions.get(version))
            .cloned()
    }

    fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_builtin_contains_jquery_331() {
        let table = VulnTable::builtin();
        assert!(table.lookup("jquery", "3.3.1").unwrap().starts_with("CVE-2019-11358"));
        assert!(table.lookup("JQuery", "3.3.1").is_some());
        assert!(table.lookup("jquery", "3.7.1").is_none());
    }

    #[test]
    fn test_from_json_str() {
        let table = VulnTable::from_json_str(r#"{"Lodash": {"4.17.20": "CVE-2021-23337"}}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("lodash", "4.17.20").as_deref(), Some("CVE-2021-23337"));
    }

    #[test]
    fn test_from_json_str_rejects_bad_shape() {
        assert!(matches!(
            VulnTable::from_json_str(r#"["jquery"]"#),
            Err(ScanError::VulnDatabase(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"vue": {{"2.5.0": "advisory"}}}}"#).unwrap();
        let table = VulnTable::from_file(file.path()).unwrap();
        assert!(table.lookup("vue", "2.5.0").is_some());
    }

    #[test]
    fn test_from_missing_file() {
        assert!(VulnTable::from_file(Path::new("/nonexistent/vulns.json")).is_err());
    }
}

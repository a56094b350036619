// File: target.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::ScanError;
use log::trace;
use reqwest::Url;
use std::collections::BTreeMap;

/// Injection points keyed by parameter name.
pub type InjectionPoints = BTreeMap<String, Vec<String>>;

/// A validated scan target. Immutable for the duration of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    url: Url,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, ScanError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ScanError::InvalidTarget("No URL provided".to_string()));
        }

        let url = Url::parse(raw).map_err(|e| ScanError::InvalidTarget(format!("{}: {}", raw, e)))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(ScanError::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ScanError::InvalidTarget(format!("{}: missing host", raw)));
        }

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(443)
    }

    /// Scheme, authority and path, without query or fragment.
    pub fn base_url(&self) -> String {
        let mut base = self.url.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.to_string()
    }

    /// Appends `path` to the base URL, avoiding a doubled slash.
    pub fn join_path(&self, path: &str) -> String {
        let base = self.base_url();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// The same target under another scheme, e.g. for the HTTP to HTTPS redirect check.
    pub fn with_scheme(&self, scheme: &str) -> Option<String> {
        let mut swapped = self.url.clone();
        swapped.set_scheme(scheme).ok()?;
        if swapped.port().is_some() {
            return None;
        }
        Some(swapped.to_string())
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Existing query parameters, or `default` when there are none, with
    /// `extra` merged on top.
    pub fn resolve(&self, default: (&str, &str), extra: &[(String, String)]) -> InjectionPoints {
        let mut points = InjectionPoints::new();
        for (name, value) in self.query_pairs() {
            points.entry(name).or_default().push(value);
        }

        if points.is_empty() {
            points.insert(default.0.to_string(), vec![default.1.to_string()]);
        }

        for (name, value) in extra {
            points.insert(name.clone(), vec![value.clone()]);
        }

        trace!("Resolved injection points for {}: {:?}", self.url, points);
        points
    }
}

/// Flattens injection points to query pairs with `param` replaced by `payload`.
pub fn substitute(points: &InjectionPoints, param: &str, payload: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name, values) in points {
        if name == param {
            pairs.push((name.clone(), payload.to_string()));
        } else {
            for value in values {
                pairs.push((name.clone(), value.clone()));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("not a url")]
    #[case("http://")]
    fn test_parse_rejects_malformed(#[case] raw: &str) {
        assert!(matches!(Target::parse(raw), Err(ScanError::InvalidTarget(_))));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(
            Target::parse("ftp://example.com/"),
            Err(ScanError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_resolve_uses_existing_params() {
        let target = Target::parse("http://example.com/item?id=5&sort=asc").unwrap();
        let points = target.resolve(("id", "1"), &[]);
        assert_eq!(points.len(), 2);
        assert_eq!(points["id"], vec!["5".to_string()]);
        assert_eq!(points["sort"], vec!["asc".to_string()]);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let target = Target::parse("http://example.com/search").unwrap();
        let points = target.resolve(("q", "test"), &[]);
        assert_eq!(points.len(), 1);
        assert_eq!(points["q"], vec!["test".to_string()]);
    }

    #[test]
    fn test_resolve_extra_params_override_defaults() {
        let target = Target::parse("http://example.com/").unwrap();
        let extra = vec![
            ("id".to_string(), "42".to_string()),
            ("lang".to_string(), "en".to_string()),
        ];
        let points = target.resolve(("id", "1"), &extra);
        assert_eq!(points["id"], vec!["42".to_string()]);
        assert_eq!(points["lang"], vec!["en".to_string()]);
    }

    #[test]
    fn test_substitute_replaces_only_target_param() {
        let target = Target::parse("http://example.com/?a=1&b=2&b=3").unwrap();
        let points = target.resolve(("id", "1"), &[]);
        let pairs = substitute(&points, "a", "' OR 1=1 --");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "' OR 1=1 --".to_string()),
                ("b".to_string(), "2".to_string()),
                ("b".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_join_path_and_base_url() {
        let target = Target::parse("https://example.com/app/?x=1#frag").unwrap();
        assert_eq!(target.base_url(), "https://example.com/app/");
        assert_eq!(target.join_path("/admin"), "https://example.com/app/admin");
        assert_eq!(target.join_path("backup/"), "https://example.com/app/backup/");
        assert_eq!(target.origin(), "https://example.com");
    }

    #[test]
    fn test_with_scheme() {
        let target = Target::parse("https://example.com/login").unwrap();
        assert_eq!(target.with_scheme("http").as_deref(), Some("http://example.com/login"));

        let custom_port = Target::parse("https://example.com:8443/").unwrap();
        assert_eq!(custom_port.with_scheme("http"), None);
    }

    #[test]
    fn test_host_and_port() {
        let target = Target::parse("https://example.com/").unwrap();
        assert_eq!(target.host(), "example.com");
        assert_eq!(target.port(), 443);
        assert!(target.is_https());
    }
}

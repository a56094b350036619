// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{ConfigParameter, ScanOptions};
use crate::report::ReportFormat;
use crate::result::VulnClass;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long = "log-level", default_value = "warn", global = true)]
    pub log_level: String,

    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose output",
        global = true
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Reduce output verbosity",
        global = true
    )]
    pub quiet: bool,

    #[arg(long = "no-color", help = "Disable colored output", global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan one target for one vulnerability class, or `all`.
    Scan(ScanArgs),
    /// List the vulnerability classes.
    Classes,
}

/// `all` or a single class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassSelection {
    All,
    One(VulnClass),
}

impl FromStr for ClassSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ClassSelection::All);
        }
        VulnClass::from_str(s).map(ClassSelection::One)
    }
}

impl ClassSelection {
    pub fn classes(&self) -> Vec<VulnClass> {
        match self {
            ClassSelection::All => VulnClass::ALL.to_vec(),
            ClassSelection::One(class) => vec![*class],
        }
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[arg(help = "Vulnerability class (see `classes`) or `all`")]
    pub class: ClassSelection,

    #[arg(help = "Target URL, e.g. https://example.com/item?id=1")]
    pub url: String,

    #[arg(long = "max-tests", default_value_t = 10, help = "Payloads tried per parameter")]
    pub max_tests: usize,

    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = 5,
        help = "HTTP request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(
        long = "time-threshold",
        help = "Delay in seconds that marks a time-based probe as vulnerable"
    )]
    pub time_threshold: Option<u64>,

    #[arg(
        short = 'p',
        long = "param",
        value_parser = parse_key_value,
        help = "Extra injection parameter as name=value (repeatable)"
    )]
    pub params: Vec<(String, String)>,

    #[arg(short = 'f', long = "format", value_enum, default_value = "text")]
    pub format: ReportFormat,

    #[arg(short = 'o', long = "output", help = "Write the report to a file")]
    pub output: Option<PathBuf>,

    #[arg(short = 'w', long = "wordlist", help = "Directory enumeration wordlist file")]
    pub wordlist: Option<PathBuf>,

    #[arg(long = "extensions", value_delimiter = ',', help = "Comma-separated extensions for directory enumeration")]
    pub extensions: Option<Vec<String>>,

    #[arg(long = "vuln-db", help = "JSON file of known-vulnerable library versions")]
    pub vuln_db: Option<PathBuf>,

    #[arg(short = 'r', long = "rate-limit", help = "Maximum requests per second")]
    pub rate_limit: Option<u32>,

    #[arg(short = 'c', long = "concurrency", default_value_t = 10)]
    pub concurrency: usize,

    #[arg(long = "user-agent")]
    pub user_agent: Option<String>,
}

impl ScanArgs {
    pub fn to_config(&self) -> ConfigParameter {
        let mut config = ConfigParameter::new();
        config.set_timeout(self.timeout);
        config.set_concurrency(self.concurrency);
        config.set_rate_limit(self.rate_limit);
        config.set_wordlist_path(self.wordlist.clone());
        config.set_vuln_db_path(self.vuln_db.clone());
        if let Some(threshold) = self.time_threshold {
            config.set_time_threshold(Duration::from_secs(threshold));
        }
        if let Some(user_agent) = &self.user_agent {
            config.set_user_agent(user_agent.clone());
        }
        config
    }

    pub fn to_options(&self) -> ScanOptions {
        ScanOptions {
            max_tests: self.max_tests,
            extra_params: self.params.clone(),
            extensions: self.extensions.clone(),
            ..ScanOptions::default()
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

/// Effective log level from `--log-level`, `-v` and `-q`.
pub fn log_level(cli: &Cli) -> log::LevelFilter {
    if cli.verbose {
        return log::LevelFilter::Debug;
    }
    if cli.quiet {
        return log::LevelFilter::Error;
    }
    log::LevelFilter::from_str(&cli.log_level).unwrap_or(log::LevelFilter::Warn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("id=5"), Ok(("id".to_string(), "5".to_string())));
        assert_eq!(parse_key_value("q=a=b"), Ok(("q".to_string(), "a=b".to_string())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_class_selection() {
        assert_eq!("all".parse::<ClassSelection>(), Ok(ClassSelection::All));
        assert_eq!(
            "sql".parse::<ClassSelection>(),
            Ok(ClassSelection::One(VulnClass::SqlInjection))
        );
        assert!("bogus".parse::<ClassSelection>().is_err());
        assert_eq!(ClassSelection::All.classes().len(), 13);
    }

    #[test]
    fn test_scan_command_parsing() {
        let cli = Cli::try_parse_from([
            "securiscan",
            "scan",
            "sql",
            "http://t.local/?id=1",
            "--max-tests",
            "3",
            "-p",
            "user=bob",
            "--format",
            "json",
            "--extensions",
            ".php,.bak",
            "-v",
        ])
        .unwrap();

        assert_eq!(log_level(&cli), log::LevelFilter::Debug);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.class, ClassSelection::One(VulnClass::SqlInjection));
        assert_eq!(args.format, ReportFormat::Json);

        let options = args.to_options();
        assert_eq!(options.max_tests, 3);
        assert_eq!(options.extra_params, vec![("user".to_string(), "bob".to_string())]);
        assert_eq!(options.extensions, Some(vec![".php".to_string(), ".bak".to_string()]));
        assert_eq!(args.to_config().timeout(), 5);
    }

    #[test]
    fn test_log_level_defaults() {
        let cli = Cli::try_parse_from(["securiscan", "classes"]).unwrap();
        assert_eq!(log_level(&cli), log::LevelFilter::Warn);
        let cli = Cli::try_parse_from(["securiscan", "--log-level", "info", "classes"]).unwrap();
        assert_eq!(log_level(&cli), log::LevelFilter::Info);
    }
}

// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use securiscan::cli::{log_level, Cli, ClassSelection, Commands, ScanArgs};
use securiscan::engine::Engine;
use securiscan::report::ReportGenerator;
use securiscan::result::{ScanResult, VulnClass};
use simple_logger::SimpleLogger;
use std::process::ExitCode;

fn print_classes() {
    for class in VulnClass::ALL {
        println!("  {:<18} {}", class.slug().bold(), class.label());
    }
}

async fn run_all(engine: &Engine, args: &ScanArgs, show_progress: bool) -> Result<Vec<ScanResult>> {
    let classes = args.class.classes();
    let options = args.to_options();

    let pb = if show_progress {
        let pb = ProgressBar::new(classes.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut pending: FuturesUnordered<_> = classes
        .iter()
        .enumerate()
        .map(|(index, class)| {
            let options = &options;
            async move { (index, *class, engine.scan(*class, &args.url, options).await) }
        })
        .collect();

    let mut results: Vec<(usize, ScanResult)> = Vec::with_capacity(classes.len());
    while let Some((index, class, result)) = pending.next().await {
        let result = result.with_context(|| format!("{} scan of {} failed", class.label(), args.url))?;
        pb.set_message(class.slug());
        pb.inc(1);
        results.push((index, result));
    }
    pb.finish_and_clear();

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}

async fn run_scan(args: &ScanArgs) -> Result<bool> {
    let engine = Engine::new(args.to_config()).context("Failed to initialise scan engine")?;
    let show_progress = args.class == ClassSelection::All && args.output.is_none();

    let results = run_all(&engine, args, show_progress).await?;

    match &args.output {
        Some(path) => {
            ReportGenerator::write_report(&results, path, args.format)?;
            println!("{} Report written to {}", "✓".green().bold(), path.display());
        }
        None => println!("{}", ReportGenerator::render(&results, args.format)?),
    }

    if let Some(stats) = engine.stats() {
        info!(
            "{} probes sent: {} completed, {} failed",
            stats.total(),
            stats.completed(),
            stats.failed()
        );
    }

    Ok(results.iter().any(ScanResult::is_vulnerable))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if let Err(e) = SimpleLogger::new().with_level(log_level(&cli)).init() {
        eprintln!("{} Failed to initialise logger: {}", "✗".red().bold(), e);
    }

    match &cli.command {
        Commands::Classes => {
            print_classes();
            ExitCode::SUCCESS
        }
        Commands::Scan(args) => match run_scan(args).await {
            Ok(true) => ExitCode::from(1),
            Ok(false) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                ExitCode::from(2)
            }
        },
    }
}

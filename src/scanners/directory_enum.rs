// File: directory_enum.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{ClassReport, ScanContext, Scanner};
use crate::payloads::{DIRECTORY_EXTENSIONS, DIRECTORY_WORDLIST};
use crate::result::{Finding, Severity, VulnClass};
use crate::target::Target;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, info};

pub struct DirectoryEnum;

/// `word/` plus `word<ext>` for every extension, in wordlist order.
pub fn candidates(target: &Target, words: &[String], extensions: &[String]) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(words.len() * (extensions.len() + 1));
    for word in words {
        let word = word.trim().trim_matches('/');
        if word.is_empty() {
            continue;
        }
        let dir = format!("{}/", word);
        out.push((target.join_path(&dir), dir));
        for ext in extensions {
            let file = format!("{}{}", word, ext);
            out.push((target.join_path(&file), file));
        }
    }
    out
}

fn classify(url: &str, status: u16) -> Option<Finding> {
    let finding = match status {
        200 => Finding::vulnerable(url, Severity::Medium, "Accessible path found"),
        301 => Finding::vulnerable(url, Severity::Low, "Path exists (redirect)"),
        403 => Finding::clean(url, "Path exists but access is forbidden"),
        _ => return None,
    };
    Some(finding.with_status(status).with_method("GET"))
}

#[async_trait]
impl Scanner for DirectoryEnum {
    fn class(&self) -> VulnClass {
        VulnClass::DirectoryEnum
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let words: Vec<String> = match &ctx.options.wordlist {
            Some(words) => words.clone(),
            None => DIRECTORY_WORDLIST.iter().map(|w| w.to_string()).collect(),
        };
        let extensions: Vec<String> = match &ctx.options.extensions {
            Some(extensions) => extensions.clone(),
            None => DIRECTORY_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        };

        let candidates = candidates(ctx.target, &words, &extensions);
        info!(
            "Enumerating {} paths on {} with concurrency {}",
            candidates.len(),
            ctx.target.as_str(),
            ctx.settings.concurrency
        );

        let mut findings: Vec<Finding> = stream::iter(candidates)
            .map(|(url, path)| async move {
                let request = ctx.get(&url).without_redirects();
                let response = ctx.send(&request).await?;
                debug!("{} -> {}", path, response.status());
                classify(&url, response.status()).map(|finding| finding.with_payload(&path))
            })
            .buffer_unordered(ctx.settings.concurrency)
            .filter_map(|finding| async move { finding })
            .collect()
            .await;

        findings.sort_by(|a, b| a.location.cmp(&b.location));
        ClassReport::new(findings)
    }
}

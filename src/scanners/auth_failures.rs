// File: auth_failures.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{ClassReport, ScanContext, Scanner};
use crate::html::{extract_forms, FormInfo};
use crate::payloads::{DEFAULT_CREDENTIALS, LOGIN_PATHS, RATE_LIMIT_ATTEMPTS};
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::{LOCKOUT_MARKERS, LOGIN_FAILURE};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::time::Duration;

const LATENCY_GROWTH: Duration = Duration::from_millis(500);
const SESSION_COOKIE_HINTS: &[&str] = &["sess", "sid", "auth", "token"];

pub struct AuthFailures;

/// Where and how to submit credentials for one login page.
#[derive(Debug, Clone, PartialEq)]
struct LoginForm {
    action: String,
    user_field: String,
    password_field: String,
    extra: Vec<(String, String)>,
}

impl LoginForm {
    fn discover(page: &ProbeResponse, login_url: &str) -> Self {
        let forms = extract_forms(page.body(), page.url());
        match forms.iter().find(|f| f.has_password()) {
            Some(form) => Self::from_form(form),
            None => Self {
                action: login_url.to_string(),
                user_field: "username".to_string(),
                password_field: "password".to_string(),
                extra: Vec::new(),
            },
        }
    }

    fn from_form(form: &FormInfo) -> Self {
        let password_field = form
            .inputs
            .iter()
            .find(|i| i.is_password())
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "password".to_string());
        let user_field = form
            .inputs
            .iter()
            .find(|i| !i.is_password() && !i.is_hidden() && i.input_type != "submit")
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "username".to_string());
        let extra = form
            .inputs
            .iter()
            .filter(|i| i.is_hidden())
            .map(|i| (i.name.clone(), i.value.clone().unwrap_or_default()))
            .collect();
        Self {
            action: form.action.clone(),
            user_field,
            password_field,
            extra,
        }
    }

    fn fields(&self, username: &str, password: &str) -> Vec<(String, String)> {
        let mut fields = vec![
            (self.user_field.clone(), username.to_string()),
            (self.password_field.clone(), password.to_string()),
        ];
        fields.extend(self.extra.iter().cloned());
        fields
    }
}

/// `(name, value)` of every cookie the response sets.
fn cookie_pairs(response: &ProbeResponse) -> Vec<(String, String)> {
    response
        .set_cookies()
        .into_iter()
        .filter_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn is_session_cookie(name: &str) -> bool {
    let name = name.to_lowercase();
    SESSION_COOKIE_HINTS.iter().any(|hint| name.contains(hint))
}

/// Session cookies issued before login that the login response left in place.
fn unrotated_cookies(before: &ProbeResponse, after: &ProbeResponse) -> Vec<String> {
    let issued = cookie_pairs(after);
    cookie_pairs(before)
        .into_iter()
        .filter(|(name, _)| is_session_cookie(name))
        .filter(|(name, value)| match issued.iter().find(|(n, _)| n == name) {
            Some((_, new_value)) => new_value == value,
            None => true,
        })
        .map(|(name, _)| name)
        .collect()
}

fn login_accepted(response: &ProbeResponse) -> bool {
    response.status() == 200 && !LOGIN_FAILURE.is_match(response.body()) && !LOCKOUT_MARKERS.is_match(response.body())
}

/// True when repeated failures were answered with throttling of any kind.
fn throttled(responses: &[ProbeResponse]) -> bool {
    if responses
        .iter()
        .any(|r| r.status() == 429 || LOCKOUT_MARKERS.is_match(r.body()))
    {
        return true;
    }
    match (responses.first(), responses.last()) {
        (Some(first), Some(last)) if responses.len() > 1 => last.elapsed() > first.elapsed() + LATENCY_GROWTH,
        _ => false,
    }
}

impl AuthFailures {
    async fn test_login(&self, ctx: &ScanContext<'_>, login_url: &str, page: &ProbeResponse) -> Vec<Finding> {
        let form = LoginForm::discover(page, login_url);
        debug!("Login form at {} posts {}/{}", form.action, form.user_field, form.password_field);
        let mut findings = Vec::new();

        for (username, password) in DEFAULT_CREDENTIALS {
            let request = ctx.post(&form.action).with_form(form.fields(username, password));
            let Some(response) = ctx.send(&request).await else {
                continue;
            };
            if !login_accepted(&response) {
                continue;
            }
            let credentials = format!("{}/{}", username, password);
            findings.push(
                Finding::vulnerable(
                    &form.action,
                    Severity::Critical,
                    format!("Default credentials worked: {}", credentials),
                )
                .with_payload(&credentials)
                .with_method("POST")
                .with_status(response.status()),
            );

            let stale = unrotated_cookies(page, &response);
            if !stale.is_empty() {
                findings.push(
                    Finding::vulnerable(
                        &form.action,
                        Severity::Medium,
                        format!("Session cookie not rotated after login: {}", stale.join(", ")),
                    )
                    .with_method("POST"),
                );
            }
            break;
        }

        let mut failures = Vec::with_capacity(RATE_LIMIT_ATTEMPTS);
        for attempt in 0..RATE_LIMIT_ATTEMPTS {
            let password = format!("securiscan-wrong-{}", attempt);
            let request = ctx.post(&form.action).with_form(form.fields("admin", &password));
            if let Some(response) = ctx.send(&request).await {
                failures.push(response);
            }
        }
        if failures.len() == RATE_LIMIT_ATTEMPTS && !throttled(&failures) {
            findings.push(
                Finding::vulnerable(
                    &form.action,
                    Severity::Medium,
                    format!("No rate limiting after {} rapid failed logins", RATE_LIMIT_ATTEMPTS),
                )
                .with_method("POST"),
            );
        }

        findings
    }
}

#[async_trait]
impl Scanner for AuthFailures {
    fn class(&self) -> VulnClass {
        VulnClass::AuthFailures
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let url = ctx.target.as_str();
        let session = match ctx.executor.session() {
            Ok(session) => session,
            Err(e) => {
                warn!("Could not open login session for {}: {}", url, e);
                return ClassReport::new(vec![Finding::incomplete(url, format!("Authentication check incomplete: {}", e))]);
            }
        };
        let ctx = ScanContext {
            executor: session.as_ref(),
            target: ctx.target,
            settings: ctx.settings,
            options: ctx.options,
            vuln_source: ctx.vuln_source,
        };

        let mut findings = Vec::new();
        for path in LOGIN_PATHS.iter().take(ctx.settings.max_tests) {
            let login_url = ctx.target.join_path(path);
            let Some(page) = ctx.send(&ctx.get(&login_url)).await else {
                continue;
            };
            if page.status() != 200 {
                continue;
            }
            info!("Login page found at {}", login_url);
            findings.push(Finding::clean(&login_url, "Login page found").with_status(200));
            findings.extend(self.test_login(&ctx, &login_url, &page).await);
        }

        ClassReport::new(findings)
    }
}

// File: html.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{Html, Selector};

static FORM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("form").expect("valid selector"));
static INPUT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input, select, textarea").expect("valid selector"));
static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("script").expect("valid selector"));

#[derive(Debug, Clone, PartialEq)]
pub struct InputField {
    pub name: String,
    pub input_type: String,
    pub value: Option<String>,
}

impl InputField {
    pub fn is_hidden(&self) -> bool {
        self.input_type.eq_ignore_ascii_case("hidden")
    }

    pub fn is_password(&self) -> bool {
        self.input_type.eq_ignore_ascii_case("password")
    }

    /// Hidden inputs named like an anti-forgery token.
    pub fn is_csrf_token(&self) -> bool {
        let name = self.name.to_lowercase();
        self.is_hidden() && (name.contains("csrf") || name.contains("token"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormInfo {
    pub action: String,
    pub method: String,
    pub inputs: Vec<InputField>,
}

impl FormInfo {
    pub fn has_csrf_token(&self) -> bool {
        self.inputs.iter().any(InputField::is_csrf_token)
    }

    pub fn has_password(&self) -> bool {
        self.inputs.iter().any(InputField::is_password)
    }

    pub fn is_state_changing(&self) -> bool {
        matches!(self.method.as_str(), "POST" | "PUT" | "DELETE")
    }

    /// Field values to submit, with token fields left out.
    pub fn fields_without_token(&self) -> Vec<(String, String)> {
        self.inputs
            .iter()
            .filter(|input| !input.is_csrf_token())
            .map(|input| {
                let value = input.value.clone().unwrap_or_else(|| "test".to_string());
                (input.name.clone(), value)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptRef {
    External(String),
    Inline(String),
}

/// Forms with their actions resolved against `base_url`.
pub fn extract_forms(body: &str, base_url: &str) -> Vec<FormInfo> {
    let document = Html::parse_document(body);
    let base = Url::parse(base_url).ok();
    let mut forms = Vec::new();

    for form in document.select(&FORM_SELECTOR) {
        let raw_action = form.value().attr("action").unwrap_or("").to_string();
        let action = base
            .as_ref()
            .and_then(|b| b.join(&raw_action).ok())
            .map(|u| u.to_string())
            .unwrap_or(raw_action);
        let method = form.value().attr("method").unwrap_or("GET").to_uppercase();

        let mut inputs = Vec::new();
        for input in form.select(&INPUT_SELECTOR) {
            let name = input.value().attr("name").unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }
            inputs.push(InputField {
                name,
                input_type: input.value().attr("type").unwrap_or("text").to_string(),
                value: input.value().attr("value").map(String::from),
            });
        }

        forms.push(FormInfo { action, method, inputs });
    }

    forms
}

/// Script tags in document order. External sources are kept as written.
pub fn extract_scripts(body: &str) -> Vec<ScriptRef> {
    let document = Html::parse_document(body);
    document
        .select(&SCRIPT_SELECTOR)
        .filter_map(|element| match element.value().attr("src") {
            Some(src) if !src.trim().is_empty() => Some(ScriptRef::External(src.trim().to_string())),
            Some(_) => None,
            None => {
                let text: String = element.text().collect();
                if text.trim().is_empty() {
                    None
                } else {
                    Some(ScriptRef::Inline(text))
                }
            }
        })
        .collect()
}

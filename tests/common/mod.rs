// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use securiscan::{ConfigParameter, Engine};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn create_html_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(content)
        .append_header("content-type", "text/html")
}

pub async fn mount_page(server: &MockServer, route: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(create_html_response(content))
        .mount(server)
        .await;
}

/// Engine with short timeouts for tests against a local mock server.
pub fn test_engine() -> Engine {
    let mut config = ConfigParameter::new();
    config.set_timeout(2);
    config.set_time_based_timeout(3);
    Engine::new(config).expect("engine")
}

/// Any query value of the request contains `needle`.
pub fn query_contains(needle: &'static str) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |request: &Request| request.url.query_pairs().any(|(_, v)| v.contains(needle))
}

pub fn sample_page_with_scripts() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
    <title>Shop</title>
    <script src="/static/jquery-3.3.1.min.js"></script>
    <script src="/static/bootstrap-5.3.2.min.js"></script>
</head>
<body><h1>Welcome</h1></body>
</html>"#
        .to_string()
}

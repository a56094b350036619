// File: sql_injection.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use super::{probe_parameters, time_based_parameter, ClassReport, ScanContext, Scanner};
use crate::payloads::{SQL_PAYLOADS, SQL_TIME_BASED};
use crate::probe::ProbeResponse;
use crate::result::{Finding, Severity, VulnClass};
use crate::signatures::SQL_ERRORS;
use async_trait::async_trait;

pub struct SqlInjection;

fn classify(param: &str, _payload: &str, response: &ProbeResponse) -> Finding {
    let hits = SQL_ERRORS.find_matches(response.body());
    if hits.is_empty() {
        Finding::clean(param, "No SQL error signature in response")
    } else {
        Finding::vulnerable(
            param,
            Severity::High,
            format!("SQL error signature found in response: {}", hits.join(", ")),
        )
    }
}

#[async_trait]
impl Scanner for SqlInjection {
    fn class(&self) -> VulnClass {
        VulnClass::SqlInjection
    }

    async fn run(&self, ctx: &ScanContext<'_>) -> ClassReport {
        let points = ctx.target.resolve(("id", "1"), &ctx.settings.extra_params);
        let findings = probe_parameters(ctx, &points, SQL_PAYLOADS.iter().copied(), classify).await;
        let time_based = time_based_parameter(
            ctx,
            &points,
            SQL_TIME_BASED,
            "Significant response delay (possible blind SQL injection)",
        )
        .await;

        ClassReport {
            findings,
            time_based,
        }
    }
}

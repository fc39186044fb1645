use anyhow::Result;
use serde::Serialize;

use crate::engine::AnalysisFailure;
use crate::models::Dependency;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    dependencies: &'a [Dependency],
    failures: &'a [AnalysisFailure],
}

pub fn to_string(deps: &[Dependency], failures: &[AnalysisFailure]) -> Result<String> {
    let report = JsonReport {
        dependencies: deps,
        failures,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

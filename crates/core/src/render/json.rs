//! JSON rendering for reports

use crate::report::Report;

/// Render the report as a pretty-printed JSON string
pub fn render_json_string(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

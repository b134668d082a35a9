//! JSON output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::location::LocationSnapshot;

/// JSON formatter - outputs the full snapshot as pretty-printed JSON
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Full JSON snapshot"
    }

    fn format(&self, snapshot: &LocationSnapshot, _config: &Config) -> Result<String> {
        Ok(serde_json::to_string_pretty(snapshot)?)
    }
}

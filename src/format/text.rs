//! Human-readable text output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::location::LocationSnapshot;

/// Text formatter - outputs a human-readable summary
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable text"
    }

    fn format(&self, snapshot: &LocationSnapshot, _config: &Config) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!("{}\n", snapshot.address));
        output.push_str(&format!("Coordinates: {}\n", snapshot.coordinate));
        output.push_str(&format!("Source: {}\n", snapshot.source.label()));
        if let Some(accuracy) = snapshot.accuracy {
            output.push_str(&format!("Accuracy: ±{:.0}m\n", accuracy));
        }
        if snapshot.is_provisional() {
            output.push_str("Address: looking up...\n");
        }

        let status = if snapshot.is_actionable() {
            "confirmed"
        } else {
            "not confirmed"
        };
        output.push_str(&format!("Status: {}\n", status));

        Ok(output)
    }
}

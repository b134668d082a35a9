//! URL output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::location::LocationSnapshot;

/// URL formatter - outputs a map link for the snapshot's coordinate
pub struct UrlFormatter;

impl UrlFormatter {
    /// Format URL with optional provider override
    pub fn format_with_provider(
        &self,
        snapshot: &LocationSnapshot,
        config: &Config,
        provider: Option<&str>,
    ) -> Result<String> {
        config.format_url(provider, snapshot.coordinate.lat, snapshot.coordinate.lng)
    }
}

impl OutputFormatter for UrlFormatter {
    fn name(&self) -> &str {
        "url"
    }

    fn description(&self) -> &str {
        "Map URL for the location"
    }

    fn format(&self, snapshot: &LocationSnapshot, config: &Config) -> Result<String> {
        self.format_with_provider(snapshot, config, None)
    }
}

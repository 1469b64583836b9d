use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Published salary dataset used when no other source is configured.
pub const DEFAULT_DATA_URL: &str =
    "https://raw.githubusercontent.com/vqrca/dashboard_salarios_dados/refs/heads/main/dados-imersao-final.csv";

/// Looked up in the working directory at startup.
pub const CONFIG_FILE_NAME: &str = "salary-dashboard.json";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Every field is optional in the JSON file; missing ones keep their default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// URL or local path of the dataset.
    pub data_url: String,
    /// File name offered by the download action.
    pub export_file_name: String,
    pub histogram_bins: usize,
    /// Size of the job-title ranking.
    pub top_n: usize,
    /// Job title shown on the country map.
    pub focus_title: String,
    pub request_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_DATA_URL.to_string(),
            export_file_name: "dados_filtrados.csv".to_string(),
            histogram_bins: 30,
            top_n: 10,
            focus_title: "Data Scientist".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl DashboardConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read `path` if it exists. A missing file means defaults; a malformed
    /// one is logged and also falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("Failed to read {}: {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<DashboardConfig>(&text) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("Ignoring malformed config {}: {e}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DashboardConfig::load_or_default(&dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.histogram_bins, 30);
        assert_eq!(cfg.top_n, 10);
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "data_url": "local.csv", "top_n": 5 }"#).unwrap();
        let cfg = DashboardConfig::load_or_default(&path);
        assert_eq!(cfg.data_url, "local.csv");
        assert_eq!(cfg.top_n, 5);
        assert_eq!(cfg.focus_title, "Data Scientist");
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "top_n": "ten" }"#).unwrap();
        assert_eq!(DashboardConfig::load_or_default(&path), DashboardConfig::default());
    }
}

//! Configuration loaded from `.cohort-risk.toml`.
//!
//! Every field has a default, so an empty or partial file is valid.
//! Command-line flags are applied on top in `main`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = ".cohort-risk.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Where and how the student sheet is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Sheet to read when the input is a workbook directory.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Inputs above this size are rejected before parsing.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

fn default_sheet_name() -> String {
    "Reporte IA".to_string()
}

fn default_max_input_bytes() -> u64 {
    16 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,

    /// Save every analysis run to the history directory.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: default_history_dir(),
            enabled: true,
        }
    }
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("history")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("report.md")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Returns `Ok(None)` when no config file exists in the working directory.
    pub fn load_default() -> Result<Option<Self>> {
        let path = Path::new(DEFAULT_CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to render default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_settings() {
        let config = Config::default();
        assert_eq!(config.ingest.sheet_name, "Reporte IA");
        assert_eq!(config.ingest.max_input_bytes, 16 * 1024 * 1024);
        assert_eq!(config.history.dir, PathBuf::from("history"));
        assert!(config.history.enabled);
        assert_eq!(config.export.output, PathBuf::from("report.md"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let toml_content = r#"
[ingest]
sheet_name = "Grupo A"

[history]
enabled = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.ingest.sheet_name, "Grupo A");
        assert_eq!(config.ingest.max_input_bytes, 16 * 1024 * 1024);
        assert!(!config.history.enabled);
        assert_eq!(config.history.dir, PathBuf::from("history"));
    }

    #[test]
    fn default_toml_round_trips() {
        let rendered = Config::default_toml().unwrap();
        assert!(rendered.contains("[ingest]"));
        assert!(rendered.contains("[history]"));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.ingest.sheet_name, "Reporte IA");
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[export]\noutput = \"out/cohort.md\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.export.output, PathBuf::from("out/cohort.md"));
    }

    #[test]
    fn load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[ingest\nsheet_name = 1").unwrap();

        assert!(Config::load(&path).is_err());
    }
}

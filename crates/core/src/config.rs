use serde::{Deserialize, Serialize};

use crate::lrc::TRANSLATION_TOLERANCE_SECS;

fn default_schema_version() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub search_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 10_000,
            search_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Command,
    Stdin,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub command: Vec<String>,
    pub path: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Command,
            command: vec![
                "adb".to_string(),
                "logcat".to_string(),
                "-s".to_string(),
                "USB_MUSIC:D".to_string(),
            ],
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub translation_tolerance_secs: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            translation_tolerance_secs: TRANSLATION_TOLERANCE_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub include_translation: bool,
    pub output_dir: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_translation: true,
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: default_log_level(),
            catalog: CatalogConfig::default(),
            source: SourceConfig::default(),
            matching: MatchingConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

// Application settings
// Loaded from ~/.config/gridcrm/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Import
    #[serde(rename = "import.maxRows")]
    pub import_max_rows: usize,

    #[serde(rename = "import.maxFileBytes")]
    pub import_max_file_bytes: u64,

    #[serde(rename = "import.allowedExtensions")]
    pub import_allowed_extensions: Vec<String>,

    // Grid
    #[serde(rename = "grid.placeholderRows")]
    pub placeholder_rows: usize,

    // Enrichment
    #[serde(rename = "enrichment.progressClearDelayMs")]
    pub progress_clear_delay_ms: u64,

    #[serde(rename = "enrichment.financialKeywords")]
    pub financial_keywords: Vec<String>,

    // Generation
    #[serde(rename = "generation.maxCount")]
    pub generation_max_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Import
            import_max_rows: 1000,
            import_max_file_bytes: 5 * 1024 * 1024,
            import_allowed_extensions: ["csv", "tsv", "txt", "xlsx", "xls", "ods"]
                .into_iter()
                .map(String::from)
                .collect(),
            // Grid
            placeholder_rows: 20,
            // Enrichment
            progress_clear_delay_ms: 3000,
            financial_keywords: ["revenue", "funding", "valuation", "employees", "profit"]
                .into_iter()
                .map(String::from)
                .collect(),
            // Generation
            generation_max_count: 50,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridcrm");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. Missing keys take their defaults;
    /// an unreadable or malformed file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring whole-line `//` comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn progress_clear_delay(&self) -> Duration {
        Duration::from_millis(self.progress_clear_delay_ms)
    }

    /// True if `ext` (without the dot, any case) is an accepted import type.
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.import_allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    /// True if a column title names a financial figure.
    pub fn is_financial(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.financial_keywords
            .iter()
            .any(|k| title.contains(&k.to_lowercase()))
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Import limits (files over these are rejected, never truncated)
    "import.maxRows": 1000,
    "import.maxFileBytes": 5242880,
    "import.allowedExtensions": ["csv", "tsv", "txt", "xlsx", "xls", "ods"],

    // Empty rows kept at the bottom of every table
    "grid.placeholderRows": 20,

    // How long finished enrichment progress stays visible
    "enrichment.progressClearDelayMs": 3000,
    // Column titles containing these words get the financial phase
    "enrichment.financialKeywords": ["revenue", "funding", "valuation", "employees", "profit"],

    // Upper bound on companies requested per generation
    "generation.maxCount": 50
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

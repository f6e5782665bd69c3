use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Nested config sections
// ---------------------------------------------------------------------------

/// A font file tried by the direct PDF layout backend, resolved relative to
/// [`ForgeConfig::font_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontCandidateConfig {
    pub name: String,
    pub file: PathBuf,
}

/// An external HTML-to-PDF converter. `{input}` and `{output}` in `args` are
/// replaced with the HTML and PDF paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlEngineConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// Fixed text printed by the direct layout backend above the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentLabels {
    pub title: String,
    pub file: String,
    pub records: String,
    pub columns: String,
    pub generated: String,
}

impl Default for DocumentLabels {
    fn default() -> Self {
        Self {
            title: "Data from file".into(),
            file: "File".into(),
            records: "Records".into(),
            columns: "Columns".into(),
            generated: "Generated".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ForgeConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.dataforge/config.json`.
///
/// Relative paths are resolved against the working directory of the process,
/// matching the layout of a checkout (`templates/`, `fonts/`, `output/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    // Output
    pub output_dir: PathBuf,

    // HTML-to-PDF path
    pub template_path: PathBuf,
    pub html_enabled: bool,
    pub html_engines: Vec<HtmlEngineConfig>,

    // Direct layout path
    pub font_dir: PathBuf,
    pub font_candidates: Vec<FontCandidateConfig>,
    pub labels: DocumentLabels,

    // Readers
    pub default_separator: String,

    // General
    pub log_level: String,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            template_path: PathBuf::from("templates").join("template.html"),
            html_enabled: true,
            html_engines: vec![
                HtmlEngineConfig {
                    program: "weasyprint".into(),
                    args: vec!["{input}".into(), "{output}".into()],
                },
                HtmlEngineConfig {
                    program: "wkhtmltopdf".into(),
                    args: vec![
                        "--quiet".into(),
                        "--encoding".into(),
                        "utf-8".into(),
                        "{input}".into(),
                        "{output}".into(),
                    ],
                },
            ],
            font_dir: PathBuf::from("fonts"),
            font_candidates: vec![
                FontCandidateConfig {
                    name: "DejaVuSans".into(),
                    file: PathBuf::from("DejaVuSans.ttf"),
                },
                FontCandidateConfig {
                    name: "ArialUnicode".into(),
                    file: PathBuf::from("Arial Unicode.ttf"),
                },
                FontCandidateConfig {
                    name: "RobotoBold".into(),
                    file: PathBuf::from("Roboto-Bold.ttf"),
                },
            ],
            labels: DocumentLabels::default(),
            default_separator: "\t".into(),
            log_level: "info".into(),
        }
    }
}

impl ForgeConfig {
    /// Returns the base config directory: `~/.dataforge/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".dataforge"))
    }

    /// Returns the config file path: `~/.dataforge/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.dataforge/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        let dirs = [Self::base_dir()?, Self::logs_dir()?];
        for dir in &dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates default if missing.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path, writing defaults there if the
    /// file does not exist yet. Does not log: this runs before logging is set
    /// up.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            Ok(config)
        }
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Font candidates in priority order with paths joined onto `font_dir`.
    pub fn font_paths(&self) -> Vec<(String, PathBuf)> {
        self.font_candidates
            .iter()
            .map(|c| (c.name.clone(), self.font_dir.join(&c.file)))
            .collect()
    }

    /// The configured separator, falling back to a tab when it is empty.
    pub fn separator(&self) -> &str {
        if self.default_separator.is_empty() {
            "\t"
        } else {
            &self.default_separator
        }
    }
}

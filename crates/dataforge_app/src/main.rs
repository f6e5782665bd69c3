use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, warn};

use dataforge_core::logging;
use dataforge_core::{ForgeConfig, ForgeError};
use dataforge_docs::{FormatReader, SourceFormat};
use dataforge_pdf::{Capabilities, RenderOrchestrator, RenderRequest, RenderSettings};

/// Convert a CSV, JSON, XLSX, DOCX or TXT table into a printable PDF.
#[derive(Parser, Debug)]
#[command(name = "dataforge", version, about, long_about = None)]
struct Cli {
    /// Source file to convert
    path: PathBuf,

    /// Source format (csv, json, xlsx, docx, txt); detected from the extension if omitted
    #[arg(long)]
    format: Option<SourceFormat>,

    /// Column separator for plain-text input
    #[arg(long)]
    separator: Option<String>,

    /// Directory the PDF is written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// HTML document template
    #[arg(long)]
    template: Option<PathBuf>,

    /// Directory searched for embeddable fonts
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Configuration file (defaults to ~/.dataforge/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the HTML-to-PDF engine and always use the direct layout
    #[arg(long, default_value_t = false)]
    direct_only: bool,

    /// Produce a document even when the source has no data
    #[arg(long, default_value_t = false)]
    render_empty: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    fn apply(&self, config: &mut ForgeConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(template) = &self.template {
            config.template_path = template.clone();
        }
        if let Some(dir) = &self.font_dir {
            config.font_dir = dir.clone();
        }
        if let Some(separator) = self.separator.as_ref().filter(|s| !s.is_empty()) {
            config.default_separator = separator.clone();
        }
        if self.direct_only {
            config.html_enabled = false;
        }
    }

    fn source_format(&self) -> Result<SourceFormat, ForgeError> {
        match self.format {
            Some(format) => Ok(format),
            None => Ok(SourceFormat::from_path(&self.path)?),
        }
    }
}

/// Configuration and, when the per-user file could not be used, why.
type LoadedConfig = (ForgeConfig, Option<anyhow::Error>);

/// An explicit `--config` must load. The implicit per-user file falls back
/// to defaults, and the failure is reported once logging is up.
fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ForgeError> {
    match path {
        Some(path) => ForgeConfig::load_from_path(path)
            .map(|config| (config, None))
            .map_err(|e| ForgeError::Config(format!("{e:#}"))),
        None => Ok(match ForgeConfig::load() {
            Ok(config) => (config, None),
            Err(e) => (ForgeConfig::default(), Some(e)),
        }),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref());
    let log_level = match &loaded {
        Ok((config, _)) => config.log_level.clone(),
        Err(_) => ForgeConfig::default().log_level,
    };

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = match logging::init_logging(&log_level) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e:#}");
            None
        }
    };

    info!("Starting DataForge v{}", env!("CARGO_PKG_VERSION"));

    let result = loaded.and_then(|(mut config, fallback)| {
        match (&cli.config, fallback) {
            (Some(path), _) => info!("Using config {}", path.display()),
            (None, Some(e)) => warn!("Failed to load config, using defaults: {e:#}"),
            (None, None) => debug!("Using per-user config"),
        }
        cli.apply(&mut config);
        run(&cli, &config)
    });

    match result {
        Ok(Some(path)) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            error!(category = ?e.category(), "{e}");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Read, render and write. Returns the written path, or `None` when the
/// source had no data and rendering was skipped.
fn run(cli: &Cli, config: &ForgeConfig) -> Result<Option<PathBuf>, ForgeError> {
    let format = cli.source_format()?;
    let reader = FormatReader::for_format(format, config.separator());
    info!("Reading {} as {}", cli.path.display(), format.label());

    let record = reader.read(&cli.path)?;
    debug!(
        rows = record.row_count(),
        columns = record.column_count(),
        "source read"
    );

    if record.is_empty() && !cli.render_empty {
        warn!("No data in {}; nothing to render", cli.path.display());
        return Ok(None);
    }

    let capabilities = if config.html_enabled {
        Capabilities::probe(&config.html_engines)
    } else {
        Capabilities::none()
    };

    let mut orchestrator =
        RenderOrchestrator::new(RenderSettings::from_config(config), &capabilities)?;
    let filename = cli
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.path.display().to_string());

    let outcome = orchestrator.render(RenderRequest::new(record, filename), &config.output_dir)?;
    if outcome.fallback_used {
        warn!("Rendered with the {} fallback backend", outcome.backend);
    }
    if let Some(font) = outcome.font.as_ref().filter(|f| f.degraded) {
        warn!("Using fallback font {}", font.font_name);
    }
    Ok(Some(outcome.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dataforge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_path_is_required() {
        assert!(Cli::try_parse_from(["dataforge"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["data.csv"]);
        assert_eq!(cli.path, PathBuf::from("data.csv"));
        assert!(cli.format.is_none());
        assert!(!cli.direct_only);
        assert!(!cli.render_empty);
        assert_eq!(cli.source_format().unwrap(), SourceFormat::DelimitedText);
    }

    #[test]
    fn test_explicit_format_overrides_extension() {
        let cli = parse(&["notes.dat", "--format", "txt"]);
        assert_eq!(cli.source_format().unwrap(), SourceFormat::PlainText);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["dataforge", "a.csv", "--format", "pdf"]).is_err());

        let cli = parse(&["notes.dat"]);
        let err = cli.source_format().unwrap_err();
        assert_eq!(err.category(), dataforge_core::ErrorCategory::InputError);
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = parse(&[
            "data.txt",
            "--separator",
            ";",
            "--output-dir",
            "pdfs",
            "--template",
            "custom.html",
            "--font-dir",
            "/usr/share/fonts",
            "--direct-only",
        ]);
        let mut config = ForgeConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.separator(), ";");
        assert_eq!(config.output_dir, PathBuf::from("pdfs"));
        assert_eq!(config.template_path, PathBuf::from("custom.html"));
        assert_eq!(config.font_dir, PathBuf::from("/usr/share/fonts"));
        assert!(!config.html_enabled);
    }

    #[test]
    fn test_empty_separator_keeps_default() {
        let cli = parse(&["data.txt", "--separator", ""]);
        let mut config = ForgeConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.separator(), "\t");
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"output_dir": "pdfs", "html_enabled": false}"#).unwrap();

        let (config, fallback) = load_config(Some(&path)).unwrap();
        assert!(fallback.is_none());
        assert_eq!(config.output_dir, PathBuf::from("pdfs"));
        assert!(!config.html_enabled);
        assert_eq!(config.separator(), "\t");
    }

    #[test]
    fn test_broken_explicit_config_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ForgeError::Config(_)));
        assert_eq!(err.category(), dataforge_core::ErrorCategory::ConfigError);
        assert!(err.user_message().contains("broken.json"), "{}", err.user_message());
    }

    #[test]
    fn test_empty_source_skips_rendering() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("empty.csv");
        std::fs::write(&source, "").unwrap();

        let cli = parse(&[source.to_str().unwrap()]);
        let mut config = ForgeConfig::default();
        config.output_dir = tmp.path().join("out");
        // A missing template would fail if rendering were attempted.
        config.template_path = tmp.path().join("missing.html");

        assert_eq!(run(&cli, &config).unwrap(), None);
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn test_run_renders_with_direct_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("people.csv");
        std::fs::write(&source, "Name,Age\nAnn,30\n").unwrap();
        let template = tmp.path().join("template.html");
        std::fs::write(
            &template,
            "<table>{{#each columns}}<th>{{this}}</th>{{/each}}{{#each rows}}<tr></tr>{{/each}}</table>",
        )
        .unwrap();

        let cli = parse(&[source.to_str().unwrap(), "--direct-only"]);
        let mut config = ForgeConfig::default();
        config.output_dir = tmp.path().join("out");
        config.template_path = template;
        config.font_dir = tmp.path().join("no-fonts");
        cli.apply(&mut config);

        let path = run(&cli, &config).unwrap().unwrap();
        assert_eq!(path, tmp.path().join("out").join("people.pdf"));
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_missing_template_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("people.csv");
        std::fs::write(&source, "Name\nAnn\n").unwrap();

        let cli = parse(&[source.to_str().unwrap(), "--direct-only"]);
        let mut config = ForgeConfig::default();
        config.template_path = tmp.path().join("missing.html");
        cli.apply(&mut config);

        let err = run(&cli, &config).unwrap_err();
        assert_eq!(err.category(), dataforge_core::ErrorCategory::ConfigError);
    }
}

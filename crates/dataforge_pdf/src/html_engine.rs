//! HTML-to-PDF through an external converter program.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use dataforge_core::{BackendError, BackendKind, HtmlEngineConfig, resolve_first};
use tracing::{debug, info};

use crate::request::{RenderRequest, RenderedDocument};
use crate::template::DocumentTemplate;

const INPUT: &str = "{input}";
const OUTPUT: &str = "{output}";

/// A converter command: the resolved program path and its argument
/// templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineCommand {
    /// Arguments with `{input}` and `{output}` replaced.
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(INPUT, &input).replace(OUTPUT, &output))
            .collect()
    }
}

/// What the host environment offers, probed once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub html_engine: Option<EngineCommand>,
}

impl Capabilities {
    /// Find the first configured converter present on `PATH`.
    pub fn probe(engines: &[HtmlEngineConfig]) -> Self {
        let resolution = resolve_first(
            "html-engine",
            engines,
            |engine| engine.program.clone(),
            |engine| {
                find_program(&engine.program)
                    .map(|program| EngineCommand {
                        program,
                        args: engine.args.clone(),
                    })
                    .ok_or("not found on PATH")
            },
        );
        match &resolution.value {
            Some(command) => info!("HTML-to-PDF engine: {}", command.program.display()),
            None => info!("No HTML-to-PDF engine found; using direct layout only"),
        }
        Self {
            html_engine: resolution.value,
        }
    }

    /// No optional capabilities.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Locate `program`: a path containing a separator is taken as is,
/// otherwise every `PATH` entry is searched.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = full.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// The HTML-to-PDF backend: fills the template and runs the converter.
#[derive(Debug, Clone)]
pub struct HtmlEngine {
    command: EngineCommand,
    template: DocumentTemplate,
}

impl HtmlEngine {
    pub fn new(command: EngineCommand, template: DocumentTemplate) -> Self {
        Self { command, template }
    }

    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    pub fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, BackendError> {
        let fail = |reason: String| BackendError::new(BackendKind::HtmlToPdf, reason);

        let html = self.template.fill(request).map_err(|e| fail(e.to_string()))?;

        // Removed on drop, on every return path.
        let workdir = tempfile::Builder::new()
            .prefix("dataforge-")
            .tempdir()
            .map_err(|e| fail(format!("cannot create temporary directory: {e}")))?;
        let input = workdir.path().join("document.html");
        let output = workdir.path().join("document.pdf");
        std::fs::write(&input, html)
            .map_err(|e| fail(format!("cannot write {}: {e}", input.display())))?;

        let args = self.command.arguments(&input, &output);
        debug!(program = %self.command.program.display(), ?args, "running HTML-to-PDF engine");

        let result = Command::new(&self.command.program)
            .args(&args)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| fail(format!("cannot run {}: {e}", self.command.program.display())))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let detail = stderr.trim().lines().last().unwrap_or("no diagnostics");
            return Err(fail(format!("engine exited with {}: {detail}", result.status)));
        }

        let bytes = std::fs::read(&output)
            .map_err(|e| fail(format!("engine produced no output: {e}")))?;
        if !bytes.starts_with(b"%PDF") {
            return Err(fail("engine output is not a PDF document".into()));
        }

        Ok(RenderedDocument {
            bytes,
            backend: BackendKind::HtmlToPdf,
            font: None,
        })
    }
}

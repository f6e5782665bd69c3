use std::path::{Path, PathBuf};

use dataforge_core::{
    BackendKind, DocumentLabels, ForgeConfig, RenderError, TemplateError, resolve_first,
};
use tracing::{debug, info};

use crate::backend::RenderBackend;
use crate::fonts::FontResolutionPolicy;
use crate::html_engine::{Capabilities, HtmlEngine};
use crate::layout::DirectLayout;
use crate::request::{FontReport, RenderRequest};
use crate::template::DocumentTemplate;

/// Inputs for building the backend chain.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub template_path: PathBuf,
    pub fonts: FontResolutionPolicy,
    pub labels: DocumentLabels,
    /// When false the HTML-to-PDF backend is left out even if an engine is
    /// installed.
    pub html_enabled: bool,
}

impl RenderSettings {
    pub fn from_config(config: &ForgeConfig) -> Self {
        Self {
            template_path: config.template_path.clone(),
            fonts: FontResolutionPolicy::from_config(config),
            labels: config.labels.clone(),
            html_enabled: config.html_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Rendering,
    Done(PathBuf),
    FailedFinal,
}

/// A written document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub path: PathBuf,
    pub backend: BackendKind,
    /// A preferred backend failed before this one succeeded.
    pub fallback_used: bool,
    pub font: Option<FontReport>,
}

/// Runs the backend chain for a request and writes the result.
#[derive(Debug)]
pub struct RenderOrchestrator {
    backends: Vec<RenderBackend>,
    state: RenderState,
}

impl RenderOrchestrator {
    /// Build the chain: HTML-to-PDF when enabled and an engine was found,
    /// then the direct layout. The template is loaded up front so that a
    /// missing template fails before any rendering.
    pub fn new(settings: RenderSettings, capabilities: &Capabilities) -> Result<Self, TemplateError> {
        let template = DocumentTemplate::load(&settings.template_path)?;

        let mut backends = Vec::new();
        match (&capabilities.html_engine, settings.html_enabled) {
            (Some(command), true) => {
                backends.push(RenderBackend::HtmlToPdf(HtmlEngine::new(command.clone(), template)));
            }
            (None, true) => debug!("No HTML-to-PDF engine available"),
            (_, false) => debug!("HTML-to-PDF backend disabled"),
        }
        backends.push(RenderBackend::DirectLayout(DirectLayout::new(
            settings.fonts,
            settings.labels,
        )));

        Ok(Self::with_backends(backends))
    }

    /// An orchestrator over an explicit chain.
    pub fn with_backends(backends: Vec<RenderBackend>) -> Self {
        Self {
            backends,
            state: RenderState::Idle,
        }
    }

    pub fn backends(&self) -> &[RenderBackend] {
        &self.backends
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Render `request` with the first backend that succeeds and write it to
    /// `<output_dir>/<stem>.pdf`. Each backend is tried once.
    pub fn render(&mut self, request: RenderRequest, output_dir: &Path) -> Result<RenderOutcome, RenderError> {
        self.state = RenderState::Rendering;
        info!(
            "Rendering {} ({} rows, {} columns)",
            request.filename,
            request.record.row_count(),
            request.record.column_count()
        );

        let resolution = resolve_first(
            "render-backend",
            &self.backends,
            |backend| backend.kind().to_string(),
            |backend| backend.render(&request),
        );
        let fallback_used = resolution.degraded();

        let Some(document) = resolution.value else {
            self.state = RenderState::FailedFinal;
            return Err(RenderError::Exhausted {
                failures: resolution.skipped.into_iter().map(|s| s.error).collect(),
            });
        };

        let path = output_dir.join(format!("{}.pdf", request.document_stem()));
        if let Err(e) = write_document(output_dir, &path, &document.bytes) {
            self.state = RenderState::FailedFinal;
            return Err(e);
        }

        info!("PDF written to {} by {} backend", path.display(), document.backend);
        self.state = RenderState::Done(path.clone());
        Ok(RenderOutcome {
            path,
            backend: document.backend,
            fallback_used,
            font: document.font,
        })
    }
}

fn write_document(output_dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    std::fs::create_dir_all(output_dir).map_err(|source| RenderError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;
    std::fs::write(path, bytes).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}

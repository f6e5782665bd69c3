use dataforge_core::{BackendError, BackendKind};

use crate::html_engine::HtmlEngine;
use crate::layout::DirectLayout;
use crate::request::{RenderRequest, RenderedDocument};

/// A document-rendering strategy. Backends produce bytes; they never write
/// files.
#[derive(Debug, Clone)]
pub enum RenderBackend {
    HtmlToPdf(HtmlEngine),
    DirectLayout(DirectLayout),
}

impl RenderBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::HtmlToPdf(_) => BackendKind::HtmlToPdf,
            Self::DirectLayout(_) => BackendKind::DirectLayout,
        }
    }

    pub fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, BackendError> {
        match self {
            Self::HtmlToPdf(engine) => engine.render(request),
            Self::DirectLayout(layout) => layout.render(request),
        }
    }
}

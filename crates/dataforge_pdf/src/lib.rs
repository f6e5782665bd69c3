//! Rendering a [`TabularRecord`](dataforge_core::TabularRecord) to PDF.
//!
//! Two backends are tried in order: an external HTML-to-PDF engine driven by
//! a document template, then a procedural layout written directly to PDF.

pub mod backend;
pub mod fonts;
pub mod html_engine;
pub mod layout;
pub mod orchestrator;
pub mod pdf;
pub mod request;
pub mod sanitize;
pub mod template;

pub use backend::RenderBackend;
pub use fonts::{FontCandidate, FontResolution, FontResolutionPolicy, PdfFont};
pub use html_engine::{Capabilities, EngineCommand, HtmlEngine};
pub use layout::DirectLayout;
pub use orchestrator::{RenderOrchestrator, RenderOutcome, RenderSettings, RenderState};
pub use request::{FontReport, RenderRequest, RenderedDocument};
pub use sanitize::sanitize;
pub use template::DocumentTemplate;

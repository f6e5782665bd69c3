use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dataforge_core::TemplateError;
use handlebars::Handlebars;
use serde::Serialize;

use crate::request::RenderRequest;

const TEMPLATE_NAME: &str = "document";

/// Values every template must use, typically as `{{#each columns}}` and
/// `{{#each rows}}`.
const REQUIRED: [&str; 2] = ["columns", "rows"];

/// Data handed to the template.
#[derive(Debug, Serialize)]
struct DocumentContext<'a> {
    filename: &'a str,
    timestamp: String,
    row_count: usize,
    column_count: usize,
    columns: &'a [String],
    /// Every row padded to `column_count` cells.
    rows: Vec<Vec<&'a str>>,
}

impl<'a> DocumentContext<'a> {
    fn new(request: &'a RenderRequest) -> Self {
        let record = &request.record;
        let rows = (0..record.row_count())
            .map(|row| {
                (0..record.column_count())
                    .map(|column| record.cell(row, column))
                    .collect()
            })
            .collect();
        Self {
            filename: &request.filename,
            timestamp: request.timestamp_label(),
            row_count: record.row_count(),
            column_count: record.column_count(),
            columns: record.columns(),
            rows,
        }
    }
}

/// Handlebars document template for the HTML-to-PDF backend.
///
/// The template sees `columns` (header labels), `rows` (arrays of cell
/// text), `filename`, `timestamp`, `row_count` and `column_count`. Values are
/// HTML-escaped on output.
#[derive(Clone)]
pub struct DocumentTemplate {
    path: PathBuf,
    registry: Arc<Handlebars<'static>>,
}

impl fmt::Debug for DocumentTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentTemplate")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl DocumentTemplate {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                TemplateError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_source(path, source)
    }

    /// Compile a template from markup. `path` is only used in error messages.
    pub fn from_source(path: &Path, source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        if let Some(placeholder) = REQUIRED.into_iter().find(|name| !references(&source, name)) {
            return Err(TemplateError::MissingPlaceholder {
                path: path.to_path_buf(),
                placeholder,
            });
        }

        let mut registry = Handlebars::new();
        registry
            .register_template_string(TEMPLATE_NAME, &source)
            .map_err(|e| TemplateError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            registry: Arc::new(registry),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the request into HTML.
    pub fn fill(&self, request: &RenderRequest) -> Result<String, TemplateError> {
        self.registry
            .render(TEMPLATE_NAME, &DocumentContext::new(request))
            .map_err(|e| TemplateError::Render {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }
}

/// True when some `{{ ... }}` expression in `source` mentions `name`.
fn references(source: &str, name: &str) -> bool {
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        let inner = &rest[start + 2..];
        let Some(end) = inner.find("}}") else {
            break;
        };
        let expression = &inner[..end];
        if expression
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .any(|token| token == name)
        {
            return true;
        }
        rest = &inner[end + 2..];
    }
    false
}

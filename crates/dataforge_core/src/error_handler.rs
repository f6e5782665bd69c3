use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Read errors
// ---------------------------------------------------------------------------

/// A structured-markup document whose top level is not one of the
/// recognized table shapes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported JSON shape: {found}")]
pub struct UnsupportedShapeError {
    pub found: String,
}

impl UnsupportedShapeError {
    pub fn new(found: impl Into<String>) -> Self {
        Self {
            found: found.into(),
        }
    }
}

/// Failure to turn a source file into a `TabularRecord`.
///
/// Readers never return partial data: a read either yields a complete record
/// or one of these.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input is not valid UTF-8 (first invalid byte at offset {valid_up_to})")]
    Encoding { valid_up_to: usize },

    #[error("Malformed {format} input: {reason}")]
    Malformed { format: &'static str, reason: String },

    #[error(transparent)]
    UnsupportedShape(#[from] UnsupportedShapeError),

    #[error("Column separator must not be empty")]
    InvalidSeparator,

    #[error("Unrecognized file type: {}", .0.display())]
    UnknownFormat(PathBuf),
}

impl ReadError {
    pub fn malformed(format: &'static str, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            format,
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Render errors
// ---------------------------------------------------------------------------

/// The document-rendering strategies, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    HtmlToPdf,
    DirectLayout,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HtmlToPdf => "html-to-pdf",
            Self::DirectLayout => "direct-layout",
        };
        f.write_str(s)
    }
}

/// One backend's failure. Collected by the orchestrator, only surfaced
/// inside [`RenderError::Exhausted`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{backend} backend failed: {reason}")]
pub struct BackendError {
    pub backend: BackendKind,
    pub reason: String,
}

impl BackendError {
    pub fn new(backend: BackendKind, reason: impl fmt::Display) -> Self {
        Self {
            backend,
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    /// Every backend in the chain failed.
    #[error("All render backends failed: {}", summarize(.failures))]
    Exhausted { failures: Vec<BackendError> },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn summarize(failures: &[BackendError]) -> String {
    if failures.is_empty() {
        return "no backend configured".into();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The document template is a hard precondition of rendering.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Document template not found: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read document template {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document template {} never uses `{placeholder}`", .path.display())]
    MissingPlaceholder {
        path: PathBuf,
        placeholder: &'static str,
    },

    #[error("Document template {} is invalid: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("Failed to render document template {}: {reason}", .path.display())]
    Render { path: PathBuf, reason: String },
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Classification of errors for logging and user display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The source file is unreadable, malformed or of an unsupported shape.
    InputError,
    /// No backend could produce a document.
    RenderError,
    /// Invalid or missing configuration, including the document template.
    ConfigError,
    /// Local I/O failure (permissions, disk space).
    SystemError,
}

impl ForgeError {
    /// Returns the broad error category for routing and display purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Read(ReadError::Io { .. }) => ErrorCategory::SystemError,
            Self::Read(_) => ErrorCategory::InputError,
            Self::Render(RenderError::Write { .. }) => ErrorCategory::SystemError,
            Self::Render(RenderError::Exhausted { .. }) => ErrorCategory::RenderError,
            Self::Template(_) | Self::Config(_) => ErrorCategory::ConfigError,
        }
    }

    /// Returns a short, human-readable message for the terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::Read(ReadError::Io { path, .. }) => {
                format!("Could not open {}. Check the path and permissions.", path.display())
            }
            Self::Read(ReadError::Encoding { .. }) => {
                "The file is not UTF-8 encoded. Re-save it as UTF-8 and try again.".into()
            }
            Self::Read(ReadError::UnsupportedShape(e)) => format!(
                "{e}. Expected an array of objects, an array of arrays or a single object."
            ),
            Self::Read(e) => format!("Could not read the data file: {e}"),
            Self::Render(RenderError::Exhausted { failures }) => {
                format!("PDF generation failed: {}", summarize(failures))
            }
            Self::Render(RenderError::Write { path, .. }) => format!(
                "Could not write {}. Check disk space and permissions.",
                path.display()
            ),
            Self::Template(e) => format!("Template problem: {e}"),
            Self::Config(msg) => format!("Configuration issue: {msg}"),
        }
    }
}

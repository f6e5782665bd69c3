pub mod config;
pub mod error_handler;
pub mod fallback;
pub mod logging;
pub mod record;

pub use config::{DocumentLabels, FontCandidateConfig, ForgeConfig, HtmlEngineConfig};
pub use error_handler::{
    BackendError, BackendKind, ErrorCategory, ForgeError, ReadError, RenderError, TemplateError,
    UnsupportedShapeError,
};
pub use fallback::{Resolution, Skipped, resolve_first};
pub use record::{TabularRecord, synthetic_header};

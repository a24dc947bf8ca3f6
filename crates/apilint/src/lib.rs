//! apilint validation service.
//!
//! Accepts a `(document, ruleset)` pair over HTTP, resolves the ruleset
//! (inline text or an `http`/`https` URL), lints the document with
//! [`apilint_engine`] and returns the findings as [`ValidationProblem`]s.
//!
//! The pipeline is resolve → load/bundle → lint → map, see
//! [`pipeline::ValidationService`].

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod problem;
pub mod server;

pub use config::{parse_origins, ServerConfig, DEFAULT_MAX_BODY_SIZE};
pub use error::{ApiError, ApiErrorResponse, ErrorCode};
pub use pipeline::{ValidationConfig, ValidationError, ValidationService};
pub use problem::{ProblemSeverity, ValidationProblem};

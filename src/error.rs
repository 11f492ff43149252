//! Error types for the LupIA review pipeline.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LupiaError`] — **Fatal**: the run cannot produce a report (no
//!   credential, a document is missing or unreadable, a stage exhausted its
//!   retry). Returned as `Err(LupiaError)` from [`crate::review::run_review`]
//!   and friends. There is no partial-success state: a run either yields all
//!   three stage texts plus the PDF, or one of these errors.
//!
//! * [`ModelError`] — **Per attempt**: one call to the language model failed
//!   (timeout, provider error, empty answer). The stage runner decides whether
//!   to retry; only when the budget is spent does the last `ModelError` get
//!   folded into [`LupiaError::ModelInvocation`].

use crate::output::StageKind;
use crate::pipeline::extract::DocumentRole;
use edgequake_llm::{LlmError, RetryStrategy};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the LupIA library.
#[derive(Debug, Error)]
pub enum LupiaError {
    // ── Request validation ────────────────────────────────────────────────
    /// No provider credential was supplied (or it was blank).
    #[error("No API key supplied.\nProvide an OpenAI API key with --api-key or OPENAI_API_KEY before running the review.")]
    MissingCredential,

    /// One of the two documents was not supplied.
    #[error("The {which} document is missing.\nUpload both the pliego and the oferta to run the review.")]
    MissingInput { which: DocumentRole },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes were read, but they are not a PDF.
    #[error("The {which} document is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { which: DocumentRole, magic: [u8; 4] },

    /// The PDF could not be parsed, or it yielded no text at all.
    #[error("Could not extract text from one or both inputs ({which}: {detail})\nMake sure the PDFs are not empty, scanned-only or corrupt.")]
    Extraction { which: DocumentRole, detail: String },

    // ── Model errors ──────────────────────────────────────────────────────
    /// A stage failed and its retry budget is spent; the run is aborted.
    #[error("Stage '{stage}' failed after {attempts} attempt(s): {detail}")]
    ModelInvocation {
        stage: StageKind,
        attempts: u32,
        detail: String,
    },

    // ── Report errors ─────────────────────────────────────────────────────
    /// Both the primary and the fallback PDF encoding paths failed.
    #[error("Failed to encode the PDF report: {0}")]
    ReportEncoding(String),

    /// Could not create or write the report file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single failed call to the language model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The call did not complete within the configured timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered with an error.
    #[error(transparent)]
    Provider(#[from] LlmError),

    /// The call succeeded but the generated text was blank.
    #[error("provider response contained no text")]
    EmptyResponse,
}

impl ModelError {
    /// Whether a second attempt could plausibly succeed.
    ///
    /// Provider errors follow their own [`RetryStrategy`]: a rejected key or
    /// an invalid request fails the same way again, and an over-long prompt
    /// needs a smaller context, not a retry. Timeouts and blank answers are
    /// always worth another call.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Provider(e) => !matches!(
                e.retry_strategy(),
                RetryStrategy::NoRetry | RetryStrategy::ReduceContext
            ),
            ModelError::Timeout { .. } | ModelError::EmptyResponse => true,
        }
    }
}

//! Progress-callback trait for per-stage review events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::ReviewConfigBuilder::progress_callback`] to receive
//! events as the run moves through extraction, the three model stages and
//! report generation. A web front-end can forward them to a spinner, the
//! CLI forwards them to an `indicatif` bar.
//!
//! # Example
//!
//! ```rust
//! use lupia::{ReviewConfig, ReviewProgressCallback, StageKind};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ReviewProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: StageKind, output_chars: usize) {
//!         eprintln!("{stage} done ({output_chars} chars)");
//!     }
//! }
//!
//! let config = ReviewConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ReviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::StageKind;
use std::sync::Arc;

/// Called by the review pipeline as it runs.
///
/// Implementations must be `Send + Sync`: with
/// [`crate::config::ReviewConfig::concurrent_reviews`] enabled, events for
/// stages A and B may arrive from different tasks at the same time. All
/// methods have default no-op implementations.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called once, after the request is validated and before extraction.
    fn on_run_start(&self) {}

    /// Called when both documents have been extracted and bounded.
    ///
    /// # Arguments
    /// * `pliego_chars` — characters of pliego text sent to the reviewers
    /// * `oferta_chars` — characters of oferta text sent to the reviewers
    fn on_documents_ready(&self, pliego_chars: usize, oferta_chars: usize) {
        let _ = (pliego_chars, oferta_chars);
    }

    /// Called just before the first model call of a stage.
    fn on_stage_start(&self, stage: StageKind) {
        let _ = stage;
    }

    /// Called when a stage produced its text.
    fn on_stage_complete(&self, stage: StageKind, output_chars: usize) {
        let _ = (stage, output_chars);
    }

    /// Called when a stage failed after its retry; the run aborts right after.
    fn on_stage_error(&self, stage: StageKind, error: &str) {
        let _ = (stage, error);
    }

    /// Called once the PDF report has been encoded.
    fn on_report_built(&self, report_bytes: usize) {
        let _ = report_bytes;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReviewConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;

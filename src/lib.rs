//! # lupia
//!
//! Compare a public-procurement specification (*pliego*) against a vendor
//! bid (*oferta*) with three language-model reviewers, and produce a PDF
//! report of their findings.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pliego.pdf + oferta.pdf + API key
//!  │
//!  ├─ 1. Validate  credential first, then both documents
//!  ├─ 2. Extract   text of every page (pdf-extract, spawn_blocking)
//!  ├─ 3. Bound     keep the first 20 000 characters of each document
//!  ├─ 4. Stage A   technical compliance review
//!  ├─ 5. Stage B   documentary compliance review (independent of A)
//!  ├─ 6. Stage C   consensus, built from the A and B texts only
//!  └─ 7. Report    cover + one section per stage, Courier PDF
//! ```
//!
//! Every model call goes through an `edgequake-llm` provider with a 180 s
//! timeout and at most one retry. A failure anywhere aborts the run; there is
//! no partial report.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lupia::{run_review, write_report, ReviewConfig, ReviewRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = ReviewRequest::new(
//!         std::fs::read("pliego.pdf")?,
//!         std::fs::read("oferta.pdf")?,
//!         std::env::var("OPENAI_API_KEY")?,
//!     );
//!     let config = ReviewConfig::default();
//!     let result = run_review(request, &config).await?;
//!     println!("{}", result.consensus.output_text);
//!     write_report(&result, "informe_LupIA.pdf").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lupia` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! lupia-review = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod review;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Credential, ReviewConfig, ReviewConfigBuilder};
pub use error::{LupiaError, ModelError};
pub use output::{RunResult, RunStats, StageKind, StageResult};
pub use pipeline::extract::{BoundedText, DocumentRole};
pub use pipeline::llm::{build_messages, run_stage, ModelResponse};
pub use pipeline::report::{build_report, PdfReport, ReportRenderer};
pub use pipeline::sanitize::sanitize;
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback};
pub use review::{run_review, run_review_files, run_review_sync, write_report, ReviewRequest};

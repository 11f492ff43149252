//! Review entry points: two PDFs and a credential in, three reviews and a
//! PDF report out.
//!
//! ## Run order
//!
//! ```text
//! validate credential → validate inputs → extract pliego → extract oferta
//!   → bound both → Stage A → Stage B → Stage C → report
//! ```
//!
//! Stages A and B only read the bounded documents, so with
//! [`ReviewConfig::concurrent_reviews`] they run side by side; Stage C always
//! waits for both. Any failure ends the run: there is no partial
//! [`RunResult`].

use crate::config::{Credential, ReviewConfig};
use crate::error::LupiaError;
use crate::output::{RunResult, RunStats, StageKind};
use crate::pipeline::extract::{Document, DocumentRole};
use crate::pipeline::input;
use crate::pipeline::llm::run_stage;
use crate::pipeline::report::{PdfReport, ReportRenderer};
use crate::prompts;
use edgequake_llm::{LLMProvider, OpenAIProvider};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Everything one run needs from the caller.
///
/// Fields are optional so that a front-end can hand over whatever the user
/// provided and let [`run_review`] report what is missing.
#[derive(Debug, Clone, Default)]
pub struct ReviewRequest {
    pub pliego: Option<Vec<u8>>,
    pub oferta: Option<Vec<u8>>,
    pub credential: Option<Credential>,
}

impl ReviewRequest {
    pub fn new(pliego: Vec<u8>, oferta: Vec<u8>, credential: impl Into<Credential>) -> Self {
        Self {
            pliego: Some(pliego),
            oferta: Some(oferta),
            credential: Some(credential.into()),
        }
    }
}

/// Run the full review.
///
/// # Errors
/// * [`LupiaError::MissingCredential`] / [`LupiaError::MissingInput`] before
///   any work starts
/// * [`LupiaError::Extraction`] if either PDF yields no text; no model call
///   is made
/// * [`LupiaError::ModelInvocation`] if a stage fails after its retry
/// * [`LupiaError::ReportEncoding`] if the report cannot be encoded
pub async fn run_review(
    request: ReviewRequest,
    config: &ReviewConfig,
) -> Result<RunResult, LupiaError> {
    let total_start = Instant::now();

    // ── Step 1: Validate request ─────────────────────────────────────────
    let credential = validate_credential(request.credential)?;
    let pliego_bytes = request.pliego.ok_or(LupiaError::MissingInput {
        which: DocumentRole::Pliego,
    })?;
    let oferta_bytes = request.oferta.ok_or(LupiaError::MissingInput {
        which: DocumentRole::Oferta,
    })?;

    info!(
        "Starting review: pliego {} bytes, oferta {} bytes, model {}",
        pliego_bytes.len(),
        oferta_bytes.len(),
        config.model
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start();
    }

    // ── Step 2: Extract and bound ────────────────────────────────────────
    let pliego = Document::extract(DocumentRole::Pliego, pliego_bytes).await?;
    let oferta = Document::extract(DocumentRole::Oferta, oferta_bytes).await?;
    let pliego_text = pliego.bounded(config.char_limit)?;
    let oferta_text = oferta.bounded(config.char_limit)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_documents_ready(pliego_text.char_len(), oferta_text.char_len());
    }

    // ── Step 3: Technical reviews ────────────────────────────────────────
    let provider = resolve_provider(credential, config);
    let llm_start = Instant::now();
    let prompt_a = prompts::technical_a_prompt(&pliego_text, &oferta_text);
    let prompt_b = prompts::technical_b_prompt(&pliego_text, &oferta_text);

    let (technical_a, technical_b) = if config.concurrent_reviews {
        debug!("Running technical reviews concurrently");
        tokio::try_join!(
            run_stage(provider.as_ref(), StageKind::TechnicalA, prompt_a, config),
            run_stage(provider.as_ref(), StageKind::TechnicalB, prompt_b, config),
        )?
    } else {
        let a = run_stage(provider.as_ref(), StageKind::TechnicalA, prompt_a, config).await?;
        let b = run_stage(provider.as_ref(), StageKind::TechnicalB, prompt_b, config).await?;
        (a, b)
    };

    // ── Step 4: Consensus ────────────────────────────────────────────────
    let prompt_c = prompts::consensus_prompt(&technical_a.output_text, &technical_b.output_text);
    let consensus = run_stage(provider.as_ref(), StageKind::Consensus, prompt_c, config).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 5: Report ───────────────────────────────────────────────────
    let report = match &config.renderer {
        Some(renderer) => renderer.render([&technical_a, &technical_b, &consensus])?,
        None => PdfReport {
            wrap_width: config.wrap_width,
        }
        .render([&technical_a, &technical_b, &consensus])?,
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_report_built(report.len());
    }

    // ── Step 6: Stats ────────────────────────────────────────────────────
    let stages = [&technical_a, &technical_b, &consensus];
    let stats = RunStats {
        pliego_chars: pliego.char_count(),
        oferta_chars: oferta.char_count(),
        pliego_bounded_chars: pliego_text.char_len(),
        oferta_bounded_chars: oferta_text.char_len(),
        total_input_tokens: stages.iter().map(|s| s.input_tokens as u64).sum(),
        total_output_tokens: stages.iter().map(|s| s.output_tokens as u64).sum(),
        llm_duration_ms,
        report_bytes: report.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Review complete: {} + {} tokens, report {} bytes, {}ms total",
        stats.total_input_tokens, stats.total_output_tokens, stats.report_bytes, stats.total_duration_ms
    );

    Ok(RunResult {
        technical_a,
        technical_b,
        consensus,
        report,
        stats,
    })
}

/// Synchronous wrapper around [`run_review`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_review_sync(
    request: ReviewRequest,
    config: &ReviewConfig,
) -> Result<RunResult, LupiaError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LupiaError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_review(request, config))
}

/// Run a review on two local PDF files.
///
/// The credential is checked before anything is read.
pub async fn run_review_files(
    pliego: impl AsRef<Path>,
    oferta: impl AsRef<Path>,
    credential: Option<Credential>,
    config: &ReviewConfig,
) -> Result<RunResult, LupiaError> {
    let credential = validate_credential(credential)?;
    let pliego = input::resolve_input(pliego.as_ref(), DocumentRole::Pliego).await?;
    let oferta = input::resolve_input(oferta.as_ref(), DocumentRole::Oferta).await?;
    run_review(ReviewRequest::new(pliego, oferta, credential), config).await
}

/// Write the report of a finished run to `path`.
///
/// Atomic: the bytes go to a temp file in the same directory, which is then
/// renamed over `path`, so a crash never leaves a truncated PDF behind.
pub async fn write_report(result: &RunResult, path: impl AsRef<Path>) -> Result<(), LupiaError> {
    let path = path.as_ref().to_path_buf();
    let bytes = result.report.clone();
    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
        .await
        .map_err(|e| LupiaError::Internal(format!("Write task failed: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn validate_credential(credential: Option<Credential>) -> Result<Credential, LupiaError> {
    match credential {
        Some(c) if !c.is_blank() => Ok(c),
        _ => Err(LupiaError::MissingCredential),
    }
}

/// Resolve the LLM provider for one run.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is. Tests and
///    callers that wrap a provider in middleware land here.
/// 2. **OpenAI-compatible endpoint** (`config.base_url`): an
///    [`OpenAIProvider`] pointed at that base URL.
/// 3. **OpenAI**: an [`OpenAIProvider`] on the public endpoint.
///
/// The credential goes straight into the provider and lives only as long as
/// the run.
fn resolve_provider(credential: Credential, config: &ReviewConfig) -> Arc<dyn LLMProvider> {
    if let Some(ref provider) = config.provider {
        return Arc::clone(provider);
    }
    let provider = match config.base_url {
        Some(ref url) => OpenAIProvider::compatible(credential.expose(), url.trim_end_matches('/')),
        None => OpenAIProvider::new(credential.expose()),
    };
    debug!("Using OpenAI provider with model {}", config.model);
    Arc::new(provider.with_model(&config.model))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LupiaError> {
    let failed = |source: std::io::Error| LupiaError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir: PathBuf = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(failed)?;
    tmp.write_all(bytes).map_err(failed)?;
    tmp.as_file().sync_all().map_err(failed)?;
    tmp.persist(path).map_err(|e| failed(e.error))?;
    info!("Wrote report to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

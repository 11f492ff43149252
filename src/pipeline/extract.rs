//! Text extraction: PDF bytes → plain text, then bounded for prompting.
//!
//! ## Why spawn_blocking?
//!
//! `pdf-extract` parses the whole document and walks every content stream
//! synchronously. A 300-page pliego can keep a core busy for seconds, so the
//! work runs on Tokio's blocking pool instead of stalling the worker thread
//! that also drives the HTTP calls.
//!
//! ## Why catch_unwind?
//!
//! `pdf-extract` panics on some malformed inputs instead of returning an
//! error. A panic is converted into [`LupiaError::Extraction`] so a bad
//! upload aborts the run cleanly rather than taking the process down.

use crate::error::LupiaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info};

/// Which of the two uploads a document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    /// Requirements specification issued by the contracting entity.
    Pliego,
    /// Vendor bid answering the pliego.
    Oferta,
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentRole::Pliego => "pliego",
            DocumentRole::Oferta => "oferta",
        })
    }
}

/// An uploaded PDF and the text pulled out of it.
///
/// Created once per run; the text is populated by [`Document::extract`] and
/// never changes afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    pub role: DocumentRole,
    pub raw_bytes: Vec<u8>,
    pub extracted_text: String,
}

impl Document {
    /// Extract the text of `raw_bytes` on the blocking pool.
    ///
    /// # Errors
    /// [`LupiaError::Extraction`] if the PDF cannot be parsed or the
    /// extraction task panics.
    pub async fn extract(role: DocumentRole, raw_bytes: Vec<u8>) -> Result<Self, LupiaError> {
        let (raw_bytes, text) = tokio::task::spawn_blocking(move || {
            let text = extract_text(&raw_bytes);
            (raw_bytes, text)
        })
        .await
        .map_err(|e| LupiaError::Internal(format!("Extraction task failed: {}", e)))?;

        let extracted_text = text.map_err(|detail| LupiaError::Extraction {
            which: role,
            detail,
        })?;
        info!(
            "Extracted {} chars from the {} ({} bytes)",
            extracted_text.chars().count(),
            role,
            raw_bytes.len()
        );

        Ok(Self {
            role,
            raw_bytes,
            extracted_text,
        })
    }

    /// Character count of the full extracted text.
    pub fn char_count(&self) -> usize {
        self.extracted_text.chars().count()
    }

    /// The text truncated to `limit` characters.
    ///
    /// # Errors
    /// [`LupiaError::Extraction`] if nothing but whitespace remains; an
    /// empty document is never worth a model call.
    pub fn bounded(&self, limit: usize) -> Result<BoundedText, LupiaError> {
        let bounded = BoundedText::new(&self.extracted_text, limit);
        if bounded.as_str().trim().is_empty() {
            return Err(LupiaError::Extraction {
                which: self.role,
                detail: "the PDF contains no extractable text (it may be scanned or image-only)"
                    .into(),
            });
        }
        if bounded.was_truncated() {
            debug!(
                "Truncated {} from {} to {} chars",
                self.role,
                self.char_count(),
                bounded.char_len()
            );
        }
        Ok(bounded)
    }
}

/// Extract the text of every page and concatenate it.
///
/// Pages without a text layer contribute an empty string. Parse failures and
/// panics inside the parser are both returned as `Err(detail)`.
pub fn extract_text(data: &[u8]) -> Result<String, String> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(data)
    }));
    match result {
        Ok(Ok(pages)) => {
            debug!("Parsed {} pages", pages.len());
            Ok(pages.concat())
        }
        Ok(Err(e)) => Err(format!("PDF extraction failed: {e}")),
        Err(_) => Err("PDF extraction panicked (malformed document)".into()),
    }
}

/// Document text truncated to a fixed character budget.
///
/// Invariant: `char_len() <= limit` for the limit it was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedText {
    text: String,
    truncated: bool,
}

impl BoundedText {
    /// Keep at most `limit` characters (not bytes) of `text`.
    pub fn new(text: &str, limit: usize) -> Self {
        match text.char_indices().nth(limit) {
            Some((cut, _)) => Self {
                text: text[..cut].to_string(),
                truncated: true,
            },
            None => Self {
                text: text.to_string(),
                truncated: false,
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn was_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

//! Pipeline stages for a pliego/oferta review.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. another report format) without touching
//! other stages. Model providers come from `edgequake-llm`.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm (A, B, C) ──▶ sanitize ──▶ report
//! (path)     (text)     (LLMProvider)     (Courier-safe) (PDF bytes)
//! ```
//!
//! 1. [`input`]    — read a local file, check `%PDF` magic
//! 2. [`extract`]  — pull text with `pdf-extract` on the blocking pool and
//!    truncate it to the character budget
//! 3. [`llm`]      — drive one stage's model call with timeout and retry
//! 4. [`sanitize`] — fold model text into what the PDF fonts can show
//! 5. [`report`]   — lay out and encode the report with `lopdf`

pub mod extract;
pub mod input;
pub mod llm;
pub mod report;
pub mod sanitize;

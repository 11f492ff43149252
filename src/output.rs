//! Result types produced by a review run.
//!
//! Every value here is created once and never mutated afterwards: a
//! [`StageResult`] is fixed as soon as its model call returns, and a
//! [`RunResult`] is assembled only when all three stages and the report
//! have succeeded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three sequential units of work in a review run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Technical-specification compliance review.
    TechnicalA,
    /// Documentary / eligibility compliance review, independent of A.
    TechnicalB,
    /// Cross-check of A and B into a consensus matrix and recommendation.
    Consensus,
}

impl StageKind {
    /// All stages in report order.
    pub const ALL: [StageKind; 3] = [
        StageKind::TechnicalA,
        StageKind::TechnicalB,
        StageKind::Consensus,
    ];

    /// Short machine-friendly name used in logs and errors.
    pub fn label(self) -> &'static str {
        match self {
            Self::TechnicalA => "technical-1",
            Self::TechnicalB => "technical-2",
            Self::Consensus => "consensus",
        }
    }

    /// Bold section title in the PDF report.
    pub fn report_title(self) -> &'static str {
        match self {
            Self::TechnicalA => "Asistente Tecnico 1",
            Self::TechnicalB => "Asistente Tecnico 2",
            Self::Consensus => "Informe de Consenso de LupIA",
        }
    }

    /// Italic subtitle printed under the section title.
    pub fn report_subtitle(self) -> &'static str {
        match self {
            Self::TechnicalA => {
                "Análisis de Especificaciones Técnicas y Cumplimiento de Ficha."
            }
            Self::TechnicalB => {
                "Revisión Documental, Requisitos Habilitantes y Riesgos Administrativos."
            }
            Self::Consensus => {
                "Integración de resultados, detección de discrepancias y recomendación final."
            }
        }
    }

    /// Heading used when the stage text is shown on screen or saved as Markdown.
    pub fn display_heading(self) -> &'static str {
        match self {
            Self::TechnicalA => "Informe del Asistente Tecnico 1 - Especificaciones",
            Self::TechnicalB => "Informe del Asistente Tecnico 2 - Documental / Pliego",
            Self::Consensus => "Informe de Consenso de LupIA",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The textual output of one model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageKind,
    /// Model text, verbatim.
    pub output_text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Number of model calls it took (1 or 2 with the default retry budget).
    pub attempts: u32,
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub technical_a: StageResult,
    pub technical_b: StageResult,
    pub consensus: StageResult,
    /// PDF report bytes. Not serialised; write it with
    /// [`crate::review::write_report`].
    #[serde(skip)]
    pub report: Vec<u8>,
    pub stats: RunStats,
}

impl RunResult {
    /// The three stage results in report order.
    pub fn stages(&self) -> [&StageResult; 3] {
        [&self.technical_a, &self.technical_b, &self.consensus]
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Characters extracted from the pliego before truncation.
    pub pliego_chars: usize,
    /// Characters extracted from the oferta before truncation.
    pub oferta_chars: usize,
    /// Characters of pliego text actually embedded in the prompts.
    pub pliego_bounded_chars: usize,
    /// Characters of oferta text actually embedded in the prompts.
    pub oferta_bounded_chars: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Wall-clock time spent inside model calls (A, B and C).
    pub llm_duration_ms: u64,
    pub report_bytes: usize,
    pub total_duration_ms: u64,
}

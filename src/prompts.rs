//! Reviewer personas and stage prompts.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what a reviewer is asked for
//!    (a new matrix column, a tighter word limit) means editing one place.
//!
//! 2. **Testability**: unit tests inspect the rendered prompts directly,
//!    without a model behind them.
//!
//! Each stage sends its reviewer's persona as the system message and the
//! rendered template as the user message. Prompts are Spanish because the
//! reports are read by Spanish-speaking procurement officers.

use crate::output::StageKind;
use crate::pipeline::extract::BoundedText;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Who a stage's reviewer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewerProfile {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl ReviewerProfile {
    /// The persona rendered as a system message.
    pub fn system_prompt(&self) -> String {
        format!(
            "Eres {}.\n\nObjetivo: {}\n\nContexto: {}",
            self.role, self.goal, self.backstory
        )
    }
}

pub const TECHNICAL_A_PROFILE: ReviewerProfile = ReviewerProfile {
    role: "Asistente Tecnico 1",
    goal: "Evaluar el cumplimiento TECNICO de la oferta frente al pliego, identificando \
claramente que cumple, que no cumple y que no es verificable.",
    backstory: "Eres un ingeniero especialista en licitaciones publicas en Ecuador, con foco \
en especificaciones tecnicas, fichas, catalogos y hojas de datos.",
};

pub const TECHNICAL_B_PROFILE: ReviewerProfile = ReviewerProfile {
    role: "Asistente Tecnico 2",
    goal: "Revisar la OFERTA desde la optica de requisitos documentales del pliego \
(habilitantes, experiencia, capacidad financiera, formularios, etc.), tratandolo como un \
analisis tecnico-documental.",
    backstory: "Actuas como segundo par de ojos tecnico-documental, enfocado en contrastar lo \
que el pliego exige versus lo que se adjunta efectivamente en la oferta.",
};

pub const CONSENSUS_PROFILE: ReviewerProfile = ReviewerProfile {
    role: "Coordinador de LupIA",
    goal: "Integrar los analisis de los dos asistentes tecnicos, identificando fortalezas, \
debilidades, discrepancias y generando un informe de consenso claro y accionable.",
    backstory: "Tienes experiencia combinando analisis tecnicos en informes de recomendacion \
para entidades contratantes y oferentes.",
};

/// The persona that runs `stage`.
pub fn profile_for(stage: StageKind) -> &'static ReviewerProfile {
    match stage {
        StageKind::TechnicalA => &TECHNICAL_A_PROFILE,
        StageKind::TechnicalB => &TECHNICAL_B_PROFILE,
        StageKind::Consensus => &CONSENSUS_PROFILE,
    }
}

/// Stage A template. Placeholders: `{pliego}`, `{oferta}`.
pub const TECHNICAL_A_TEMPLATE: &str = "Analiza el CUMPLIMIENTO TECNICO de la oferta frente al pliego.

Contexto de documentos (recortado por eficiencia):
PLIEGO:
{pliego}

OFERTA:
{oferta}

LIMITE: Maximo 1200 palabras y maximo 20 filas en la matriz. Responde sin repetir el contexto.

Estructura de salida:
1. Lista de requisitos tecnicos principales (vinetas).
2. MATRIZ DE CUMPLIMIENTO (Markdown) con columnas: ID, Tipo, Requisito, Evidencia OFERTA, Cumple (Sí/No/No verificable), Comentario.
3. Conclusion tecnica (% cumplimiento, riesgos, recomendacion tecnica).";

/// Stage B template. Placeholders: `{pliego}`, `{oferta}`.
pub const TECHNICAL_B_TEMPLATE: &str = "Analiza el CUMPLIMIENTO DOCUMENTAL de la oferta frente al pliego.

Contexto de documentos (recortado por eficiencia):
PLIEGO:
{pliego}

OFERTA:
{oferta}

LIMITE: Maximo 1200 palabras y maximo 20 filas en la matriz. Responde sin repetir el contexto.

Estructura de salida:
1. Requisitos documentales principales (vinetas).
2. MATRIZ DE CUMPLIMIENTO (Markdown) con columnas: ID, Tipo, Requisito, Evidencia OFERTA, Cumple (Sí/No/No verificable), Comentario.
3. Conclusion tecnico-documental (riesgos, posibles observaciones, recomendacion).";

/// Stage C template. Placeholders: `{informe_tec1}`, `{informe_tec2}`.
///
/// Only the two reviews are embedded; the documents themselves are not
/// sent again.
pub const CONSENSUS_TEMPLATE: &str = "Eres el COORDINADOR de LupIA. Has recibido dos informes. Tu objetivo es hacer un CROSS-CHECK real entre ambos analisis, detectar contradicciones y generar un CONSENSO.

=== INFORME ASISTENTE TECNICO 1 ===
{informe_tec1}

=== INFORME ASISTENTE TECNICO 2 ===
{informe_tec2}

Trabaja de forma muy concreta, limitando el informe a un maximo de 1500 palabras.

Estructura de salida:
1. Resumen ejecutivo (max. 10 lineas).
2. MATRIZ DE CONSENSO (Markdown) con columnas: ID, Tipo (Tecnico/Documental), Requisito, AT1, AT2, Consenso (Cumple/No cumple/Subsanable), Comentario final.
3. Conclusion general: fortalezas, debilidades, y recomendacion final de LupIA (adjudicar / pedir subsanacion / descalificar).";

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_0-9]+)\}").unwrap());

/// Replace `{name}` placeholders in one pass.
///
/// Inserted values are never scanned again, so document text that happens
/// to contain `{oferta}` stays literal. Unknown placeholders are left as-is.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            values
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// User prompt for Stage A.
pub fn technical_a_prompt(pliego: &BoundedText, oferta: &BoundedText) -> String {
    fill(
        TECHNICAL_A_TEMPLATE,
        &[("pliego", pliego.as_str()), ("oferta", oferta.as_str())],
    )
}

/// User prompt for Stage B.
pub fn technical_b_prompt(pliego: &BoundedText, oferta: &BoundedText) -> String {
    fill(
        TECHNICAL_B_TEMPLATE,
        &[("pliego", pliego.as_str()), ("oferta", oferta.as_str())],
    )
}

/// User prompt for Stage C, built from the two review texts only.
pub fn consensus_prompt(technical_a: &str, technical_b: &str) -> String {
    fill(
        CONSENSUS_TEMPLATE,
        &[("informe_tec1", technical_a), ("informe_tec2", technical_b)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(s: &str) -> BoundedText {
        BoundedText::new(s, 20_000)
    }

    #[test]
    fn technical_prompts_embed_both_documents() {
        let p = bounded("Requires 10 units of widget X");
        let o = bounded("We offer 12 units of widget X");
        for prompt in [technical_a_prompt(&p, &o), technical_b_prompt(&p, &o)] {
            assert!(prompt.contains("PLIEGO:\nRequires 10 units of widget X"));
            assert!(prompt.contains("OFERTA:\nWe offer 12 units of widget X"));
            assert!(prompt.contains("MATRIZ DE CUMPLIMIENTO"));
            assert!(!prompt.contains("{pliego}"));
        }
    }

    #[test]
    fn a_and_b_ask_different_questions() {
        let p = bounded("p");
        let o = bounded("o");
        assert!(technical_a_prompt(&p, &o).contains("CUMPLIMIENTO TECNICO"));
        assert!(technical_b_prompt(&p, &o).contains("CUMPLIMIENTO DOCUMENTAL"));
    }

    #[test]
    fn consensus_prompt_embeds_reviews_only() {
        let prompt = consensus_prompt("informe uno", "informe dos");
        assert!(prompt.contains("=== INFORME ASISTENTE TECNICO 1 ===\ninforme uno"));
        assert!(prompt.contains("=== INFORME ASISTENTE TECNICO 2 ===\ninforme dos"));
        assert!(!prompt.contains("PLIEGO:"));
        assert!(prompt.contains("1500 palabras"));
    }

    #[test]
    fn inserted_text_is_not_rescanned() {
        let p = bounded("texto con {oferta} literal");
        let o = bounded("OFERTA REAL");
        let prompt = technical_a_prompt(&p, &o);
        assert!(prompt.contains("texto con {oferta} literal"));
        assert_eq!(prompt.matches("OFERTA REAL").count(), 1);
    }

    #[test]
    fn unknown_placeholder_is_kept() {
        assert_eq!(fill("a {x} b {y}", &[("x", "1")]), "a 1 b {y}");
    }

    #[test]
    fn every_stage_has_a_distinct_persona() {
        let prompts: Vec<String> = StageKind::ALL
            .iter()
            .map(|s| profile_for(*s).system_prompt())
            .collect();
        assert!(prompts[0].contains("Asistente Tecnico 1"));
        assert!(prompts[1].contains("Asistente Tecnico 2"));
        assert!(prompts[2].contains("Coordinador de LupIA"));
        assert_ne!(prompts[0], prompts[1]);
    }
}

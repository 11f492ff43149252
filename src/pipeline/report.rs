//! Report Builder: three stage texts → a multi-page PDF.
//!
//! ## Layout
//!
//! A4 portrait, measured in millimetres like a classic flowing-text PDF
//! writer: 10 mm side and top margins, an automatic page break once a line
//! would end within 15 mm of the bottom edge, and a 1 mm inner cell margin.
//!
//! 1. Cover page: centred title, centred intro paragraph.
//! 2. One new page per stage, in order A, B, C: bold title, oblique
//!    subtitle, then the body as a flowing block that breaks onto further
//!    pages as needed.
//!
//! ## Why Courier?
//!
//! The standard Courier family needs no embedded font program and every
//! glyph advances exactly 0.6 em, so the character-count wrapping done by
//! [`crate::pipeline::sanitize`] maps directly onto physical width. The body
//! size is picked so a full wrap-width line fits between the margins.
//!
//! ## Encoding fallback
//!
//! The document is first saved with compressed content streams. If that
//! fails the uncompressed document is saved instead; only when both fail is
//! [`LupiaError::ReportEncoding`] returned.

use crate::config::DEFAULT_WRAP_WIDTH;
use crate::error::LupiaError;
use crate::output::{StageKind, StageResult};
use crate::pipeline::sanitize::{sanitize, sanitize_with_width};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, StringFormat, Stream};
use tracing::{debug, warn};

/// Cover-page heading and PDF `/Title`.
pub const REPORT_TITLE: &str = "LupIA - Informe de Analisis";

/// Cover-page paragraph.
pub const REPORT_INTRO: &str = "Este informe ha sido generado automáticamente por LupIA \
utilizando múltiples agentes de IA para analizar el pliego y la oferta proporcionados.";

const PRODUCER: &str = "lupia-review";

/// Points per millimetre.
const MM: f32 = 72.0 / 25.4;
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 10.0;
const BREAK_MARGIN: f32 = 15.0;
const CELL_MARGIN: f32 = 1.0;
/// Glyph advance of every Courier character, in em.
const COURIER_ADVANCE: f32 = 0.6;
const BODY_MAX_PT: f32 = 10.0;

/// Turns the three stage results into report bytes.
///
/// The orchestrator only talks to this trait, so the output format can be
/// swapped (or counted in tests) without touching the pipeline.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, stages: [&StageResult; 3]) -> Result<Vec<u8>, LupiaError>;
}

/// The built-in PDF renderer.
#[derive(Debug, Clone, Copy)]
pub struct PdfReport {
    pub wrap_width: usize,
}

impl Default for PdfReport {
    fn default() -> Self {
        Self {
            wrap_width: DEFAULT_WRAP_WIDTH,
        }
    }
}

impl ReportRenderer for PdfReport {
    fn render(&self, stages: [&StageResult; 3]) -> Result<Vec<u8>, LupiaError> {
        let [a, b, c] = stages;
        build_report_with_width(&a.output_text, &b.output_text, &c.output_text, self.wrap_width)
    }
}

/// Build the report for the A, B and C texts at the default wrap width.
pub fn build_report(stage_a: &str, stage_b: &str, stage_c: &str) -> Result<Vec<u8>, LupiaError> {
    build_report_with_width(stage_a, stage_b, stage_c, DEFAULT_WRAP_WIDTH)
}

/// Build the report, wrapping stage bodies at `wrap_width` columns.
pub fn build_report_with_width(
    stage_a: &str,
    stage_b: &str,
    stage_c: &str,
    wrap_width: usize,
) -> Result<Vec<u8>, LupiaError> {
    let mut layout = Layout::new();

    // Cover
    layout.add_page();
    layout.set_font(FontStyle::Bold, 18.0);
    layout.cell(15.0, REPORT_TITLE, Align::Center);
    layout.ln(10.0);
    layout.set_font(FontStyle::Regular, 12.0);
    layout.multi_cell(8.0, &sanitize(REPORT_INTRO), Align::Center);

    let body_pt = body_font_size(wrap_width);
    for (stage, text) in StageKind::ALL.into_iter().zip([stage_a, stage_b, stage_c]) {
        layout.add_page();
        layout.set_font(FontStyle::Bold, 14.0);
        layout.multi_cell(8.0, &sanitize(stage.report_title()), Align::Left);
        layout.ln(2.0);
        layout.set_font(FontStyle::Oblique, 11.0);
        layout.multi_cell(6.0, &sanitize(stage.report_subtitle()), Align::Left);
        layout.ln(5.0);
        layout.set_font(FontStyle::Regular, body_pt);
        layout.multi_cell(5.0, &sanitize_with_width(text, wrap_width), Align::Left);
    }

    debug!("Report laid out on {} pages", layout.pages.len());
    let doc = layout.into_document()?;
    encode(doc)
}

/// Largest body size (in half points, capped at 10 pt) at which a line of
/// `wrap_width` Courier characters fits between the margins.
pub fn body_font_size(wrap_width: usize) -> f32 {
    let fit = text_width() * MM / (COURIER_ADVANCE * wrap_width.max(1) as f32);
    ((fit * 2.0).floor() / 2.0).clamp(1.0, BODY_MAX_PT)
}

/// Writes a finished document into a byte buffer.
type SaveFn = fn(&mut Document, &mut Vec<u8>) -> Result<(), String>;

fn save_compressed(doc: &mut Document, buf: &mut Vec<u8>) -> Result<(), String> {
    doc.compress();
    doc.save_to(buf).map_err(|e| e.to_string())
}

fn save_plain(doc: &mut Document, buf: &mut Vec<u8>) -> Result<(), String> {
    doc.save_to(buf).map_err(|e| e.to_string())
}

fn encode(doc: Document) -> Result<Vec<u8>, LupiaError> {
    encode_with(doc, save_compressed, save_plain)
}

/// Try `primary` on a copy of `doc`, then `fallback` on the untouched original.
fn encode_with(doc: Document, primary: SaveFn, fallback: SaveFn) -> Result<Vec<u8>, LupiaError> {
    let mut first = doc.clone();
    let mut buf = Vec::new();
    match primary(&mut first, &mut buf) {
        Ok(()) => {
            debug!("Encoded report ({} bytes, compressed)", buf.len());
            return Ok(buf);
        }
        Err(e) => warn!("Compressed report encoding failed, retrying uncompressed: {}", e),
    }

    let mut doc = doc;
    let mut buf = Vec::new();
    fallback(&mut doc, &mut buf).map_err(LupiaError::ReportEncoding)?;
    debug!("Encoded report ({} bytes, uncompressed)", buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_count(pdf: &[u8]) -> usize {
        Document::load_mem(pdf).unwrap().get_pages().len()
    }

    fn sample_document() -> Document {
        Document::load_mem(&build_report("A", "B", "C").unwrap()).unwrap()
    }

    fn failing_save(_: &mut Document, _: &mut Vec<u8>) -> Result<(), String> {
        Err("disk full".into())
    }

    #[test]
    fn failed_compressed_save_falls_back_to_plain() {
        let pdf = encode_with(sample_document(), failing_save, save_plain).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(page_count(&pdf), 4);
    }

    #[test]
    fn both_saves_failing_is_a_report_error() {
        match encode_with(sample_document(), failing_save, failing_save) {
            Err(LupiaError::ReportEncoding(msg)) => assert_eq!(msg, "disk full"),
            other => panic!("expected ReportEncoding, got {other:?}"),
        }
    }

    #[test]
    fn compressed_save_is_used_when_it_works() {
        let pdf = encode_with(sample_document(), save_compressed, failing_save).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn report_has_pdf_header() {
        let pdf = build_report("A", "B", "C").unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(pdf.len() > 100);
    }

    #[test]
    fn short_report_has_cover_plus_one_page_per_stage() {
        let pdf = build_report("uno", "dos", "tres").unwrap();
        assert_eq!(page_count(&pdf), 4);
    }

    #[test]
    fn long_body_flows_onto_more_pages() {
        let long = "| R1 | Tecnico | Requisito | Evidencia | Si | ok |\n".repeat(200);
        let pdf = build_report(&long, "dos", "tres").unwrap();
        assert!(page_count(&pdf) > 4);
    }

    #[test]
    fn section_titles_appear_in_order() {
        let pdf = build_report("cuerpo A", "cuerpo B", "cuerpo C").unwrap();
        let text = pdf_extract::extract_text_from_mem(&pdf).unwrap();
        let pos = |needle: &str| {
            text.find(needle)
                .unwrap_or_else(|| panic!("{needle:?} not found in {text:?}"))
        };
        let cover = pos(REPORT_TITLE);
        let a = pos("Asistente Tecnico 1");
        let b = pos("Asistente Tecnico 2");
        let c = pos("Informe de Consenso de LupIA");
        assert!(cover < a && a < b && b < c);
    }

    #[test]
    fn info_dictionary_carries_title() {
        let pdf = build_report("a", "b", "c").unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let info_ref = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_ref).unwrap();
        let title = info.get(b"Title").unwrap().as_str().unwrap();
        assert_eq!(title, REPORT_TITLE.as_bytes());
    }

    #[test]
    fn unsanitized_model_text_still_renders() {
        let nasty = format!("🚀 “Matriz” ✅\r\n{}\tfin", "x".repeat(1000));
        let pdf = build_report(&nasty, &nasty, &nasty).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn default_wrap_width_fits_the_page() {
        let pt = body_font_size(DEFAULT_WRAP_WIDTH);
        assert_eq!(pt, 8.5);
        let line_mm = DEFAULT_WRAP_WIDTH as f32 * COURIER_ADVANCE * pt / MM;
        assert!(line_mm <= text_width());
        assert_eq!(body_font_size(20), BODY_MAX_PT);
    }

    #[test]
    fn break_line_prefers_spaces() {
        assert_eq!(break_line("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(break_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(break_line("short", 10), vec!["short"]);
        assert_eq!(break_line("    xxxxxxxx", 6), vec!["    xx", "xxxxxx"]);
    }

    #[test]
    fn latin1_drops_wide_chars() {
        assert_eq!(latin1("a°b€"), vec![b'a', 0xB0, b'b']);
    }
}

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, ChatRole, CompletionOptions, LLMProvider, LLMResponse, LlmError};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use lupia::{build_report, LupiaError, ReportRenderer, StageKind, StageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const PLIEGO_TEXT: &str = "Requires 10 units of widget X";
pub const OFERTA_TEXT: &str = "We offer 12 units of widget X";

pub const ANSWER_A: &str = "| R1 | Tecnico | 10 unidades | 12 unidades | Si | ok |";
pub const ANSWER_B: &str = "| D1 | Documental | RUC vigente | no adjunto | No verificable | pedir |";
pub const ANSWER_C: &str = "Recomendacion final de LupIA: pedir subsanacion";

/// A single-page PDF with one text line per `\n`-separated line of `text`.
pub fn pdf_with_text(text: &str) -> Vec<u8> {
    let mut operations = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let y = 800.0 - 14.0 * i as f32;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![50.into(), Object::Real(y)]),
            Operation::new("Tj", vec![Object::string_literal(line)]),
            Operation::new("ET", vec![]),
        ]);
    }
    single_page_pdf(operations)
}

/// A valid PDF whose only page has no text at all.
pub fn blank_pdf() -> Vec<u8> {
    single_page_pdf(Vec::new())
}

fn single_page_pdf(operations: Vec<Operation>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// One recorded model call.
#[derive(Debug, Clone)]
pub struct Call {
    pub stage: StageKind,
    pub user_prompt: String,
}

/// Stub model that answers according to the persona in the system message,
/// records every call, and can be told to fail a stage N times.
#[derive(Default)]
pub struct RecordingModel {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<StageKind, u32>>,
}

impl RecordingModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls for `stage` fail with a provider error.
    pub fn failing(self, stage: StageKind, times: u32) -> Self {
        self.failures.lock().unwrap().insert(stage, times);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: StageKind) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.stage == stage)
            .collect()
    }

    fn stage_of(messages: &[ChatMessage]) -> StageKind {
        let system = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        if system.contains("Asistente Tecnico 1") {
            StageKind::TechnicalA
        } else if system.contains("Asistente Tecnico 2") {
            StageKind::TechnicalB
        } else {
            StageKind::Consensus
        }
    }
}

#[async_trait]
impl LLMProvider for RecordingModel {
    fn name(&self) -> &str {
        "recording-stub"
    }

    fn model(&self) -> &str {
        "recording-model"
    }

    fn max_context_length(&self) -> usize {
        128_000
    }

    async fn complete(&self, prompt: &str) -> edgequake_llm::Result<LLMResponse> {
        self.chat(&[ChatMessage::user(prompt)], None).await
    }

    async fn complete_with_options(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.chat(&[ChatMessage::user(prompt)], Some(options)).await
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _options: Option<&CompletionOptions>,
    ) -> edgequake_llm::Result<LLMResponse> {
        let stage = Self::stage_of(messages);
        let user_prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(Call { stage, user_prompt });

        if let Some(left) = self.failures.lock().unwrap().get_mut(&stage) {
            if *left > 0 {
                *left -= 1;
                return Err(LlmError::ApiError(format!("503 {stage} unavailable")));
            }
        }

        let text = match stage {
            StageKind::TechnicalA => ANSWER_A,
            StageKind::TechnicalB => ANSWER_B,
            StageKind::Consensus => ANSWER_C,
        };
        Ok(LLMResponse::new(text, "recording-model").with_usage(100, 20))
    }
}

/// Renderer that counts its invocations and delegates to the real PDF builder.
#[derive(Default)]
pub struct CountingRenderer {
    pub calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReportRenderer for CountingRenderer {
    fn render(&self, stages: [&StageResult; 3]) -> Result<Vec<u8>, LupiaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let [a, b, c] = stages;
        build_report(&a.output_text, &b.output_text, &c.output_text)
    }
}

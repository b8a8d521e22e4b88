//! Boundary to an external semantic paragraph classifier.
//!
//! The classifier itself (a hosted language model, a captured response, a
//! test stub) lives behind [`SemanticClassifier`]. This module owns the
//! request payload, the response parser and the vocabulary mapping onto
//! [`Role`].

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::model::Role;

/// Characters of paragraph text sent per paragraph.
pub const PREVIEW_CHARS: usize = 200;

pub const SYSTEM_PROMPT: &str = "You analyse the structure of word-processing documents. \
For every paragraph in the list, assign one paragraph_type from: title_1, title_2, title_3, \
body, list_item, table_caption, figure_caption, abstract, keyword, reference, footer, unknown. \
Reply with JSON only: {\"paragraphs\": [{\"index\": <int>, \"paragraph_type\": <string>, \
\"confidence\": <0.0-1.0>}]}.";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classifier timed out: {0}")]
    Timeout(String),
    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

/// Paragraph texts in flow order. `indices` restricts the request to a
/// subset; `rule_labels` gives the model the rule roles as context.
#[derive(Debug, Clone, Default)]
pub struct ClassifyRequest {
    pub texts: Vec<String>,
    pub indices: Option<Vec<usize>>,
    pub rule_labels: Option<Vec<Role>>,
}

impl ClassifyRequest {
    /// Paragraph indices the classifier is asked about.
    pub fn requested(&self) -> Vec<usize> {
        match &self.indices {
            Some(indices) => indices.iter().copied().filter(|&i| i < self.texts.len()).collect(),
            None => (0..self.texts.len()).collect(),
        }
    }
}

/// One per-paragraph answer in the external vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalTag {
    pub index: usize,
    pub paragraph_type: String,
    pub confidence: f32,
}

impl ExternalTag {
    pub fn role(&self) -> Option<Role> {
        map_external_type(&self.paragraph_type)
    }
}

pub trait SemanticClassifier {
    fn classify(&self, request: &ClassifyRequest) -> Result<Vec<ExternalTag>, ClassifierError>;
}

impl<F> SemanticClassifier for F
where
    F: Fn(&ClassifyRequest) -> Result<Vec<ExternalTag>, ClassifierError>,
{
    fn classify(&self, request: &ClassifyRequest) -> Result<Vec<ExternalTag>, ClassifierError> {
        self(request)
    }
}

/// External vocabulary → role. `None` for values outside the vocabulary.
pub fn map_external_type(paragraph_type: &str) -> Option<Role> {
    match paragraph_type.trim().to_ascii_lowercase().as_str() {
        "title_1" => Some(Role::H1),
        "title_2" => Some(Role::H2),
        "title_3" => Some(Role::H3),
        "body" => Some(Role::Body),
        "list_item" => Some(Role::ListItem),
        "table_caption" | "figure_caption" => Some(Role::Caption),
        "abstract" => Some(Role::Abstract),
        "keyword" => Some(Role::Keyword),
        "reference" => Some(Role::Reference),
        "footer" => Some(Role::Footer),
        "unknown" => Some(Role::Unknown),
        _ => None,
    }
}

#[derive(Serialize)]
struct PromptItem<'a> {
    index: usize,
    text_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule_label: Option<&'a str>,
}

/// User message for a model-backed classifier.
pub fn build_prompt(request: &ClassifyRequest) -> String {
    let items: Vec<PromptItem> = request
        .requested()
        .into_iter()
        .map(|i| PromptItem {
            index: i,
            text_preview: request.texts[i].chars().take(PREVIEW_CHARS).collect(),
            rule_label: request
                .rule_labels
                .as_ref()
                .and_then(|labels| labels.get(i))
                .map(|r| r.as_str()),
        })
        .collect();
    let payload = serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Label the following {} paragraphs.\n\nParagraphs (JSON):\n{payload}\n",
        items.len()
    )
}

/// Drop a surrounding markdown code fence, if any.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Skip the info string (`json`) on the opening line.
    match rest.find('\n') {
        Some(nl) => rest[nl + 1..].trim(),
        None => rest.trim_start_matches("json").trim(),
    }
}

fn lenient_index(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_confidence(v: Option<&Value>) -> f32 {
    let raw = match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f64>().map(|p| p / 100.0).unwrap_or(0.0),
                None => s.parse::<f64>().unwrap_or(0.0),
            }
        }
        _ => 0.0,
    };
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 1.0) as f32
}

/// Parse a classifier reply: either `{"paragraphs": [...]}` or a bare array,
/// optionally inside a ```json fence.
pub fn parse_response(raw: &str) -> Result<Vec<ExternalTag>, ClassifierError> {
    let body = strip_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(300).collect();
        ClassifierError::Malformed(format!("{e}: {preview}"))
    })?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("paragraphs") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ClassifierError::Malformed(
                    "response has no \"paragraphs\" array".into(),
                ));
            }
        },
        _ => {
            return Err(ClassifierError::Malformed(
                "response is neither an object nor an array".into(),
            ));
        }
    };

    let mut tags = Vec::with_capacity(items.len());
    for item in items {
        let Some(index) = item.get("index").and_then(lenient_index) else {
            log::warn!("Skipping classifier entry without a usable index: {item}");
            continue;
        };
        let paragraph_type = item
            .get("paragraph_type")
            .or_else(|| item.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        tags.push(ExternalTag {
            index,
            paragraph_type,
            confidence: lenient_confidence(item.get("confidence")),
        });
    }
    Ok(tags)
}

/// Classifier backed by a previously captured response.
pub struct ResponseFileClassifier {
    tags: Vec<ExternalTag>,
}

impl ResponseFileClassifier {
    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        Ok(Self {
            tags: parse_response(raw)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

impl SemanticClassifier for ResponseFileClassifier {
    fn classify(&self, request: &ClassifyRequest) -> Result<Vec<ExternalTag>, ClassifierError> {
        let requested = request.requested();
        Ok(self
            .tags
            .iter()
            .filter(|t| requested.contains(&t.index))
            .cloned()
            .collect())
    }
}

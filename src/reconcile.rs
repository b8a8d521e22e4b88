//! Merges rule labels with an external classifier's labels.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{Block, HybridTriggers, LabelEntry, LabelSet, LabelSource, Role};
use crate::semantic::{ClassifierError, ClassifyRequest, ExternalTag, SemanticClassifier};

/// Minimum external confidence for a triggered paragraph to take the
/// external role in hybrid mode.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;
/// Headings longer than this are suspicious.
pub const LONG_HEADING_CHARS: usize = 30;
/// Body paragraphs shorter than this may be unrecognized list items.
pub const SHORT_BODY_CHARS: usize = 60;
pub const SHORT_BODY_RUN: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Rule,
    Llm,
    #[default]
    Hybrid,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Rule => "rule",
            Mode::Llm => "llm",
            Mode::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rule" => Ok(Mode::Rule),
            "llm" => Ok(Mode::Llm),
            "hybrid" => Ok(Mode::Hybrid),
            other => Err(format!("unknown mode '{other}' (expected rule, llm or hybrid)")),
        }
    }
}

fn char_count(text: &str) -> usize {
    text.trim().chars().count()
}

/// Evaluate the hybrid triggers over the rule labels.
pub fn find_triggers(blocks: &[Block], rule_labels: &[Role]) -> HybridTriggers {
    let mut indices = BTreeSet::new();
    let mut t = HybridTriggers::default();

    for (block, &role) in blocks.iter().zip(rule_labels) {
        if role == Role::Unknown {
            t.unknown_count += 1;
            indices.insert(block.paragraph_index);
        } else if role.is_heading() && char_count(&block.text) > LONG_HEADING_CHARS {
            t.ambiguous_heading_count += 1;
            indices.insert(block.paragraph_index);
        }
    }

    let mut run: Vec<usize> = Vec::new();
    let mut flush = |run: &mut Vec<usize>, t: &mut HybridTriggers| {
        if run.len() >= SHORT_BODY_RUN {
            t.short_body_run_count += 1;
            indices.extend(run.iter().copied());
        }
        run.clear();
    };
    for (block, &role) in blocks.iter().zip(rule_labels) {
        if role == Role::Body && char_count(&block.text) < SHORT_BODY_CHARS {
            run.push(block.paragraph_index);
        } else {
            flush(&mut run, &mut t);
        }
    }
    flush(&mut run, &mut t);

    if t.unknown_count > 0 {
        t.reasons.push(format!("{} paragraphs labeled unknown", t.unknown_count));
    }
    if t.ambiguous_heading_count > 0 {
        t.reasons.push(format!(
            "{} headings longer than {LONG_HEADING_CHARS} characters",
            t.ambiguous_heading_count
        ));
    }
    if t.short_body_run_count > 0 {
        t.reasons.push(format!(
            "{} runs of {SHORT_BODY_RUN}+ short body paragraphs",
            t.short_body_run_count
        ));
    }
    t.triggered_indices = indices.into_iter().collect();
    t.triggered = !t.triggered_indices.is_empty();
    t
}

/// Index → tag, later duplicates winning.
fn index_tags(tags: &[ExternalTag]) -> HashMap<usize, &ExternalTag> {
    tags.iter().map(|t| (t.index, t)).collect()
}

/// External role usable for a paragraph whose rule label is `rule`.
/// `unknown` and out-of-vocabulary answers carry no opinion, and blank
/// paragraphs stay blank.
fn usable_role(tag: &ExternalTag, rule: Role) -> Option<Role> {
    if rule == Role::Blank {
        return None;
    }
    match tag.role() {
        Some(Role::Unknown) => None,
        Some(role) => Some(role),
        None => {
            log::warn!(
                "Classifier returned unsupported type '{}' for paragraph {}",
                tag.paragraph_type,
                tag.index
            );
            None
        }
    }
}

fn request(blocks: &[Block], rule_labels: &[Role], indices: Option<Vec<usize>>) -> ClassifyRequest {
    ClassifyRequest {
        texts: blocks.iter().map(|b| b.text.clone()).collect(),
        indices,
        rule_labels: Some(rule_labels.to_vec()),
    }
}

fn call(
    classifier: Option<&dyn SemanticClassifier>,
    request: &ClassifyRequest,
) -> Result<Vec<ExternalTag>, ClassifierError> {
    match classifier {
        Some(c) => c.classify(request),
        None => Err(ClassifierError::Unavailable(
            "no semantic classifier configured".into(),
        )),
    }
}

/// Produce the final labels for `blocks` under `mode`. Never fails: any
/// classifier failure leaves the rule labels in place and is reported in
/// `warnings`.
pub fn reconcile(
    blocks: &[Block],
    rule_labels: &[Role],
    mode: Mode,
    classifier: Option<&dyn SemanticClassifier>,
) -> LabelSet {
    match mode {
        Mode::Rule => LabelSet::from_rules(rule_labels),
        Mode::Llm => full_external(blocks, rule_labels, classifier),
        Mode::Hybrid => selective(blocks, rule_labels, classifier),
    }
}

fn full_external(
    blocks: &[Block],
    rule_labels: &[Role],
    classifier: Option<&dyn SemanticClassifier>,
) -> LabelSet {
    let tags = match call(classifier, &request(blocks, rule_labels, None)) {
        Ok(tags) => tags,
        Err(e) => {
            log::warn!("llm mode: classifier call failed, using rule labels: {e}");
            let mut set = LabelSet::from_rules(rule_labels);
            set.warnings.push(format!(
                "llm classifier call failed, fell back to rule labels for all {} paragraphs: {e}",
                blocks.len()
            ));
            return set;
        }
    };

    let by_index = index_tags(&tags);
    let mut covered = 0;
    let entries: Vec<LabelEntry> = blocks
        .iter()
        .zip(rule_labels)
        .map(|(block, &rule)| {
            match by_index
                .get(&block.paragraph_index)
                .and_then(|tag| usable_role(tag, rule).map(|role| (role, tag.confidence)))
            {
                Some((role, confidence)) => {
                    covered += 1;
                    LabelEntry::external(role, confidence)
                }
                None => LabelEntry::rule(rule),
            }
        })
        .collect();

    let mut warnings = Vec::new();
    let labelable = rule_labels.iter().filter(|&&r| r != Role::Blank).count();
    if covered < labelable {
        warnings.push(format!(
            "llm labels cover {covered} of {labelable} paragraphs, rule labels used for the rest"
        ));
    }

    LabelSet {
        entries,
        source: LabelSource::Llm,
        warnings,
        hybrid: None,
    }
}

fn selective(
    blocks: &[Block],
    rule_labels: &[Role],
    classifier: Option<&dyn SemanticClassifier>,
) -> LabelSet {
    let mut triggers = find_triggers(blocks, rule_labels);
    let mut set = LabelSet::from_rules(rule_labels);

    if !triggers.triggered {
        set.hybrid = Some(triggers);
        return set;
    }

    log::info!(
        "hybrid mode: {} paragraphs triggered ({})",
        triggers.triggered_indices.len(),
        triggers.reasons.join("; ")
    );
    triggers.classifier_called = classifier.is_some();
    let req = request(blocks, rule_labels, Some(triggers.triggered_indices.clone()));
    let tags = match call(classifier, &req) {
        Ok(tags) => tags,
        Err(e) => {
            log::warn!("hybrid mode: classifier call failed, using rule labels: {e}");
            set.warnings.push(format!(
                "hybrid classifier call failed for {} triggered paragraphs, rule labels kept: {e}",
                triggers.triggered_indices.len()
            ));
            triggers.error = Some(e.to_string());
            set.hybrid = Some(triggers);
            return set;
        }
    };

    let by_index = index_tags(&tags);
    let position: HashMap<usize, usize> = blocks
        .iter()
        .enumerate()
        .map(|(pos, b)| (b.paragraph_index, pos))
        .collect();
    let mut low_confidence = 0;
    for &index in &triggers.triggered_indices {
        let (Some(&pos), Some(tag)) = (position.get(&index), by_index.get(&index)) else {
            continue;
        };
        let rule = rule_labels[pos];
        let Some(role) = usable_role(tag, rule) else {
            continue;
        };
        if tag.confidence < CONFIDENCE_THRESHOLD {
            low_confidence += 1;
            continue;
        }
        if role != rule {
            triggers.overridden += 1;
        }
        set.entries[pos] = LabelEntry::external(role, tag.confidence);
    }

    if low_confidence > 0 {
        set.warnings.push(format!(
            "hybrid: {low_confidence} triggered paragraphs below confidence {CONFIDENCE_THRESHOLD} kept their rule labels"
        ));
    }
    set.source = LabelSource::Hybrid;
    set.hybrid = Some(triggers);
    set
}

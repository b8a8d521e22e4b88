//! Diagnostics for one tidy run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::classify::is_multi_item_blob;
use crate::error::Error;
use crate::lists::Materialized;
use crate::model::{Block, HybridTriggers, LabelOrigin, LabelSet, LabelSource, Role};
use crate::reconcile::Mode;
use crate::split::SplitOutcome;

const MAX_EXAMPLES: usize = 5;
const EXAMPLE_PREVIEW_CHARS: usize = 60;

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub meta: Meta,
    pub labels: Labels,
    pub actions: Actions,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Meta {
    pub paragraphs_before: usize,
    pub paragraphs_after: usize,
    pub blank_before: usize,
    pub blank_after: usize,
    pub mode: Mode,
}

#[derive(Clone, Debug, Serialize)]
pub struct Labels {
    pub source: LabelSource,
    pub counts: BTreeMap<String, usize>,
    pub coverage: Coverage,
    pub consistency: Consistency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridTriggers>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Coverage {
    pub labeled: usize,
    pub total: usize,
    pub coverage_rate: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Consistency {
    pub compared: usize,
    pub mismatched: usize,
    pub mismatch_rate: f64,
    pub examples: Vec<Mismatch>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Mismatch {
    pub paragraph_index: usize,
    pub text: String,
    pub rule: Role,
    pub label: Role,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Actions {
    pub blank_paragraphs_removed: usize,
    pub split_new_paragraphs_created: usize,
    pub split_original_paragraphs_affected: usize,
    pub split_max_lines: usize,
    pub list_groups_materialized: usize,
    pub text_list_converted_to_numpr: usize,
    pub preambles_kept_as_body: usize,
    pub native_numbering_paragraphs: usize,
    pub formatted: BTreeMap<String, usize>,
}

/// Everything the pipeline observed, gathered for [`Report::build`].
pub struct Facts<'a> {
    pub mode: Mode,
    pub blocks: &'a [Block],
    pub rule_labels: &'a [Role],
    pub labels: &'a LabelSet,
    pub paragraphs_after: usize,
    pub blank_after: usize,
    pub blank_removed: usize,
    pub split: &'a SplitOutcome,
    pub materialized: &'a Materialized,
    pub preambles: usize,
    pub native_numbering: usize,
    pub formatted: BTreeMap<String, usize>,
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Share of paragraphs whose label is neither `blank` nor `unknown`.
pub fn coverage(labels: &LabelSet) -> Coverage {
    let total = labels.len();
    let labeled = labels
        .entries
        .iter()
        .filter(|e| !matches!(e.role, Role::Blank | Role::Unknown))
        .count();
    Coverage {
        labeled,
        total,
        coverage_rate: rate(labeled, total),
    }
}

/// Externally labelled paragraphs whose role differs from the rule role.
/// Multi-item blobs are skipped: the rule classifier defers them on purpose.
pub fn consistency(blocks: &[Block], rule_labels: &[Role], labels: &LabelSet) -> Consistency {
    let mut compared = 0;
    let mut examples = Vec::new();
    let mut mismatched = 0;
    for ((block, &rule), entry) in blocks.iter().zip(rule_labels).zip(&labels.entries) {
        if entry.origin != LabelOrigin::External || is_multi_item_blob(&block.text) {
            continue;
        }
        compared += 1;
        if entry.role != rule {
            mismatched += 1;
            if examples.len() < MAX_EXAMPLES {
                examples.push(Mismatch {
                    paragraph_index: block.paragraph_index,
                    text: block.text.trim().chars().take(EXAMPLE_PREVIEW_CHARS).collect(),
                    rule,
                    label: entry.role,
                });
            }
        }
    }
    Consistency {
        compared,
        mismatched,
        mismatch_rate: rate(mismatched, compared),
        examples,
    }
}

impl Report {
    pub fn build(facts: Facts) -> Self {
        let mut counts = BTreeMap::new();
        for role in facts.labels.roles() {
            *counts.entry(role.as_str().to_string()).or_insert(0) += 1;
        }

        let mut warnings = facts.labels.warnings.clone();
        if facts.native_numbering > 0 {
            warnings.push(format!(
                "{} paragraphs already used native numbering and may need manual indent review",
                facts.native_numbering
            ));
        }

        Report {
            meta: Meta {
                paragraphs_before: facts.blocks.len(),
                paragraphs_after: facts.paragraphs_after,
                blank_before: facts.rule_labels.iter().filter(|&&r| r == Role::Blank).count(),
                blank_after: facts.blank_after,
                mode: facts.mode,
            },
            labels: Labels {
                source: facts.labels.source,
                counts,
                coverage: coverage(facts.labels),
                consistency: consistency(facts.blocks, facts.rule_labels, facts.labels),
                hybrid: facts.labels.hybrid.clone(),
            },
            actions: Actions {
                blank_paragraphs_removed: facts.blank_removed,
                split_new_paragraphs_created: facts.split.created,
                split_original_paragraphs_affected: facts.split.affected,
                split_max_lines: facts.split.max_lines,
                list_groups_materialized: facts.materialized.groups,
                text_list_converted_to_numpr: facts.materialized.paragraphs,
                preambles_kept_as_body: facts.preambles,
                native_numbering_paragraphs: facts.native_numbering,
                formatted: facts.formatted,
            },
            warnings,
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let meta = &self.meta;
        let delta = meta.paragraphs_after as i64 - meta.paragraphs_before as i64;
        format!(
            "paragraphs {} -> {} ({delta:+}), split {} into {} new, lists {} ({} paragraphs), coverage {:.1}% ({}), mismatches {}/{}, warnings {}",
            meta.paragraphs_before,
            meta.paragraphs_after,
            self.actions.split_original_paragraphs_affected,
            self.actions.split_new_paragraphs_created,
            self.actions.list_groups_materialized,
            self.actions.text_list_converted_to_numpr,
            self.labels.coverage.coverage_rate * 100.0,
            self.labels.source.as_str(),
            self.labels.consistency.mismatched,
            self.labels.consistency.compared,
            self.warnings.len(),
        )
    }

    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

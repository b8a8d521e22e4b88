//! One document, start to finish: classify, reconcile, clean up, split,
//! materialize lists, format, report.

use std::collections::BTreeMap;

use crate::classify;
use crate::config::Config;
use crate::docx::Docx;
use crate::docx::flow::{self, is_blank_text};
use crate::format;
use crate::lists::{self, Candidate, Materialized};
use crate::model::{Block, NodeLabels, ParagraphView, Role};
use crate::reconcile;
use crate::report::{Facts, Report};
use crate::semantic::SemanticClassifier;
use crate::split;

/// Run every stage on `docx` in place. Never fails; problems end up in the
/// report's warnings.
pub fn run(
    docx: &mut Docx,
    config: &Config,
    classifier: Option<&dyn SemanticClassifier>,
) -> Report {
    let styles = docx.styles().clone();

    let paragraphs = flow::paragraphs(&docx.document);
    let views: Vec<ParagraphView> = paragraphs
        .iter()
        .map(|p| flow::paragraph_view(&docx.document, &styles, p.node))
        .collect();
    let texts: Vec<&str> = views.iter().map(|v| v.text.as_str()).collect();
    let blocks = Block::from_texts(&texts);

    let rule_labels = classify::classify_all(&views);
    let labels = reconcile::reconcile(&blocks, &rule_labels, config.mode, classifier);
    for warning in &labels.warnings {
        log::warn!("{warning}");
    }

    let mut node_labels: NodeLabels = paragraphs
        .iter()
        .zip(&labels.entries)
        .map(|(p, entry)| (p.node, *entry))
        .collect();

    let blank_removed =
        format::cleanup_blanks(&mut docx.document, &mut node_labels, &config.cleanup);
    let split = split::split_soft_breaks(&mut docx.document, &styles, &mut node_labels);

    let expanded = flow::paragraphs(&docx.document);
    let native: Vec<bool> = expanded
        .iter()
        .map(|p| flow::has_native_numbering(&docx.document, &styles, p.node))
        .collect();
    let native_numbering = native.iter().filter(|&&n| n).count();

    let mut preambles = 0;
    let mut materialized = Materialized::default();
    if config.list_item.convert_text_numbers {
        let candidates: Vec<Candidate> = expanded
            .iter()
            .zip(&native)
            .map(|(p, &native)| Candidate {
                paragraph: *p,
                text: flow::paragraph_text(&docx.document, p.node),
                role: node_labels.get(&p.node).map_or(Role::Body, |e| e.role),
                native,
            })
            .collect();
        let plan = lists::plan_groups(&candidates, config.list_item.min_run_len);

        for p in &plan.preambles {
            if let Some(entry) = node_labels.get_mut(&p.node) {
                entry.role = Role::Body;
            }
        }
        preambles = plan.preambles.len();

        materialized = lists::materialize(docx, &plan, &config.list_layout());
        for item in plan.groups.iter().flat_map(|g| &g.items) {
            if let Some(entry) = node_labels.get_mut(&item.paragraph.node) {
                entry.role = Role::ListItem;
            }
        }
        if materialized.groups > 0 {
            log::info!(
                "Converted {} typed list(s) covering {} paragraph(s) to native numbering",
                materialized.groups,
                materialized.paragraphs
            );
        }
    }

    let formatted = if config.formatting.enabled {
        format::apply(&mut docx.document, &styles, &node_labels, config)
    } else {
        BTreeMap::new()
    };

    let finished = flow::paragraphs(&docx.document);
    let blank_after = finished
        .iter()
        .filter(|p| is_blank_text(&flow::paragraph_text(&docx.document, p.node)))
        .count();

    Report::build(Facts {
        mode: config.mode,
        blocks: &blocks,
        rule_labels: &rule_labels,
        labels: &labels,
        paragraphs_after: finished.len(),
        blank_after,
        blank_removed,
        split: &split,
        materialized: &materialized,
        preambles,
        native_numbering,
        formatted,
    })
}

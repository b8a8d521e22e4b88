use crate::docx::{Docx, set_wml_text};
use crate::docx::flow::{Atom, run_atoms, runs};
use crate::docx::numbering::{self, LevelDef, MarkerFont};
use crate::xml::{NodeId, XmlTree};

use super::group::GroupPlan;

/// Indentation and marker font of generated list definitions.
#[derive(Clone, Debug, PartialEq)]
pub struct ListLayout {
    pub indent_left: f32,
    pub indent_hanging: f32,
    pub font: MarkerFont,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Materialized {
    pub groups: usize,
    pub paragraphs: usize,
    /// New `numId`s, one per group, in flow order.
    pub num_ids: Vec<u32>,
}

/// Bind every planned group to a fresh single-level numbering definition and
/// strip the typed markers.
pub fn materialize(docx: &mut Docx, plan: &GroupPlan, layout: &ListLayout) -> Materialized {
    let mut out = Materialized::default();
    for group in &plan.groups {
        let level = LevelDef {
            num_fmt: group.family.num_fmt().to_string(),
            lvl_text: group.family.lvl_text().to_string(),
            indent_left: layout.indent_left,
            indent_hanging: layout.indent_hanging,
            start: group.start(),
        };
        let num_id = docx.ensure_numbering().add_single_level(&level, &layout.font);
        log::debug!(
            "List {num_id}: {} item(s), {} starting at {}",
            group.len(),
            group.family.as_str(),
            level.start
        );

        for item in &group.items {
            numbering::bind(&mut docx.document, item.paragraph.node, num_id, 0);
            strip_prefix(&mut docx.document, item.paragraph.node, item.marker.prefix_len);
            out.paragraphs += 1;
        }
        out.groups += 1;
        out.num_ids.push(num_id);
    }
    out
}

fn paragraph_atoms(tree: &XmlTree, paragraph: NodeId) -> Vec<Atom> {
    runs(tree, paragraph)
        .into_iter()
        .flat_map(|r| run_atoms(tree, r))
        .collect()
}

/// Remove the first `count` code points of a paragraph's text, across as
/// many runs as they span, then drop whitespace left at the front.
/// Returns false when the paragraph has no text to strip.
pub fn strip_prefix(tree: &mut XmlTree, paragraph: NodeId, count: usize) -> bool {
    let atoms = paragraph_atoms(tree, paragraph);
    if atoms.is_empty() {
        return false;
    }

    let mut remaining = count;
    for &atom in &atoms {
        if remaining == 0 {
            break;
        }
        match atom {
            Atom::Text(node) => {
                let text = tree.element_text(node);
                let len = text.chars().count();
                if len <= remaining {
                    tree.set_element_text(node, "");
                    remaining -= len;
                } else {
                    let rest: String = text.chars().skip(remaining).collect();
                    set_wml_text(tree, node, &rest);
                    remaining = 0;
                }
            }
            Atom::Tab(node) | Atom::Break(node) => {
                tree.detach(node);
                remaining -= 1;
            }
        }
    }

    for atom in paragraph_atoms(tree, paragraph) {
        match atom {
            Atom::Text(node) => {
                let text = tree.element_text(node);
                let trimmed = text.trim_start();
                if trimmed.len() != text.len() {
                    let trimmed = trimmed.to_string();
                    set_wml_text(tree, node, &trimmed);
                }
                if !trimmed.is_empty() {
                    break;
                }
            }
            Atom::Tab(node) => tree.detach(node),
            Atom::Break(_) => break,
        }
    }
    true
}

//! Turns soft line breaks inside a paragraph into real paragraph boundaries.

use crate::classify;
use crate::docx::flow::{self, Atom, ParagraphRef, atom_text, is_blank_text, run_atoms, runs};
use crate::docx::{StyleTable, WML_NS, new_wml, set_wml_text, wml};
use crate::lists::detect;
use crate::model::{LabelEntry, LabelOrigin, NodeLabels, ParagraphView, Role};
use crate::xml::{NodeId, XmlTree};

/// Paragraph children that carry run content and are rebuilt on split.
const RUN_CONTENT: &[&str] = &[
    "r", "hyperlink", "ins", "smartTag", "fldSimple", "customXml", "dir", "bdo", "sdt",
];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitOutcome {
    /// Paragraphs added to the document.
    pub created: usize,
    /// Source paragraphs that were split into two or more.
    pub affected: usize,
    pub max_lines: usize,
}

enum Piece {
    Text(String),
    Tab,
}

/// Consecutive pieces of one line taken from the same source run.
struct Segment {
    run: NodeId,
    pieces: Vec<Piece>,
}

type Line = Vec<Segment>;

#[derive(Default)]
struct LineBuilder {
    done: Vec<Line>,
    current: Line,
}

impl LineBuilder {
    fn push(&mut self, run: NodeId, piece: Piece) {
        match self.current.last_mut() {
            Some(seg) if seg.run == run => seg.pieces.push(piece),
            _ => self.current.push(Segment {
                run,
                pieces: vec![piece],
            }),
        }
    }

    fn newline(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
    }

    fn finish(mut self) -> Vec<Line> {
        self.newline();
        self.done
    }
}

fn line_text(line: &Line) -> String {
    line.iter()
        .flat_map(|seg| seg.pieces.iter())
        .map(|p| match p {
            Piece::Text(t) => t.as_str(),
            Piece::Tab => "\t",
        })
        .collect()
}

fn collect_lines(tree: &XmlTree, paragraph: NodeId) -> Vec<Line> {
    let mut lines = LineBuilder::default();
    for run in runs(tree, paragraph) {
        for atom in run_atoms(tree, run) {
            match atom {
                Atom::Text(_) => {
                    let text = atom_text(tree, atom);
                    for (i, part) in text.split('\n').enumerate() {
                        if i > 0 {
                            lines.newline();
                        }
                        if !part.is_empty() {
                            lines.push(run, Piece::Text(part.to_string()));
                        }
                    }
                }
                Atom::Tab(_) => lines.push(run, Piece::Tab),
                Atom::Break(_) => lines.newline(),
            }
        }
    }
    lines.finish()
}

fn build_run(tree: &mut XmlTree, segment: &Segment) -> NodeId {
    let run = new_wml(tree, "r");
    if let Some(rpr) = wml(tree, segment.run, "rPr") {
        let copy = tree.deep_clone(rpr);
        tree.append_child(run, copy);
    }
    for piece in &segment.pieces {
        let node = match piece {
            Piece::Text(text) => {
                let t = new_wml(tree, "t");
                set_wml_text(tree, t, text);
                t
            }
            Piece::Tab => new_wml(tree, "tab"),
        };
        tree.append_child(run, node);
    }
    run
}

fn is_run_content(tree: &XmlTree, node: NodeId) -> bool {
    tree.name(node).is_some_and(|n| {
        n.ns.as_deref() == Some(WML_NS) && RUN_CONTENT.contains(&n.local.as_str())
    })
}

/// Fresh paragraph carrying a copy of `source`'s paragraph properties,
/// minus any section break.
fn sibling_paragraph(tree: &mut XmlTree, source: NodeId) -> NodeId {
    let p = new_wml(tree, "p");
    if let Some(ppr) = wml(tree, source, "pPr") {
        let copy = tree.deep_clone(ppr);
        for sect in tree.children_named(copy, WML_NS, "sectPr") {
            tree.detach(sect);
        }
        tree.append_child(p, copy);
    }
    p
}

/// Every run holds only content that `build_run` reproduces.
fn runs_are_plain(tree: &XmlTree, paragraph: NodeId) -> bool {
    runs(tree, paragraph).into_iter().all(|run| {
        tree.children(run).iter().all(|&c| {
            !tree.is_element(c)
                || match tree.local_name(c) {
                    Some("rPr" | "t" | "tab" | "cr" | "lastRenderedPageBreak") => true,
                    Some("br") => tree
                        .attr(c, Some(WML_NS), "type")
                        .is_none_or(|t| t == "textWrapping"),
                    _ => false,
                }
        })
    })
}

fn splittable(tree: &XmlTree, styles: &StyleTable, paragraph: NodeId) -> bool {
    !flow::has_native_numbering(tree, styles, paragraph)
        && !flow::has_field(tree, paragraph)
        && !flow::has_embedded_object(tree, paragraph)
        && runs_are_plain(tree, paragraph)
}

/// Label of the `index`-th fragment of a split paragraph.
///
/// Rule labels are recomputed per line; external labels are inherited, with
/// an unmarked leading line of a list item demoted to body.
fn fragment_label(parent: LabelEntry, index: usize, view: &ParagraphView) -> LabelEntry {
    match parent.origin {
        LabelOrigin::Rule => LabelEntry::rule(classify::classify(view)),
        LabelOrigin::External => {
            let role = if parent.role == Role::ListItem
                && index == 0
                && !detect::has_marker(&view.text)
            {
                Role::Body
            } else {
                parent.role
            };
            LabelEntry { role, ..parent }
        }
    }
}

/// Split one paragraph; returns the paragraphs now holding its lines, in order.
///
/// Markers after the last run (`bookmarkEnd`, `commentRangeEnd`, ...) close
/// ranges over the whole paragraph and follow the last line.
fn split_one(tree: &mut XmlTree, paragraph: NodeId, lines: Vec<Line>) -> Vec<NodeId> {
    let children = tree.children(paragraph).to_vec();
    let trailing: Vec<NodeId> = children
        .iter()
        .rposition(|&c| is_run_content(tree, c))
        .map(|last| {
            children[last + 1..]
                .iter()
                .copied()
                .filter(|&c| tree.is_element(c))
                .collect()
        })
        .unwrap_or_default();
    for &child in &children {
        if is_run_content(tree, child) || trailing.contains(&child) {
            tree.detach(child);
        }
    }

    let mut nodes = Vec::with_capacity(lines.len());
    let mut anchor = paragraph;
    for (i, line) in lines.iter().enumerate() {
        let target = if i == 0 {
            paragraph
        } else {
            let p = sibling_paragraph(tree, paragraph);
            tree.insert_after(anchor, p);
            anchor = p;
            p
        };
        for segment in line {
            let run = build_run(tree, segment);
            tree.append_child(target, run);
        }
        nodes.push(target);
    }

    // The section break belongs after the last line.
    if nodes.len() > 1
        && let Some(ppr) = wml(tree, paragraph, "pPr")
        && let Some(sect) = wml(tree, ppr, "sectPr")
        && let Some(&last) = nodes.last()
        && let Some(last_ppr) = wml(tree, last, "pPr")
    {
        tree.append_child(last_ppr, sect);
    }
    if let Some(&last) = nodes.last() {
        for node in trailing {
            tree.append_child(last, node);
        }
    }
    nodes
}

/// Split every `body`/`list_item` paragraph that contains soft breaks.
/// Fragment labels are written to `labels`.
pub fn split_soft_breaks(
    tree: &mut XmlTree,
    styles: &StyleTable,
    labels: &mut NodeLabels,
) -> SplitOutcome {
    let mut outcome = SplitOutcome::default();
    let paragraphs: Vec<ParagraphRef> = flow::paragraphs(tree);

    for p in paragraphs {
        let Some(&parent) = labels.get(&p.node) else {
            continue;
        };
        if !matches!(parent.role, Role::Body | Role::ListItem) {
            continue;
        }
        let text = flow::paragraph_text(tree, p.node);
        if !text.contains('\n') || is_blank_text(&text) || !splittable(tree, styles, p.node) {
            continue;
        }

        let lines: Vec<Line> = collect_lines(tree, p.node)
            .into_iter()
            .filter(|l| !is_blank_text(&line_text(l)))
            .collect();
        if lines.is_empty() {
            continue;
        }
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        let style_name = flow::style_id(tree, p.node).map(|id| styles.name_of(id).to_string());

        let nodes = split_one(tree, p.node, lines);
        for (i, (node, text)) in nodes.iter().zip(texts).enumerate() {
            let view = ParagraphView {
                text,
                style_name: style_name.clone(),
                has_numbering: false,
            };
            labels.insert(*node, fragment_label(parent, i, &view));
        }

        if nodes.len() > 1 {
            outcome.affected += 1;
            outcome.created += nodes.len() - 1;
        }
        outcome.max_lines = outcome.max_lines.max(nodes.len());
    }

    if outcome.affected > 0 {
        log::info!(
            "Split {} paragraph(s) on soft breaks into {} new paragraph(s)",
            outcome.affected,
            outcome.created
        );
    }
    outcome
}

//! Read access to the paragraph flow of `word/document.xml`.
//!
//! Paragraphs are visited in document order: direct body paragraphs, then
//! table cells row by row (nested tables recursively). Content controls and
//! custom XML wrappers are transparent.

use crate::model::ParagraphView;
use crate::xml::{NodeId, XmlTree};

use super::{StyleTable, WML_NS, wml, wml_attr};

/// A paragraph and the block container that owns it (`w:body` or `w:tc`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParagraphRef {
    pub node: NodeId,
    pub container: NodeId,
}

/// Text-bearing child of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Atom {
    Text(NodeId),
    Tab(NodeId),
    Break(NodeId),
}

impl Atom {
    pub fn node(self) -> NodeId {
        match self {
            Atom::Text(n) | Atom::Tab(n) | Atom::Break(n) => n,
        }
    }
}

const INLINE_WRAPPERS: &[&str] =
    &["hyperlink", "ins", "smartTag", "fldSimple", "customXml", "dir", "bdo"];

pub fn body(tree: &XmlTree) -> Option<NodeId> {
    wml(tree, tree.root(), "body")
}

fn is_wml(tree: &XmlTree, node: NodeId) -> bool {
    tree.name(node)
        .is_some_and(|n| n.ns.as_deref() == Some(WML_NS))
}

/// Children of `parent` with `w:sdt`/`w:customXml` wrappers flattened.
fn block_children(tree: &XmlTree, parent: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &child in tree.children(parent) {
        if !is_wml(tree, child) {
            continue;
        }
        match tree.local_name(child) {
            Some("sdt") => {
                if let Some(content) = wml(tree, child, "sdtContent") {
                    out.extend(block_children(tree, content));
                }
            }
            Some("customXml") => out.extend(block_children(tree, child)),
            _ => out.push(child),
        }
    }
    out
}

fn collect_paragraphs(
    tree: &XmlTree,
    parent: NodeId,
    container: NodeId,
    out: &mut Vec<ParagraphRef>,
) {
    for node in block_children(tree, parent) {
        match tree.local_name(node) {
            Some("p") => out.push(ParagraphRef { node, container }),
            Some("tbl") => {
                for row in block_children(tree, node) {
                    if tree.local_name(row) != Some("tr") {
                        continue;
                    }
                    for cell in block_children(tree, row) {
                        if tree.local_name(cell) == Some("tc") {
                            collect_paragraphs(tree, cell, cell, out);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Every paragraph in reading order.
pub fn paragraphs(tree: &XmlTree) -> Vec<ParagraphRef> {
    let mut out = Vec::new();
    if let Some(body) = body(tree) {
        collect_paragraphs(tree, body, body, &mut out);
    }
    out
}

fn collect_runs(tree: &XmlTree, parent: NodeId, out: &mut Vec<NodeId>) {
    for &child in tree.children(parent) {
        if !is_wml(tree, child) {
            continue;
        }
        match tree.local_name(child) {
            Some("r") => out.push(child),
            Some("sdt") => {
                if let Some(content) = wml(tree, child, "sdtContent") {
                    collect_runs(tree, content, out);
                }
            }
            Some(name) if INLINE_WRAPPERS.contains(&name) => collect_runs(tree, child, out),
            _ => {}
        }
    }
}

/// Runs of a paragraph, including runs nested in hyperlinks and insertions.
pub fn runs(tree: &XmlTree, paragraph: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_runs(tree, paragraph, &mut out);
    out
}

pub fn run_atoms(tree: &XmlTree, run: NodeId) -> Vec<Atom> {
    let mut atoms = Vec::new();
    for &child in tree.children(run) {
        if !is_wml(tree, child) {
            continue;
        }
        match tree.local_name(child) {
            Some("t") => atoms.push(Atom::Text(child)),
            Some("tab") => atoms.push(Atom::Tab(child)),
            Some("cr") => atoms.push(Atom::Break(child)),
            Some("br") => {
                let kind = tree.attr(child, Some(WML_NS), "type");
                if !matches!(kind, Some("page") | Some("column")) {
                    atoms.push(Atom::Break(child));
                }
            }
            _ => {}
        }
    }
    atoms
}

/// Visible text of an atom. Literal carriage returns and vertical tabs inside
/// `w:t` are reported as `\n`.
pub fn atom_text(tree: &XmlTree, atom: Atom) -> String {
    match atom {
        Atom::Text(n) => tree
            .element_text(n)
            .chars()
            .map(|c| if matches!(c, '\r' | '\u{b}') { '\n' } else { c })
            .collect(),
        Atom::Tab(_) => "\t".to_string(),
        Atom::Break(_) => "\n".to_string(),
    }
}

pub fn run_text(tree: &XmlTree, run: NodeId) -> String {
    run_atoms(tree, run)
        .into_iter()
        .map(|a| atom_text(tree, a))
        .collect()
}

pub fn paragraph_text(tree: &XmlTree, paragraph: NodeId) -> String {
    runs(tree, paragraph)
        .into_iter()
        .map(|r| run_text(tree, r))
        .collect()
}

/// Whitespace-only text, counting ideographic and no-break spaces.
pub fn is_blank_text(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || matches!(c, '\u{3000}' | '\u{a0}'))
}

pub fn style_id(tree: &XmlTree, paragraph: NodeId) -> Option<&str> {
    wml(tree, paragraph, "pPr").and_then(|ppr| wml_attr(tree, ppr, "pStyle"))
}

/// Direct `w:numPr` numbering id, ignoring the `0` "no numbering" id.
pub fn direct_num_id(tree: &XmlTree, paragraph: NodeId) -> Option<u32> {
    wml(tree, paragraph, "pPr")
        .and_then(|ppr| wml(tree, ppr, "numPr"))
        .and_then(|num_pr| wml_attr(tree, num_pr, "numId"))
        .and_then(|id| id.trim().parse::<u32>().ok())
        .filter(|&id| id != 0)
}

pub fn has_native_numbering(tree: &XmlTree, styles: &StyleTable, paragraph: NodeId) -> bool {
    direct_num_id(tree, paragraph).is_some()
        || style_id(tree, paragraph).is_some_and(|id| styles.is_numbered(id))
}

fn has_descendant(tree: &XmlTree, node: NodeId, names: &[&str]) -> bool {
    tree.descendants(node).into_iter().any(|d| {
        is_wml(tree, d) && tree.local_name(d).is_some_and(|n| names.contains(&n))
    })
}

/// Drawings, VML pictures and OLE objects.
pub fn has_embedded_object(tree: &XmlTree, paragraph: NodeId) -> bool {
    has_descendant(tree, paragraph, &["drawing", "pict", "object"])
}

pub fn has_field(tree: &XmlTree, paragraph: NodeId) -> bool {
    has_descendant(tree, paragraph, &["fldChar", "instrText", "fldSimple"])
}

/// A paragraph carrying `w:pPr/w:sectPr` ends a section.
pub fn has_section_break(tree: &XmlTree, paragraph: NodeId) -> bool {
    wml(tree, paragraph, "pPr").is_some_and(|ppr| wml(tree, ppr, "sectPr").is_some())
}

pub fn paragraph_view(tree: &XmlTree, styles: &StyleTable, paragraph: NodeId) -> ParagraphView {
    ParagraphView {
        text: paragraph_text(tree, paragraph),
        style_name: style_id(tree, paragraph).map(|id| styles.name_of(id).to_string()),
        has_numbering: has_native_numbering(tree, styles, paragraph),
    }
}

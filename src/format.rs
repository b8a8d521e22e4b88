//! Role-based paragraph formatting and blank-paragraph cleanup.

use std::collections::BTreeMap;

use crate::config::{Cleanup, Config, RoleStyle};
use crate::docx::flow::{self, ParagraphRef, runs};
use crate::docx::{
    StyleTable, WML_NS, ensure_ppr, ensure_rpr, new_wml, pt_to_half_points, pt_to_twips,
    set_wml_attr, wml,
};
use crate::model::{NodeLabels, Role};
use crate::xml::{NodeId, XmlTree};

// Schema order of the pPr children this pass writes, with their neighbours.
const PPR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku", "wordWrap",
    "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi", "adjustRightInd",
    "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents", "suppressOverlap", "jc",
    "textDirection", "textAlignment", "textboxTightWrap", "outlineLvl", "divId", "cnfStyle", "rPr",
    "sectPr", "pPrChange",
];

const RPR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike", "outline",
    "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden", "color",
    "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect", "bdr", "shd",
    "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout", "specVanish", "oMath",
];

const THEME_FONT_ATTRS: &[&str] = &["asciiTheme", "hAnsiTheme", "eastAsiaTheme", "cstheme"];

fn rank(order: &[&str], tree: &XmlTree, node: NodeId) -> usize {
    tree.local_name(node)
        .and_then(|n| order.iter().position(|o| *o == n))
        .unwrap_or(order.len())
}

/// Existing `w:<name>` child of `parent`, or a new one placed in schema order.
fn ordered_child(tree: &mut XmlTree, parent: NodeId, name: &str, order: &[&str]) -> NodeId {
    if let Some(existing) = wml(tree, parent, name) {
        return existing;
    }
    let own = order.iter().position(|o| *o == name).unwrap_or(order.len());
    let pos = tree
        .children(parent)
        .iter()
        .position(|&c| tree.is_element(c) && rank(order, tree, c) > own)
        .unwrap_or(tree.children(parent).len());
    let node = new_wml(tree, name);
    tree.insert_child(parent, pos, node);
    node
}

fn remove_children(tree: &mut XmlTree, parent: NodeId, name: &str) {
    for node in tree.children_named(parent, WML_NS, name) {
        tree.detach(node);
    }
}

fn set_toggle(tree: &mut XmlTree, rpr: NodeId, name: &str, on: bool) {
    let node = ordered_child(tree, rpr, name, RPR_ORDER);
    if on {
        tree.remove_attr(node, Some(WML_NS), "val");
    } else {
        set_wml_attr(tree, node, "val", "0");
    }
}

fn set_spacing(tree: &mut XmlTree, ppr: NodeId, before_pt: f32, after_pt: f32, line: f32) {
    let spacing = ordered_child(tree, ppr, "spacing", PPR_ORDER);
    for attr in ["beforeLines", "afterLines", "beforeAutospacing", "afterAutospacing"] {
        tree.remove_attr(spacing, Some(WML_NS), attr);
    }
    set_wml_attr(tree, spacing, "before", &pt_to_twips(before_pt).to_string());
    set_wml_attr(tree, spacing, "after", &pt_to_twips(after_pt).to_string());
    set_wml_attr(tree, spacing, "line", &((line * 240.0).round() as i64).to_string());
    set_wml_attr(tree, spacing, "lineRule", "auto");
}

/// Replace `w:ind` with the given indents (points). A zero indent set is
/// still written so inherited style indents are overridden.
fn set_indent(
    tree: &mut XmlTree,
    ppr: NodeId,
    left_pt: f32,
    hanging_pt: f32,
    first_line_chars: u32,
    size_pt: f32,
) {
    remove_children(tree, ppr, "ind");
    let ind = ordered_child(tree, ppr, "ind", PPR_ORDER);
    set_wml_attr(tree, ind, "left", &pt_to_twips(left_pt).to_string());
    if hanging_pt > 0.0 {
        set_wml_attr(tree, ind, "hanging", &pt_to_twips(hanging_pt).to_string());
    } else {
        // One character is roughly one em at the paragraph's font size.
        set_wml_attr(tree, ind, "firstLineChars", &(first_line_chars * 100).to_string());
        set_wml_attr(
            tree,
            ind,
            "firstLine",
            &pt_to_twips(first_line_chars as f32 * size_pt).to_string(),
        );
    }
}

struct RunFormat<'a> {
    zh: &'a str,
    en: &'a str,
    size_pt: f32,
    bold: bool,
    italic: Option<bool>,
}

fn format_runs(tree: &mut XmlTree, paragraph: NodeId, f: &RunFormat) {
    let half_points = pt_to_half_points(f.size_pt).to_string();
    for run in runs(tree, paragraph) {
        let rpr = ensure_rpr(tree, run);
        let fonts = ordered_child(tree, rpr, "rFonts", RPR_ORDER);
        for attr in THEME_FONT_ATTRS {
            tree.remove_attr(fonts, Some(WML_NS), attr);
        }
        set_wml_attr(tree, fonts, "ascii", f.en);
        set_wml_attr(tree, fonts, "hAnsi", f.en);
        set_wml_attr(tree, fonts, "cs", f.en);
        set_wml_attr(tree, fonts, "eastAsia", f.zh);
        set_toggle(tree, rpr, "b", f.bold);
        if let Some(italic) = f.italic {
            set_toggle(tree, rpr, "i", italic);
        }
        for name in ["sz", "szCs"] {
            let node = ordered_child(tree, rpr, name, RPR_ORDER);
            set_wml_attr(tree, node, "val", &half_points);
        }
    }
}

fn apply_role_style(tree: &mut XmlTree, p: ParagraphRef, style: &RoleStyle, config: &Config) {
    let ppr = ensure_ppr(tree, p.node);
    set_spacing(tree, ppr, style.space_before_pt, style.space_after_pt, style.line_spacing);
    let in_cell = tree.local_name(p.container) == Some("tc");
    let first_line = if in_cell { 0 } else { style.first_line_chars };
    set_indent(
        tree,
        ppr,
        style.left_indent_pt,
        style.hanging_indent_pt,
        first_line,
        style.font_size_pt,
    );
    let jc = ordered_child(tree, ppr, "jc", PPR_ORDER);
    set_wml_attr(tree, jc, "val", style.alignment.wml_value());
    format_runs(
        tree,
        p.node,
        &RunFormat {
            zh: &config.fonts.zh,
            en: &config.fonts.en,
            size_pt: style.font_size_pt,
            bold: style.bold,
            italic: Some(style.italic),
        },
    );
}

fn apply_list_style(tree: &mut XmlTree, p: ParagraphRef, numbered: bool, config: &Config) {
    let list = &config.list_item;
    let ppr = ensure_ppr(tree, p.node);
    set_spacing(tree, ppr, list.space_before_pt, list.space_after_pt, list.line_spacing);
    if numbered {
        // Indentation comes from the numbering level.
        remove_children(tree, ppr, "ind");
    } else {
        set_indent(tree, ppr, list.left_indent_pt, 0.0, 0, list.font_size_pt);
    }
    format_runs(
        tree,
        p.node,
        &RunFormat {
            zh: &config.fonts.zh,
            en: &config.fonts.en,
            size_pt: list.font_size_pt,
            bold: list.bold,
            italic: None,
        },
    );
}

/// Apply the configured style of each paragraph's role. Returns how many
/// paragraphs were formatted per role.
pub fn apply(
    tree: &mut XmlTree,
    styles: &StyleTable,
    labels: &NodeLabels,
    config: &Config,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for p in flow::paragraphs(tree) {
        let Some(entry) = labels.get(&p.node) else {
            continue;
        };
        let numbered = flow::has_native_numbering(tree, styles, p.node);
        let role = entry.role;
        if role == Role::Blank {
            continue;
        }
        if numbered || role == Role::ListItem {
            apply_list_style(tree, p, numbered, config);
            *counts.entry(Role::ListItem.as_str().to_string()).or_insert(0) += 1;
        } else if let Some(style) = config.role_style(role) {
            apply_role_style(tree, p, style, config);
            *counts.entry(role.as_str().to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Blank paragraphs that must survive cleanup.
fn is_protected(tree: &XmlTree, p: ParagraphRef, last_in_container: bool) -> bool {
    flow::has_embedded_object(tree, p.node)
        || flow::has_section_break(tree, p.node)
        || (last_in_container && tree.local_name(p.container) == Some("tc"))
}

/// Compress blank runs and drop blanks right after configured roles, per
/// container. Returns the number of paragraphs removed.
pub fn cleanup_blanks(tree: &mut XmlTree, labels: &mut NodeLabels, cleanup: &Cleanup) -> usize {
    let paragraphs = flow::paragraphs(tree);
    let max_run = cleanup.max_blank_run();
    let mut removed = Vec::new();

    let mut container = None;
    let mut blank_run = 0usize;
    let mut prev_role: Option<Role> = None;
    for (i, &p) in paragraphs.iter().enumerate() {
        if container != Some(p.container) {
            container = Some(p.container);
            blank_run = 0;
            prev_role = None;
        }
        let role = labels.get(&p.node).map_or(Role::Body, |e| e.role);
        let last_in_container = paragraphs
            .get(i + 1)
            .is_none_or(|next| next.container != p.container);

        if role != Role::Blank || is_protected(tree, p, last_in_container) {
            blank_run = 0;
            prev_role = Some(role);
            continue;
        }

        let after_listed = prev_role.is_some_and(|r| cleanup.remove_blank_after_roles.contains(&r));
        if after_listed || blank_run >= max_run {
            removed.push(p.node);
        } else {
            blank_run += 1;
        }
    }

    for node in &removed {
        tree.detach(*node);
        labels.remove(node);
    }
    if !removed.is_empty() {
        log::info!("Removed {} blank paragraph(s)", removed.len());
    }
    removed.len()
}

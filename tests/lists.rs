mod common;

use common::{cell_paragraphs, existing_numbering, flow_texts, numbering_defs, open, open_with, para, table};
use docx_tidy::docx::flow::{self, ParagraphRef};
use docx_tidy::docx::numbering::{self, LevelDef, MarkerFont};
use docx_tidy::docx::{NumberingStore, WML_NS};
use docx_tidy::lists::{Candidate, materialize, plan_groups, strip_prefix};
use docx_tidy::model::{ListFamily, Role};
use docx_tidy::{Config, Mode, pipeline};

fn rule_config(min_run_len: usize) -> Config {
    let mut config = Config::default();
    config.mode = Mode::Rule;
    config.list_item.min_run_len = min_run_len;
    config
}

fn candidates(docx: &docx_tidy::docx::Docx, roles: &[Role]) -> Vec<Candidate> {
    flow::paragraphs(&docx.document)
        .into_iter()
        .zip(roles)
        .map(|(p, &role)| Candidate {
            paragraph: p,
            text: flow::paragraph_text(&docx.document, p.node),
            role,
            native: false,
        })
        .collect()
}

fn num_ids(docx: &docx_tidy::docx::Docx) -> Vec<Option<u32>> {
    flow::paragraphs(&docx.document)
        .iter()
        .map(|p| flow::direct_num_id(&docx.document, p.node))
        .collect()
}

fn level(start: u32) -> LevelDef {
    LevelDef {
        num_fmt: "decimal".into(),
        lvl_text: "%1.".into(),
        indent_left: 18.0,
        indent_hanging: 18.0,
        start,
    }
}

fn font() -> MarkerFont {
    MarkerFont {
        latin: "Times New Roman".into(),
        east_asian: "宋体".into(),
        size_pt: 12.0,
        bold: false,
    }
}

#[test]
fn paren_arabic_run_becomes_one_native_list() {
    let body = [para("（1）第一项"), para("（2）第二项"), para("（3）第三项")].concat();
    let mut docx = open(&body);
    let report = pipeline::run(&mut docx, &rule_config(2), None);

    assert_eq!(flow_texts(&docx), vec!["第一项", "第二项", "第三项"]);
    let ids = num_ids(&docx);
    assert!(ids[0].is_some());
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(report.actions.list_groups_materialized, 1);
    assert_eq!(report.actions.text_list_converted_to_numpr, 3);

    let numbering = docx.numbering().unwrap();
    assert!(numbering.is_new());
    let defs = numbering_defs(&numbering.serialize());
    assert_eq!(defs, vec![(ids[0].unwrap(), 1, "decimal".to_string(), "（%1）".to_string())]);
}

#[test]
fn short_runs_stay_text_below_minimum() {
    let body = [para("（1）唯一一项"), para("正文")].concat();
    let mut docx = open(&body);
    let report = pipeline::run(&mut docx, &rule_config(2), None);

    assert_eq!(flow_texts(&docx)[0], "（1）唯一一项");
    assert_eq!(num_ids(&docx), vec![None, None]);
    assert_eq!(report.actions.list_groups_materialized, 0);
    assert!(docx.numbering().is_none());
}

#[test]
fn lists_in_different_cells_get_distinct_ids() {
    let body = table(&[vec![para("1) 第一条")], vec![para("1) 甲")]]);
    let mut docx = open(&body);
    pipeline::run(&mut docx, &rule_config(1), None);

    let cells = cell_paragraphs(&docx.document.serialize());
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0][0].text, "第一条");
    assert_eq!(cells[1][0].text, "甲");
    let (a, b) = (cells[0][0].num_id.unwrap(), cells[1][0].num_id.unwrap());
    assert_ne!(a, b);
}

#[test]
fn list_starts_at_first_ordinal() {
    let body = [para("2. 乙"), para("3. 丙")].concat();
    let mut docx = open(&body);
    pipeline::run(&mut docx, &rule_config(1), None);

    let id = num_ids(&docx)[0].unwrap();
    let def = docx.numbering().unwrap().level_def(id, 0).unwrap();
    assert_eq!(def.start, 2);
    assert_eq!(def.lvl_text, "%1.");
    assert_eq!(flow_texts(&docx), vec!["乙", "丙"]);
}

#[test]
fn blank_paragraph_ends_a_group() {
    let body = [para("1. 甲"), para(""), para("2. 乙")].concat();
    let docx = open(&body);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem, Role::Blank, Role::ListItem]), 1);
    assert_eq!(plan.groups.len(), 2);
    assert_eq!(plan.groups[1].start(), 2);
}

#[test]
fn headings_end_a_group() {
    let body = [para("1. 甲"), para("第二章 方法"), para("2. 乙")].concat();
    let docx = open(&body);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem, Role::H1, Role::ListItem]), 1);
    assert_eq!(plan.groups.len(), 2);
}

#[test]
fn decimal_families_continue_when_ordinal_follows() {
    let body = [para("1. 甲"), para("2) 乙"), para("（3）丙"), para("a. 丁")].concat();
    let docx = open(&body);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem; 4]), 1);

    assert_eq!(plan.groups.len(), 2);
    assert_eq!(plan.groups[0].family, ListFamily::NumDot);
    assert_eq!(plan.groups[0].len(), 3);
    assert_eq!(plan.groups[1].family, ListFamily::AlphaLower);
}

#[test]
fn decimal_family_switch_with_gap_starts_new_group() {
    let body = [para("1. 甲"), para("5) 乙")].concat();
    let docx = open(&body);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem; 2]), 1);
    assert_eq!(plan.groups.len(), 2);
}

#[test]
fn largest_ordinal_does_not_continue_into_another_family() {
    let body = [para("4294967295) 甲"), para("（1）乙")].concat();
    let docx = open(&body);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem; 2]), 1);
    assert_eq!(plan.groups.len(), 2);

    let mut docx = open(&body);
    let report = pipeline::run(&mut docx, &rule_config(1), None);
    assert_eq!(report.actions.list_groups_materialized, 2);
    assert_eq!(flow_texts(&docx), vec!["甲", "乙"]);
}

#[test]
fn unmarked_list_item_before_group_is_a_preamble() {
    let body = [para("方向如下："), para("1. 保研。"), para("2. 就业。")].concat();
    let docx = open(&body);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem; 3]), 1);

    let first: ParagraphRef = flow::paragraphs(&docx.document)[0];
    assert_eq!(plan.preambles, vec![first]);
    assert_eq!(plan.groups.len(), 1);
    assert_eq!(plan.groups[0].len(), 2);
}

#[test]
fn short_groups_are_counted_as_discarded() {
    let body = [para("1. 甲"), para("正文"), para("a. 乙"), para("b. 丙")].concat();
    let docx = open(&body);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem, Role::Body, Role::ListItem, Role::ListItem]), 2);
    assert_eq!(plan.groups.len(), 1);
    assert_eq!(plan.discarded, 1);
}

#[test]
fn materialize_uses_fresh_ids_next_to_existing_numbering() {
    let body = [para("1. 甲"), para("2. 乙")].concat();
    let mut docx = open_with(&body, Some(&existing_numbering(4, 9)), None);
    let plan = plan_groups(&candidates(&docx, &[Role::ListItem; 2]), 1);
    let out = materialize(&mut docx, &plan, &rule_config(1).list_layout());

    assert_eq!(out.num_ids, vec![10]);
    let store = docx.numbering().unwrap();
    assert!(!store.is_new());
    assert_eq!(store.num_ids(), vec![9, 10]);
}

#[test]
fn next_free_id_spans_both_id_spaces() {
    let xml = existing_numbering(12, 3);
    let store = NumberingStore::parse(&xml).unwrap();
    assert_eq!(store.next_free_id(), 13);
    assert_eq!(NumberingStore::empty().next_free_id(), 1);
}

#[test]
fn new_abstract_definitions_precede_nums() {
    let mut store = NumberingStore::parse(&existing_numbering(1, 1)).unwrap();
    let id = store.add_single_level(&level(1), &font());
    assert_eq!(id, 2);

    let xml = store.serialize();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let names: Vec<&str> = doc
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect();
    assert_eq!(names, vec!["abstractNum", "abstractNum", "num", "num"]);

    let def = store.level_def(2, 0).unwrap();
    assert_eq!(def, level(1));
}

#[test]
fn binding_twice_leaves_one_num_pr() {
    let mut docx = open(&common::styled_para("Normal", "甲"));
    let p = flow::paragraphs(&docx.document)[0].node;
    numbering::bind(&mut docx.document, p, 5, 0);
    numbering::bind(&mut docx.document, p, 6, 0);

    let paragraphs = common::body_paragraphs(&docx.document.serialize());
    assert_eq!(paragraphs[0].num_pr_count, 1);
    assert_eq!(paragraphs[0].num_id, Some(6));

    // numPr follows pStyle.
    let tree = &docx.document;
    let ppr = tree.find_child(p, WML_NS, "pPr").unwrap();
    let order: Vec<&str> = tree.children(ppr).iter().filter_map(|&c| tree.local_name(c)).collect();
    assert_eq!(order, vec!["pStyle", "numPr"]);
}

#[test]
fn strip_prefix_spans_runs() {
    let mut docx = open(&common::runs_para(&[("（1", false), ("）", true), (" 第一项", false)]));
    let p = flow::paragraphs(&docx.document)[0].node;
    assert!(strip_prefix(&mut docx.document, p, 3));
    assert_eq!(flow::paragraph_text(&docx.document, p), "第一项");
}

#[test]
fn strip_prefix_without_text_reports_nothing_done() {
    let mut docx = open("<w:p/>");
    let p = flow::paragraphs(&docx.document)[0].node;
    assert!(!strip_prefix(&mut docx.document, p, 2));
}

#[test]
fn conversion_can_be_disabled() {
    let body = [para("1. 甲"), para("2. 乙")].concat();
    let mut docx = open(&body);
    let mut config = rule_config(1);
    config.list_item.convert_text_numbers = false;
    pipeline::run(&mut docx, &config, None);
    assert_eq!(flow_texts(&docx), vec!["1. 甲", "2. 乙"]);
    assert!(docx.numbering().is_none());
}

#[test]
fn soft_break_after_marker_text_is_kept() {
    // The field keeps the paragraph from being split.
    let body = r#"<w:p><w:r><w:t>a.</w:t><w:br/><w:t>see page</w:t></w:r><w:fldSimple w:instr="PAGE"><w:r><w:t>3</w:t></w:r></w:fldSimple></w:p>"#;
    let mut docx = open(body);
    pipeline::run(&mut docx, &rule_config(1), None);

    assert_eq!(num_ids(&docx), vec![None]);
    assert_eq!(flow_texts(&docx), vec!["a.\nsee page3"]);
}

#[test]
fn strip_prefix_stops_at_line_break() {
    let mut docx = open(r#"<w:p><w:r><w:t xml:space="preserve">1. </w:t><w:br/><w:t>x</w:t></w:r></w:p>"#);
    let p = flow::paragraphs(&docx.document)[0].node;
    assert!(strip_prefix(&mut docx.document, p, 2));
    assert_eq!(flow::paragraph_text(&docx.document, p), "\nx");
}

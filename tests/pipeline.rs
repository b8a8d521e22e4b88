mod common;

use common::{
    FailingClassifier, FixedClassifier, body_paragraphs, heading_styles, minimal_package, open, open_with, para,
    read_part, styled_para, tag,
};
use docx_tidy::{Config, Mode, pipeline, tidy_docx_bytes};

fn config(mode: Mode) -> Config {
    let _ = env_logger::try_init();
    let mut config = Config::default();
    config.mode = mode;
    config
}

#[test]
fn preamble_scenario_end_to_end() {
    let mut docx = open(&para("结合背景，方向如下：\n1. 保研。\n2. 就业。"));
    let report = pipeline::run(&mut docx, &config(Mode::Rule), None);

    let paragraphs = body_paragraphs(&docx.document.serialize());
    let texts: Vec<&str> = paragraphs.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["结合背景，方向如下：", "保研。", "就业。"]);
    assert_eq!(paragraphs[0].num_id, None);
    assert!(paragraphs[1].num_id.is_some());
    assert_eq!(paragraphs[1].num_id, paragraphs[2].num_id);

    assert_eq!(report.meta.paragraphs_before, 1);
    assert_eq!(report.meta.paragraphs_after, 3);
    assert_eq!(report.actions.split_new_paragraphs_created, 2);
    assert_eq!(report.actions.split_original_paragraphs_affected, 1);
    assert_eq!(report.actions.split_max_lines, 3);
    assert_eq!(report.actions.list_groups_materialized, 1);
    assert_eq!(report.actions.text_list_converted_to_numpr, 2);
}

#[test]
fn externally_labelled_preamble_is_kept_as_body() {
    let mut docx = open(&para("结合背景，方向如下：\n1. 保研。\n2. 就业。"));
    let stub = FixedClassifier::new(vec![tag(0, "list_item", 0.95)]);
    let report = pipeline::run(&mut docx, &config(Mode::Llm), Some(&stub));

    assert_eq!(report.labels.source.as_str(), "llm");
    let paragraphs = body_paragraphs(&docx.document.serialize());
    assert_eq!(paragraphs[0].num_id, None);
    assert_eq!(paragraphs[0].text, "结合背景，方向如下：");
    assert_eq!(paragraphs[1].text, "保研。");
    assert_eq!(report.labels.consistency.compared, 0);
}

#[test]
fn hybrid_failure_is_reported_not_raised() {
    let mut docx = open(&[para("短一"), para("短二"), para("短三")].concat());
    let stub = FailingClassifier::new();
    let report = pipeline::run(&mut docx, &config(Mode::Hybrid), Some(&stub));

    assert_eq!(stub.calls.get(), 1);
    assert_eq!(report.labels.source.as_str(), "rule");
    assert!(report.warnings.iter().any(|w| w.contains("failed")));
    let hybrid = report.labels.hybrid.as_ref().unwrap();
    assert!(hybrid.triggered);
    assert_eq!(hybrid.triggered_indices, vec![0, 1, 2]);
}

#[test]
fn native_numbering_is_counted_and_warned() {
    let body = [
        common::numbered_para(1, "已有编号一"),
        common::numbered_para(1, "已有编号二"),
        styled_para("ListNumberChild", "样式编号"),
        para("正文"),
    ]
    .concat();
    let mut docx = open_with(&body, Some(&common::existing_numbering(1, 1)), Some(&heading_styles()));
    let report = pipeline::run(&mut docx, &config(Mode::Rule), None);

    assert_eq!(report.actions.native_numbering_paragraphs, 3);
    assert!(report.warnings.iter().any(|w| w.starts_with("3 paragraphs already used native numbering")));
    assert_eq!(report.labels.counts.get("list_item"), Some(&3));
    // Native lists are left as they are.
    assert_eq!(report.actions.list_groups_materialized, 0);
}

#[test]
fn consistency_counts_external_disagreements() {
    let body = [para("第一章 绪论"), para("正文一"), para("正文二")].concat();
    let mut docx = open(&body);
    let stub = FixedClassifier::new(vec![tag(0, "title_1", 0.9), tag(1, "title_2", 0.9), tag(2, "body", 0.9)]);
    let report = pipeline::run(&mut docx, &config(Mode::Llm), Some(&stub));

    let c = &report.labels.consistency;
    assert_eq!(c.compared, 3);
    assert_eq!(c.mismatched, 1);
    assert_eq!(c.examples[0].paragraph_index, 1);
    assert_eq!(c.examples[0].text, "正文一");
    assert!((c.mismatch_rate - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn blank_runs_are_compressed() {
    let body = [para("第一章 绪论"), para(""), para("正文"), para(""), para(""), para(""), para("结尾")].concat();
    let mut docx = open(&body);
    let report = pipeline::run(&mut docx, &config(Mode::Rule), None);

    let texts = common::flow_texts(&docx);
    assert_eq!(texts, vec!["第一章 绪论", "正文", "", "结尾"]);
    assert_eq!(report.meta.blank_before, 4);
    assert_eq!(report.meta.blank_after, 1);
    assert_eq!(report.actions.blank_paragraphs_removed, 3);
}

#[test]
fn remove_all_blank_paragraphs() {
    let body = [para("甲"), para(""), para("乙")].concat();
    let mut docx = open(&body);
    let mut config = config(Mode::Rule);
    config.cleanup.remove_all_blank_paragraphs = true;
    pipeline::run(&mut docx, &config, None);
    assert_eq!(common::flow_texts(&docx), vec!["甲", "乙"]);
}

#[test]
fn last_blank_in_table_cell_survives() {
    let body = common::table(&[vec![para("")], vec![para("甲"), para(""), para("")]]);
    let mut docx = open(&body);
    let mut config = config(Mode::Rule);
    config.cleanup.remove_all_blank_paragraphs = true;
    pipeline::run(&mut docx, &config, None);

    let cells = common::cell_paragraphs(&docx.document.serialize());
    assert_eq!(cells[0].len(), 1);
    assert_eq!(cells[1].len(), 2);
}

#[test]
fn headings_receive_role_formatting() {
    let mut docx = open(&para("第一章 绪论"));
    let report = pipeline::run(&mut docx, &config(Mode::Rule), None);
    assert_eq!(report.actions.formatted.get("h1"), Some(&1));

    let xml = docx.document.serialize();
    assert!(xml.contains(r#"w:jc w:val="center""#));
    assert!(xml.contains(r#"w:sz w:val="32""#));
    assert!(xml.contains(r#"w:eastAsia="宋体""#));
}

#[test]
fn formatting_can_be_disabled() {
    let mut docx = open(&para("第一章 绪论"));
    let mut config = config(Mode::Rule);
    config.formatting.enabled = false;
    let report = pipeline::run(&mut docx, &config, None);
    assert!(report.actions.formatted.is_empty());
    assert!(!docx.document.serialize().contains("w:jc"));
}

#[test]
fn report_json_shape() {
    let input = minimal_package(&[para("第一章 绪论"), para("（1）第一项"), para("（2）第二项")].concat());
    let (_, report) = tidy_docx_bytes(&input, &config(Mode::Rule), None).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["meta"]["mode"], "rule");
    assert_eq!(json["meta"]["paragraphs_before"], 3);
    assert_eq!(json["labels"]["source"], "rule");
    assert_eq!(json["labels"]["counts"]["h1"], 1);
    assert_eq!(json["labels"]["counts"]["list_item"], 2);
    assert_eq!(json["labels"]["coverage"]["labeled"], 3);
    assert_eq!(json["labels"]["coverage"]["coverage_rate"], 1.0);
    assert_eq!(json["actions"]["list_groups_materialized"], 1);
    assert!(json["labels"].get("hybrid").is_none());
    assert!(json["warnings"].as_array().unwrap().is_empty());
    assert!(report.summary().contains("paragraphs 3 -> 3"));
}

#[test]
fn saved_package_gains_a_numbering_part() {
    let input = minimal_package(&[para("1. 甲"), para("2. 乙")].concat());
    let (output, _) = tidy_docx_bytes(&input, &config(Mode::Rule), None).unwrap();

    let types = read_part(&output, "[Content_Types].xml").unwrap();
    assert!(types.contains(r#"PartName="/word/numbering.xml""#));
    let rels = read_part(&output, "word/_rels/document.xml.rels").unwrap();
    assert!(rels.contains("relationships/numbering"));
    assert!(rels.contains(r#"Id="rId4""#));
    assert!(rels.contains(r#"Target="settings.xml""#));

    let numbering = read_part(&output, "word/numbering.xml").unwrap();
    let defs = common::numbering_defs(&numbering);
    assert_eq!(defs.len(), 1);
    let doc = read_part(&output, "word/document.xml").unwrap();
    let paragraphs = body_paragraphs(&doc);
    assert!(paragraphs.iter().all(|p| p.num_id == Some(defs[0].0)));
    assert_eq!(read_part(&output, "word/media/note.txt").as_deref(), Some("kept as is"));
}

#[test]
fn output_reopens_and_is_stable() {
    let input = minimal_package(&[para("结合背景，方向如下：\n1. 保研。\n2. 就业。"), para("第一章 绪论")].concat());
    let (first, _) = tidy_docx_bytes(&input, &config(Mode::Rule), None).unwrap();
    let (second, report) = tidy_docx_bytes(&first, &config(Mode::Rule), None).unwrap();

    assert_eq!(report.actions.split_new_paragraphs_created, 0);
    assert_eq!(report.actions.list_groups_materialized, 0);
    let before = body_paragraphs(&read_part(&first, "word/document.xml").unwrap());
    let after = body_paragraphs(&read_part(&second, "word/document.xml").unwrap());
    assert_eq!(before, after);
}

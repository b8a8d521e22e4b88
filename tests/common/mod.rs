#![allow(dead_code)]

use std::cell::Cell;
use std::io::{Read, Write};

use docx_tidy::docx::Docx;
use docx_tidy::docx::flow;
use docx_tidy::model::{LabelEntry, NodeLabels, Role};
use docx_tidy::semantic::{ClassifierError, ClassifyRequest, ExternalTag, SemanticClassifier};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Run content for `text`, with `\n` written as `w:br`.
fn run_content(text: &str) -> String {
    text.split('\n')
        .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>")
}

pub fn para(text: &str) -> String {
    format!("<w:p><w:r>{}</w:r></w:p>", run_content(text))
}

pub fn styled_para(style_id: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style_id}"/></w:pPr><w:r>{}</w:r></w:p>"#,
        run_content(text)
    )
}

pub fn numbered_para(num_id: u32, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr><w:r>{}</w:r></w:p>"#,
        run_content(text)
    )
}

/// Paragraph made of several runs; `(text, bold)` per run.
pub fn runs_para(runs: &[(&str, bool)]) -> String {
    let body: String = runs
        .iter()
        .map(|(text, bold)| {
            let rpr = if *bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
            format!("<w:r>{rpr}{}</w:r>", run_content(text))
        })
        .collect();
    format!("<w:p>{body}</w:p>")
}

/// One-row table; each cell holds the given paragraph XML.
pub fn table(cells: &[Vec<String>]) -> String {
    let cells: String = cells
        .iter()
        .map(|paras| format!("<w:tc>{}</w:tc>", paras.concat()))
        .collect();
    format!("<w:tbl><w:tr>{cells}</w:tr></w:tbl>")
}

pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    )
}

pub fn numbering_xml(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:numbering xmlns:w="{W_NS}">{inner}</w:numbering>"#
    )
}

/// A numbering part holding one decimal list with the given ids.
pub fn existing_numbering(abstract_id: u32, num_id: u32) -> String {
    numbering_xml(&format!(
        r#"<w:abstractNum w:abstractNumId="{abstract_id}"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl></w:abstractNum><w:num w:numId="{num_id}"><w:abstractNumId w:val="{abstract_id}"/></w:num>"#
    ))
}

pub fn styles_xml(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{W_NS}">{inner}</w:styles>"#
    )
}

pub fn heading_styles() -> String {
    styles_xml(
        r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style><w:style w:type="paragraph" w:styleId="Footer"><w:name w:val="footer"/></w:style><w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/><w:pPr><w:numPr><w:numId w:val="7"/></w:numPr></w:pPr></w:style><w:style w:type="paragraph" w:styleId="ListNumberChild"><w:name w:val="List Number Child"/><w:basedOn w:val="ListNumber"/></w:style>"#,
    )
}

pub fn open(body: &str) -> Docx {
    Docx::from_xml(&document_xml(body), None, None).unwrap()
}

pub fn open_with(body: &str, numbering: Option<&str>, styles: Option<&str>) -> Docx {
    Docx::from_xml(&document_xml(body), numbering, styles).unwrap()
}

/// A zip package with the given `(name, content)` entries.
pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn minimal_package(body: &str) -> Vec<u8> {
    build_zip(&[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#,
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#,
        ),
        (
            "word/_rels/document.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings" Target="settings.xml"/></Relationships>"#,
        ),
        ("word/document.xml", &document_xml(body)),
        ("word/media/note.txt", "kept as is"),
    ])
}

pub fn read_part(package: &[u8], name: &str) -> Option<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(package)).ok()?;
    let mut file = archive.by_name(name).ok()?;
    let mut out = String::new();
    file.read_to_string(&mut out).ok()?;
    Some(out)
}

/// What a test wants to know about one output paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ParaInfo {
    pub text: String,
    pub num_id: Option<u32>,
    pub num_pr_count: usize,
}

fn w<'a, 'i>(node: roxmltree::Node<'a, 'i>, name: &str) -> Option<roxmltree::Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name((W_NS, name)))
}

fn para_info(p: roxmltree::Node) -> ParaInfo {
    let mut text = String::new();
    for d in p.descendants() {
        if d.has_tag_name((W_NS, "t")) {
            text.push_str(d.text().unwrap_or(""));
        } else if d.has_tag_name((W_NS, "tab")) && d.parent().is_some_and(|r| r.has_tag_name((W_NS, "r"))) {
            text.push('\t');
        } else if d.has_tag_name((W_NS, "br")) {
            text.push('\n');
        }
    }
    let ppr = w(p, "pPr");
    let num_prs: Vec<_> = ppr
        .map(|ppr| ppr.children().filter(|n| n.has_tag_name((W_NS, "numPr"))).collect())
        .unwrap_or_default();
    let num_id = num_prs
        .first()
        .and_then(|n| w(*n, "numId"))
        .and_then(|n| n.attribute((W_NS, "val")))
        .and_then(|v| v.parse().ok());
    ParaInfo {
        text,
        num_id,
        num_pr_count: num_prs.len(),
    }
}

/// Body-level paragraphs of a serialized document part.
pub fn body_paragraphs(document: &str) -> Vec<ParaInfo> {
    let xml = roxmltree::Document::parse(document).unwrap();
    let body = w(xml.root_element(), "body").unwrap();
    body.children()
        .filter(|n| n.has_tag_name((W_NS, "p")))
        .map(para_info)
        .collect()
}

/// Paragraphs of every table cell, cell by cell.
pub fn cell_paragraphs(document: &str) -> Vec<Vec<ParaInfo>> {
    let xml = roxmltree::Document::parse(document).unwrap();
    xml.descendants()
        .filter(|n| n.has_tag_name((W_NS, "tc")))
        .map(|tc| {
            tc.children()
                .filter(|n| n.has_tag_name((W_NS, "p")))
                .map(para_info)
                .collect()
        })
        .collect()
}

/// `(numId, start, numFmt, lvlText)` for every num in a numbering part.
pub fn numbering_defs(numbering: &str) -> Vec<(u32, u32, String, String)> {
    let xml = roxmltree::Document::parse(numbering).unwrap();
    let root = xml.root_element();
    let abstract_of = |id: &str| {
        root.children()
            .find(|n| n.has_tag_name((W_NS, "abstractNum")) && n.attribute((W_NS, "abstractNumId")) == Some(id))
    };
    root.children()
        .filter(|n| n.has_tag_name((W_NS, "num")))
        .filter_map(|num| {
            let num_id = num.attribute((W_NS, "numId"))?.parse().ok()?;
            let abs_id = w(num, "abstractNumId")?.attribute((W_NS, "val"))?;
            let lvl = w(abstract_of(abs_id)?, "lvl")?;
            let val = |name: &str| w(lvl, name).and_then(|n| n.attribute((W_NS, "val"))).unwrap_or("").to_string();
            Some((num_id, val("start").parse().unwrap_or(0), val("numFmt"), val("lvlText")))
        })
        .collect()
}

/// Texts of the document's paragraphs in flow order.
pub fn flow_texts(docx: &Docx) -> Vec<String> {
    flow::paragraphs(&docx.document)
        .iter()
        .map(|p| flow::paragraph_text(&docx.document, p.node))
        .collect()
}

/// Label every paragraph with the same entry.
pub fn label_all(docx: &Docx, entry: LabelEntry) -> NodeLabels {
    flow::paragraphs(&docx.document)
        .into_iter()
        .map(|p| (p.node, entry))
        .collect()
}

pub fn role_of(docx: &Docx, labels: &NodeLabels, index: usize) -> Role {
    let p = flow::paragraphs(&docx.document)[index];
    labels[&p.node].role
}

/// Classifier stub returning fixed tags and counting its calls.
pub struct FixedClassifier {
    pub tags: Vec<ExternalTag>,
    pub calls: Cell<usize>,
    pub last_indices: std::cell::RefCell<Option<Vec<usize>>>,
}

impl FixedClassifier {
    pub fn new(tags: Vec<ExternalTag>) -> Self {
        Self {
            tags,
            calls: Cell::new(0),
            last_indices: std::cell::RefCell::new(None),
        }
    }
}

impl SemanticClassifier for FixedClassifier {
    fn classify(&self, request: &ClassifyRequest) -> Result<Vec<ExternalTag>, ClassifierError> {
        self.calls.set(self.calls.get() + 1);
        *self.last_indices.borrow_mut() = request.indices.clone();
        Ok(self.tags.clone())
    }
}

/// Classifier stub that always fails.
pub struct FailingClassifier {
    pub calls: Cell<usize>,
}

impl FailingClassifier {
    pub fn new() -> Self {
        Self { calls: Cell::new(0) }
    }
}

impl SemanticClassifier for FailingClassifier {
    fn classify(&self, _request: &ClassifyRequest) -> Result<Vec<ExternalTag>, ClassifierError> {
        self.calls.set(self.calls.get() + 1);
        Err(ClassifierError::Unavailable("connection refused".into()))
    }
}

pub fn tag(index: usize, paragraph_type: &str, confidence: f32) -> ExternalTag {
    ExternalTag {
        index,
        paragraph_type: paragraph_type.to_string(),
        confidence,
    }
}

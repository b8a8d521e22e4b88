pub mod flow;
pub mod numbering;
mod styles;

use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::error::Error;
use crate::xml::{NodeId, XML_NS, XmlTree};

pub use numbering::NumberingStore;
pub use styles::StyleTable;

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CT_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NUMBERING_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const STYLES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const NUMBERING_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES: &str = "[Content_Types].xml";
const DEFAULT_NUMBERING_PART: &str = "word/numbering.xml";
const DEFAULT_STYLES_PART: &str = "word/styles.xml";

/// Prefix used for elements this crate creates in WordprocessingML parts.
pub(crate) const W: Option<&str> = Some("w");

pub fn pt_to_twips(pt: f32) -> i64 {
    (pt * 20.0).round() as i64
}

pub fn pt_to_half_points(pt: f32) -> i64 {
    (pt * 2.0).round() as i64
}

pub fn wml(tree: &XmlTree, node: NodeId, name: &str) -> Option<NodeId> {
    tree.find_child(node, WML_NS, name)
}

/// `w:val` of the named child element.
pub fn wml_attr<'a>(tree: &'a XmlTree, node: NodeId, child: &str) -> Option<&'a str> {
    wml(tree, node, child).and_then(|n| tree.attr(n, Some(WML_NS), "val"))
}

pub fn new_wml(tree: &mut XmlTree, name: &str) -> NodeId {
    tree.create_element(W, WML_NS, name)
}

pub fn set_wml_attr(tree: &mut XmlTree, node: NodeId, attr: &str, value: &str) {
    tree.set_attr(node, W, Some(WML_NS), attr, value);
}

/// Replace the text of a `w:t`, preserving edge whitespace.
pub fn set_wml_text(tree: &mut XmlTree, node: NodeId, text: &str) {
    tree.set_element_text(node, text);
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        tree.set_attr(node, Some("xml"), Some(XML_NS), "space", "preserve");
    }
}

/// Existing `w:<name>` child, or a new one appended to `parent`.
pub fn get_or_add_wml(tree: &mut XmlTree, parent: NodeId, name: &str) -> NodeId {
    if let Some(existing) = wml(tree, parent, name) {
        return existing;
    }
    let node = new_wml(tree, name);
    tree.append_child(parent, node);
    node
}

/// `w:pPr` of a paragraph, created as the first child when missing.
pub fn ensure_ppr(tree: &mut XmlTree, paragraph: NodeId) -> NodeId {
    if let Some(ppr) = wml(tree, paragraph, "pPr") {
        return ppr;
    }
    let ppr = new_wml(tree, "pPr");
    tree.insert_child(paragraph, 0, ppr);
    ppr
}

/// `w:rPr` of a run, created as the first child when missing.
pub fn ensure_rpr(tree: &mut XmlTree, run: NodeId) -> NodeId {
    if let Some(rpr) = wml(tree, run, "rPr") {
        return rpr;
    }
    let rpr = new_wml(tree, "rPr");
    tree.insert_child(run, 0, rpr);
    rpr
}

fn decode_part(name: &str, data: &[u8]) -> Result<String, Error> {
    let text = std::str::from_utf8(data)
        .map_err(|_| Error::InvalidDocx(format!("{name} is not valid UTF-8")))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{target}"),
    }
}

fn relationship_target(rels: &XmlTree, rel_type: &str) -> Option<String> {
    rels.children(rels.root())
        .iter()
        .copied()
        .filter(|&n| rels.is(n, PKG_REL_NS, "Relationship"))
        .find(|&n| rels.attr(n, None, "Type") == Some(rel_type))
        .and_then(|n| rels.attr(n, None, "Target"))
        .map(part_path)
}

/// An opened DOCX package: the mutable document and numbering parts plus
/// every other entry kept verbatim.
pub struct Docx {
    entries: Vec<(String, Vec<u8>)>,
    pub document: XmlTree,
    numbering: Option<NumberingStore>,
    numbering_part: String,
    styles: StyleTable,
}

impl Docx {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        Self::from_reader(file)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_reader(std::io::Cursor::new(bytes))
    }

    fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(reader)
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;

        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push((file.name().to_string(), data));
        }
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<(String, Vec<u8>)>) -> Result<Self, Error> {
        let find = |name: &str| entries.iter().find(|(n, _)| n == name).map(|(_, d)| d);

        let document_xml = find(DOCUMENT_PART).ok_or_else(|| {
            Error::InvalidDocx("missing word/document.xml (is this a DOCX file?)".into())
        })?;
        let document = XmlTree::parse(&decode_part(DOCUMENT_PART, document_xml)?)?;
        if flow::body(&document).is_none() {
            return Err(Error::InvalidDocx("missing w:body".into()));
        }

        let rels = match find(DOCUMENT_RELS) {
            Some(data) => XmlTree::parse(&decode_part(DOCUMENT_RELS, data)?).ok(),
            None => None,
        };
        let numbering_part = rels
            .as_ref()
            .and_then(|r| relationship_target(r, NUMBERING_REL_TYPE))
            .unwrap_or_else(|| DEFAULT_NUMBERING_PART.to_string());
        let styles_part = rels
            .as_ref()
            .and_then(|r| relationship_target(r, STYLES_REL_TYPE))
            .unwrap_or_else(|| DEFAULT_STYLES_PART.to_string());

        let numbering = match find(&numbering_part) {
            Some(data) => match NumberingStore::parse(&decode_part(&numbering_part, data)?) {
                Ok(store) => Some(store),
                Err(e) => {
                    return Err(Error::InvalidDocx(format!(
                        "{numbering_part} is not well-formed: {e}"
                    )));
                }
            },
            None => None,
        };

        let styles = match find(&styles_part) {
            Some(data) => StyleTable::parse(&decode_part(&styles_part, data)?),
            None => StyleTable::default(),
        };

        Ok(Self {
            entries,
            document,
            numbering,
            numbering_part,
            styles,
        })
    }

    /// Build a package from raw part XML. Missing parts are simply absent;
    /// the content types and relationships needed to save it are generated.
    pub fn from_xml(
        document_xml: &str,
        numbering_xml: Option<&str>,
        styles_xml: Option<&str>,
    ) -> Result<Self, Error> {
        let mut overrides = String::from(
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        );
        let mut rels = String::new();
        let mut entries = Vec::new();
        if numbering_xml.is_some() {
            overrides.push_str(&format!(
                r#"<Override PartName="/word/numbering.xml" ContentType="{NUMBERING_CONTENT_TYPE}"/>"#
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId1" Type="{NUMBERING_REL_TYPE}" Target="numbering.xml"/>"#
            ));
        }
        if styles_xml.is_some() {
            overrides.push_str(
                r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
            );
            rels.push_str(&format!(
                r#"<Relationship Id="rId2" Type="{STYLES_REL_TYPE}" Target="styles.xml"/>"#
            ));
        }
        entries.push((
            CONTENT_TYPES.to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="{CT_NS}"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{overrides}</Types>"#
            )
            .into_bytes(),
        ));
        entries.push((
            "_rels/.rels".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#
            )
            .into_bytes(),
        ));
        entries.push((
            DOCUMENT_RELS.to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#
            )
            .into_bytes(),
        ));
        entries.push((DOCUMENT_PART.to_string(), document_xml.as_bytes().to_vec()));
        if let Some(xml) = numbering_xml {
            entries.push((DEFAULT_NUMBERING_PART.to_string(), xml.as_bytes().to_vec()));
        }
        if let Some(xml) = styles_xml {
            entries.push((DEFAULT_STYLES_PART.to_string(), xml.as_bytes().to_vec()));
        }
        Self::from_entries(entries)
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn numbering(&self) -> Option<&NumberingStore> {
        self.numbering.as_ref()
    }

    /// The numbering store, created empty when the package has none.
    pub fn ensure_numbering(&mut self) -> &mut NumberingStore {
        self.numbering.get_or_insert_with(|| {
            log::info!("Document has no numbering part, creating an empty one");
            NumberingStore::empty()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(Error::Io)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let created_numbering = self.numbering.as_ref().is_some_and(|n| n.is_new());

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let mut wrote_rels = false;
        let mut wrote_numbering = false;
        for (name, data) in &self.entries {
            let bytes = if name == DOCUMENT_PART {
                self.document.serialize().into_bytes()
            } else if *name == self.numbering_part
                && let Some(store) = &self.numbering
            {
                wrote_numbering = true;
                store.serialize().into_bytes()
            } else if created_numbering && name == CONTENT_TYPES {
                self.patch_content_types(data)?
            } else if created_numbering && name == DOCUMENT_RELS {
                wrote_rels = true;
                self.patch_relationships(Some(data))?
            } else {
                data.clone()
            };
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&bytes)?;
        }

        if created_numbering {
            if !wrote_rels {
                writer.start_file(DOCUMENT_RELS, options)?;
                writer.write_all(&self.patch_relationships(None)?)?;
            }
            if !wrote_numbering && let Some(store) = &self.numbering {
                writer.start_file(self.numbering_part.as_str(), options)?;
                writer.write_all(store.serialize().as_bytes())?;
            }
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    fn patch_content_types(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut types = XmlTree::parse(&decode_part(CONTENT_TYPES, data)?)?;
        let part_name = format!("/{}", self.numbering_part);
        let root = types.root();
        let present = types
            .children_named(root, CT_NS, "Override")
            .into_iter()
            .any(|n| types.attr(n, None, "PartName") == Some(part_name.as_str()));
        if !present {
            let node = types.create_element(None, CT_NS, "Override");
            types.set_attr(node, None, None, "PartName", &part_name);
            types.set_attr(node, None, None, "ContentType", NUMBERING_CONTENT_TYPE);
            types.append_child(root, node);
        }
        Ok(types.serialize().into_bytes())
    }

    fn patch_relationships(&self, data: Option<&Vec<u8>>) -> Result<Vec<u8>, Error> {
        let mut rels = match data {
            Some(data) => XmlTree::parse(&decode_part(DOCUMENT_RELS, data)?)?,
            None => XmlTree::with_root(None, PKG_REL_NS, "Relationships", &[(None, PKG_REL_NS)]),
        };
        let root = rels.root();
        let existing = rels.children_named(root, PKG_REL_NS, "Relationship");
        if existing
            .iter()
            .any(|&n| rels.attr(n, None, "Type") == Some(NUMBERING_REL_TYPE))
        {
            return Ok(rels.serialize().into_bytes());
        }
        let next = existing
            .iter()
            .filter_map(|&n| rels.attr(n, None, "Id"))
            .filter_map(|id| id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let target = self
            .numbering_part
            .strip_prefix("word/")
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", self.numbering_part));
        let node = rels.create_element(None, PKG_REL_NS, "Relationship");
        rels.set_attr(node, None, None, "Id", &format!("rId{next}"));
        rels.set_attr(node, None, None, "Type", NUMBERING_REL_TYPE);
        rels.set_attr(node, None, None, "Target", &target);
        rels.append_child(root, node);
        Ok(rels.serialize().into_bytes())
    }
}

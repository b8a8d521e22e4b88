use crate::xml::{NodeId, XmlTree};

use super::{
    W, WML_NS, ensure_ppr, new_wml, pt_to_half_points, pt_to_twips, set_wml_attr, wml, wml_attr,
};

/// One level of a list definition. Indents are in points.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelDef {
    pub num_fmt: String,
    pub lvl_text: String,
    pub indent_left: f32,
    pub indent_hanging: f32,
    pub start: u32,
}

/// Font applied to the generated number glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerFont {
    pub latin: String,
    pub east_asian: String,
    pub size_pt: f32,
    pub bold: bool,
}

/// The `word/numbering.xml` part, editable in place.
pub struct NumberingStore {
    tree: XmlTree,
    created: bool,
}

fn twips_attr(tree: &XmlTree, node: NodeId, attr: &str) -> Option<f32> {
    tree.attr(node, Some(WML_NS), attr)
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| v / 20.0)
}

impl NumberingStore {
    pub fn parse(xml_content: &str) -> Result<Self, roxmltree::Error> {
        Ok(Self {
            tree: XmlTree::parse(xml_content)?,
            created: false,
        })
    }

    pub fn empty() -> Self {
        Self {
            tree: XmlTree::with_root(W, WML_NS, "numbering", &[(W, WML_NS)]),
            created: true,
        }
    }

    /// True when the part did not exist in the source package.
    pub fn is_new(&self) -> bool {
        self.created
    }

    pub fn serialize(&self) -> String {
        self.tree.serialize()
    }

    fn top_level(&self, name: &str) -> Vec<NodeId> {
        self.tree.children_named(self.tree.root(), WML_NS, name)
    }

    /// One past the largest abstract or concrete numbering id in use.
    pub fn next_free_id(&self) -> u32 {
        let abstract_ids = self
            .top_level("abstractNum")
            .into_iter()
            .filter_map(|n| self.tree.attr(n, Some(WML_NS), "abstractNumId"));
        let num_ids = self
            .top_level("num")
            .into_iter()
            .filter_map(|n| self.tree.attr(n, Some(WML_NS), "numId"));
        abstract_ids
            .chain(num_ids)
            .filter_map(|v| v.trim().parse::<u32>().ok())
            .max()
            .map_or(1, |m| m + 1)
    }

    pub fn num_ids(&self) -> Vec<u32> {
        self.top_level("num")
            .into_iter()
            .filter_map(|n| self.tree.attr(n, Some(WML_NS), "numId"))
            .filter_map(|v| v.trim().parse().ok())
            .collect()
    }

    /// Register a single-level list definition and a numbering instance
    /// pointing at it. Returns the new `numId`.
    pub fn add_single_level(&mut self, level: &LevelDef, font: &MarkerFont) -> u32 {
        let id = self.next_free_id();
        let id_text = id.to_string();
        let tree = &mut self.tree;

        let abstract_num = new_wml(tree, "abstractNum");
        set_wml_attr(tree, abstract_num, "abstractNumId", &id_text);
        let multi = new_wml(tree, "multiLevelType");
        set_wml_attr(tree, multi, "val", "singleLevel");
        tree.append_child(abstract_num, multi);

        let lvl = new_wml(tree, "lvl");
        set_wml_attr(tree, lvl, "ilvl", "0");
        tree.append_child(abstract_num, lvl);
        for (name, value) in [
            ("start", level.start.to_string()),
            ("numFmt", level.num_fmt.clone()),
            ("lvlText", level.lvl_text.clone()),
            ("lvlJc", "left".to_string()),
        ] {
            let node = new_wml(tree, name);
            set_wml_attr(tree, node, "val", &value);
            tree.append_child(lvl, node);
        }

        let ppr = new_wml(tree, "pPr");
        let ind = new_wml(tree, "ind");
        set_wml_attr(tree, ind, "left", &pt_to_twips(level.indent_left).to_string());
        set_wml_attr(tree, ind, "hanging", &pt_to_twips(level.indent_hanging).to_string());
        tree.append_child(ppr, ind);
        tree.append_child(lvl, ppr);

        let rpr = new_wml(tree, "rPr");
        let fonts = new_wml(tree, "rFonts");
        set_wml_attr(tree, fonts, "ascii", &font.latin);
        set_wml_attr(tree, fonts, "hAnsi", &font.latin);
        set_wml_attr(tree, fonts, "eastAsia", &font.east_asian);
        set_wml_attr(tree, fonts, "cs", &font.latin);
        tree.append_child(rpr, fonts);
        let bold = new_wml(tree, "b");
        if !font.bold {
            set_wml_attr(tree, bold, "val", "0");
        }
        tree.append_child(rpr, bold);
        let half_points = pt_to_half_points(font.size_pt).to_string();
        for name in ["sz", "szCs"] {
            let node = new_wml(tree, name);
            set_wml_attr(tree, node, "val", &half_points);
            tree.append_child(rpr, node);
        }
        tree.append_child(lvl, rpr);

        let num = new_wml(tree, "num");
        set_wml_attr(tree, num, "numId", &id_text);
        let abstract_ref = new_wml(tree, "abstractNumId");
        set_wml_attr(tree, abstract_ref, "val", &id_text);
        tree.append_child(num, abstract_ref);

        // All abstractNum elements precede the first num.
        let root = tree.root();
        match tree.find_child(root, WML_NS, "num") {
            Some(first_num) => tree.insert_before(first_num, abstract_num),
            None => match tree.find_child(root, WML_NS, "numIdMacAtCleanup") {
                Some(tail) => tree.insert_before(tail, abstract_num),
                None => tree.append_child(root, abstract_num),
            },
        }
        match tree.find_child(root, WML_NS, "numIdMacAtCleanup") {
            Some(tail) => tree.insert_before(tail, num),
            None => tree.append_child(root, num),
        }
        id
    }

    /// Level definition reached through a `numId`.
    pub fn level_def(&self, num_id: u32, ilvl: u8) -> Option<LevelDef> {
        let tree = &self.tree;
        let id_text = num_id.to_string();
        let num = self
            .top_level("num")
            .into_iter()
            .find(|&n| tree.attr(n, Some(WML_NS), "numId") == Some(id_text.as_str()))?;
        let abs_id = wml_attr(tree, num, "abstractNumId")?;
        let abstract_num = self
            .top_level("abstractNum")
            .into_iter()
            .find(|&n| tree.attr(n, Some(WML_NS), "abstractNumId") == Some(abs_id))?;
        let lvl = tree
            .children_named(abstract_num, WML_NS, "lvl")
            .into_iter()
            .find(|&l| {
                tree.attr(l, Some(WML_NS), "ilvl")
                    .and_then(|v| v.parse::<u8>().ok())
                    == Some(ilvl)
            })?;

        let ind = wml(tree, lvl, "pPr").and_then(|ppr| wml(tree, ppr, "ind"));
        Some(LevelDef {
            num_fmt: wml_attr(tree, lvl, "numFmt").unwrap_or("bullet").to_string(),
            lvl_text: wml_attr(tree, lvl, "lvlText").unwrap_or("").to_string(),
            indent_left: ind.and_then(|n| twips_attr(tree, n, "left")).unwrap_or(0.0),
            indent_hanging: ind.and_then(|n| twips_attr(tree, n, "hanging")).unwrap_or(0.0),
            start: wml_attr(tree, lvl, "start")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1),
        })
    }
}

// pPr children that precede numPr in schema order.
const BEFORE_NUM_PR: &[&str] = &[
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
];

/// Point a paragraph at `num_id`, replacing any numbering it already had.
pub fn bind(tree: &mut XmlTree, paragraph: NodeId, num_id: u32, ilvl: u32) {
    let ppr = ensure_ppr(tree, paragraph);
    for existing in tree.children_named(ppr, WML_NS, "numPr") {
        tree.detach(existing);
    }

    let num_pr = new_wml(tree, "numPr");
    let ilvl_node = new_wml(tree, "ilvl");
    set_wml_attr(tree, ilvl_node, "val", &ilvl.to_string());
    tree.append_child(num_pr, ilvl_node);
    let num_id_node = new_wml(tree, "numId");
    set_wml_attr(tree, num_id_node, "val", &num_id.to_string());
    tree.append_child(num_pr, num_id_node);

    let pos = tree
        .children(ppr)
        .iter()
        .rposition(|&c| {
            tree.name(c).is_some_and(|n| {
                n.ns.as_deref() == Some(WML_NS) && BEFORE_NUM_PR.contains(&n.local.as_str())
            })
        })
        .map_or(0, |i| i + 1);
    tree.insert_child(ppr, pos, num_pr);
}

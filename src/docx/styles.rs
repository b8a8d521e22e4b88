use std::collections::HashMap;

use super::WML_NS;

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

#[derive(Clone, Debug, Default)]
pub struct ParagraphStyle {
    pub name: String,
    pub numbered: bool,
    based_on: Option<String>,
}

/// Paragraph styles from `word/styles.xml`, keyed by style id.
#[derive(Clone, Debug, Default)]
pub struct StyleTable {
    styles: HashMap<String, ParagraphStyle>,
}

impl StyleTable {
    pub fn parse(xml_content: &str) -> Self {
        let mut styles = HashMap::new();
        let Ok(xml) = roxmltree::Document::parse(xml_content) else {
            log::warn!("word/styles.xml is not well-formed, style names unavailable");
            return Self { styles };
        };

        for style_node in xml.root_element().children() {
            if style_node.tag_name().name() != "style"
                || style_node.tag_name().namespace() != Some(WML_NS)
            {
                continue;
            }
            if style_node.attribute((WML_NS, "type")) != Some("paragraph") {
                continue;
            }
            let Some(style_id) = style_node.attribute((WML_NS, "styleId")) else {
                continue;
            };
            let name = wml_attr(style_node, "name").unwrap_or(style_id).to_string();
            let numbered = wml(style_node, "pPr")
                .and_then(|ppr| wml(ppr, "numPr"))
                .and_then(|num_pr| wml_attr(num_pr, "numId"))
                .is_some_and(|id| id != "0");
            let based_on = wml_attr(style_node, "basedOn").map(|s| s.to_string());
            styles.insert(
                style_id.to_string(),
                ParagraphStyle {
                    name,
                    numbered,
                    based_on,
                },
            );
        }

        resolve_based_on(&mut styles);
        Self { styles }
    }

    /// Human-readable style name for a style id, falling back to the id.
    pub fn name_of<'a>(&'a self, style_id: &'a str) -> &'a str {
        self.styles
            .get(style_id)
            .map(|s| s.name.as_str())
            .unwrap_or(style_id)
    }

    /// Whether paragraphs using this style get list numbering from the style itself.
    pub fn is_numbered(&self, style_id: &str) -> bool {
        self.styles.get(style_id).is_some_and(|s| s.numbered)
    }
}

fn resolve_based_on(styles: &mut HashMap<String, ParagraphStyle>) {
    let ids: Vec<String> = styles.keys().cloned().collect();
    for id in ids {
        let mut chain: Vec<String> = Vec::new();
        let mut current = id.clone();
        loop {
            if chain.contains(&current) {
                break;
            }
            chain.push(current.clone());
            match styles.get(&current).and_then(|s| s.based_on.clone()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        let inherited = chain
            .iter()
            .any(|ancestor| styles.get(ancestor).is_some_and(|s| s.numbered));
        if let Some(s) = styles.get_mut(&id) {
            s.numbered = inherited;
        }
    }
}

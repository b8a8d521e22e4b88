use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::xml::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// `w:jc` value.
    pub fn wml_value(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

/// Structural role of a paragraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Blank,
    H1,
    H2,
    H3,
    Caption,
    Abstract,
    Keyword,
    Reference,
    Footer,
    ListItem,
    Body,
    Unknown,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::Blank,
        Role::H1,
        Role::H2,
        Role::H3,
        Role::Caption,
        Role::Abstract,
        Role::Keyword,
        Role::Reference,
        Role::Footer,
        Role::ListItem,
        Role::Body,
        Role::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Blank => "blank",
            Role::H1 => "h1",
            Role::H2 => "h2",
            Role::H3 => "h3",
            Role::Caption => "caption",
            Role::Abstract => "abstract",
            Role::Keyword => "keyword",
            Role::Reference => "reference",
            Role::Footer => "footer",
            Role::ListItem => "list_item",
            Role::Body => "body",
            Role::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s)
    }

    pub fn is_heading(self) -> bool {
        matches!(self, Role::H1 | Role::H2 | Role::H3)
    }

    /// Roles that always break a list run.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Role::H1
                | Role::H2
                | Role::H3
                | Role::Caption
                | Role::Abstract
                | Role::Keyword
                | Role::Reference
                | Role::Footer
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the rule classifier sees of a paragraph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphView {
    pub text: String,
    pub style_name: Option<String>,
    pub has_numbering: bool,
}

impl ParagraphView {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

/// 1-based surrogate key of a block within one classification pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub text: String,
    pub paragraph_index: usize,
}

impl Block {
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Vec<Block> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Block {
                id: BlockId(i as u32 + 1),
                text: t.as_ref().to_string(),
                paragraph_index: i,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    Rule,
    Llm,
    Hybrid,
}

impl LabelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelSource::Rule => "rule",
            LabelSource::Llm => "llm",
            LabelSource::Hybrid => "hybrid",
        }
    }
}

/// Which classifier produced a single label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOrigin {
    Rule,
    External,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LabelEntry {
    pub role: Role,
    pub confidence: Option<f32>,
    pub origin: LabelOrigin,
}

impl LabelEntry {
    pub fn rule(role: Role) -> Self {
        Self {
            role,
            confidence: None,
            origin: LabelOrigin::Rule,
        }
    }

    pub fn external(role: Role, confidence: f32) -> Self {
        Self {
            role,
            confidence: Some(confidence),
            origin: LabelOrigin::External,
        }
    }
}

/// Diagnostics of the selective (hybrid) policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HybridTriggers {
    pub triggered: bool,
    pub classifier_called: bool,
    pub reasons: Vec<String>,
    pub triggered_indices: Vec<usize>,
    pub unknown_count: usize,
    pub ambiguous_heading_count: usize,
    pub short_body_run_count: usize,
    pub overridden: usize,
    pub error: Option<String>,
}

/// Reconciled labels, one entry per block in flow order.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelSet {
    pub entries: Vec<LabelEntry>,
    pub source: LabelSource,
    pub warnings: Vec<String>,
    pub hybrid: Option<HybridTriggers>,
}

impl LabelSet {
    pub fn from_rules(roles: &[Role]) -> Self {
        Self {
            entries: roles.iter().map(|&r| LabelEntry::rule(r)).collect(),
            source: LabelSource::Rule,
            warnings: Vec::new(),
            hybrid: None,
        }
    }

    pub fn role(&self, index: usize) -> Option<Role> {
        self.entries.get(index).map(|e| e.role)
    }

    pub fn get(&self, id: BlockId) -> Option<&LabelEntry> {
        (id.0 as usize).checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn roles(&self) -> Vec<Role> {
        self.entries.iter().map(|e| e.role).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Labels keyed by paragraph node; survives paragraph insertion and removal.
pub type NodeLabels = HashMap<NodeId, LabelEntry>;

/// Text conventions for typing a list ordinal by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListFamily {
    /// `（1）`
    ParenArabic,
    /// `1)` or `1）`
    RParen,
    /// `1. `
    NumDot,
    /// `①`
    Enclosed,
    /// `a. ` or `a) `
    AlphaLower,
    /// `A. ` or `A) `
    AlphaUpper,
}

impl ListFamily {
    /// Decimal families may alternate inside one list.
    pub fn is_decimal(self) -> bool {
        matches!(self, ListFamily::ParenArabic | ListFamily::RParen | ListFamily::NumDot)
    }

    /// `w:numFmt` value.
    pub fn num_fmt(self) -> &'static str {
        match self {
            ListFamily::ParenArabic | ListFamily::RParen | ListFamily::NumDot => "decimal",
            ListFamily::Enclosed => "decimalEnclosedCircle",
            ListFamily::AlphaLower => "lowerLetter",
            ListFamily::AlphaUpper => "upperLetter",
        }
    }

    /// `w:lvlText` template.
    pub fn lvl_text(self) -> &'static str {
        match self {
            ListFamily::ParenArabic => "（%1）",
            ListFamily::RParen => "%1)",
            ListFamily::NumDot => "%1.",
            ListFamily::Enclosed => "%1",
            ListFamily::AlphaLower | ListFamily::AlphaUpper => "%1.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListFamily::ParenArabic => "paren_arabic",
            ListFamily::RParen => "rparen",
            ListFamily::NumDot => "num_dot",
            ListFamily::Enclosed => "enclosed",
            ListFamily::AlphaLower => "alpha_lower",
            ListFamily::AlphaUpper => "alpha_upper",
        }
    }
}

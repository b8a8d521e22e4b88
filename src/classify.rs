//! Rule-based role classifier.
//!
//! The rules form a decision table evaluated top-down; the first rule that
//! returns a role wins and unmatched text is `body`.

use std::sync::LazyLock;

use regex::Regex;

use crate::docx::flow::is_blank_text;
use crate::lists::detect;
use crate::model::{ParagraphView, Role};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid role pattern"));
    };
}

pattern!(ABSTRACT, r"(?i)^(摘\s*要|abstract)\s*([:：]|$)");
pattern!(KEYWORD, r"(?i)^(关\s*键\s*[词字]|key\s*words?)\s*([:：]|$)");
pattern!(REFERENCES, r"(?i)^(参考文献|references?|bibliography)\s*[:：]?\s*$");
pattern!(
    CAPTION,
    r"(?i)^(图|表|figure|fig\.|table)\s*[0-9]+([.．\-－][0-9]+)*(\s|[:：.．、]|$|[^\x00-\x7F])"
);
pattern!(PAREN_CN, r"^（[一二三四五六七八九十百千万零〇两]+）");
pattern!(CHAPTER, r"^第[一二三四五六七八九十百千万零〇两0-9]+章");
pattern!(SECTION, r"^第[一二三四五六七八九十百千万零〇两0-9]+节");
pattern!(ARTICLE, r"^第[一二三四五六七八九十百千万零〇两0-9]+条");
pattern!(CN_ENUM, r"^[一二三四五六七八九十百千万零〇两]+、");
pattern!(OUTLINE, r"^([0-9]{1,3}(?:\.[0-9]+){0,3})\.?\s+");

/// One entry of the decision table.
struct Rule {
    name: &'static str,
    apply: fn(&Subject) -> Option<Role>,
}

/// A paragraph as seen by the rules: trimmed text plus native hints.
struct Subject<'a> {
    view: &'a ParagraphView,
    text: &'a str,
}

fn when(cond: bool, role: Role) -> Option<Role> {
    cond.then_some(role)
}

const RULES: &[Rule] = &[
    Rule {
        name: "blank",
        apply: |s| when(is_blank_text(&s.view.text), Role::Blank),
    },
    Rule {
        name: "multi_item_blob",
        apply: |s| when(is_multi_item_blob(&s.view.text), Role::Body),
    },
    Rule {
        name: "native_style",
        apply: |s| s.view.style_name.as_deref().and_then(role_from_style),
    },
    Rule {
        name: "abstract",
        apply: |s| when(ABSTRACT.is_match(s.text), Role::Abstract),
    },
    Rule {
        name: "keyword",
        apply: |s| when(KEYWORD.is_match(s.text), Role::Keyword),
    },
    Rule {
        name: "references",
        apply: |s| when(REFERENCES.is_match(s.text), Role::Reference),
    },
    Rule {
        name: "caption",
        apply: |s| when(CAPTION.is_match(s.text), Role::Caption),
    },
    Rule {
        name: "native_numbering",
        apply: |s| when(s.view.has_numbering, Role::ListItem),
    },
    Rule {
        name: "paren_cn_subheading",
        apply: |s| when(PAREN_CN.is_match(s.text), Role::H3),
    },
    Rule {
        name: "chapter",
        apply: |s| when(CHAPTER.is_match(s.text), Role::H1),
    },
    Rule {
        name: "section",
        apply: |s| when(SECTION.is_match(s.text), Role::H2),
    },
    Rule {
        name: "article",
        apply: |s| when(ARTICLE.is_match(s.text), Role::H3),
    },
    Rule {
        name: "cn_enum",
        apply: |s| when(CN_ENUM.is_match(s.text), Role::H2),
    },
    Rule {
        name: "outline",
        apply: |s| outline_depth(s.text).map(|d| if d == 0 { Role::H2 } else { Role::H3 }),
    },
    Rule {
        name: "list_marker",
        apply: |s| when(detect::has_marker(s.text), Role::ListItem),
    },
];

/// Number of dots in a leading decimal outline number (`1` → 0, `1.2` → 1).
fn outline_depth(text: &str) -> Option<usize> {
    // `1. text` is a list marker, not a depth-0 outline number.
    if detect::detect(text).is_some_and(|m| m.family.is_decimal()) {
        return None;
    }
    let caps = OUTLINE.captures(text)?;
    Some(caps.get(1)?.as_str().matches('.').count())
}

fn role_from_style(style_name: &str) -> Option<Role> {
    let name = style_name.trim().to_lowercase();
    match name.as_str() {
        "heading 1" | "标题 1" => Some(Role::H1),
        "heading 2" | "标题 2" => Some(Role::H2),
        "heading 3" | "标题 3" => Some(Role::H3),
        "footer" | "页脚" => Some(Role::Footer),
        _ => None,
    }
}

/// A line that opens like an enumerated item or an outline heading.
fn is_item_line(line: &str) -> bool {
    let line = line.trim_start();
    detect::has_marker(line)
        || OUTLINE.is_match(line)
        || PAREN_CN.is_match(line)
        || CN_ENUM.is_match(line)
}

/// Several numbered items joined by soft breaks. Such text is body until the
/// splitter separates it and each line is classified on its own.
pub fn is_multi_item_blob(text: &str) -> bool {
    let lines: Vec<&str> = text.split('\n').filter(|l| !is_blank_text(l)).collect();
    lines.len() >= 2 && lines.iter().filter(|l| is_item_line(l)).count() >= 2
}

/// Role of a single paragraph.
pub fn classify(view: &ParagraphView) -> Role {
    classify_with_rule(view).0
}

/// Role of a paragraph and the name of the rule that decided it.
pub fn classify_with_rule(view: &ParagraphView) -> (Role, &'static str) {
    let subject = Subject {
        view,
        text: view.text.trim(),
    };
    RULES
        .iter()
        .find_map(|rule| (rule.apply)(&subject).map(|role| (role, rule.name)))
        .unwrap_or((Role::Body, "default"))
}

pub fn classify_all(views: &[ParagraphView]) -> Vec<Role> {
    views.iter().map(classify).collect()
}

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ListFamily;

/// A list marker found at the start of a paragraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker {
    pub family: ListFamily,
    pub ordinal: u32,
    /// Code points to strip, leading whitespace and punctuation included.
    pub prefix_len: usize,
}

macro_rules! marker_regex {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid list marker regex"));
    };
}

// Blanks around a marker are spaces, tabs or U+3000; a line break never counts.
marker_regex!(PAREN_ARABIC, r"^[ \t\u{3000}]*（([0-9]+)）");
marker_regex!(RPAREN, r"^[ \t\u{3000}]*([0-9]+)[)）][ \t\u{3000}]?");
marker_regex!(NUM_DOT, r"^[ \t\u{3000}]*([0-9]+)\.[ \t\u{3000}]");
marker_regex!(ENCLOSED, r"^[ \t\u{3000}]*([\u{2460}-\u{2473}])");
marker_regex!(ALPHA_LOWER, r"^[ \t\u{3000}]*([a-z])[.)][ \t\u{3000}]");
marker_regex!(ALPHA_UPPER, r"^[ \t\u{3000}]*([A-Z])[.)][ \t\u{3000}]");

fn char_len(text: &str, byte_end: usize) -> usize {
    text[..byte_end].chars().count()
}

fn numeric(text: &str, re: &Regex, family: ListFamily) -> Option<Marker> {
    let caps = re.captures(text)?;
    let ordinal = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let end = caps.get(0)?.end();
    Some(Marker {
        family,
        ordinal,
        prefix_len: char_len(text, end),
    })
}

/// `1.2 text` is an outline number, not a `1.` list marker.
fn is_multilevel(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .is_some_and(|token| token.trim_end_matches('.').contains('.'))
}

fn letter(text: &str, re: &Regex, family: ListFamily, base: char) -> Option<Marker> {
    let caps = re.captures(text)?;
    let c = caps.get(1)?.as_str().chars().next()?;
    Some(Marker {
        family,
        ordinal: c as u32 - base as u32 + 1,
        prefix_len: char_len(text, caps.get(0)?.end()),
    })
}

/// Detect a typed list marker. More specific families are tried first.
///
/// A marker that ends its line (`1)` then a soft break) is not a list item.
pub fn detect(text: &str) -> Option<Marker> {
    find_marker(text).filter(|m| text.chars().nth(m.prefix_len) != Some('\n'))
}

fn find_marker(text: &str) -> Option<Marker> {
    if let Some(m) = numeric(text, &PAREN_ARABIC, ListFamily::ParenArabic) {
        return Some(m);
    }
    if let Some(m) = numeric(text, &RPAREN, ListFamily::RParen) {
        return Some(m);
    }
    if !is_multilevel(text)
        && let Some(m) = numeric(text, &NUM_DOT, ListFamily::NumDot)
    {
        return Some(m);
    }
    if let Some(caps) = ENCLOSED.captures(text)
        && let (Some(glyph), Some(all)) = (caps.get(1), caps.get(0))
        && let Some(c) = glyph.as_str().chars().next()
    {
        return Some(Marker {
            family: ListFamily::Enclosed,
            ordinal: c as u32 - 0x2460 + 1,
            prefix_len: char_len(text, all.end()),
        });
    }
    if let Some(m) = letter(text, &ALPHA_LOWER, ListFamily::AlphaLower, 'a') {
        return Some(m);
    }
    letter(text, &ALPHA_UPPER, ListFamily::AlphaUpper, 'A')
}

pub fn has_marker(text: &str) -> bool {
    detect(text).is_some()
}

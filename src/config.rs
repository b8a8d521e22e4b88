use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::docx::numbering::MarkerFont;
use crate::error::Error;
use crate::lists::ListLayout;
use crate::model::{Alignment, Role};
use crate::reconcile::Mode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fonts {
    /// East-Asian typeface.
    pub zh: String,
    /// Latin typeface.
    pub en: String,
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            zh: "宋体".to_string(),
            en: "Times New Roman".to_string(),
        }
    }
}

/// Visual attributes applied to one role. Sizes and spacing in points;
/// `line_spacing` is a multiple of single spacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleStyle {
    pub font_size_pt: f32,
    pub bold: bool,
    pub italic: bool,
    pub alignment: Alignment,
    pub line_spacing: f32,
    pub space_before_pt: f32,
    pub space_after_pt: f32,
    /// First-line indent in character widths.
    pub first_line_chars: u32,
    pub left_indent_pt: f32,
    pub hanging_indent_pt: f32,
}

impl Default for RoleStyle {
    fn default() -> Self {
        Self {
            font_size_pt: 12.0,
            bold: false,
            italic: false,
            alignment: Alignment::Justify,
            line_spacing: 1.5,
            space_before_pt: 0.0,
            space_after_pt: 0.0,
            first_line_chars: 2,
            left_indent_pt: 0.0,
            hanging_indent_pt: 0.0,
        }
    }
}

impl RoleStyle {
    fn heading(size: f32, alignment: Alignment, before: f32, after: f32) -> Self {
        Self {
            font_size_pt: size,
            bold: true,
            alignment,
            space_before_pt: before,
            space_after_pt: after,
            first_line_chars: 0,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListStyle {
    pub font_size_pt: f32,
    pub bold: bool,
    pub line_spacing: f32,
    pub space_before_pt: f32,
    pub space_after_pt: f32,
    pub left_indent_pt: f32,
    pub hanging_indent_pt: f32,
    /// Shortest marker run converted to native numbering.
    pub min_run_len: usize,
    pub convert_text_numbers: bool,
}

impl Default for ListStyle {
    fn default() -> Self {
        Self {
            font_size_pt: 12.0,
            bold: false,
            line_spacing: 1.5,
            space_before_pt: 0.0,
            space_after_pt: 0.0,
            left_indent_pt: 18.0,
            hanging_indent_pt: 18.0,
            min_run_len: 1,
            convert_text_numbers: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cleanup {
    pub max_consecutive_blank_paragraphs: usize,
    /// Shorthand for `max_consecutive_blank_paragraphs = 0`.
    pub remove_all_blank_paragraphs: bool,
    pub remove_blank_after_roles: Vec<Role>,
}

impl Default for Cleanup {
    fn default() -> Self {
        Self {
            max_consecutive_blank_paragraphs: 1,
            remove_all_blank_paragraphs: false,
            remove_blank_after_roles: vec![Role::H1, Role::H2, Role::H3, Role::Caption],
        }
    }
}

impl Cleanup {
    pub fn max_blank_run(&self) -> usize {
        if self.remove_all_blank_paragraphs {
            0
        } else {
            self.max_consecutive_blank_paragraphs
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formatting {
    pub enabled: bool,
}

impl Default for Formatting {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Settings for one tidy run. Every section is optional in the JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub fonts: Fonts,
    pub body: RoleStyle,
    pub h1: RoleStyle,
    pub h2: RoleStyle,
    pub h3: RoleStyle,
    pub caption: RoleStyle,
    #[serde(rename = "abstract")]
    pub abstract_: RoleStyle,
    pub keyword: RoleStyle,
    pub reference: RoleStyle,
    pub footer: RoleStyle,
    pub list_item: ListStyle,
    pub cleanup: Cleanup,
    pub formatting: Formatting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            fonts: Fonts::default(),
            body: RoleStyle::default(),
            h1: RoleStyle::heading(16.0, Alignment::Center, 12.0, 12.0),
            h2: RoleStyle::heading(14.0, Alignment::Left, 6.0, 6.0),
            h3: RoleStyle::heading(12.0, Alignment::Left, 6.0, 0.0),
            caption: RoleStyle {
                font_size_pt: 10.5,
                alignment: Alignment::Center,
                line_spacing: 1.0,
                space_before_pt: 3.0,
                space_after_pt: 3.0,
                first_line_chars: 0,
                ..RoleStyle::default()
            },
            abstract_: RoleStyle {
                italic: true,
                ..RoleStyle::default()
            },
            keyword: RoleStyle {
                first_line_chars: 0,
                ..RoleStyle::default()
            },
            reference: RoleStyle {
                font_size_pt: 10.5,
                alignment: Alignment::Left,
                line_spacing: 1.25,
                first_line_chars: 0,
                left_indent_pt: 21.0,
                hanging_indent_pt: 21.0,
                ..RoleStyle::default()
            },
            footer: RoleStyle {
                font_size_pt: 9.0,
                alignment: Alignment::Center,
                line_spacing: 1.0,
                first_line_chars: 0,
                ..RoleStyle::default()
            },
            list_item: ListStyle::default(),
            cleanup: Cleanup::default(),
            formatting: Formatting::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.fonts.zh.trim().is_empty() || self.fonts.en.trim().is_empty() {
            return Err(Error::Config("fonts.zh and fonts.en must not be empty".into()));
        }
        let sizes = [
            ("body", self.body.font_size_pt),
            ("h1", self.h1.font_size_pt),
            ("h2", self.h2.font_size_pt),
            ("h3", self.h3.font_size_pt),
            ("caption", self.caption.font_size_pt),
            ("abstract", self.abstract_.font_size_pt),
            ("keyword", self.keyword.font_size_pt),
            ("reference", self.reference.font_size_pt),
            ("footer", self.footer.font_size_pt),
            ("list_item", self.list_item.font_size_pt),
        ];
        if let Some((name, size)) = sizes.iter().find(|(_, s)| s.is_nan() || *s <= 0.0) {
            return Err(Error::Config(format!("{name}.font_size_pt must be positive, got {size}")));
        }
        Ok(())
    }

    /// Style for a role. `unknown` is styled as body; `blank` and `list_item`
    /// have no role style.
    pub fn role_style(&self, role: Role) -> Option<&RoleStyle> {
        match role {
            Role::Body | Role::Unknown => Some(&self.body),
            Role::H1 => Some(&self.h1),
            Role::H2 => Some(&self.h2),
            Role::H3 => Some(&self.h3),
            Role::Caption => Some(&self.caption),
            Role::Abstract => Some(&self.abstract_),
            Role::Keyword => Some(&self.keyword),
            Role::Reference => Some(&self.reference),
            Role::Footer => Some(&self.footer),
            Role::Blank | Role::ListItem => None,
        }
    }

    pub fn list_layout(&self) -> ListLayout {
        ListLayout {
            indent_left: self.list_item.left_indent_pt,
            indent_hanging: self.list_item.hanging_indent_pt,
            font: MarkerFont {
                latin: self.fonts.en.clone(),
                east_asian: self.fonts.zh.clone(),
                size_pt: self.list_item.font_size_pt,
                bold: self.list_item.bold,
            },
        }
    }
}

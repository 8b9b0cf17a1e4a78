//! Checklist text codec for combined free-text/checklist descriptions.
//!
//! # Responsibility
//! - Split a description into checklist items and free-text paragraphs.
//! - Serialize items back to text with normalized `- [ ] ` / `- [x] ` markers.
//!
//! # Invariants
//! - A line matching `([-*] )?[[xX ]]` opens a new checklist item; its text
//!   is trimmed. Empty checklist items are kept.
//! - Consecutive plain lines form one paragraph joined by `\n`, untrimmed.
//! - Trailing empty lines are ignored; blank lines directly after a
//!   checklist item are swallowed.
//! - `parse(serialize(items)) == items` when no plain item contains `\n`
//!   next to a checklist item, plain texts are non-empty, and no two plain
//!   items are adjacent. Adjacent plain items come back as one paragraph
//!   joined by `\n`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CHECKMARK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-*] )?\[([xX ])\](.*)").expect("checkmark pattern must compile")
});

const CHECKED_MARKER: &str = "- [x] ";
const UNCHECKED_MARKER: &str = "- [ ] ";

/// One checklist item or free-text paragraph of a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionItem {
    /// `true` for checklist items, `false` for plain paragraphs.
    pub checkbox: bool,
    /// Always `false` for plain paragraphs.
    pub checked: bool,
    pub text: String,
}

impl DescriptionItem {
    pub fn checkbox(checked: bool, text: impl Into<String>) -> Self {
        Self {
            checkbox: true,
            checked,
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            checkbox: false,
            checked: false,
            text: text.into(),
        }
    }
}

enum Block {
    Checklist { checked: bool, text: String },
    Paragraph(String),
}

impl Block {
    fn close(self, items: &mut Vec<DescriptionItem>) {
        match self {
            Self::Checklist { checked, text } => {
                items.push(DescriptionItem::checkbox(checked, text.trim()));
            }
            Self::Paragraph(text) if !text.is_empty() => items.push(DescriptionItem::plain(text)),
            Self::Paragraph(_) => {}
        }
    }
}

/// Parses description text into items. `None` and `""` yield no items.
pub fn parse_description(description: Option<&str>) -> Vec<DescriptionItem> {
    let mut items = Vec::new();
    let Some(description) = description else {
        return items;
    };

    let mut current = Block::Paragraph(String::new());
    for line in significant_lines(description) {
        if let Some(captures) = CHECKMARK_PATTERN.captures(line) {
            let checked = captures
                .get(2)
                .is_some_and(|mark| mark.as_str().eq_ignore_ascii_case("x"));
            let text = captures.get(3).map_or("", |text| text.as_str()).to_string();
            std::mem::replace(&mut current, Block::Checklist { checked, text }).close(&mut items);
            continue;
        }

        if let Block::Paragraph(paragraph) = &mut current {
            if !paragraph.is_empty() {
                paragraph.push('\n');
            }
            paragraph.push_str(line);
        } else {
            std::mem::replace(&mut current, Block::Paragraph(line.to_string())).close(&mut items);
        }
    }
    current.close(&mut items);
    items
}

/// Serializes items, one line per item. An empty list yields `""`.
pub fn serialize_description(items: &[DescriptionItem]) -> String {
    let mut out = String::with_capacity(items.iter().map(|item| item.text.len() + 7).sum());
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if item.checkbox {
            out.push_str(if item.checked {
                CHECKED_MARKER
            } else {
                UNCHECKED_MARKER
            });
        }
        out.push_str(&item.text);
    }
    out
}

fn significant_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
}

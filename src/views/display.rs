//! Display Models
//!
//! Plain data produced by the view renderers. `Serialize` gives the JSON
//! output of the CLI; `Display` gives the text output.

use serde::Serialize;
use std::fmt;

/// Colour hint for cards and badges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
    Purple,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub label: String,
    pub value: String,
    pub tone: Tone,
}

impl StatCard {
    pub fn new(label: impl Into<String>, value: impl ToString, tone: Tone) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            tone,
        }
    }
}

impl fmt::Display for StatCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub text: String,
    pub tone: Tone,
}

impl Badge {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    /// "Active" / "Inactive"
    pub fn activity(active: bool) -> Self {
        if active {
            Self::new("Active", Tone::Success)
        } else {
            Self::new("Inactive", Tone::Danger)
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.text)
    }
}

/// What a button does when pressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    SetIgnition { bike_id: String, block: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub label: String,
    pub intent: Intent,
    pub tone: Tone,
    pub enabled: bool,
}

impl Action {
    pub fn new(label: impl Into<String>, intent: Intent, tone: Tone) -> Self {
        Self {
            label: label.into(),
            intent,
            tone,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Text(String),
    Badge(Badge),
    Actions(Vec<Action>),
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Cell::Text(text.into())
    }

    /// Text, or [`PLACEHOLDER`] when missing or empty
    pub fn or_dash(text: Option<&str>) -> Self {
        Cell::Text(
            text.filter(|t| !t.is_empty())
                .unwrap_or(PLACEHOLDER)
                .to_string(),
        )
    }

    pub fn plain(&self) -> String {
        match self {
            Cell::Text(text) => text.clone(),
            Cell::Badge(badge) => badge.to_string(),
            Cell::Actions(actions) => actions
                .iter()
                .map(|a| {
                    if a.enabled {
                        format!("<{}>", a.label)
                    } else {
                        format!("({})", a.label)
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Shown for missing optional values
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Row whose first column equals `key`
    pub fn row(&self, key: &str) -> Option<&[Cell]> {
        self.rows
            .iter()
            .find(|row| matches!(row.first(), Some(Cell::Text(t)) if t == key))
            .map(Vec::as_slice)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;

        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(Cell::plain).collect())
            .collect();

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        writeln!(f, "  {}", line(&self.headers[..]))?;
        for row in &rendered {
            writeln!(f, "  {}", line(&row[..]))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Success => write!(f, "✓ {}", self.message),
            NoticeLevel::Error => write!(f, "✗ {}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl EmptyState {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for EmptyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ({})", self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {}", hint)?;
        }
        Ok(())
    }
}

/// Write a list of stat cards on one line each
pub(crate) fn write_cards(f: &mut fmt::Formatter<'_>, cards: &[StatCard]) -> fmt::Result {
    for card in cards {
        writeln!(f, "  {}", card)?;
    }
    Ok(())
}

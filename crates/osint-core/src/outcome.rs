//! # Lookup Outcomes
//!
//! Every lookup module reports through [`LookupOutcome`], so the console can
//! render any module without knowing which portal produced the data.

use serde::{Deserialize, Serialize};

/// An ordered list of labelled values, such as one row of a portal table.
///
/// Insertion order is kept; it is the column order used when rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<(String, String)>);

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, consuming and returning the record.
    pub fn with(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(label, value);
        self
    }

    /// Append a field.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.0.push((label.into(), value.into()));
    }

    /// Value of the first field with `label`.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Field labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(l, _)| l.as_str())
    }

    /// `(label, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(l, v)| (l.into(), v.into()))
                .collect(),
        )
    }
}

/// What a lookup module found for one identity number.
///
/// Build values through the constructors ([`LookupOutcome::line`],
/// [`LookupOutcome::lines`], [`LookupOutcome::table`]) so that empty results
/// collapse to [`LookupOutcome::Absent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Nothing was found.
    Absent,
    /// A single line of text.
    Line(String),
    /// One labelled record.
    Record(Record),
    /// Several independent lines.
    Lines(Vec<String>),
    /// Rows of labelled records sharing the same columns.
    Table(Vec<Record>),
}

impl LookupOutcome {
    /// A single line, or `Absent` when `text` is blank. Surrounding
    /// whitespace is trimmed.
    pub fn line(text: impl AsRef<str>) -> Self {
        let text = text.as_ref().trim();
        if text.is_empty() {
            Self::Absent
        } else {
            Self::Line(text.to_string())
        }
    }

    /// Non-blank lines, or `Absent` when none remain.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines
            .into_iter()
            .map(Into::into)
            .filter(|l| !l.trim().is_empty())
            .collect();
        if lines.is_empty() {
            Self::Absent
        } else {
            Self::Lines(lines)
        }
    }

    /// A record, or `Absent` when it has no fields.
    pub fn record(record: Record) -> Self {
        if record.is_empty() {
            Self::Absent
        } else {
            Self::Record(record)
        }
    }

    /// Non-empty rows, or `Absent` when none remain.
    pub fn table(rows: Vec<Record>) -> Self {
        let rows: Vec<Record> = rows.into_iter().filter(|r| !r.is_empty()).collect();
        if rows.is_empty() {
            Self::Absent
        } else {
            Self::Table(rows)
        }
    }

    /// Wrap an optional line.
    pub fn from_option(text: Option<String>) -> Self {
        text.map_or(Self::Absent, Self::line)
    }

    /// True for [`LookupOutcome::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl Default for LookupOutcome {
    fn default() -> Self {
        Self::Absent
    }
}

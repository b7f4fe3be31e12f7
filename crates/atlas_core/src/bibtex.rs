//! Minimal BibTeX reader for seed bibliographies.
//!
//! # Responsibility
//! - Parse `@type{key, field = value, ...}` records into [`BibEntry`] values.
//!
//! # Invariants
//! - Entry types and field names are lowercased; values keep their text with
//!   the outermost delimiters stripped.
//! - `@comment`, `@preamble` and `@string` blocks are skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static ENTRY_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\s*([A-Za-z]+)\s*[{(]").expect("valid entry header regex"));

const SKIPPED_ENTRY_TYPES: &[&str] = &["comment", "preamble", "string"];

/// One parsed bibliography record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

impl BibEntry {
    /// Returns a field value by case-insensitive name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name.trim().to_ascii_lowercase().as_str())
            .map(String::as_str)
    }
}

/// BibTeX parse failures; `offset` is a byte offset into the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BibtexError {
    MissingKey { offset: usize },
    UnterminatedEntry { offset: usize },
    MalformedField { key: String, detail: String },
}

impl Display for BibtexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey { offset } => write!(f, "bibtex entry at byte {offset} has no key"),
            Self::UnterminatedEntry { offset } => {
                write!(f, "bibtex entry at byte {offset} is not terminated")
            }
            Self::MalformedField { key, detail } => {
                write!(f, "bibtex entry `{key}` has a malformed field: {detail}")
            }
        }
    }
}

impl Error for BibtexError {}

pub type BibtexResult<T> = Result<T, BibtexError>;

/// Parses every entry in `text`, in document order.
pub fn parse_bibtex(text: &str) -> BibtexResult<Vec<BibEntry>> {
    let mut entries = Vec::new();
    let mut cursor = 0;

    while let Some(captures) = ENTRY_HEADER_RE.captures_at(text, cursor) {
        let (Some(whole), Some(kind)) = (captures.get(0), captures.get(1)) else {
            break;
        };
        let offset = whole.start();
        let body_start = whole.end();
        let entry_type = kind.as_str().to_ascii_lowercase();
        let opener = text[..body_start].chars().last().unwrap_or('{');
        let closer = if opener == '(' { ')' } else { '}' };

        let body_end = find_entry_end(text, body_start, closer)
            .ok_or(BibtexError::UnterminatedEntry { offset })?;
        cursor = body_end + closer.len_utf8();

        if SKIPPED_ENTRY_TYPES.contains(&entry_type.as_str()) {
            continue;
        }
        entries.push(parse_entry_body(
            entry_type,
            &text[body_start..body_end],
            offset,
        )?);
    }

    Ok(entries)
}

fn find_entry_end(text: &str, start: usize, closer: char) -> Option<usize> {
    let mut depth = 0_usize;
    for (index, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            c if c == closer && depth == 0 => return Some(start + index),
            _ => {}
        }
    }
    None
}

fn parse_entry_body(entry_type: String, body: &str, offset: usize) -> BibtexResult<BibEntry> {
    let (key, rest) = match body.find(',') {
        Some(comma) => (body[..comma].trim(), &body[comma + 1..]),
        None => (body.trim(), ""),
    };
    if key.is_empty() {
        return Err(BibtexError::MissingKey { offset });
    }

    let mut fields = BTreeMap::new();
    let mut scanner = FieldScanner::new(rest);
    while let Some((name, value)) = scanner.next_field().map_err(|detail| {
        BibtexError::MalformedField {
            key: key.to_string(),
            detail,
        }
    })? {
        fields.insert(name, value);
    }

    Ok(BibEntry {
        entry_type,
        key: key.to_string(),
        fields,
    })
}

struct FieldScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> FieldScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_separators(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        self.pos += rest.len() - trimmed.len();
    }

    fn next_field(&mut self) -> Result<Option<(String, String)>, String> {
        self.skip_separators();
        if self.rest().is_empty() {
            return Ok(None);
        }

        let Some(eq) = self.rest().find('=') else {
            return Err(format!("expected `=` near `{}`", preview(self.rest())));
        };
        let name = self.rest()[..eq].trim().to_ascii_lowercase();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(format!("invalid field name near `{}`", preview(self.rest())));
        }
        self.pos += eq + 1;
        let value = self.read_value()?;
        Ok(Some((name, value)))
    }

    fn read_value(&mut self) -> Result<String, String> {
        let mut parts = Vec::new();
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            let part = match trimmed.chars().next() {
                Some('{') => self.read_delimited('{', '}')?,
                Some('"') => self.read_delimited('"', '"')?,
                Some(_) => self.read_bare(),
                None => return Err("missing field value".to_string()),
            };
            parts.push(part);

            let rest = self.rest();
            let trimmed = rest.trim_start();
            if let Some(after) = trimmed.strip_prefix('#') {
                self.pos += rest.len() - after.len();
                continue;
            }
            break;
        }
        Ok(normalize_whitespace(&parts.concat()))
    }

    fn read_delimited(&mut self, open: char, close: char) -> Result<String, String> {
        let rest = self.rest();
        let mut depth = 0_usize;
        for (index, ch) in rest.char_indices().skip(1) {
            match ch {
                '{' => depth += 1,
                '}' if depth > 0 => depth -= 1,
                c if c == close && depth == 0 => {
                    let value = rest[open.len_utf8()..index].to_string();
                    self.pos += index + close.len_utf8();
                    return Ok(value);
                }
                _ => {}
            }
        }
        Err(format!("unbalanced `{open}` near `{}`", preview(rest)))
    }

    fn read_bare(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c == ',' || c == '#' || c.is_whitespace())
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_string()
    }
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn preview(value: &str) -> String {
    value.chars().take(24).collect()
}

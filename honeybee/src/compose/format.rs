//! YAML normalization
//!
//! Compose documents are re-emitted in one house style: block collections,
//! string values double-quoted (or as literal blocks when they span lines),
//! long quoted values folded at `line_length`, and no document start marker.
//! Keys keep their document order.

use std::fmt::Write;

use serde_yaml::{Mapping, Value};

use crate::errors::HoneybeeError;
use crate::storage::settings::FormatSettings;

const INDENT: usize = 2;

const RESERVED_WORDS: [&str; 11] = [
    "true", "false", "null", "yes", "no", "on", "off", "y", "n", "~", "",
];

#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub line_length: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { line_length: 120 }
    }
}

impl From<&FormatSettings> for FormatOptions {
    fn from(settings: &FormatSettings) -> Self {
        Self {
            line_length: settings.line_length,
        }
    }
}

/// Parse `text` and re-emit it in normalized form
pub fn normalize_yaml(text: &str, options: &FormatOptions) -> Result<String, HoneybeeError> {
    let value: Value = serde_yaml::from_str(text)?;
    Ok(to_yaml_string(&value, options))
}

/// Emit `value` in normalized form
pub fn to_yaml_string(value: &Value, options: &FormatOptions) -> String {
    let mut emitter = Emitter::new(options.line_length);
    match value {
        Value::Mapping(mapping) if !mapping.is_empty() => emitter.write_mapping(mapping, 0),
        Value::Sequence(sequence) if !sequence.is_empty() => emitter.write_sequence(sequence, 0),
        other => {
            emitter.write_value(other, 0, 0);
            // write_value leaves the separator space for a key or dash
            let trimmed = emitter.out.trim_start().to_string();
            emitter.out = trimmed;
        }
    }
    emitter.out
}

struct Emitter {
    out: String,
    line_length: usize,
}

impl Emitter {
    fn new(line_length: usize) -> Self {
        Self {
            out: String::new(),
            line_length,
        }
    }

    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat(' ').take(indent));
    }

    fn write_mapping(&mut self, mapping: &Mapping, indent: usize) {
        for (key, value) in mapping {
            let key = render_key(key);
            self.pad(indent);
            self.out.push_str(&key);
            self.out.push(':');
            self.write_value(value, indent, indent + key.chars().count() + 2);
        }
    }

    fn write_sequence(&mut self, sequence: &[Value], indent: usize) {
        for item in sequence {
            match item {
                Value::Mapping(mapping) if !mapping.is_empty() => {
                    let mut nested = Emitter::new(self.line_length);
                    nested.write_mapping(mapping, indent + INDENT);
                    self.write_compact(&nested.out, indent);
                }
                Value::Sequence(inner) if !inner.is_empty() => {
                    let mut nested = Emitter::new(self.line_length);
                    nested.write_sequence(inner, indent + INDENT);
                    self.write_compact(&nested.out, indent);
                }
                Value::Null => {
                    self.pad(indent);
                    self.out.push_str("- null\n");
                }
                other => {
                    self.pad(indent);
                    self.out.push('-');
                    self.write_value(other, indent, indent + INDENT);
                }
            }
        }
    }

    /// Put the first line of a nested block on the dash line
    fn write_compact(&mut self, nested: &str, indent: usize) {
        self.pad(indent);
        self.out.push_str("- ");
        self.out.push_str(&nested[indent + INDENT..]);
    }

    /// Write `value` after a `key:` or `-` already on the current line.
    ///
    /// `col` is where the value starts when it stays on that line.
    fn write_value(&mut self, value: &Value, indent: usize, col: usize) {
        match value {
            Value::Null => self.out.push('\n'),
            Value::Bool(b) => {
                let _ = writeln!(self.out, " {}", b);
            }
            Value::Number(n) => {
                let _ = writeln!(self.out, " {}", n);
            }
            Value::String(s) => self.write_string(s, indent, col),
            Value::Sequence(sequence) if sequence.is_empty() => self.out.push_str(" []\n"),
            Value::Mapping(mapping) if mapping.is_empty() => self.out.push_str(" {}\n"),
            Value::Sequence(sequence) => {
                self.out.push('\n');
                self.write_sequence(sequence, indent + INDENT);
            }
            Value::Mapping(mapping) => {
                self.out.push('\n');
                self.write_mapping(mapping, indent + INDENT);
            }
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                self.out.push(' ');
                self.out.push_str(&tag);
                self.write_value(&tagged.value, indent, col + tag.chars().count() + 1);
            }
        }
    }

    fn write_string(&mut self, s: &str, indent: usize, col: usize) {
        if let Some(header) = literal_header(s) {
            self.out.push(' ');
            self.out.push_str(header);
            self.out.push('\n');

            let body = s.trim_end_matches('\n');
            for line in body.split('\n') {
                if !line.is_empty() {
                    self.pad(indent + INDENT);
                    self.out.push_str(line);
                }
                self.out.push('\n');
            }
            let trailing = s.len() - body.len();
            for _ in 1..trailing {
                self.out.push('\n');
            }
            return;
        }

        self.out.push(' ');
        let quoted = quote(s);
        let wrapped = wrap_quoted(&quoted, col, indent + INDENT, self.line_length);
        self.out.push_str(&wrapped);
        self.out.push('\n');
    }
}

/// Literal block header for `s`, or `None` when it must stay double-quoted
fn literal_header(s: &str) -> Option<&'static str> {
    if !s.contains('\n') {
        return None;
    }
    if s.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return None;
    }
    // The first line sets the block indentation
    let first = s.split('\n').next().unwrap_or_default();
    if first.is_empty() || first.starts_with(' ') || first.starts_with('\t') {
        return None;
    }

    let trailing = s.len() - s.trim_end_matches('\n').len();
    Some(match trailing {
        0 => "|-",
        1 => "|",
        _ => "|+",
    })
}

fn render_key(key: &Value) -> String {
    match key {
        Value::String(s) if is_plain_key(s) => s.clone(),
        Value::String(s) => quote(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => {
            let rendered = serde_yaml::to_string(other).unwrap_or_default();
            quote(rendered.trim())
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    if key == "<<" {
        return true;
    }
    if RESERVED_WORDS.contains(&key.to_ascii_lowercase().as_str()) {
        return false;
    }
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
}

/// Double-quoted scalar with YAML escapes
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Fold a double-quoted scalar at single spaces so lines stay within `width`.
///
/// A line break inside a double-quoted scalar reads back as one space, so
/// only a space with non-space neighbours may be replaced.
fn wrap_quoted(quoted: &str, col: usize, continuation: usize, width: usize) -> String {
    if col + quoted.chars().count() <= width {
        return quoted.to_string();
    }

    let bytes = quoted.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    for i in 2..bytes.len().saturating_sub(2) {
        let breakable = bytes[i] == b' '
            && bytes[i - 1] != b' '
            && bytes[i - 1] != b'\\'
            && bytes[i + 1] != b' ';
        if breakable {
            segments.push(&quoted[start..i]);
            start = i + 1;
        }
    }
    segments.push(&quoted[start..]);

    let mut out = String::with_capacity(quoted.len() + 16);
    let mut line_col = col;
    for (index, segment) in segments.iter().enumerate() {
        let len = segment.chars().count();
        if index == 0 {
            out.push_str(segment);
            line_col += len;
        } else if line_col + 1 + len > width {
            out.push('\n');
            out.extend(std::iter::repeat(' ').take(continuation));
            out.push_str(segment);
            line_col = continuation + len;
        } else {
            out.push(' ');
            out.push_str(segment);
            line_col += 1 + len;
        }
    }
    out
}

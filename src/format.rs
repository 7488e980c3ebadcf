//! Log-line templates.
//!
//! A template is plain text with `:name` placeholders, optionally followed by
//! a bracketed key for map-valued fields:
//!
//! ```text
//! :remote-address :method :url :status-code :res-headers[content-length]
//! ```
//!
//! [`Format::compile`] parses the template once into a list of segments.
//! [`Format::render`] walks that list against a [`Metadata`] record. There is
//! no per-request parsing and no allocation beyond the output string.
//!
//! # Placeholder rules
//!
//! - A name is two or more characters from `[A-Za-z0-9_-]`. A `:` followed by
//!   anything shorter is literal text (`:a` survives untouched, `12:30`
//!   does not: `:30` is an unknown field and renders `-`).
//! - A present, non-empty value renders verbatim.
//! - A numeric value that is zero renders `0`. Absent values render `-`.
//!   Zero and "missing" stay distinguishable.
//! - `:name[key]` looks `key` up in a header map (case-insensitive).
//!   `:response-hrtime[0]` and `[1]` pick the seconds and nanoseconds; bare
//!   `:response-hrtime` renders both as `secs,nanos`. A key on any other
//!   field, or any other index, renders `-`.

use std::fmt::Write as _;

use crate::error::Error;
use crate::metadata::{Metadata, Value};

/// The template used when none is configured.
pub const DEFAULT_FORMAT: &str =
    ":remote-address :incoming :method :url HTTP/:http-version :status-code :res-headers[content-length] :response-time ms";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { name: String, key: Option<String> },
}

/// A compiled log-line template.
///
/// Build it once, share it across every request; rendering never fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Format {
    segments: Vec<Segment>,
}

impl Format {
    /// Parses `template` into a reusable formatter.
    ///
    /// # Errors
    ///
    /// [`Error::Template`] when a placeholder opens a `[key]` that is never
    /// closed, or when the key is empty.
    ///
    /// ```rust
    /// use reqlog::Format;
    ///
    /// assert!(Format::compile(":method :url").is_ok());
    /// assert!(Format::compile(":req-headers[host").is_err());
    /// ```
    pub fn compile(template: &str) -> Result<Self, Error> {
        let bytes = template.as_bytes();
        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b':' {
                i += 1;
                continue;
            }

            let name_start = i + 1;
            let name_len = bytes[name_start..]
                .iter()
                .take_while(|b| is_name_byte(**b))
                .count();
            if name_len < 2 {
                i += 1;
                continue;
            }
            let name_end = name_start + name_len;

            let (key, next) = if bytes.get(name_end) == Some(&b'[') {
                let key_start = name_end + 1;
                let key_len = template[key_start..].find(']').ok_or(Error::Template {
                    offset: i,
                    reason: "unterminated `[`",
                })?;
                if key_len == 0 {
                    return Err(Error::Template { offset: i, reason: "empty `[]` key" });
                }
                let key = template[key_start..key_start + key_len].to_owned();
                (Some(key), key_start + key_len + 1)
            } else {
                (None, name_end)
            };

            if literal_start < i {
                segments.push(Segment::Literal(template[literal_start..i].to_owned()));
            }
            segments.push(Segment::Field {
                name: template[name_start..name_end].to_owned(),
                key,
            });

            i = next;
            literal_start = next;
        }

        if literal_start < bytes.len() {
            segments.push(Segment::Literal(template[literal_start..].to_owned()));
        }

        Ok(Self { segments })
    }

    /// Renders one log line from `meta`.
    pub fn render(&self, meta: &Metadata<'_>) -> String {
        let mut out = String::with_capacity(128);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { name, key } => {
                    render_field(&mut out, meta.get(name), key.as_deref());
                }
            }
        }
        out
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn render_field(out: &mut String, value: Option<Value<'_>>, key: Option<&str>) {
    match (value, key) {
        (Some(Value::Headers(headers)), Some(key)) => {
            match headers.get(key).and_then(|v| v.to_str().ok()) {
                Some(v) if !v.is_empty() => out.push_str(v),
                _ => out.push('-'),
            }
        }
        (Some(Value::Text(text)), None) if !text.is_empty() => out.push_str(&text),
        (Some(Value::Pair(secs, nanos)), None) => {
            let _ = write!(out, "{secs},{nanos}");
        }
        (Some(Value::Pair(secs, _)), Some("0")) => {
            let _ = write!(out, "{secs}");
        }
        (Some(Value::Pair(_, nanos)), Some("1")) => {
            let _ = write!(out, "{nanos}");
        }
        (Some(Value::Number(n)), None) => {
            if n == 0.0 || n.is_nan() {
                out.push('0');
            } else {
                let _ = write!(out, "{n}");
            }
        }
        _ => out.push('-'),
    }
}

//! Field path patterns and their resolution against documents.
//!
//! Pattern syntax: segments separated by `.`; each segment is a field name
//! optionally followed by bracket suffixes. `[]` or `[*]` visits every
//! element of an array, `[N]` selects one element.
//!
//! ```text
//! order_total
//! customer.address.zip
//! items[].category
//! matrix[][0]
//! ```
//!
//! Resolution is total. Anything that prevents the pattern from reaching a
//! value (a missing key, an index out of range, a segment applied to the
//! wrong kind of node) yields a single `Absent` match rather than an error.
//! A wildcard over an empty array yields no matches at all.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// One step of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Wildcard,
    Index(usize),
}

/// A pattern that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path '{path}': {reason}")]
pub struct PathSyntaxError {
    pub path: String,
    pub reason: String,
}

/// A parsed field path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(path: &str) -> Result<Self, PathSyntaxError> {
        let err = |reason: String| PathSyntaxError {
            path: path.to_string(),
            reason,
        };

        if path.trim().is_empty() {
            return Err(err("path is empty".to_string()));
        }

        let mut segments = Vec::new();
        for (position, part) in path.split('.').enumerate() {
            if part.is_empty() {
                return Err(err(format!("segment {} is empty", position + 1)));
            }

            let (key, mut rest) = match part.find('[') {
                Some(idx) => part.split_at(idx),
                None => (part, ""),
            };
            if key.is_empty() {
                return Err(err(format!("segment '{part}' has no field name before '['")));
            }
            if key.contains(']') {
                return Err(err(format!("unexpected ']' in segment '{part}'")));
            }
            segments.push(Segment::Key(key.to_string()));

            while !rest.is_empty() {
                let Some(body) = rest.strip_prefix('[') else {
                    return Err(err(format!("unexpected text '{rest}' after ']' in '{part}'")));
                };
                let Some(close) = body.find(']') else {
                    return Err(err(format!("unterminated '[' in segment '{part}'")));
                };
                let inner = &body[..close];
                let segment = match inner {
                    "" | "*" => Segment::Wildcard,
                    digits => digits.parse::<usize>().map(Segment::Index).map_err(|_| {
                        err(format!("invalid array index '{digits}' in segment '{part}'"))
                    })?,
                };
                segments.push(segment);
                rest = &body[close + 1..];
            }
        }

        Ok(Self {
            source: path.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern can produce more than one match.
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }
}

impl FromStr for PathPattern {
    type Err = PathSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// One concrete step of a resolved location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocationStep {
    Key(String),
    Index(usize),
}

/// The concrete location of a match, e.g. `items[1].category`.
///
/// For absent matches this is the deepest point resolution reached,
/// including the step that could not be taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location(pub Vec<LocationStep>);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            match step {
                LocationStep::Key(key) if i == 0 => f.write_str(key)?,
                LocationStep::Key(key) => write!(f, ".{key}")?,
                LocationStep::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// What a pattern found at one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Matched<'d> {
    Absent,
    Null,
    Value(&'d Value),
}

impl<'d> Matched<'d> {
    pub fn value(&self) -> Option<&'d Value> {
        match self {
            Matched::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// One resolution of a pattern against a document.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatch<'d> {
    pub location: Location,
    pub value: Matched<'d>,
}

/// Resolve `pattern` against `document`, returning every match in document
/// order.
pub fn resolve<'d>(document: &'d Value, pattern: &PathPattern) -> Vec<PathMatch<'d>> {
    let mut matches = Vec::new();
    let mut location = Vec::new();
    resolve_into(document, pattern.segments(), &mut location, &mut matches);
    matches
}

fn resolve_into<'d>(
    node: &'d Value,
    rest: &[Segment],
    location: &mut Vec<LocationStep>,
    out: &mut Vec<PathMatch<'d>>,
) {
    let Some((segment, tail)) = rest.split_first() else {
        let value = if node.is_null() {
            Matched::Null
        } else {
            Matched::Value(node)
        };
        out.push(PathMatch {
            location: Location(location.clone()),
            value,
        });
        return;
    };

    match segment {
        Segment::Key(key) => {
            location.push(LocationStep::Key(key.clone()));
            match node.as_object().and_then(|object| object.get(key)) {
                Some(child) => resolve_into(child, tail, location, out),
                None => out.push(absent(location)),
            }
            location.pop();
        }
        Segment::Index(idx) => {
            location.push(LocationStep::Index(*idx));
            match node.as_array().and_then(|items| items.get(*idx)) {
                Some(child) => resolve_into(child, tail, location, out),
                None => out.push(absent(location)),
            }
            location.pop();
        }
        Segment::Wildcard => match node.as_array() {
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    location.push(LocationStep::Index(idx));
                    resolve_into(item, tail, location, out);
                    location.pop();
                }
            }
            None => out.push(absent(location)),
        },
    }
}

fn absent<'d>(location: &[LocationStep]) -> PathMatch<'d> {
    PathMatch {
        location: Location(location.to_vec()),
        value: Matched::Absent,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Path template compiler.
//!
//! Templates use the router grammar: `:name` captures one path segment and
//! `*name` captures the remainder of the path. Either must fill its whole
//! segment, exactly as the route table requires. A compiled template knows its
//! ordered captures, can produce an anchored regex with one named group per
//! capture, and can substitute captured values back into itself.
//!
//! ```text
//! "/orders/:id/items/:item"
//!     → captures [(8, id), (19, item)]
//!     → ^/orders/(?P<id>[^/]+?)/items/(?P<item>[^/]+?)$
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static PARAM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("parameter name pattern is valid"));

/// Errors raised while compiling or expanding a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("parameter '{name}' appears more than once in '{template}'")]
    DuplicateParameter { template: String, name: String },

    #[error("no value for parameter '{name}' in '{template}'")]
    UnresolvedParameter { template: String, name: String },

    #[error("parameter in segment '{segment}' of '{template}' must span the whole segment")]
    PartialSegment { template: String, segment: String },

    #[error("invalid parameter name '{name}' in '{template}'")]
    InvalidName { template: String, name: String },

    #[error("remainder capture '{name}' in '{template}' must be the last segment")]
    RemainderNotLast { template: String, name: String },

    #[error("template '{template}' does not compile to a valid expression: {reason}")]
    InvalidExpression { template: String, reason: String },
}

impl TemplateError {
    /// The template the error was raised for.
    pub fn template(&self) -> &str {
        match self {
            Self::DuplicateParameter { template, .. }
            | Self::UnresolvedParameter { template, .. }
            | Self::PartialSegment { template, .. }
            | Self::InvalidName { template, .. }
            | Self::RemainderNotLast { template, .. }
            | Self::InvalidExpression { template, .. } => template,
        }
    }
}

/// How much of the path a capture consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// `:name`, a single non-empty segment.
    Segment,
    /// `*name`, everything up to the end of the path.
    Remainder,
}

/// A named placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Byte offset of the sigil within the template.
    pub position: usize,
    pub name: String,
    pub kind: CaptureKind,
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    captures: Vec<Capture>,
}

impl PathTemplate {
    /// Parse a template.
    ///
    /// A placeholder must fill its whole segment, `*name` only in the last
    /// one, and names must be unique within the template.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut captures: Vec<Capture> = Vec::new();
        let segment_count = source.split('/').count();

        let mut offset = 0;
        for (i, segment) in source.split('/').enumerate() {
            let position = offset;
            offset += segment.len() + 1;

            let (kind, name) = if let Some(name) = segment.strip_prefix(':') {
                (CaptureKind::Segment, name)
            } else if let Some(name) = segment.strip_prefix('*') {
                (CaptureKind::Remainder, name)
            } else if segment.contains([':', '*']) {
                return Err(TemplateError::PartialSegment {
                    template: source.to_string(),
                    segment: segment.to_string(),
                });
            } else {
                continue;
            };

            if name.is_empty() {
                return Err(TemplateError::InvalidName {
                    template: source.to_string(),
                    name: name.to_string(),
                });
            }
            if !PARAM_NAME.is_match(name) {
                return Err(TemplateError::PartialSegment {
                    template: source.to_string(),
                    segment: segment.to_string(),
                });
            }
            if kind == CaptureKind::Remainder && i + 1 != segment_count {
                return Err(TemplateError::RemainderNotLast {
                    template: source.to_string(),
                    name: name.to_string(),
                });
            }
            if captures.iter().any(|c| c.name == name) {
                return Err(TemplateError::DuplicateParameter {
                    template: source.to_string(),
                    name: name.to_string(),
                });
            }
            captures.push(Capture {
                position,
                name: name.to_string(),
                kind,
            });
        }

        Ok(Self {
            source: source.to_string(),
            captures,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    /// Parameter names in order of appearance.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|c| c.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.captures.iter().any(|c| c.name == name)
    }

    /// Names used by `self` that `other` does not provide.
    pub fn missing_from<'a>(&'a self, other: &'a PathTemplate) -> impl Iterator<Item = &'a str> {
        self.names().filter(move |name| !other.contains(name))
    }

    /// Number of literal segments, and whether the template ends without a
    /// remainder capture. Orders like the route table: higher is more specific.
    pub fn specificity(&self) -> (usize, bool) {
        let literal = self
            .source
            .split('/')
            .filter(|s| !s.is_empty() && !s.starts_with([':', '*']))
            .count();
        let remainder = self.captures.iter().any(|c| c.kind == CaptureKind::Remainder);
        (literal, !remainder)
    }

    /// Anchored regex matching concrete paths of this shape.
    ///
    /// Literal text is escaped; each capture becomes a named group.
    pub fn to_regex(&self) -> Result<Regex, TemplateError> {
        let mut pattern = String::with_capacity(self.source.len() + 16);
        pattern.push('^');

        let mut cursor = 0;
        for capture in &self.captures {
            pattern.push_str(&regex::escape(&self.source[cursor..capture.position]));
            match capture.kind {
                CaptureKind::Segment => {
                    pattern.push_str(&format!("(?P<{}>[^/]+?)", capture.name));
                }
                CaptureKind::Remainder => {
                    pattern.push_str(&format!("(?P<{}>.*)", capture.name));
                }
            }
            cursor = capture.position + 1 + capture.name.len();
        }
        pattern.push_str(&regex::escape(&self.source[cursor..]));
        pattern.push('$');

        Regex::new(&pattern).map_err(|e| TemplateError::InvalidExpression {
            template: self.source.clone(),
            reason: e.to_string(),
        })
    }

    /// Replace every capture with the value `lookup` returns for its name.
    pub fn expand<'v, F>(&self, lookup: F) -> Result<String, TemplateError>
    where
        F: Fn(&str) -> Option<&'v str>,
    {
        let mut out = String::with_capacity(self.source.len() + 32);
        let mut cursor = 0;
        for capture in &self.captures {
            out.push_str(&self.source[cursor..capture.position]);
            let value = lookup(&capture.name).ok_or_else(|| TemplateError::UnresolvedParameter {
                template: self.source.clone(),
                name: capture.name.clone(),
            })?;
            out.push_str(value);
            cursor = capture.position + 1 + capture.name.len();
        }
        out.push_str(&self.source[cursor..]);
        Ok(out)
    }
}

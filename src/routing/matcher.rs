//! Route matching logic.
//!
//! # Responsibilities
//! - Parse route templates into typed segments
//! - Match concrete request paths against a compiled pattern
//! - Collect captured parameters
//!
//! # Design Decisions
//! - Matching is segment-wise and case-sensitive
//! - `:name` must occupy a whole segment and never matches an empty one
//! - `*name` must be the last segment and matches the rest of the path,
//!   including an empty remainder after the final slash
//! - No regex in the request path of the router
//! - Overlapping patterns are totally ordered, so the winner never depends
//!   on registration order

use std::cmp::Ordering;

use smallvec::SmallVec;
use thiserror::Error;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Errors raised while parsing a route template for the router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("route '{0}' must start with '/'")]
    MissingLeadingSlash(String),

    #[error("route '{route}' has an unnamed parameter in segment '{segment}'")]
    UnnamedParameter { route: String, segment: String },

    #[error("route '{route}' has a parameter that does not span the whole segment '{segment}'")]
    PartialSegment { route: String, segment: String },

    #[error("route '{0}' has a catch-all parameter that is not the last segment")]
    CatchAllNotLast(String),
}

/// One `/`-separated piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Param(String),
    CatchAll(String),
}

/// A route template compiled for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a router template such as `/orders/:id` or `/static/*path`.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let rest = template
            .strip_prefix('/')
            .ok_or_else(|| PatternError::MissingLeadingSlash(template.to_string()))?;

        let raw: Vec<&str> = rest.split('/').collect();
        let mut segments = Vec::with_capacity(raw.len());

        for (i, segment) in raw.iter().enumerate() {
            let parsed = if let Some(name) = segment.strip_prefix(':') {
                Segment::Param(Self::param_name(template, segment, name)?)
            } else if let Some(name) = segment.strip_prefix('*') {
                if i != raw.len() - 1 {
                    return Err(PatternError::CatchAllNotLast(template.to_string()));
                }
                Segment::CatchAll(Self::param_name(template, segment, name)?)
            } else if segment.contains(':') || segment.contains('*') {
                return Err(PatternError::PartialSegment {
                    route: template.to_string(),
                    segment: segment.to_string(),
                });
            } else {
                Segment::Static(segment.to_string())
            };
            segments.push(parsed);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    fn param_name(template: &str, segment: &str, name: &str) -> Result<String, PatternError> {
        if name.is_empty() {
            return Err(PatternError::UnnamedParameter {
                route: template.to_string(),
                segment: segment.to_string(),
            });
        }
        if name.contains(':') || name.contains('*') {
            return Err(PatternError::PartialSegment {
                route: template.to_string(),
                segment: segment.to_string(),
            });
        }
        Ok(name.to_string())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has no parameters at all.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Static(_)))
    }

    /// Shape of the pattern with parameter names erased.
    ///
    /// Two patterns with the same shape match exactly the same paths.
    pub fn shape(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Static(s) => out.push_str(s),
                Segment::Param(_) => out.push(':'),
                Segment::CatchAll(_) => out.push('*'),
            }
        }
        out
    }

    /// Specificity used to break ties between overlapping patterns.
    /// Higher wins: more static segments first, then no catch-all.
    pub fn rank(&self) -> (usize, bool) {
        let statics = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count();
        let has_catch_all = matches!(self.segments.last(), Some(Segment::CatchAll(_)));
        (statics, !has_catch_all)
    }

    /// Total order over overlapping patterns. Compares [`rank`](Self::rank)
    /// first, then segment by segment from the left, where a static segment
    /// beats a parameter and a parameter beats a catch-all.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        fn weight(segment: &Segment) -> u8 {
            match segment {
                Segment::Static(_) => 2,
                Segment::Param(_) => 1,
                Segment::CatchAll(_) => 0,
            }
        }

        self.rank().cmp(&other.rank()).then_with(|| {
            self.segments
                .iter()
                .map(weight)
                .cmp(other.segments.iter().map(weight))
        })
    }

    /// Match a request path, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        let mut params = Params::with_capacity(self.segments.len());

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(expected) => {
                    if parts.get(i) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => match parts.get(i) {
                    Some(value) if !value.is_empty() => params.push(name.as_str(), *value),
                    _ => return None,
                },
                Segment::CatchAll(name) => {
                    if parts.len() <= i {
                        return None;
                    }
                    params.push(name.as_str(), parts[i..].join("/"));
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

/// Extracted path parameters from a route match.
///
/// Uses small-vector optimization to avoid heap allocation for common
/// cases with few parameters. Parameters are stored as (name, value) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SmallVec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

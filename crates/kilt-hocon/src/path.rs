//! Configuration paths
//!
//! Provides [`ConfigPath`] for addressing values inside a configuration tree.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path within a configuration tree
///
/// Segments are separated by `.` in the textual form. A segment that
/// contains a dot (or any character outside `[A-Za-z0-9_-]`) is written
/// between double quotes, e.g. `build.environment_variables."MY.VAR"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConfigPath(Vec<String>);

impl ConfigPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Concatenate two paths
    #[inline]
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut new = self.clone();
        new.0.extend(other.0.iter().cloned());
        new
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Parse a path expression, accepting quoted segments
    ///
    /// # Errors
    /// Returns error on empty segments or unterminated quotes
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut has_content = false;
        let mut chars = expr.chars();

        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    let mut closed = false;
                    while let Some(q) = chars.next() {
                        match q {
                            '"' => {
                                closed = true;
                                break;
                            }
                            '\\' => {
                                if let Some(escaped) = chars.next() {
                                    current.push(escaped);
                                }
                            }
                            other => current.push(other),
                        }
                    }
                    if !closed {
                        return Err(PathError::UnterminatedQuote(expr.to_string()));
                    }
                    has_content = true;
                }
                '.' => {
                    if !has_content {
                        return Err(PathError::EmptySegment(expr.to_string()));
                    }
                    segments.push(std::mem::take(&mut current));
                    has_content = false;
                }
                c if c.is_whitespace() => {
                    return Err(PathError::InvalidSegment(expr.to_string()));
                }
                other => {
                    current.push(other);
                    has_content = true;
                }
            }
        }

        if !has_content {
            return Err(PathError::EmptySegment(expr.to_string()));
        }
        segments.push(current);
        Ok(Self(segments))
    }
}

fn needs_quotes(segment: &str) -> bool {
    segment.is_empty()
        || segment
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
}

impl Display for ConfigPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if needs_quotes(segment) {
                write!(f, "\"{}\"", segment.replace('\\', "\\\\").replace('"', "\\\""))?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<String>> for ConfigPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for ConfigPath {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

/// Errors related to configuration paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),

    /// Whitespace or other invalid characters outside quotes
    #[error("invalid path expression: '{0}'")]
    InvalidSegment(String),

    /// Quote opened but never closed
    #[error("unterminated quote in path '{0}'")]
    UnterminatedQuote(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parse_plain() {
        let path: ConfigPath = "build.entry_point".parse().unwrap();
        assert_eq!(path.segments(), &["build", "entry_point"]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_parse_quoted_segment() {
        let path = ConfigPath::parse(r#"build.environment_variables."MY.VAR""#).unwrap();
        assert_eq!(
            path.segments(),
            &["build", "environment_variables", "MY.VAR"]
        );
    }

    #[test]
    fn path_parse_empty_is_root() {
        assert!(ConfigPath::parse("").unwrap().is_empty());
    }

    #[test]
    fn path_parse_rejects_empty_segment() {
        assert!(matches!(
            ConfigPath::parse("a..b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            ConfigPath::parse("a."),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn path_parse_rejects_unterminated_quote() {
        assert!(matches!(
            ConfigPath::parse(r#"a."b"#),
            Err(PathError::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn path_display_quotes_when_needed() {
        let path = ConfigPath::new(vec!["original".into(), "A.B".into()]);
        assert_eq!(path.to_string(), r#"original."A.B""#);
        assert_eq!(ConfigPath::parse(&path.to_string()).unwrap(), path);
    }

    #[test]
    fn path_join_and_prefix() {
        let base = ConfigPath::parse("config").unwrap();
        let joined = base.join(&ConfigPath::parse("sidecar.cpu").unwrap());
        assert_eq!(joined.to_string(), "config.sidecar.cpu");
        assert!(base.is_prefix_of(&joined));
        assert!(!joined.is_prefix_of(&base));
    }

    #[test]
    fn path_parent_and_child() {
        let path = ConfigPath::root().child("build").child("mount");
        assert_eq!(path.last(), Some("mount"));
        assert_eq!(path.parent().unwrap().segments(), &["build"]);
        assert!(ConfigPath::root().parent().is_none());
    }
}

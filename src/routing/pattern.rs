/*
 * Responsibility
 * - route pattern の分解 (literal / capture / catch-all)
 * - 1 つの pattern と request path segments の照合
 * - pattern の正規化キー (RouteTable の重複判定に使う)
 */
use std::fmt;

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// `:name`, matches exactly one non-empty path segment.
    Capture(String),
    /// Trailing `*` or `*name`, matches one or more remaining segments.
    CatchAll(Option<String>),
}

/// Captured values of a single successful pattern match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    pub named: Vec<(String, String)>,
    pub remainder: Vec<String>,
    pub catch_all: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    key: String,
    segments: Vec<Segment>,
}

/// Split a request path (or pattern) into segments.
///
/// Leading and trailing slashes are dropped; interior empty segments are kept
/// so that `a//b` stays three segments.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

impl RoutePattern {
    /// Parse a pattern. Nothing is rejected: a `*` that is not the last
    /// segment and empty segments are kept as literals.
    pub fn parse(pattern: &str) -> Self {
        let raw = split_path(pattern);
        let last = raw.len().saturating_sub(1);

        let segments = raw
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if let Some(name) = s.strip_prefix(':') {
                    Segment::Capture(name.to_string())
                } else if i == last && s.starts_with('*') {
                    let name = &s[1..];
                    Segment::CatchAll((!name.is_empty()).then(|| name.to_string()))
                } else {
                    Segment::Literal((*s).to_string())
                }
            })
            .collect();

        Self {
            key: format!("/{}", raw.join("/")),
            segments,
        }
    }

    /// Normalized pattern text; two patterns with the same key replace each other.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has no capture or catch-all segment.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    fn ends_with_catch_all(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::CatchAll(_)))
    }

    /// Match against already split path segments.
    pub fn matches(&self, path: &[&str]) -> Option<Captures> {
        if self.ends_with_catch_all() {
            // the catch-all needs at least one segment of its own
            if path.len() < self.segments.len() {
                return None;
            }
        } else if path.len() != self.segments.len() {
            return None;
        }

        let mut captures = Captures::default();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if path[i] != lit.as_str() {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    if path[i].is_empty() {
                        return None;
                    }
                    captures.named.push((name.clone(), path[i].to_string()));
                }
                Segment::CatchAll(name) => {
                    let rest = &path[i..];
                    if rest.iter().any(|s| s.is_empty()) {
                        return None;
                    }
                    captures.remainder = rest.iter().map(|s| s.to_string()).collect();
                    captures.catch_all = name.clone();
                }
            }
        }

        Some(captures)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_drops_outer_slashes_only() {
        assert_eq!(split_path("/"), Vec::<&str>::new());
        assert_eq!(split_path(""), Vec::<&str>::new());
        assert_eq!(split_path("//user/42/"), vec!["user", "42"]);
        assert_eq!(split_path("a//b"), vec!["a", "", "b"]);
    }

    #[test]
    fn parse_recognizes_segment_kinds() {
        let p = RoutePattern::parse("/files/:kind/*path");
        assert_eq!(
            p.segments(),
            &[
                Segment::Literal("files".into()),
                Segment::Capture("kind".into()),
                Segment::CatchAll(Some("path".into())),
            ]
        );
        assert_eq!(p.key(), "/files/:kind/*path");
        assert!(!p.is_literal());
    }

    #[test]
    fn star_in_the_middle_is_a_literal() {
        let p = RoutePattern::parse("/a/*/b");
        assert!(p.is_literal());
        assert!(p.matches(&["a", "*", "b"]).is_some());
        assert!(p.matches(&["a", "x", "b"]).is_none());
    }

    #[test]
    fn empty_interior_segment_is_kept_literally() {
        let p = RoutePattern::parse("/a//b");
        assert_eq!(p.key(), "/a//b");
        assert!(p.matches(&split_path("/a//b")).is_some());
        assert!(p.matches(&split_path("/a/b")).is_none());
    }

    #[test]
    fn capture_requires_non_empty_segment() {
        let p = RoutePattern::parse("/user/:id/edit");
        assert!(p.matches(&split_path("/user//edit")).is_none());

        let caps = p.matches(&split_path("/user/42/edit")).unwrap();
        assert_eq!(caps.named, vec![("id".to_string(), "42".to_string())]);
        assert!(caps.remainder.is_empty());
    }

    #[test]
    fn catch_all_takes_the_rest() {
        let p = RoutePattern::parse("/files/*");
        let caps = p.matches(&split_path("/files/a/b/c")).unwrap();
        assert_eq!(caps.remainder, vec!["a", "b", "c"]);
        assert_eq!(caps.catch_all, None);
    }

    #[test]
    fn catch_all_needs_at_least_one_segment() {
        let p = RoutePattern::parse("/files/*");
        assert!(p.matches(&split_path("/files")).is_none());
        assert!(p.matches(&split_path("/files/x")).is_some());
    }

    #[test]
    fn segment_count_must_match_without_catch_all() {
        let p = RoutePattern::parse("/user/:id");
        assert!(p.matches(&split_path("/user")).is_none());
        assert!(p.matches(&split_path("/user/1/2")).is_none());
    }
}

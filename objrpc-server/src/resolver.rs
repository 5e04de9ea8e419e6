//! Path-to-object resolution
//!
//! An HTTP path names an object by walking children from the root, one
//! segment at a time: `/crawler/engine` is `root.child("crawler")` followed
//! by `.child("engine")`. Empty segments (`//`, a trailing `/`) stay put.
//!
//! Nothing is cached. Every request walks the live graph again, so children
//! added or removed at runtime are seen immediately, and the resolved target
//! is the very `Arc` the graph holds.

use crate::object::Exposed;
use std::fmt;
use std::sync::Arc;

/// An HTTP request path split into decoded segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Split a request path on `/` and percent-decode each segment
    ///
    /// Empty segments are kept; resolution treats them as no-ops. A segment
    /// that does not decode to UTF-8 is kept verbatim.
    ///
    /// ```rust
    /// use objrpc_server::Path;
    ///
    /// let path = Path::parse("/crawler//spider%20one");
    /// assert_eq!(path.segments(), &["", "crawler", "", "spider one"]);
    /// assert!(!path.is_root());
    /// assert!(Path::parse("/").is_root());
    /// ```
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split('/')
            .map(|raw| match urlencoding::decode(raw) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => raw.to_string(),
            })
            .collect();
        Self { segments }
    }

    /// All segments in order, including empty ones
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when every segment is empty, i.e. the path names the root
    pub fn is_root(&self) -> bool {
        self.segments.iter().all(|s| s.is_empty())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// A path segment that named no child
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no child {segment:?} at depth {depth}")]
pub struct ResolveError {
    /// The segment that failed
    pub segment: String,
    /// Zero-based position of that segment in the path
    pub depth: usize,
}

/// Walk `segments` from `root`, one child lookup per non-empty segment
///
/// ```rust
/// use objrpc_server::{resolve, Exposed, ObjectNode};
/// use std::sync::Arc;
///
/// let leaf: Arc<dyn Exposed> = ObjectNode::builder().build();
/// let root: Arc<dyn Exposed> = ObjectNode::builder().child("leaf", leaf.clone()).build();
///
/// let found = resolve(&root, &["", "leaf", ""]).unwrap();
/// assert!(Arc::ptr_eq(&found, &leaf));
///
/// let err = resolve(&root, &["leaf", "deeper"]).err().unwrap();
/// assert_eq!(err.depth, 1);
/// ```
pub fn resolve<S: AsRef<str>>(
    root: &Arc<dyn Exposed>,
    segments: &[S],
) -> Result<Arc<dyn Exposed>, ResolveError> {
    let mut current = Arc::clone(root);
    for (depth, segment) in segments.iter().enumerate() {
        let segment = segment.as_ref();
        if segment.is_empty() {
            continue;
        }
        current = current.child(segment).ok_or_else(|| ResolveError {
            segment: segment.to_string(),
            depth,
        })?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectNode;

    fn tree() -> (Arc<dyn Exposed>, Arc<dyn Exposed>) {
        let engine: Arc<dyn Exposed> = ObjectNode::builder().build();
        let crawler: Arc<dyn Exposed> = ObjectNode::builder()
            .child("engine", Arc::clone(&engine))
            .build();
        let root: Arc<dyn Exposed> = ObjectNode::builder().child("crawler", crawler).build();
        (root, engine)
    }

    #[test]
    fn test_resolve_walks_children() {
        let (root, engine) = tree();
        let found = resolve(&root, &["crawler", "engine"]).unwrap();
        assert!(Arc::ptr_eq(&found, &engine));
    }

    #[test]
    fn test_empty_segments_are_no_ops() {
        let (root, engine) = tree();

        for segments in [
            vec!["crawler", "engine"],
            vec!["", "crawler", "engine"],
            vec!["crawler", "", "", "engine", ""],
        ] {
            let found = resolve(&root, segments.as_slice()).unwrap();
            assert!(Arc::ptr_eq(&found, &engine));
        }

        let same = resolve(&root, &["", ""]).unwrap();
        assert!(Arc::ptr_eq(&same, &root));
        let none: [&str; 0] = [];
        assert!(Arc::ptr_eq(&resolve(&root, &none).unwrap(), &root));
    }

    #[test]
    fn test_missing_child() {
        let (root, _) = tree();
        let err = resolve(&root, &["", "crawler", "spiders"]).err().unwrap();

        assert_eq!(err.segment, "spiders");
        assert_eq!(err.depth, 2);
        assert!(err.to_string().contains("spiders"));
    }

    #[test]
    fn test_resolve_sees_runtime_changes() {
        let crawler = ObjectNode::builder().build();
        let root: Arc<dyn Exposed> = ObjectNode::builder()
            .child("crawler", crawler.clone())
            .build();

        assert!(resolve(&root, &["crawler", "late"]).is_err());
        crawler.add_child("late", ObjectNode::builder().build());
        assert!(resolve(&root, &["crawler", "late"]).is_ok());
    }

    #[test]
    fn test_path_parse() {
        assert_eq!(Path::parse("").segments(), &[""]);
        assert_eq!(Path::parse("/a/b").segments(), &["", "a", "b"]);
        assert_eq!(Path::parse("/a%2Fb").segments(), &["", "a/b"]);
        assert_eq!(Path::parse("/bad%FF").segments(), &["", "bad%FF"]);
        assert!(Path::parse("//").is_root());
        assert_eq!(Path::parse("/a/b").to_string(), "/a/b");
    }
}

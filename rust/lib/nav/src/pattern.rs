use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::NavError;

/// Parameters captured from the URL, e.g. `jobId` from `jobs/:jobId`.
///
/// This is the only thing mounted views receive from the router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A route-pattern trie.
///
/// Segments:
/// - `jobs` matches the literal segment
/// - `:jobId` matches exactly one non-empty segment and captures it
///
/// On lookup, a literal child is tried before a parameter, backtracking
/// when a branch dead-ends. So
/// `jobs/new` wins over `jobs/:jobId` for the path `jobs/new`.
///
/// # Examples
///
/// ```ignore
/// let mut trie = PatternTrie::new();
/// trie.insert("engineer/jobs/:jobId", 1)?;
/// trie.insert("engineer/jobs/new", 2)?;
///
/// let m = trie.find("/engineer/jobs/42").unwrap();
/// assert_eq!(*m.value, 1);
/// assert_eq!(m.params.get("jobId"), Some("42"));
/// ```
pub struct PatternTrie<T> {
    root: TrieNode<T>,
    len: usize,
}

struct TrieNode<T> {
    /// Literal children, keyed by segment.
    children: HashMap<String, TrieNode<T>>,
    /// `:name` child: one segment.
    param: Option<(String, Box<TrieNode<T>>)>,
    /// Value when a pattern ends exactly here.
    value: Option<T>,
}

impl<T> Default for TrieNode<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            param: None,
            value: None,
        }
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct Matched<'a, T> {
    pub value: &'a T,
    pub params: RouteParams,
}

impl<T> PatternTrie<T> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            len: 0,
        }
    }

    /// Number of patterns stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value at `pattern`. Leading and trailing slashes are ignored.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<(), NavError> {
        let segments = split_segments(pattern);
        if segments.iter().any(|s| s.is_empty()) {
            return Err(NavError::invalid_pattern(pattern, "empty segment"));
        }

        let mut node = &mut self.root;
        for segment in &segments {
            node = if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(NavError::invalid_pattern(pattern, "parameter without a name"));
                }
                let (existing, child) = node
                    .param
                    .get_or_insert_with(|| (name.to_string(), Box::new(TrieNode::default())));
                if existing.as_str() != name {
                    return Err(NavError::invalid_pattern(
                        pattern,
                        format!("parameter ':{name}' conflicts with ':{existing}'"),
                    ));
                }
                &mut **child
            } else {
                node.children.entry(segment.to_string()).or_default()
            };
        }

        if node.value.is_some() {
            return Err(NavError::DuplicatePattern(pattern.to_string()));
        }
        node.value = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Find the best match for a concrete path.
    pub fn find(&self, path: &str) -> Option<Matched<'_, T>> {
        let segments = split_segments(path);
        let mut params = Vec::new();
        let value = self.root.find(&segments, &mut params)?;
        Some(Matched {
            value,
            params: params.into_iter().collect(),
        })
    }
}

impl<T> Default for PatternTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TrieNode<T> {
    fn find<'a>(&'a self, segments: &[&str], params: &mut Vec<(String, String)>) -> Option<&'a T> {
        let Some((first, rest)) = segments.split_first() else {
            return self.value.as_ref();
        };

        if let Some(child) = self.children.get(*first) {
            if let Some(value) = child.find(rest, params) {
                return Some(value);
            }
        }

        if let Some((name, child)) = &self.param {
            if !first.is_empty() {
                let mark = params.len();
                params.push((name.clone(), first.to_string()));
                if let Some(value) = child.find(rest, params) {
                    return Some(value);
                }
                params.truncate(mark);
            }
        }
        None
    }
}

/// `"/a/b/"` -> `["a", "b"]`, `"/"` -> `[]`.
fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Literal match
    // ========================================================================

    #[test]
    fn literal_match() {
        let mut trie = PatternTrie::new();
        trie.insert("engineer/dashboard", 1).unwrap();

        assert_eq!(*trie.find("/engineer/dashboard").unwrap().value, 1);
        assert_eq!(*trie.find("engineer/dashboard/").unwrap().value, 1);
        assert!(trie.find("/engineer").is_none());
        assert!(trie.find("/engineer/dashboard/x").is_none());
    }

    #[test]
    fn root_pattern() {
        let mut trie = PatternTrie::new();
        trie.insert("/", 0).unwrap();
        assert_eq!(*trie.find("/").unwrap().value, 0);
        assert_eq!(*trie.find("").unwrap().value, 0);
        assert!(trie.find("/x").is_none());
    }

    #[test]
    fn similar_prefixes_do_not_interfere() {
        let mut trie = PatternTrie::new();
        trie.insert("client/jobs", 1).unwrap();
        trie.insert("clients/jobs", 2).unwrap();

        assert_eq!(*trie.find("/client/jobs").unwrap().value, 1);
        assert_eq!(*trie.find("/clients/jobs").unwrap().value, 2);
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    #[test]
    fn param_captures_segment() {
        let mut trie = PatternTrie::new();
        trie.insert("jobs/:jobId", 1).unwrap();
        trie.insert("jobs/:jobId/tasks/:taskId", 2).unwrap();

        let m = trie.find("/jobs/42").unwrap();
        assert_eq!(*m.value, 1);
        assert_eq!(m.params.get("jobId"), Some("42"));

        let m = trie.find("/jobs/42/tasks/7").unwrap();
        assert_eq!(*m.value, 2);
        assert_eq!(m.params.get("jobId"), Some("42"));
        assert_eq!(m.params.get("taskId"), Some("7"));
    }

    #[test]
    fn param_does_not_match_zero_segments() {
        let mut trie = PatternTrie::new();
        trie.insert("jobs/:jobId", 1).unwrap();
        assert!(trie.find("/jobs").is_none());
        assert!(trie.find("/jobs//").is_none());
    }

    #[test]
    fn literal_beats_param() {
        let mut trie = PatternTrie::new();
        trie.insert("jobs/:jobId", 1).unwrap();
        trie.insert("jobs/new", 2).unwrap();

        assert_eq!(*trie.find("/jobs/new").unwrap().value, 2);
        assert_eq!(*trie.find("/jobs/old").unwrap().value, 1);
    }

    #[test]
    fn backtracks_from_dead_literal_branch() {
        let mut trie = PatternTrie::new();
        trie.insert("jobs/new", 1).unwrap();
        trie.insert("jobs/:jobId/tasks", 2).unwrap();

        let m = trie.find("/jobs/new/tasks").unwrap();
        assert_eq!(*m.value, 2);
        assert_eq!(m.params.get("jobId"), Some("new"));
    }

    #[test]
    fn conflicting_param_names_are_rejected() {
        let mut trie = PatternTrie::new();
        trie.insert("jobs/:jobId", 1).unwrap();
        let err = trie.insert("jobs/:id/tasks", 2).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PATTERN");
    }

    // ========================================================================
    // Insert errors
    // ========================================================================

    #[test]
    fn duplicates_are_rejected() {
        let mut trie = PatternTrie::new();
        trie.insert("a/b", 1).unwrap();
        assert_eq!(trie.insert("/a/b/", 2).unwrap_err().error_code(), "DUPLICATE_PATTERN");
        trie.insert("a/:id", 3).unwrap();
        assert_eq!(trie.insert("a/:id/", 4).unwrap_err().error_code(), "DUPLICATE_PATTERN");
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn empty_segments_are_rejected() {
        let mut trie = PatternTrie::new();
        assert!(trie.insert("a//b", 1).is_err());
        assert!(trie.insert("a/:", 1).is_err());
        assert!(trie.is_empty());
    }

    // ========================================================================
    // RouteParams
    // ========================================================================

    #[test]
    fn params_collect_and_serialize() {
        let params: RouteParams = [("jobId", "42"), ("taskId", "7")].into_iter().collect();
        assert_eq!(params.len(), 2);
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"jobId":"42","taskId":"7"}"#
        );
        assert!(RouteParams::new().is_empty());
    }

    #[test]
    fn split_segments_cases() {
        assert_eq!(split_segments("/a/b/"), vec!["a", "b"]);
        assert_eq!(split_segments("a"), vec!["a"]);
        assert!(split_segments("/").is_empty());
        assert!(split_segments("").is_empty());
    }
}

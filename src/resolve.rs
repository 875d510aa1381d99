//! URL resolution.
//!
//! A navigation never works with raw strings: every target is resolved into a
//! [`Location`] (origin, path, ordered query, optional hash) relative to the
//! location the page is currently showing.
//!
//! # Resolution rules
//!
//! | Candidate            | Result                                                  |
//! |----------------------|---------------------------------------------------------|
//! | `None` / `""`        | current path + query + hash                             |
//! | `#frag`              | current path + query, hash replaced                     |
//! | `?x=1` / `?x=1#frag` | current path, query (and hash) replaced                 |
//! | `scheme://...`       | full replace, `external` iff origin differs             |
//! | `/abs/path`          | same origin, absolute path                              |
//! | `rel/path`           | resolved against the directory of the current path      |
//!
//! A trailing slash is stripped from every path except the root `/`.
//!
//! Paths and hashes are kept percent-decoded. Only the string forms
//! ([`Location::full`], [`Location::relative`], [`build_url`]) encode them, so
//! `/caf%C3%A9` and `/café` resolve to the same location.
//!
//! # Example
//!
//! ```
//! use spa_navigator::resolve::{parse_url, Location};
//!
//! let current = Location::parse_absolute("https://app.test/docs/intro?lang=en").unwrap();
//!
//! let next = parse_url(Some("guide/"), &current).unwrap();
//! assert_eq!(next.path(), "/docs/guide");
//! assert!(!next.external());
//!
//! let away = parse_url(Some("https://elsewhere.test/"), &current).unwrap();
//! assert!(away.external());
//! ```

use crate::error::UrlError;
use crate::QueryParams;
use std::fmt;

/// A fully resolved URL split into the parts navigation cares about.
///
/// The `full` and `relative` string forms are cached and recomputed after
/// every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    origin: String,
    path: String,
    query: QueryParams,
    hash: Option<String>,
    external: bool,
    relative: String,
    full: String,
}

impl Location {
    /// Build a location from decoded parts. The path is normalized.
    pub fn new(
        origin: impl Into<String>,
        path: &str,
        query: QueryParams,
        hash: Option<String>,
    ) -> Self {
        let mut location = Self {
            origin: origin.into(),
            path: normalize_path(path),
            query,
            hash: hash.filter(|h| !h.is_empty()),
            external: false,
            relative: String::new(),
            full: String::new(),
        };
        location.refresh();
        location
    }

    /// Parse an absolute URL string (`scheme://host/...`).
    pub fn parse_absolute(input: &str) -> Result<Self, UrlError> {
        let parsed = url::Url::parse(input).map_err(|source| UrlError {
            input: input.to_string(),
            source,
        })?;
        Ok(Self::from_url(&parsed))
    }

    fn from_url(parsed: &url::Url) -> Self {
        Self::new(
            parsed.origin().ascii_serialization(),
            &decode_component(parsed.path()),
            parsed
                .query()
                .map(QueryParams::from_query_string)
                .unwrap_or_default(),
            parsed.fragment().map(decode_component),
        )
    }

    /// Scheme, host and port, e.g. `https://app.test`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Normalized, decoded path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parsed query parameters.
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Decoded fragment without the leading `#`.
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// `true` when this location points at a different origin than the one it
    /// was resolved against.
    pub fn external(&self) -> bool {
        self.external
    }

    /// Path + query + hash.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Origin + path + query + hash.
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Replace the hash.
    pub fn set_hash(&mut self, hash: Option<String>) {
        self.hash = hash.filter(|h| !h.is_empty());
        self.refresh();
    }

    /// Replace the whole query.
    pub fn set_query(&mut self, query: QueryParams) {
        self.query = query;
        self.refresh();
    }

    /// Merge `params` into the query: every key in `params` fully replaces the
    /// prior occurrences of that key; unrelated keys are untouched.
    pub fn extend_query(&mut self, params: &QueryParams) {
        self.query.extend_replacing(params);
        self.refresh();
    }

    fn refresh(&mut self) {
        self.relative = build_url("", &self.path, &self.query, self.hash.as_deref());
        self.full = format!("{}{}", self.origin, self.relative);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Resolve `candidate` against `current`.
///
/// See the [module documentation](self) for the rules.
pub fn parse_url(candidate: Option<&str>, current: &Location) -> Result<Location, UrlError> {
    let candidate = candidate.map(str::trim).unwrap_or_default();

    if candidate.is_empty() {
        let mut location = current.clone();
        location.external = false;
        return Ok(location);
    }

    if let Some(hash) = candidate.strip_prefix('#') {
        let mut location = current.clone();
        location.external = false;
        location.set_hash(Some(decode_component(hash)));
        return Ok(location);
    }

    if let Some(rest) = candidate.strip_prefix('?') {
        let (query, hash) = match rest.split_once('#') {
            Some((query, hash)) => (query, Some(decode_component(hash))),
            None => (rest, None),
        };
        return Ok(Location::new(
            current.origin.clone(),
            &current.path,
            QueryParams::from_query_string(query),
            hash,
        ));
    }

    let base = url::Url::parse(current.full()).map_err(|source| UrlError {
        input: current.full().to_string(),
        source,
    })?;
    let joined = base.join(candidate).map_err(|source| UrlError {
        input: candidate.to_string(),
        source,
    })?;

    let mut location = Location::from_url(&joined);
    location.external = location.origin != current.origin;
    Ok(location)
}

/// Merge `params` into a copy of `location`.
pub fn extend_query(location: &Location, params: &QueryParams) -> Location {
    let mut extended = location.clone();
    extended.extend_query(params);
    extended
}

/// Compose a URL string from parts.
///
/// `path` and `hash` are taken decoded and percent-encoded here.
/// Deterministic: the query keeps its key order and an empty query or hash is
/// omitted, so [`parse_url`] of the result yields the same parts back.
pub fn build_url(base: &str, path: &str, query: &QueryParams, hash: Option<&str>) -> String {
    let mut out = String::with_capacity(base.len() + path.len() + 16);
    out.push_str(base.trim_end_matches('/'));
    if path.is_empty() || !path.starts_with('/') {
        out.push('/');
    }
    let segments: Vec<_> = path.split('/').map(urlencoding::encode).collect();
    out.push_str(&segments.join("/"));
    if !query.is_empty() {
        out.push('?');
        out.push_str(&query.to_query_string());
    }
    if let Some(hash) = hash.filter(|h| !h.is_empty()) {
        out.push('#');
        out.push_str(&urlencoding::encode(hash));
    }
    out
}

/// Percent-decode a path or fragment. Invalid UTF-8 is kept as written.
fn decode_component(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Strip the trailing slash from every path except the root.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> Location {
        Location::new("http://localhost", "/a/b", QueryParams::new(), None)
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/users/"), "/users");
        assert_eq!(normalize_path("users"), "/users");
    }

    #[test]
    fn test_caches_follow_mutation() {
        let mut location = here();
        assert_eq!(location.relative(), "/a/b");
        assert_eq!(location.full(), "http://localhost/a/b");

        location.extend_query(&QueryParams::from_query_string("x=1"));
        location.set_hash(Some("top".to_string()));
        assert_eq!(location.relative(), "/a/b?x=1#top");
        assert_eq!(location.full(), "http://localhost/a/b?x=1#top");
    }

    #[test]
    fn test_empty_candidate_keeps_everything() {
        let mut current = here();
        current.set_hash(Some("h".to_string()));
        let resolved = parse_url(Some("  "), &current).unwrap();
        assert_eq!(resolved.relative(), "/a/b#h");
    }

    #[test]
    fn test_query_delta_with_hash() {
        let resolved = parse_url(Some("?x=1#frag"), &here()).unwrap();
        assert_eq!(resolved.path(), "/a/b");
        assert_eq!(resolved.query().get("x"), Some(&"1".to_string()));
        assert_eq!(resolved.hash(), Some("frag"));
    }

    #[test]
    fn test_build_url_root() {
        assert_eq!(
            build_url("http://localhost/", "/", &QueryParams::new(), None),
            "http://localhost/"
        );
    }

    #[test]
    fn test_decode_component_keeps_invalid_utf8() {
        assert_eq!(decode_component("caf%C3%A9%20menu"), "café menu");
        assert_eq!(decode_component("%FF"), "%FF");
    }
}

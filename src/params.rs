//! Query string parameters.
//!
//! [`QueryParams`] is an **ordered multimap**: keys keep the order in which
//! they were first inserted and every key maps to one or more values
//! (`?tag=a&tag=b`). Parsing and serialization use the
//! `application/x-www-form-urlencoded` rules from the [`url`] crate, so `+`
//! decodes to a space and serialization is deterministic.
//!
//! # Example
//!
//! ```
//! use spa_navigator::QueryParams;
//!
//! let mut query = QueryParams::from_query_string("page=1&sort=name&tag=a&tag=b");
//! assert_eq!(query.get_as::<u32>("page"), Some(1));
//! assert_eq!(query.get_all("tag"), Some(&["a".to_string(), "b".to_string()][..]));
//!
//! query.set_all("tag", ["c"]);
//! assert_eq!(query.to_query_string(), "page=1&sort=name&tag=c");
//! ```

use indexmap::IndexMap;
use url::form_urlencoded;

/// Query parameters parsed from a URL query string.
///
/// Supports multiple values for the same key and preserves key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: IndexMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create empty query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a query string without the leading `?`.
    ///
    /// Pairs without `=` are kept with an empty value.
    pub fn from_query_string(query: &str) -> Self {
        let mut params = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.insert(key.into_owned(), value.into_owned());
        }
        params
    }

    /// Get the first value for a key.
    pub fn get(&self, key: &str) -> Option<&String> {
        self.params.get(key)?.first()
    }

    /// Get all values for a key.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Get the first value for a key, parsed as type `T`.
    ///
    /// Returns `None` if the key is missing or the value cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Append a value for the given key.
    ///
    /// If the key already exists, the new value is added to the list (not replaced).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Replace every value of `key`.
    ///
    /// An empty value list removes the key. A key that already exists keeps
    /// its position.
    pub fn set_all<I, V>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let key = key.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.params.shift_remove(&key);
        } else {
            self.params.insert(key, values);
        }
    }

    /// Remove a key, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.params.shift_remove(key)
    }

    /// Merge `other` into `self`: every key present in `other` fully replaces
    /// the values of that key here; unrelated keys are untouched.
    pub fn extend_replacing(&mut self, other: &QueryParams) {
        for (key, values) in other.iter() {
            self.set_all(key.clone(), values.iter().cloned());
        }
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over `(key, values)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.params.iter()
    }

    /// Iterate over every `(key, value)` pair, repeating keys with several values.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Serialize back into a query string (no leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(self.pairs());
        serializer.finish()
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of unique parameter keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_basic() {
        let query = QueryParams::from_query_string("page=1&sort=name&filter=active");

        assert_eq!(query.get("page"), Some(&"1".to_string()));
        assert_eq!(query.get("sort"), Some(&"name".to_string()));
        assert_eq!(query.get("filter"), Some(&"active".to_string()));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn test_query_params_get_as() {
        let query = QueryParams::from_query_string("page=1&limit=50&active=true");

        assert_eq!(query.get_as::<i32>("page"), Some(1));
        assert_eq!(query.get_as::<usize>("limit"), Some(50));
        assert_eq!(query.get_as::<bool>("active"), Some(true));
        assert_eq!(query.get_as::<i32>("missing"), None);
    }

    #[test]
    fn test_query_params_multiple_values_keep_order() {
        let query = QueryParams::from_query_string("tag=rust&other=x&tag=ui");

        let tags = query.get_all("tag").unwrap();
        assert_eq!(tags, ["rust".to_string(), "ui".to_string()]);
        assert_eq!(query.get("tag"), Some(&"rust".to_string()));

        let keys: Vec<&String> = query.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["tag", "other"]);
    }

    #[test]
    fn test_decoding() {
        let query = QueryParams::from_query_string("q=hello+world&e=a%40b&flag");
        assert_eq!(query.get("q"), Some(&"hello world".to_string()));
        assert_eq!(query.get("e"), Some(&"a@b".to_string()));
        assert_eq!(query.get("flag"), Some(&String::new()));
    }

    #[test]
    fn test_to_query_string_is_ordered() {
        let mut query = QueryParams::new();
        query.insert("page", "1");
        query.insert("sort", "name");
        query.insert("page", "2");

        assert_eq!(query.to_query_string(), "page=1&page=2&sort=name");
    }

    #[test]
    fn test_set_all_replaces_and_removes() {
        let mut query = QueryParams::from_query_string("a=1&a=2&b=3");
        query.set_all("a", ["9"]);
        assert_eq!(query.to_query_string(), "a=9&b=3");

        query.set_all("b", Vec::<String>::new());
        assert!(!query.contains("b"));
        assert_eq!(query.len(), 1);
    }

    #[test]
    fn test_extend_replacing() {
        let mut query = QueryParams::from_query_string("a=1&keep=yes");
        let extra: QueryParams = [("a", "2"), ("b", "3")].into_iter().collect();
        query.extend_replacing(&extra);

        assert_eq!(query.get_all("a").unwrap(), ["2".to_string()]);
        assert_eq!(query.get("b"), Some(&"3".to_string()));
        assert_eq!(query.get("keep"), Some(&"yes".to_string()));
    }

    #[test]
    fn test_empty_query_string() {
        let query = QueryParams::from_query_string("");
        assert!(query.is_empty());
        assert_eq!(query.to_query_string(), "");
    }
}

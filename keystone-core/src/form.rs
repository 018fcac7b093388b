//! URL-encoded form and query string values

use crate::Error;
use std::collections::HashMap;

/// Multi-valued name/value pairs decoded from a query string or a
/// `application/x-www-form-urlencoded` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: HashMap<String, Vec<String>>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse URL-encoded form data
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| Error::MalformedFormRequest(format!("Failed to parse form data: {}", e)))?;
        Ok(pairs.into_iter().collect())
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse_query(query: &str) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| Error::internal(format!("Failed to parse query string: {}", e)))?;
        Ok(pairs.into_iter().collect())
    }

    /// First value for a name.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|list| list.first())
            .map(String::as_str)
    }

    /// All values for a name, in the order they appeared.
    pub fn all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FormValues::new();
        for (k, v) in iter {
            values.append(k, v);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form() {
        let body = b"name=John+Doe&email=john%40example.com&age=30";
        let form = FormValues::parse(body).unwrap();

        assert_eq!(form.first("name"), Some("John Doe"));
        assert_eq!(form.first("email"), Some("john@example.com"));
        assert_eq!(form.first("age"), Some("30"));
    }

    #[test]
    fn test_parse_query_multiple_same_key() {
        let query = FormValues::parse_query("tag=rust&tag=web&tag=framework").unwrap();

        assert_eq!(query.first("tag"), Some("rust"));
        assert_eq!(query.all("tag").len(), 3);
        assert_eq!(query.len(), 1);
    }

    #[test]
    fn test_missing_name() {
        let query = FormValues::parse_query("a=1").unwrap();
        assert_eq!(query.first("b"), None);
        assert!(query.all("b").is_empty());
    }

    #[test]
    fn test_parse_empty_query() {
        let query = FormValues::parse_query("").unwrap();
        assert!(query.is_empty());
    }
}

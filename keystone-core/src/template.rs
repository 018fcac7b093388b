//! Path template compilation
//!
//! A path template is a path with `{name}` or `{name:regex}` placeholders:
//!
//! ```
//! use keystone_core::template::PathTemplate;
//!
//! let template = PathTemplate::compile("/items/{id:[0-9]+}/{slug}").unwrap();
//! assert!(template.matches("/items/42/red-chair"));
//! assert!(!template.matches("/items/abc/red-chair"));
//!
//! let values = template.extract("/items/42/red-chair").unwrap();
//! assert_eq!(values.get("id"), Some("42"));
//! assert_eq!(values.get("slug"), Some("red-chair"));
//! ```
//!
//! Each placeholder compiles into its own named capture group, so a single
//! compiled matcher answers both "does it match" and "which value belongs to
//! which variable", even when a custom regex contains groups of its own.

use crate::Error;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// Capture body used for placeholders without an explicit regex.
pub const DEFAULT_SEGMENT: &str = "[^/]+";

/// A compiled path template.
#[derive(Clone)]
pub struct PathTemplate {
    source: String,
    matcher: Regex,
    variables: Vec<String>,
}

impl PathTemplate {
    /// Compile a template into a whole-path matcher.
    pub fn compile(template: &str) -> Result<Self, Error> {
        let mut pattern = String::with_capacity(template.len() + 16);
        let mut variables = Vec::new();
        let mut rest = template;

        pattern.push('^');
        while let Some(open) = rest.find('{') {
            pattern.push_str(&regex::escape(&rest[..open]));

            let inner = &rest[open + 1..];
            let close = closing_brace(inner).ok_or_else(|| {
                Error::InvalidPathTemplate(format!("unterminated placeholder in '{}'", template))
            })?;

            let (name, body) = parse_placeholder(&inner[..close], template)?;
            pattern.push_str(&format!("(?P<{}>{})", group_name(variables.len()), body));
            variables.push(name.to_string());

            rest = &inner[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        let matcher = Regex::new(&pattern)
            .map_err(|e| Error::InvalidPathTemplate(format!("'{}': {}", template, e)))?;

        Ok(Self {
            source: template.to_string(),
            matcher,
            variables,
        })
    }

    /// The template as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The assembled regular expression.
    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    /// Variable names in the order they appear.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Whole-path match.
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Extract variable values by name. Returns `None` if the path does not match.
    pub fn extract(&self, path: &str) -> Option<PathValues> {
        let captures = self.matcher.captures(path)?;
        let mut values = HashMap::with_capacity(self.variables.len());

        for (index, name) in self.variables.iter().enumerate() {
            if values.contains_key(name) {
                continue;
            }
            if let Some(value) = captures.name(&group_name(index)) {
                values.insert(name.clone(), value.as_str().to_string());
            }
        }

        Some(PathValues { values })
    }
}

impl fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathTemplate")
            .field("template", &self.source)
            .field("pattern", &self.matcher.as_str())
            .field("variables", &self.variables)
            .finish()
    }
}

/// Values extracted from a matched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathValues {
    values: HashMap<String, String>,
}

impl PathValues {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn group_name(index: usize) -> String {
    format!("__var{}", index)
}

/// Index of the brace closing a placeholder whose `{` was already consumed.
///
/// Braces inside a custom regex (`{code:[0-9]{3}}`) are balanced; escaped
/// characters are skipped.
fn closing_brace(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut escaped = false;

    for (index, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_placeholder<'a>(placeholder: &'a str, template: &str) -> Result<(&'a str, &'a str), Error> {
    let (name, body) = match placeholder.split_once(':') {
        Some((name, body)) => (name.trim(), body.trim()),
        None => (placeholder.trim(), DEFAULT_SEGMENT),
    };

    if name.is_empty() {
        return Err(Error::InvalidPathTemplate(format!(
            "empty variable name in '{}'",
            template
        )));
    }
    if name.contains(|c: char| c == '/' || c == '{' || c.is_whitespace()) {
        return Err(Error::InvalidPathTemplate(format!(
            "invalid variable name '{}' in '{}'",
            name, template
        )));
    }
    if body.is_empty() {
        return Err(Error::InvalidPathTemplate(format!(
            "empty pattern for variable '{}' in '{}'",
            name, template
        )));
    }

    Ok((name, body))
}

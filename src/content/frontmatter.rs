//! Front-matter parsing

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{ContentError, Result};

/// Front-matter delimiter
const DELIMITER: &str = "---";

/// Byte offsets of the two delimiters in a content file
struct Delimiters {
    /// Start of the opening `---`
    open: usize,
    /// Start of the closing `---`
    close: usize,
}

impl Delimiters {
    fn locate(content: &str) -> Result<Self> {
        let open = content
            .find(DELIMITER)
            .ok_or(ContentError::MissingOpeningDelimiter)?;
        let after_open = open + DELIMITER.len();
        let close = content[after_open..]
            .find(DELIMITER)
            .map(|pos| after_open + pos)
            .ok_or(ContentError::MissingClosingDelimiter)?;
        Ok(Self { open, close })
    }

    fn yaml<'a>(&self, content: &'a str) -> &'a str {
        &content[self.open + DELIMITER.len()..self.close]
    }

    fn end(&self) -> usize {
        self.close + DELIMITER.len()
    }
}

/// Front-matter mapping of a content file.
///
/// Keys keep their file order. Values stay loosely typed; the accessors
/// below return `None` for a missing key and for a value of the wrong type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter {
    fields: IndexMap<String, Value>,
}

impl FrontMatter {
    /// Parse front-matter from content.
    /// Returns (front_matter, body) where body is everything after the
    /// closing delimiter, untouched.
    pub fn parse(content: &str) -> Result<(Self, &str)> {
        let delimiters = Delimiters::locate(content)?;
        let yaml = delimiters.yaml(content);

        let fields = if yaml.trim().is_empty() {
            IndexMap::new()
        } else {
            // A block holding only comments deserializes to null
            serde_yaml::from_str::<Option<IndexMap<String, Value>>>(yaml)?.unwrap_or_default()
        };

        Ok((Self { fields }, &content[delimiters.end()..]))
    }

    /// The raw front-matter block of `content`, both delimiters included
    pub fn block(content: &str) -> Result<&str> {
        let delimiters = Delimiters::locate(content)?;
        Ok(&content[delimiters.open..delimiters.end()])
    }

    /// Serialize back into a delimited block
    pub fn to_block(&self) -> Result<String> {
        let yaml = if self.fields.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&self.fields)?
        };
        Ok(format!("{}\n{}{}\n", DELIMITER, yaml, DELIMITER))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("description")
    }

    pub fn date(&self) -> Option<&str> {
        self.get_str("date")
    }

    pub fn url(&self) -> Option<&str> {
        self.get_str("url")
    }

    pub fn featured(&self) -> Option<bool> {
        self.get_bool("featured")
    }

    /// Only an explicit `draft: true` counts
    pub fn is_draft(&self) -> bool {
        self.get_bool("draft").unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: Hello World
description: "A first post"
date: 2024-01-15
draft: false
featured: true
tags:
  - rust
  - ssg
---

This is the content.
"#;

        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title(), Some("Hello World"));
        assert_eq!(fm.description(), Some("A first post"));
        assert_eq!(fm.date(), Some("2024-01-15"));
        assert_eq!(fm.featured(), Some(true));
        assert!(!fm.is_draft());
        // Unknown keys survive parsing
        assert!(fm.get("tags").unwrap().is_sequence());
        assert_eq!(body, "\n\nThis is the content.\n");
    }

    #[test]
    fn test_body_is_verbatim() {
        let (_, body) = FrontMatter::parse("---\ntitle: x\n---  \n  indented\n\n").unwrap();
        assert_eq!(body, "  \n  indented\n\n");
    }

    #[test]
    fn test_missing_both_delimiters() {
        let err = FrontMatter::parse("Just some markdown\n").unwrap_err();
        assert!(matches!(err, ContentError::MissingOpeningDelimiter));
    }

    #[test]
    fn test_missing_closing_delimiter() {
        let err = FrontMatter::parse("---\ntitle: Broken\n\nBody").unwrap_err();
        assert!(matches!(err, ContentError::MissingClosingDelimiter));
    }

    #[test]
    fn test_empty_frontmatter() {
        let (fm, body) = FrontMatter::parse("---\n---\nBody").unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, "\nBody");
    }

    #[test]
    fn test_comment_only_frontmatter() {
        let (fm, _) = FrontMatter::parse("---\n# nothing yet\n---\n").unwrap();
        assert!(fm.is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = FrontMatter::parse("---\ntitle: [unclosed\n---\n").unwrap_err();
        assert!(matches!(err, ContentError::InvalidFrontMatter(_)));
    }

    #[test]
    fn test_wrong_types_read_as_absent() {
        let (fm, _) = FrontMatter::parse("---\ntitle: 42\ndraft: \"yes\"\n---\n").unwrap();
        assert_eq!(fm.title(), None);
        assert!(!fm.is_draft());
    }

    #[test]
    fn test_block_keeps_delimiters() {
        let content = "---\ntitle: \"Title\"\ndraft: true\n---\nignored body";
        assert_eq!(
            FrontMatter::block(content).unwrap(),
            "---\ntitle: \"Title\"\ndraft: true\n---"
        );
    }

    #[test]
    fn test_roundtrip_supported_keys() {
        let mut fm = FrontMatter::default();
        fm.insert("title", "Home");
        fm.insert("description", "Landing page");
        fm.insert("date", "2024-03-01");
        fm.insert("draft", false);
        fm.insert("featured", true);
        fm.insert("url", "https://example.com/");

        let block = fm.to_block().unwrap();
        let (parsed, body) = FrontMatter::parse(&block).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(body, "\n");
    }

    #[test]
    fn test_roundtrip_empty() {
        let block = FrontMatter::default().to_block().unwrap();
        let (parsed, _) = FrontMatter::parse(&block).unwrap();
        assert!(parsed.is_empty());
    }
}

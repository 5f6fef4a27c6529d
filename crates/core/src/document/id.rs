/// Document addressing.
///
/// Every stored document lives at `(partition, collection, id)`:
/// - Partition: `draft` (editable by admins) or `live` (served to visitors)
/// - Collection: `content` (site singletons), `pages`, `messages`
/// - Id: a singleton name (`main`, `wordCloud`, `global`) or a page slug
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MAX_SLUG_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Draft,
    Live,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Draft => "draft",
            Partition::Live => "live",
        }
    }

    /// Map the `draft` request flag onto a partition.
    pub fn from_draft_flag(draft: bool) -> Self {
        if draft {
            Partition::Draft
        } else {
            Partition::Live
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Content,
    Pages,
    Messages,
}

impl Collection {
    /// Collections promoted from draft to live by a publish.
    pub const PUBLISHED: [Collection; 2] = [Collection::Content, Collection::Pages];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Content => "content",
            Collection::Pages => "pages",
            Collection::Messages => "messages",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The whole-site singleton documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    #[serde(rename = "main")]
    Main,
    #[serde(rename = "wordCloud")]
    WordCloud,
    #[serde(rename = "global")]
    Global,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Main, ContentKind::WordCloud, ContentKind::Global];

    /// Document id of the singleton inside the `content` collection.
    pub fn doc_id(&self) -> &'static str {
        match self {
            ContentKind::Main => "main",
            ContentKind::WordCloud => "wordCloud",
            ContentKind::Global => "global",
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(ContentKind::Main),
            "wordCloud" => Ok(ContentKind::WordCloud),
            "global" => Ok(ContentKind::Global),
            other => Err(format!("unknown content type '{other}'")),
        }
    }
}

/// A validated page slug: lowercase ASCII letters, digits and single hyphens
/// between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageId(String);

impl PageId {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("page id cannot be empty".to_string());
        }
        if raw.len() > MAX_SLUG_LEN {
            return Err(format!("page id cannot exceed {MAX_SLUG_LEN} characters"));
        }
        if raw.starts_with('-') || raw.ends_with('-') || raw.contains("--") {
            return Err("page id cannot start, end or repeat hyphens".to_string());
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err("page id may only contain a-z, 0-9 and '-'".to_string());
        }
        Ok(PageId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PageId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PageId::parse(&value)
    }
}

impl From<PageId> for String {
    fn from(id: PageId) -> Self {
        id.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_slugs() {
        for raw in ["kontakt", "about-us", "a1", "2024-review"] {
            let id = PageId::parse(raw).unwrap();
            assert_eq!(id.as_str(), raw);
        }
    }

    #[test]
    fn reject_malformed_slugs() {
        for raw in ["", "About", "about us", "-about", "about-", "a--b", "über", "a/b"] {
            assert!(PageId::parse(raw).is_err(), "{raw:?} should be rejected");
        }
        assert!(PageId::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn content_kind_round_trips_through_doc_id() {
        for kind in ContentKind::ALL {
            assert_eq!(kind.doc_id().parse::<ContentKind>().unwrap(), kind);
        }
        assert!("page".parse::<ContentKind>().is_err());
    }

    #[test]
    fn draft_flag_selects_partition() {
        assert_eq!(Partition::from_draft_flag(true), Partition::Draft);
        assert_eq!(Partition::from_draft_flag(false), Partition::Live);
        assert_eq!(Partition::Draft.to_string(), "draft");
    }
}

//! Generic search over a parsed markup tree.
//!
//! Traversal is pre-order depth-first over `scraper`'s immutable tree,
//! starting with (and including) the given root. Matching compares the tag
//! name and, optionally, one attribute by exact string equality. A class
//! attribute of `"ui-extracts SS"` only matches a matcher asking for exactly
//! `"ui-extracts SS"`, never `"ui-extracts"`.

use scraper::{ElementRef, Html};

use crate::error::{HarvestError, Result};

/// Tag/attribute predicate used to locate containers in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    tag: String,
    attr: Option<(String, String)>,
}

impl Matcher {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attr: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attr = Some((name.into(), value.into()));
        self
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        let el = element.value();
        if el.name() != self.tag {
            return false;
        }
        match &self.attr {
            Some((name, value)) => el.attr(name) == Some(value.as_str()),
            None => true,
        }
    }
}

/// Lazily yields every element under `root` (root included) that matches,
/// in document order.
pub fn find_all<'a>(root: ElementRef<'a>, matcher: &Matcher) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| matcher.matches(el))
}

/// First matching element in pre-order, if any.
pub fn find_first<'a>(root: ElementRef<'a>, matcher: &Matcher) -> Option<ElementRef<'a>> {
    find_all(root, matcher).next()
}

/// Parse a fetched page. Bytes that are not UTF-8 count as a parse failure.
pub fn parse_document(bytes: &[u8]) -> Result<Html> {
    let text = std::str::from_utf8(bytes).map_err(|e| HarvestError::parse(e.to_string()))?;
    Ok(Html::parse_document(text))
}

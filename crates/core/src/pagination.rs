//! Paged listings.
//!
//! List endpoints answer either with a bare JSON array or with a Spring-style
//! page object, and the list itself is not always called `content`. [`Page`]
//! accepts all of these.

use serde::{Deserialize, Deserializer, Serialize};

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    /// Zero-based page index.
    pub number: u32,
    pub size: u32,
}

impl<T> Page<T> {
    /// A single page holding every item.
    #[must_use]
    pub fn single(content: Vec<T>) -> Self {
        let len = content.len();
        Self {
            total_elements: len as u64,
            total_pages: 1,
            number: 0,
            size: u32::try_from(len).unwrap_or(u32::MAX),
            content,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::single(Vec::new())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.content.iter()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.into_iter()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageRepr<T> {
    List(Vec<T>),
    Object(PageObject<T>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageObject<T> {
    #[serde(alias = "promotions", alias = "items")]
    content: Option<Vec<T>>,
    total_elements: Option<u64>,
    total_pages: Option<u32>,
    number: Option<u32>,
    size: Option<u32>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match PageRepr::deserialize(deserializer)? {
            PageRepr::List(items) => Ok(Self::single(items)),
            PageRepr::Object(obj) => {
                let content = obj.content.unwrap_or_default();
                let len = content.len();
                Ok(Self {
                    total_elements: obj.total_elements.unwrap_or(len as u64),
                    total_pages: obj.total_pages.filter(|&p| p > 0).unwrap_or(1),
                    number: obj.number.unwrap_or(0),
                    size: obj
                        .size
                        .unwrap_or_else(|| u32::try_from(len).unwrap_or(u32::MAX)),
                    content,
                })
            }
        }
    }
}

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

/// Paging and sorting query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub sort_dir: SortDir,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sorted_by(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.sort_by = field.into();
        self.sort_dir = dir;
        self
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            sort_by: "createdAt".to_string(),
            sort_dir: SortDir::Desc,
        }
    }
}

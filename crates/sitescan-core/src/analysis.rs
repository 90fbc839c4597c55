//! Data shapes produced by the downstream analysis stages (metadata
//! extraction and content classification) that consume a fetched document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// SEO-relevant metadata extracted from an HTML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub domain: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical_url: String,
    pub language: Option<String>,
    /// `h1`..`h6` mapped to the text of every heading at that level.
    pub headings: BTreeMap<String, Vec<String>>,
    pub text_content: Option<String>,
    pub word_count: usize,
    pub links: Vec<LinkInfo>,
    pub images: Vec<ImageInfo>,
    /// Parsed JSON-LD blocks.
    pub structured_data: Vec<serde_json::Value>,
    pub meta_tags: BTreeMap<String, String>,
}

impl PageMetadata {
    pub fn headings_at(&self, level: u8) -> &[String] {
        self.headings
            .get(&format!("h{level}"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub href: String,
    pub text: String,
    pub is_internal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Coarse page shape inferred from URL patterns and heading structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Product,
    Article,
    Category,
    Homepage,
    Generic,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub page_type: PageType,
    pub categories: Vec<CategoryScore>,
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Classification {
    /// Result for pages without enough text to score.
    pub fn unknown(note: impl Into<String>) -> Self {
        Self {
            page_type: PageType::Unknown,
            categories: Vec::new(),
            topics: Vec::new(),
            note: Some(note.into()),
        }
    }
}

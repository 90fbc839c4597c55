use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Node, Selector};
use sitescan_core::analysis::{ImageInfo, LinkInfo, PageMetadata};
use sitescan_core::error::CrawlError;
use sitescan_core::traits::MetadataExtractor;
use url::Url;

/// Containers tried, in order, for the main text of a page.
const MAIN_CONTENT_SELECTORS: &[&str] = &["main", "article", "section", "[role=main]"];

/// Elements whose text never counts as page content.
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "style", "script", "noscript", "template",
];
const BOILERPLATE_ROLES: &[&str] = &["banner", "navigation", "complementary"];

/// SEO metadata extractor built on `scraper`.
///
/// Parsing is lenient: malformed markup still yields whatever could be
/// recovered.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMetadataExtractor;

impl HtmlMetadataExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataExtractor for HtmlMetadataExtractor {
    fn extract(&self, document: &str, url: &str) -> Result<PageMetadata, CrawlError> {
        let parsed = Url::parse(url).map_err(|e| CrawlError::InvalidUrl(format!("{url}: {e}")))?;
        let domain = netloc(&parsed);
        let html = Html::parse_document(document);

        let text_content = extract_main_content(&html);
        let word_count = text_content
            .as_deref()
            .map_or(0, |t| t.split_whitespace().count());

        Ok(PageMetadata {
            url: url.to_string(),
            title: first_text(&html, "title"),
            description: first_attr(&html, r#"meta[name="description"]"#, "content")
                .map(|d| d.trim().to_string()),
            canonical_url: first_attr(&html, r#"link[rel="canonical"]"#, "href")
                .unwrap_or_else(|| url.to_string()),
            language: extract_language(&html),
            headings: extract_headings(&html),
            text_content,
            word_count,
            links: extract_links(&html, &domain),
            images: extract_images(&html),
            structured_data: extract_structured_data(&html),
            meta_tags: extract_meta_tags(&html),
            domain,
        })
    }
}

/// Host plus any explicit port.
fn netloc(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn select<'a>(html: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => html.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn first_text(html: &Html, css: &str) -> Option<String> {
    select(html, css)
        .first()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

fn first_attr(html: &Html, css: &str, attr: &str) -> Option<String> {
    select(html, css)
        .iter()
        .find_map(|el| el.value().attr(attr))
        .map(str::to_string)
}

fn extract_language(html: &Html) -> Option<String> {
    first_attr(html, "html[lang]", "lang").or_else(|| {
        select(html, "meta[http-equiv]")
            .iter()
            .find(|el| {
                el.value()
                    .attr("http-equiv")
                    .is_some_and(|v| v.eq_ignore_ascii_case("content-language"))
            })
            .and_then(|el| el.value().attr("content"))
            .map(str::to_string)
    })
}

fn extract_headings(html: &Html) -> BTreeMap<String, Vec<String>> {
    (1..=6)
        .map(|level| {
            let tag = format!("h{level}");
            let texts = select(html, &tag)
                .iter()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .collect();
            (tag, texts)
        })
        .collect()
}

fn is_boilerplate(element: &scraper::node::Element) -> bool {
    BOILERPLATE_TAGS.contains(&element.name())
        || element
            .attr("role")
            .is_some_and(|role| BOILERPLATE_ROLES.contains(&role))
}

/// Whitespace-collapsed text of `root`, skipping boilerplate subtrees.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != root.id())
            .filter_map(|a| a.value().as_element())
            .any(is_boilerplate);
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn extract_main_content(html: &Html) -> Option<String> {
    for css in MAIN_CONTENT_SELECTORS {
        let containers = select(html, css);
        if !containers.is_empty() {
            let text = containers
                .into_iter()
                .map(visible_text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            return Some(text);
        }
    }

    select(html, "body").into_iter().next().map(visible_text)
}

fn extract_links(html: &Html, domain: &str) -> Vec<LinkInfo> {
    select(html, "a[href]")
        .iter()
        .filter_map(|el| {
            let href = el.value().attr("href")?.to_string();
            let text = el.text().collect::<String>().trim().to_string();
            let is_internal =
                !href.starts_with("http") || (!domain.is_empty() && href.contains(domain));
            Some(LinkInfo {
                href,
                text,
                is_internal,
            })
        })
        .collect()
}

fn extract_images(html: &Html) -> Vec<ImageInfo> {
    select(html, "img")
        .iter()
        .map(|el| {
            let attr = |name: &str| el.value().attr(name).map(str::to_string);
            ImageInfo {
                src: attr("src"),
                alt: attr("alt"),
                title: attr("title"),
            }
        })
        .collect()
}

fn extract_structured_data(html: &Html) -> Vec<serde_json::Value> {
    select(html, r#"script[type="application/ld+json"]"#)
        .iter()
        .filter_map(|el| {
            let raw = el.text().collect::<String>();
            match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping invalid JSON-LD block");
                    None
                }
            }
        })
        .collect()
}

fn extract_meta_tags(html: &Html) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    for el in select(html, "meta[content]") {
        let meta = el.value();
        let Some(content) = meta.attr("content") else {
            continue;
        };
        if let Some(key) = meta.attr("name").or_else(|| meta.attr("property")) {
            tags.insert(key.to_string(), content.to_string());
        }
    }
    tags
}

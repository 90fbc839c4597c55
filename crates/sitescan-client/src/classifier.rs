use std::collections::{HashMap, HashSet};

use sitescan_core::analysis::{CategoryScore, Classification, PageMetadata, PageType};
use sitescan_core::traits::ContentClassifier;

/// Only the head of very long pages is scored.
const MAX_TEXT_CHARS: usize = 10_000;
/// Keyword hits needed before a category is reported.
const MIN_CATEGORY_MATCHES: usize = 2;
const TOPIC_CANDIDATES: usize = 20;
const MAX_TOPICS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how",
    "i", "if", "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor",
    "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
];

const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "e-commerce",
        &[
            "product", "buy", "shop", "store", "price", "cart", "purchase", "shipping", "offer",
            "discount", "deal",
        ],
    ),
    (
        "news",
        &[
            "news", "report", "article", "journalist", "breaking", "coverage", "story", "reported",
            "according", "sources",
        ],
    ),
    (
        "blog",
        &[
            "blog", "post", "author", "opinion", "comment", "thoughts", "personal", "experience",
            "perspective",
        ],
    ),
    (
        "corporate",
        &[
            "company", "business", "corporate", "enterprise", "industry", "service", "solution",
            "professional", "client",
        ],
    ),
    (
        "educational",
        &[
            "learn", "course", "education", "student", "school", "university", "academic",
            "study", "training", "teaching",
        ],
    ),
    (
        "technology",
        &[
            "tech", "technology", "software", "hardware", "digital", "app", "application",
            "device", "platform", "system",
        ],
    ),
];

/// Keyword-frequency page classifier.
///
/// Stateless: the same metadata always produces the same classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ContentClassifier for KeywordClassifier {
    fn classify(&self, metadata: &PageMetadata) -> Classification {
        let combined = combined_text(metadata);
        if combined.trim().is_empty() {
            return Classification::unknown("Insufficient content for classification");
        }

        let tokens = tokenize(&combined);
        Classification {
            page_type: page_type(metadata),
            categories: score_categories(&tokens),
            topics: extract_topics(&tokens),
            note: None,
        }
    }
}

fn combined_text(metadata: &PageMetadata) -> String {
    let mut text = String::new();
    for part in [&metadata.title, &metadata.description].into_iter().flatten() {
        text.push_str(part);
        text.push(' ');
    }
    if let Some(content) = &metadata.text_content {
        text.extend(content.chars().take(MAX_TEXT_CHARS));
    }
    text
}

/// Lower-cased words with punctuation, stop words and single characters removed.
fn tokenize(text: &str) -> Vec<String> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .split_whitespace()
        .filter(|t| t.chars().count() > 1 && !stop_words.contains(t))
        .map(str::to_string)
        .collect()
}

fn page_type(metadata: &PageMetadata) -> PageType {
    let url = metadata.url.to_lowercase();
    let has_any = |patterns: &[&str]| patterns.iter().any(|p| url.contains(p));

    if has_any(&["/product/", "/p/", "/item/"]) {
        return PageType::Product;
    }
    if has_any(&["/blog/", "/post/", "/article/"]) {
        return PageType::Article;
    }
    if has_any(&["/category/", "/collection/", "/department/"]) {
        return PageType::Category;
    }
    if is_homepage(&metadata.url) {
        return PageType::Homepage;
    }
    if metadata.headings_at(1).len() == 1 && metadata.headings_at(2).len() > 2 {
        return PageType::Article;
    }
    PageType::Generic
}

/// Root path with no query, e.g. `https://example.com/`.
fn is_homepage(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| u.path() == "/" && u.query().is_none())
        .unwrap_or(false)
}

fn score_categories(tokens: &[String]) -> Vec<CategoryScore> {
    let present: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    let mut scores: Vec<CategoryScore> = CATEGORIES
        .iter()
        .filter_map(|(name, keywords)| {
            let matches = keywords.iter().filter(|k| present.contains(*k)).count();
            (matches >= MIN_CATEGORY_MATCHES).then(|| CategoryScore {
                name: name.to_string(),
                confidence: (matches as f64 / keywords.len() as f64).min(1.0),
            })
        })
        .collect();
    scores.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    scores
}

/// Most frequent tokens longer than three characters. Ties keep first-seen order.
fn extract_topics(tokens: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, token) in tokens.iter().enumerate() {
        counts.entry(token).or_insert((0, position)).0 += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(token, (count, first))| (token, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(TOPIC_CANDIDATES)
        .filter(|(token, _, _)| token.chars().count() > 3)
        .take(MAX_TOPICS)
        .map(|(token, _, _)| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn metadata(url: &str, title: &str, text: &str) -> PageMetadata {
        PageMetadata {
            url: url.to_string(),
            title: Some(title.to_string()),
            text_content: Some(text.to_string()),
            ..PageMetadata::default()
        }
    }

    #[test]
    fn empty_page_is_unknown() {
        let result = KeywordClassifier::new().classify(&PageMetadata {
            url: "https://x.example/page".into(),
            ..PageMetadata::default()
        });
        assert_eq!(result.page_type, PageType::Unknown);
        assert!(result.categories.is_empty());
        assert!(result.topics.is_empty());
        assert!(result.note.is_some());
    }

    #[test]
    fn shop_text_scores_e_commerce() {
        let meta = metadata(
            "https://shop.example/product/42",
            "Buy the widget",
            "Add to cart. Free shipping on every purchase at our store. Best price!",
        );
        let result = KeywordClassifier::new().classify(&meta);
        assert_eq!(result.page_type, PageType::Product);
        assert_eq!(result.categories[0].name, "e-commerce");
        let expected = 6.0 / 11.0;
        assert!((result.categories[0].confidence - expected).abs() < 1e-9);
        assert!(result.note.is_none());
    }

    #[test]
    fn single_keyword_is_not_enough() {
        let meta = metadata("https://x.example/about", "About", "We love software.");
        let result = KeywordClassifier::new().classify(&meta);
        assert!(result.categories.is_empty());
    }

    #[test]
    fn categories_sorted_by_confidence() {
        let meta = metadata(
            "https://x.example/a",
            "Tech news",
            "Breaking news report: the software platform and device app system shipped",
        );
        let result = KeywordClassifier::new().classify(&meta);
        let names: Vec<_> = result.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["technology", "news"]);
        assert!(result.categories[0].confidence >= result.categories[1].confidence);
    }

    #[test]
    fn page_type_rules() {
        let classify = |url: &str, headings: BTreeMap<String, Vec<String>>| {
            let meta = PageMetadata {
                url: url.to_string(),
                title: Some("Title".into()),
                headings,
                ..PageMetadata::default()
            };
            KeywordClassifier::new().classify(&meta).page_type
        };
        assert_eq!(classify("https://x.example/blog/hello", BTreeMap::new()), PageType::Article);
        assert_eq!(classify("https://x.example/category/shoes", BTreeMap::new()), PageType::Category);
        assert_eq!(classify("https://x.example/", BTreeMap::new()), PageType::Homepage);
        assert_eq!(classify("https://x.example/about", BTreeMap::new()), PageType::Generic);

        let article_shape = BTreeMap::from([
            ("h1".to_string(), vec!["Guide".to_string()]),
            (
                "h2".to_string(),
                vec!["One".to_string(), "Two".to_string(), "Three".to_string()],
            ),
        ]);
        assert_eq!(classify("https://x.example/guide", article_shape), PageType::Article);
    }

    #[test]
    fn topics_are_frequent_long_tokens() {
        let meta = metadata(
            "https://x.example/a",
            "Rust",
            "rust rust rust tokio tokio async async async async the and web",
        );
        let topics = KeywordClassifier::new().classify(&meta).topics;
        // "rust" ties with "async" but appears first (in the title).
        assert_eq!(topics, ["rust", "async", "tokio"]);
    }

    #[test]
    fn classification_is_deterministic() {
        let meta = metadata(
            "https://x.example/a",
            "Course catalog",
            "Learn at our university: every student can study a course with academic training.",
        );
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify(&meta), classifier.classify(&meta));
    }
}

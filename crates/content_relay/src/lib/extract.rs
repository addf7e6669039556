//! # Content Extractor
//!
//! Heuristic isolation of the human-readable body of an HTML page.
//!
//! Noise (scripts, navigation, ads, sidebars) is detached from the parsed tree
//! first. The remaining document is then offered to an ordered list of
//! [`RegionStrategy`] implementations; each proposes candidate texts and the
//! longest candidate is the strategy's best. The first strategy whose best
//! reaches [`MIN_REGION_CHARS`] wins, and the final strategy (whole body) is
//! accepted regardless.
//!
//! This is best-effort: pages rendered by client-side script will usually
//! yield little more than their noscript fallback.

use std::sync::LazyLock;

use itertools::Itertools;
use scraper::{Html, Selector};

use crate::{error::ExtractionError, types::ExtractedContent};

/// A region must reach this many characters to beat the next strategy.
pub const MIN_REGION_CHARS: usize = 100;

/// Extraction fails below this many characters.
pub const MIN_CONTENT_CHARS: usize = 50;

static NOISE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(concat!(
        "script, style, noscript, iframe, svg, template, ",
        "nav, header, footer, aside, ",
        "[role=\"navigation\"], [role=\"banner\"], [role=\"contentinfo\"], [role=\"complementary\"], ",
        ".ad, .ads, .advert, .advertisement, .sponsored, ",
        ".sidebar, .side-bar, .navigation, .navbar, .menu, .breadcrumbs, ",
        ".cookie-banner, .social-share, .share-buttons, .related-posts, .comments"
    ))
    .expect("static selector must parse")
});

static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "main",
        "[role=\"main\"]",
        "article",
        ".post-content",
        ".entry-content",
        ".article-content",
        ".article-body",
        ".story-body",
        ".main-content",
        ".content",
        "#content",
        "#main",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static selector must parse"))
    .collect()
});

static PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("static selector must parse"));

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("static selector must parse"));

/// Only the document title; `<svg><title>` labels in the body don't count.
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head > title").expect("static selector must parse"));

/// A way of proposing "content region candidates" from a cleaned document.
trait RegionStrategy: Sync {
    fn name(&self) -> &'static str;

    /// Whitespace-collapsed candidate texts, in document order.
    fn candidates(&self, document: &Html) -> Vec<String>;

    /// Longest candidate; the earliest one wins ties.
    fn best(&self, document: &Html) -> Option<String> {
        self.candidates(document)
            .into_iter()
            .filter(|c| !c.is_empty())
            .rev()
            .max_by_key(|c| char_len(c))
    }
}

/// Semantic and conventional content containers.
struct ContentContainers;

impl RegionStrategy for ContentContainers {
    fn name(&self) -> &'static str {
        "containers"
    }

    fn candidates(&self, document: &Html) -> Vec<String> {
        CONTAINERS
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .collect()
    }
}

/// Every `<p>` in the document, joined.
struct Paragraphs;

impl RegionStrategy for Paragraphs {
    fn name(&self) -> &'static str {
        "paragraphs"
    }

    fn candidates(&self, document: &Html) -> Vec<String> {
        let joined = document
            .select(&PARAGRAPHS)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .join(" ");
        vec![joined]
    }
}

/// The full `<body>`, or the whole document when there is none.
struct WholeBody;

impl RegionStrategy for WholeBody {
    fn name(&self) -> &'static str {
        "body"
    }

    fn candidates(&self, document: &Html) -> Vec<String> {
        let text = match document.select(&BODY).next() {
            Some(body) => body.text().collect::<String>(),
            None => document.root_element().text().collect::<String>(),
        };
        vec![collapse_whitespace(&text)]
    }
}

static STRATEGIES: &[&dyn RegionStrategy] = &[&ContentContainers, &Paragraphs, &WholeBody];

/// Extracts the title and main body text of `html`.
///
/// `source` is the page URL (or other identifier) and doubles as the title
/// when the document has none.
#[tracing::instrument(skip(html), fields(html_len = html.len()))]
pub fn extract(html: &str, source: &str) -> Result<ExtractedContent, ExtractionError> {
    let mut document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| source.to_string());

    strip_noise(&mut document);

    let mut body_text = String::new();
    for (idx, strategy) in STRATEGIES.iter().enumerate() {
        let Some(text) = strategy.best(&document) else {
            continue;
        };
        let is_last = idx + 1 == STRATEGIES.len();
        if is_last || char_len(&text) >= MIN_REGION_CHARS {
            tracing::debug!(strategy = strategy.name(), chars = char_len(&text), "Selected region");
            body_text = text;
            break;
        }
    }

    let length = char_len(&body_text);
    if length < MIN_CONTENT_CHARS {
        return Err(ExtractionError::EmptyContent { length });
    }

    Ok(ExtractedContent {
        source: source.to_string(),
        title,
        body_text,
    })
}

fn strip_noise(document: &mut Html) {
    let noise = document.select(&NOISE).map(|el| el.id()).collect::<Vec<_>>();
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

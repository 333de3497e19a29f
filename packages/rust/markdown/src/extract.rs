//! Content-region extraction strategies.
//!
//! Strategies are tried in priority order and the first one that returns
//! `Some` wins. [`WholeDocument`] always matches, so a chain ending with it
//! always yields content.

use scraper::{Html, Selector};

/// Candidate content containers for help-center article bodies, most
/// specific first.
pub const CONTENT_SELECTORS: &[&str] = &[
    "div.article-body",
    "div.article-content",
    "div.content",
    "article",
    "main",
];

/// One way of locating the primary content region of a document.
pub trait ExtractionStrategy: Send + Sync {
    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;

    /// Return the HTML of the content region, or `None` if this strategy
    /// does not apply to the document.
    fn extract(&self, doc: &Html) -> Option<String>;
}

/// Selects the first element matching a CSS selector.
pub struct SelectorStrategy {
    source: String,
    selector: Selector,
}

impl SelectorStrategy {
    /// Parse `selector` into a strategy. Returns `None` for invalid CSS.
    pub fn parse(selector: &str) -> Option<Self> {
        Selector::parse(selector).ok().map(|parsed| Self {
            source: selector.to_string(),
            selector: parsed,
        })
    }
}

impl ExtractionStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.source
    }

    fn extract(&self, doc: &Html) -> Option<String> {
        doc.select(&self.selector).next().map(|el| el.html())
    }
}

/// Uses the entire (already cleaned) document.
pub struct WholeDocument;

impl ExtractionStrategy for WholeDocument {
    fn name(&self) -> &str {
        "whole-document"
    }

    fn extract(&self, doc: &Html) -> Option<String> {
        Some(doc.root_element().html())
    }
}

/// Content region chosen by an [`ExtractorChain`].
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Name of the strategy that matched.
    pub strategy: String,
    pub html: String,
}

/// Holds extraction strategies in priority order.
pub struct ExtractorChain {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractorChain {
    /// Build a chain from explicit strategies.
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// The help-center chain: [`CONTENT_SELECTORS`] then [`WholeDocument`].
    pub fn help_center() -> Self {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = CONTENT_SELECTORS
            .iter()
            .map(|sel| {
                Box::new(SelectorStrategy::parse(sel).expect("valid built-in selector"))
                    as Box<dyn ExtractionStrategy>
            })
            .collect();
        strategies.push(Box::new(WholeDocument));
        Self { strategies }
    }

    /// Run strategies in order and return the first match.
    pub fn extract(&self, doc: &Html) -> Option<Extracted> {
        self.strategies.iter().find_map(|strategy| {
            strategy.extract(doc).map(|html| Extracted {
                strategy: strategy.name().to_string(),
                html,
            })
        })
    }
}

impl Default for ExtractorChain {
    fn default() -> Self {
        Self::help_center()
    }
}

//! Article HTML to normalized Markdown.
//!
//! Normalization removes structural noise (navigation, header/footer,
//! breadcrumbs, article metadata), picks the primary content region through
//! an [`ExtractorChain`], converts it with `htmd` using ATX headings, and
//! runs the cleanup passes. The output is what gets fingerprinted, so it
//! must be deterministic for a given input.

mod cleanup;
pub mod extract;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use helpsync_shared::{HelpSyncError, Result};

pub use extract::{
    CONTENT_SELECTORS, Extracted, ExtractionStrategy, ExtractorChain, SelectorStrategy,
    WholeDocument,
};

/// Structural noise removed before extraction, in priority order.
pub const NOISE_SELECTORS: &[&str] = &[
    "nav",
    "header",
    "footer",
    ".related-articles",
    ".breadcrumbs",
    ".article-meta",
    ".article-footer",
];

/// Tags the converter drops together with their content.
const SKIP_TAGS: &[&str] = &["script", "style", "head", "noscript", "iframe", "svg"];

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Converts article markup into normalized Markdown.
pub struct Normalizer {
    chain: ExtractorChain,
    base_url: Option<Url>,
}

impl Normalizer {
    /// Normalizer using the help-center extraction chain.
    pub fn new() -> Self {
        Self {
            chain: ExtractorChain::help_center(),
            base_url: None,
        }
    }

    /// Resolve relative links in the output against `base_url`.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Replace the extraction chain.
    pub fn with_chain(mut self, chain: ExtractorChain) -> Self {
        self.chain = chain;
        self
    }

    /// Normalize `html`, returning an empty string on any failure.
    ///
    /// Callers treat an empty result as a failed item.
    pub fn normalize(&self, html: &str) -> String {
        match self.try_normalize(html) {
            Ok(md) => md,
            Err(e) => {
                warn!(error = %e, "normalization failed");
                String::new()
            }
        }
    }

    /// Normalize `html`, surfacing the failure reason.
    #[instrument(skip_all, fields(html_len = html.len()))]
    pub fn try_normalize(&self, html: &str) -> Result<String> {
        let mut doc = Html::parse_document(html);
        let removed = strip_noise(&mut doc);

        let extracted = self
            .chain
            .extract(&doc)
            .ok_or_else(|| HelpSyncError::parse("no content region matched"))?;

        debug!(strategy = %extracted.strategy, removed, "content region selected");

        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(SKIP_TAGS.to_vec())
            .build();

        let raw_markdown = converter
            .convert(&extracted.html)
            .map_err(|e| HelpSyncError::Conversion(format!("htmd conversion failed: {e}")))?;

        let cleaned = cleanup::run_pipeline(&raw_markdown, self.base_url.as_ref());

        debug!(raw_len = raw_markdown.len(), final_len = cleaned.len(), "conversion complete");

        Ok(cleaned)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize with the default help-center settings and no link resolution.
pub fn normalize(html: &str) -> String {
    Normalizer::new().normalize(html)
}

/// Detach every element matching [`NOISE_SELECTORS`]. Returns how many
/// subtrees were removed.
fn strip_noise(doc: &mut Html) -> usize {
    static NOISE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        NOISE_SELECTORS
            .iter()
            .map(|s| Selector::parse(s).expect("valid noise selector"))
            .collect()
    });

    let mut removed = 0;
    for selector in NOISE.iter() {
        let ids: Vec<_> = doc.select(selector).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }
    }
    removed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Help-center catalog client.
//!
//! Lists articles page by page and fetches each article's HTML body. Both
//! operations degrade instead of failing: listing returns whatever was
//! collected before an error, and a body fetch returns `None` so the caller
//! can count the article as failed and move on.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use helpsync_shared::{ArticleRef, HelpSyncError, Result, SourceConfig};

/// User-Agent string for catalog requests.
const USER_AGENT: &str = concat!("helpsync/", env!("CARGO_PKG_VERSION"));

/// Listing endpoint, relative to the help-center origin.
const ARTICLES_PATH: &str = "api/v2/help_center/articles.json";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One page of `GET /api/v2/help_center/articles.json`.
#[derive(Debug, Deserialize)]
struct ArticlePage {
    #[serde(default)]
    articles: Vec<ArticleRef>,
    /// URL of the next page, `null` on the last one.
    #[serde(default)]
    next_page: Option<String>,
}

/// `GET /api/v2/help_center/articles/{id}.json`.
#[derive(Debug, Deserialize)]
struct ArticleEnvelope {
    article: ArticleBody,
}

#[derive(Debug, Deserialize)]
struct ArticleBody {
    #[serde(default)]
    body: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Read-only client for the help-center articles API.
pub struct HelpCenterClient {
    client: Client,
    base_url: Url,
    page_size: usize,
    page_delay: Duration,
    list_timeout: Duration,
    fetch_timeout: Duration,
}

impl HelpCenterClient {
    /// Create a client from the `[source]` config section.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| HelpSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            page_size: config.page_size.max(1),
            page_delay: Duration::from_millis(config.page_delay_ms),
            list_timeout: Duration::from_secs(config.list_timeout_secs),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        })
    }

    /// The help-center origin, used to resolve relative links in bodies.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List up to `max_count` articles.
    ///
    /// Pagination stops at `max_count`, at an empty page, when the API reports
    /// no next page, or at the first failed request. Partial results are
    /// returned as-is.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn list_articles(&self, max_count: usize) -> Vec<ArticleRef> {
        let mut articles: Vec<ArticleRef> = Vec::new();
        let mut page: usize = 1;

        while articles.len() < max_count {
            let listing = match self.fetch_page(page).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(page, error = %e, "listing stopped early");
                    break;
                }
            };

            debug!(page, count = listing.articles.len(), "fetched listing page");

            if listing.articles.is_empty() {
                debug!(page, "empty page, no more articles");
                break;
            }

            articles.extend(listing.articles);

            if listing.next_page.is_none() {
                debug!(page, "no next page available");
                break;
            }

            page += 1;
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        articles.truncate(max_count);
        info!(count = articles.len(), "article listing complete");
        articles
    }

    /// Fetch the HTML body of one article.
    ///
    /// Returns `None` on a non-success status, a transport or decode error,
    /// or a missing/empty body.
    #[instrument(skip_all, fields(id = %article.id, title = %article.title))]
    pub async fn fetch_body(&self, article: &ArticleRef) -> Option<String> {
        match self.try_fetch_body(article).await {
            Ok(Some(body)) => {
                debug!(len = body.len(), "fetched article body");
                Some(body)
            }
            Ok(None) => {
                warn!("article has no body content");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch article body");
                None
            }
        }
    }

    async fn fetch_page(&self, page: usize) -> Result<ArticlePage> {
        let url = self
            .base_url
            .join(ARTICLES_PATH)
            .map_err(|e| HelpSyncError::parse(format!("invalid listing URL: {e}")))?;

        let response = self
            .client
            .get(url.as_str())
            .query(&[("page", page), ("per_page", self.page_size)])
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| HelpSyncError::Network(format!("{url} page {page}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HelpSyncError::Network(format!(
                "{url} page {page}: HTTP {status}"
            )));
        }

        response
            .json::<ArticlePage>()
            .await
            .map_err(|e| HelpSyncError::parse(format!("{url} page {page}: {e}")))
    }

    async fn try_fetch_body(&self, article: &ArticleRef) -> Result<Option<String>> {
        let url = self
            .base_url
            .join(&format!("api/v2/help_center/articles/{}.json", article.id))
            .map_err(|e| HelpSyncError::parse(format!("invalid article URL: {e}")))?;

        let response = self
            .client
            .get(url.as_str())
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| HelpSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HelpSyncError::Network(format!("{url}: HTTP {status}")));
        }

        let envelope: ArticleEnvelope = response
            .json()
            .await
            .map_err(|e| HelpSyncError::parse(format!("{url}: {e}")))?;

        Ok(envelope
            .article
            .body
            .filter(|body| !body.trim().is_empty()))
    }
}

/// Parse the configured origin, making sure relative joins keep its path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };

    let url = Url::parse(&with_slash)
        .map_err(|e| HelpSyncError::config(format!("invalid source base_url '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HelpSyncError::config(format!(
            "unsupported scheme '{other}' in source base_url"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpsync_shared::ArticleId;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> SourceConfig {
        SourceConfig {
            base_url: base_url.to_string(),
            page_size: 2,
            page_delay_ms: 0,
            article_delay_ms: 0,
            ..SourceConfig::default()
        }
    }

    fn listing(ids: &[u64], next: bool) -> serde_json::Value {
        let articles: Vec<_> = ids
            .iter()
            .map(|id| json!({ "id": id, "title": format!("Article {id}"), "draft": false }))
            .collect();
        json!({
            "articles": articles,
            "next_page": if next { json!("https://example.com/next") } else { json!(null) },
        })
    }

    async fn mount_page(server: &MockServer, page: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/v2/help_center/articles.json"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("https://help.example.com/hc").unwrap();
        assert_eq!(url.as_str(), "https://help.example.com/hc/");
        assert_eq!(
            url.join(ARTICLES_PATH).unwrap().as_str(),
            "https://help.example.com/hc/api/v2/help_center/articles.json"
        );
    }

    #[test]
    fn base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://help.example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[tokio::test]
    async fn list_follows_pages_until_last() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing(&[1, 2], true)).await;
        mount_page(&server, "2", listing(&[3], false)).await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        let articles = client.list_articles(40).await;

        let ids: Vec<_> = articles.iter().map(|a| a.id.0.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(articles[2].title, "Article 3");
    }

    #[tokio::test]
    async fn list_sends_identifying_headers_and_page_size() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/help_center/articles.json"))
            .and(query_param("per_page", "2"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[7], false)))
            .expect(1)
            .mount(&server)
            .await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        let articles = client.list_articles(10).await;
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn list_truncates_to_max_count() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing(&[1, 2], true)).await;
        mount_page(&server, "2", listing(&[3, 4], true)).await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        let articles = client.list_articles(3).await;

        assert_eq!(articles.len(), 3);
        assert_eq!(articles[2].id, ArticleId("3".into()));
    }

    #[tokio::test]
    async fn list_stops_on_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing(&[1, 2], true)).await;
        mount_page(&server, "2", listing(&[], true)).await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        assert_eq!(client.list_articles(40).await.len(), 2);
    }

    #[tokio::test]
    async fn list_keeps_partial_results_on_error() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing(&[1, 2], true)).await;
        Mock::given(method("GET"))
            .and(path("/api/v2/help_center/articles.json"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        let articles = client.list_articles(40).await;
        assert_eq!(articles.len(), 2);
    }

    #[tokio::test]
    async fn list_zero_max_count_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[1], false)))
            .expect(0)
            .mount(&server)
            .await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        assert!(client.list_articles(0).await.is_empty());
    }

    #[tokio::test]
    async fn fetch_body_returns_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/help_center/articles/42.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "article": { "id": 42, "body": "<p>Hello</p>" } }),
            ))
            .mount(&server)
            .await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        let article = ArticleRef {
            id: ArticleId("42".into()),
            title: "Hello".into(),
        };
        assert_eq!(client.fetch_body(&article).await.as_deref(), Some("<p>Hello</p>"));
    }

    #[tokio::test]
    async fn fetch_body_absent_on_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/help_center/articles/1.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "article": { "body": "  " } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/help_center/articles/2.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "article": {} })))
            .mount(&server)
            .await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        for id in ["1", "2"] {
            let article = ArticleRef {
                id: ArticleId(id.into()),
                title: "Empty".into(),
            };
            assert!(client.fetch_body(&article).await.is_none(), "article {id}");
        }
    }

    #[tokio::test]
    async fn fetch_body_absent_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/help_center/articles/9.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HelpCenterClient::new(&test_config(&server.uri())).unwrap();
        let article = ArticleRef {
            id: ArticleId("9".into()),
            title: "Missing".into(),
        };
        assert!(client.fetch_body(&article).await.is_none());
    }
}

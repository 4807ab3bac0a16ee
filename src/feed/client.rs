use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::feed::dto::ResponseEnvelope;
use crate::feed::{Article, NewsCategory};

/// Seam between the cache coordinator and the network. Production uses
/// [`RemoteFeedClient`]; tests substitute a scripted double.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch one page of articles for a category, preserving server order.
    async fn fetch_page(
        &self,
        category: NewsCategory,
        page: u32,
    ) -> Result<Vec<Article>, FetchError>;
}

/// HTTP client for the paged news provider.
///
/// Maps outcomes into the typed [`FetchError`] set and nothing more: retry
/// and fallback policy live in the coordinator, not here.
#[derive(Debug, Clone)]
pub struct RemoteFeedClient {
    client: Client,
    config: FeedConfig,
}

impl RemoteFeedClient {
    pub fn new(config: FeedConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn with_client(config: FeedConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn endpoint_url(&self, category: NewsCategory, page: u32) -> Result<url::Url, FetchError> {
        let base = format!("{}/v2/top-headlines", self.config.base_url.trim_end_matches('/'));
        let mut url = url::Url::parse(&base)
            .map_err(|e| FetchError::InvalidRequest(format!("bad base url: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apiKey", &self.config.api_key);
            query.append_pair("pageSize", &self.config.page_size.to_string());
            query.append_pair("country", &self.config.country);
            if let Some(token) = category.api_token() {
                query.append_pair("category", token);
            }
            query.append_pair("page", &page.to_string());
        }

        Ok(url)
    }
}

#[async_trait]
impl FeedClient for RemoteFeedClient {
    async fn fetch_page(
        &self,
        category: NewsCategory,
        page: u32,
    ) -> Result<Vec<Article>, FetchError> {
        if self.config.api_key.is_empty() {
            return Err(FetchError::InvalidRequest(
                "API key is not configured".to_string(),
            ));
        }

        let url = self.endpoint_url(category, page)?;
        debug!(category = category.as_str(), page, "Fetching feed page");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_connect() {
                FetchError::NoConnectivity
            } else {
                FetchError::Unknown(e.to_string())
            }
        })?;

        let status = response.status();
        match status.as_u16() {
            200..=299 => {
                let envelope: ResponseEnvelope = response
                    .json()
                    .await
                    .map_err(|e| FetchError::Decoding(e.to_string()))?;

                let articles = envelope.into_articles();
                debug!(
                    category = category.as_str(),
                    page,
                    count = articles.len(),
                    "Fetched feed page"
                );
                Ok(articles)
            }
            401 => Err(FetchError::Auth),
            429 => {
                warn!(category = category.as_str(), page, "Rate limited by provider");
                Err(FetchError::RateLimit)
            }
            code => Err(FetchError::Server(code)),
        }
    }
}

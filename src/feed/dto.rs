use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::feed::Article;

/// JSON envelope returned by the news provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub status: String,
    #[serde(rename = "totalResults")]
    pub total_results: i64,
    pub articles: Vec<ArticleDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArticleDto {
    pub source: SourceDto,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "urlToImage")]
    pub url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDto {
    pub id: Option<String>,
    pub name: String,
}

impl ArticleDto {
    pub fn into_article(self) -> Article {
        Article {
            title: self.title,
            description: self.description,
            content: self.content,
            author: self.author,
            url: self.url,
            url_to_image: self.url_to_image,
            published_at: self.published_at,
            source_name: self.source.name,
        }
    }
}

impl ResponseEnvelope {
    /// Flatten the envelope into domain articles, preserving server order.
    pub fn into_articles(self) -> Vec<Article> {
        self.articles
            .into_iter()
            .map(ArticleDto::into_article)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "status": "ok",
        "totalResults": 2,
        "articles": [
            {
                "source": {"id": "the-verge", "name": "The Verge"},
                "author": "Jane Doe",
                "title": "First article",
                "description": "A description",
                "url": "https://example.com/first",
                "urlToImage": "https://example.com/first.jpg",
                "publishedAt": "2024-03-15T10:00:00Z",
                "content": "Full content"
            },
            {
                "source": {"id": null, "name": "Wire"},
                "author": null,
                "title": "Second article",
                "description": null,
                "url": "https://example.com/second",
                "urlToImage": null,
                "publishedAt": "2024-03-15T11:30:00Z",
                "content": null
            }
        ]
    }"#;

    #[test]
    fn test_decode_envelope() {
        let envelope: ResponseEnvelope = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        assert_eq!(envelope.status, "ok");
        assert_eq!(envelope.total_results, 2);
        assert_eq!(envelope.articles.len(), 2);
    }

    #[test]
    fn test_into_articles_preserves_order_and_optionals() {
        let envelope: ResponseEnvelope = serde_json::from_str(SAMPLE_RESPONSE).unwrap();
        let articles = envelope.into_articles();

        assert_eq!(articles[0].title, "First article");
        assert_eq!(articles[0].author.as_deref(), Some("Jane Doe"));
        assert_eq!(articles[0].source_name, "The Verge");

        assert_eq!(articles[1].title, "Second article");
        assert_eq!(articles[1].author, None);
        assert_eq!(articles[1].description, None);
        assert_eq!(articles[1].url_to_image, None);
        assert_eq!(articles[1].source_name, "Wire");
    }

    #[test]
    fn test_decode_rejects_missing_required_fields() {
        let missing_url = r#"{
            "status": "ok",
            "totalResults": 1,
            "articles": [{
                "source": {"id": null, "name": "Wire"},
                "title": "No url here",
                "publishedAt": "2024-03-15T11:30:00Z"
            }]
        }"#;
        assert!(serde_json::from_str::<ResponseEnvelope>(missing_url).is_err());
    }
}

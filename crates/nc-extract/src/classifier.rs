//! The classifier client contract (§4.3/§9): request/response shapes and
//! the trait seam a real ML service sits behind. No model logic lives
//! here — this crate only knows how to ask and how to interpret the
//! answer.

use async_trait::async_trait;
use nc_domain::{Article, RawContent, Relevance};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ExtractError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRequest {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
}

impl From<&RawContent> for ClassificationRequest {
    fn from(content: &RawContent) -> Self {
        Self { id: content.id.clone(), title: content.title.clone(), body: content.raw_text.clone(), url: content.url.clone() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationResponse {
    pub topic_tags: Vec<String>,
    pub quality_score: i16,
    pub crime_sub_type: Option<String>,
    pub relevance: Relevance,
    pub review_required: bool,
    pub category: Option<String>,
    pub section: Option<String>,
}

impl ClassificationResponse {
    /// Merges a classification result onto the raw content it classified.
    pub fn into_article(self, raw: RawContent, tags: Vec<String>, intro: Option<String>, byline: Option<String>) -> Article {
        Article {
            raw,
            topic_tags: self.topic_tags,
            quality_score: self.quality_score,
            crime_sub_type: self.crime_sub_type,
            relevance: self.relevance,
            review_required: self.review_required,
            category: self.category,
            section: self.section,
            tags,
            intro,
            byline,
        }
    }
}

#[async_trait]
pub trait ClassifierClient: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<ClassificationResponse>;
}

/// Thin HTTP client posting to a classifier service's `/classify`
/// endpoint. The service itself (model, features, training) is entirely
/// out of scope here — this only knows the wire contract.
pub struct HttpClassifierClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpClassifierClient {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder().timeout(timeout).build().expect("reqwest client configuration is static and always valid");
        Self { http, endpoint }
    }
}

#[async_trait]
impl ClassifierClient for HttpClassifierClient {
    async fn classify(&self, request: &ClassificationRequest) -> Result<ClassificationResponse> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        if !response.status().is_success() {
            return Err(ExtractError::ClassifierResponse(format!("classifier returned http {}", response.status())));
        }
        response.json::<ClassificationResponse>().await.map_err(ExtractError::Classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn classifies_via_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "topic_tags": ["crime"],
                "quality_score": 80,
                "crime_sub_type": null,
                "relevance": "direct",
                "review_required": false,
                "category": null,
                "section": null,
            })))
            .mount(&server)
            .await;

        let client = HttpClassifierClient::new(format!("{}/classify", server.uri()), Duration::from_secs(5));
        let request = ClassificationRequest { id: "1".to_string(), title: "T".to_string(), body: "B".to_string(), url: "https://e.com/a".to_string() };
        let response = client.classify(&request).await.unwrap();
        assert_eq!(response.quality_score, 80);
        assert_eq!(response.topic_tags, vec!["crime".to_string()]);
    }
}

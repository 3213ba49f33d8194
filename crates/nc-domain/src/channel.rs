//! Delivery channels, routing rules, and publish history.

use crate::content::{Article, ContentType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Filters applied before an article is delivered to a channel. Empty
/// rules (all fields absent/empty) match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChannelRules {
    /// Any-match: article must carry at least one of these topics, if set.
    #[serde(default)]
    pub include_topics: Vec<String>,
    /// None-match: article must carry none of these topics.
    #[serde(default)]
    pub exclude_topics: Vec<String>,
    pub min_quality_score: Option<i16>,
    #[serde(default)]
    pub content_types: Vec<ContentType>,
}

impl ChannelRules {
    pub fn matches(&self, article: &Article, content_type: ContentType) -> bool {
        if !self.include_topics.is_empty()
            && !self
                .include_topics
                .iter()
                .any(|t| article.topic_tags.contains(t))
        {
            return false;
        }
        if self
            .exclude_topics
            .iter()
            .any(|t| article.topic_tags.contains(t))
        {
            return false;
        }
        if let Some(min) = self.min_quality_score {
            if article.quality_score < min {
                return false;
            }
        }
        if !self.content_types.is_empty() && !self.content_types.contains(&content_type) {
            return false;
        }
        true
    }
}

/// A delivery target.
///
/// Layer 1 channels (`articles:{topic}`) are materialized implicitly, one
/// per known topic, and never stored as rows. This struct represents a
/// Layer 2 (explicit) channel row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub redis_channel: String,
    pub description: Option<String>,
    pub enabled: bool,
    #[sqlx(json)]
    pub rules: ChannelRules,
    pub created_at: DateTime<Utc>,
}

/// Layer 1 implicit channel name for a topic.
pub fn layer1_channel_name(topic: &str) -> String {
    format!("articles:{topic}")
}

/// Gates which source-channel pairs deliver, and with what additional
/// filters beyond the channel's own rules. Unique by `(source_id,
/// channel_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Route {
    pub id: Uuid,
    pub source_id: Uuid,
    pub channel_id: Uuid,
    pub enabled: bool,
    pub min_quality_score: Option<i16>,
    pub topics: Vec<String>,
}

impl Route {
    pub fn matches(&self, article: &Article) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(min) = self.min_quality_score {
            if article.quality_score < min {
                return false;
            }
        }
        if !self.topics.is_empty() && !self.topics.iter().any(|t| article.topic_tags.contains(t)) {
            return false;
        }
        true
    }
}

/// Publisher-owned idempotent delivery record, keyed on
/// `(article_id, channel_name)` so a retried publish never double-sends.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct PublishHistoryItem {
    pub id: Uuid,
    pub article_id: String,
    pub channel_name: String,
    pub article_title: String,
    pub article_url: String,
    pub quality_score: i16,
    pub topics: Vec<String>,
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ClassificationStatus, JsonLdValue, RawContent, Relevance};
    use std::collections::BTreeMap;

    fn article_with(topic_tags: Vec<&str>, quality_score: i16) -> Article {
        Article {
            raw: RawContent {
                id: "abc".to_string(),
                source_id: Uuid::new_v4(),
                url: "https://e.com/a".to_string(),
                source_name: "Example".to_string(),
                title: "Headline".to_string(),
                raw_text: "body".to_string(),
                raw_html: "<html></html>".to_string(),
                description: None,
                keywords: vec![],
                og: JsonLdValue::default(),
                twitter: JsonLdValue::default(),
                json_ld: JsonLdValue::default(),
                author: None,
                published_date: None,
                canonical_url: None,
                article_section: None,
                crawled_at: Utc::now(),
                word_count: 100,
                classification_status: ClassificationStatus::Classified,
                meta: BTreeMap::new(),
            },
            topic_tags: topic_tags.into_iter().map(str::to_string).collect(),
            quality_score,
            crime_sub_type: None,
            relevance: Relevance::Direct,
            review_required: false,
            category: None,
            section: None,
            tags: vec![],
            intro: None,
            byline: None,
        }
    }

    #[test]
    fn empty_rules_match_everything() {
        let rules = ChannelRules::default();
        let article = article_with(vec!["crime"], 10);
        assert!(rules.matches(&article, ContentType::Article));
    }

    #[test]
    fn include_topics_is_any_match() {
        let rules = ChannelRules {
            include_topics: vec!["politics".to_string(), "crime".to_string()],
            ..Default::default()
        };
        assert!(rules.matches(&article_with(vec!["crime"], 50), ContentType::Article));
        assert!(!rules.matches(&article_with(vec!["sports"], 50), ContentType::Article));
    }

    #[test]
    fn exclude_topics_is_none_match() {
        let rules = ChannelRules {
            exclude_topics: vec!["opinion".to_string()],
            ..Default::default()
        };
        assert!(!rules.matches(&article_with(vec!["opinion", "crime"], 50), ContentType::Article));
    }

    #[test]
    fn min_quality_score_filters() {
        let rules = ChannelRules {
            min_quality_score: Some(60),
            ..Default::default()
        };
        assert!(!rules.matches(&article_with(vec![], 50), ContentType::Article));
        assert!(rules.matches(&article_with(vec![], 70), ContentType::Article));
    }

    #[test]
    fn layer1_channel_name_format() {
        assert_eq!(layer1_channel_name("crime"), "articles:crime");
    }

    #[test]
    fn disabled_route_never_matches() {
        let route = Route {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            enabled: false,
            min_quality_score: None,
            topics: vec![],
        };
        assert!(!route.matches(&article_with(vec![], 100)));
    }
}

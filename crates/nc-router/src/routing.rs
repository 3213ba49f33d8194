//! §4.5: maps a classified article onto the set of channel deliveries it
//! should fan out to.
//!
//! Layer 1 (implicit topic channels) is computed directly from
//! [`KNOWN_TOPICS`] with no storage round-trip. Layer 2 (operator-defined
//! channels) is gated by an enabled [`Route`] joining the article's
//! source to the channel, on top of the channel's own [`ChannelRules`].

use nc_domain::{layer1_channel_name, Article, Channel, ContentType, Route};

/// Fixed alphabetical set of topics that get an auto-provisioned
/// `articles:{topic}` channel. Topics outside this set are still stored
/// on the article but never fan out to a Layer 1 channel.
pub const KNOWN_TOPICS: &[&str] = &[
    "business",
    "criminal_justice",
    "drug_crime",
    "education",
    "entertainment",
    "health",
    "local_news",
    "organized_crime",
    "politics",
    "property_crime",
    "sports",
    "technology",
    "violent_crime",
    "weather",
];

/// One fanout target: a channel name (used as the `PublishHistoryItem`
/// key) paired with the transport-level pub/sub channel to publish on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel_name: String,
    pub redis_channel: String,
}

/// A Layer 2 channel considered for routing, paired with the enabled
/// [`Route`] gating it for the article's source. Callers build this list
/// from `RouteRepository::find_enabled_for_source` (which already joins
/// against enabled channels) plus the matching `Channel` rows.
pub struct RouteCandidate<'a> {
    pub channel: &'a Channel,
    pub route: &'a Route,
}

/// Computes every delivery a classified article fans out to.
///
/// `route_candidates` must already be scoped to the article's source —
/// Layer 2 fanout with no matching enabled route for that source never
/// fires, even if the channel's own rules would otherwise match (§4.5:
/// "a delivery is only emitted if an enabled Route(source_id, C.id)
/// exists").
pub fn route(article: &Article, content_type: ContentType, route_candidates: &[RouteCandidate<'_>]) -> Vec<Delivery> {
    let mut deliveries = Vec::new();

    for topic in &article.topic_tags {
        if KNOWN_TOPICS.contains(&topic.as_str()) {
            let name = layer1_channel_name(topic);
            deliveries.push(Delivery { channel_name: name.clone(), redis_channel: name });
        }
    }

    for candidate in route_candidates {
        if !candidate.channel.enabled {
            continue;
        }
        if !candidate.channel.rules.matches(article, content_type) {
            continue;
        }
        if !candidate.route.matches(article) {
            continue;
        }
        deliveries.push(Delivery {
            channel_name: candidate.channel.name.clone(),
            redis_channel: candidate.channel.redis_channel.clone(),
        });
    }

    deliveries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nc_domain::{ChannelRules, ClassificationStatus, JsonLdValue, RawContent, Relevance};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn article_with(topics: &[&str], quality: i16) -> Article {
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
            topic_tags: topics.iter().map(|s| s.to_string()).collect(),
            quality_score: quality,
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

    fn channel(rules: ChannelRules) -> Channel {
        Channel {
            id: Uuid::new_v4(),
            name: "custom".to_string(),
            slug: "custom".to_string(),
            redis_channel: "nc:channel:custom".to_string(),
            description: None,
            enabled: true,
            rules,
            created_at: Utc::now(),
        }
    }

    fn route_for(channel_id: Uuid) -> Route {
        Route {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            channel_id,
            enabled: true,
            min_quality_score: None,
            topics: vec![],
        }
    }

    #[test]
    fn layer1_fanout_only_for_known_topics() {
        let article = article_with(&["violent_crime", "not_a_real_topic"], 50);
        let deliveries = route(&article, ContentType::Article, &[]);
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].channel_name, "articles:violent_crime");
    }

    #[test]
    fn layer1_and_layer2_fanout_combine() {
        let article = article_with(&["violent_crime", "local_news"], 85);
        let rules = ChannelRules { include_topics: vec!["violent_crime".to_string()], min_quality_score: Some(80), ..Default::default() };
        let c = channel(rules);
        let r = route_for(c.id);
        let candidates = vec![RouteCandidate { channel: &c, route: &r }];

        let deliveries = route(&article, ContentType::Article, &candidates);
        assert_eq!(deliveries.len(), 3);
        assert!(deliveries.iter().any(|d| d.channel_name == "articles:violent_crime"));
        assert!(deliveries.iter().any(|d| d.channel_name == "articles:local_news"));
        assert!(deliveries.iter().any(|d| d.channel_name == "custom"));
    }

    #[test]
    fn disabled_route_blocks_layer2_even_if_rules_match() {
        let article = article_with(&["violent_crime"], 90);
        let c = channel(ChannelRules::default());
        let mut r = route_for(c.id);
        r.enabled = false;
        let candidates = vec![RouteCandidate { channel: &c, route: &r }];

        let deliveries = route(&article, ContentType::Article, &candidates);
        assert!(!deliveries.iter().any(|d| d.channel_name == "custom"));
    }

    #[test]
    fn route_topics_intersection_is_required_beyond_channel_rules() {
        let article = article_with(&["sports"], 90);
        let c = channel(ChannelRules::default());
        let mut r = route_for(c.id);
        r.topics = vec!["politics".to_string()];
        let candidates = vec![RouteCandidate { channel: &c, route: &r }];

        let deliveries = route(&article, ContentType::Article, &candidates);
        assert!(!deliveries.iter().any(|d| d.channel_name == "custom"));
    }
}

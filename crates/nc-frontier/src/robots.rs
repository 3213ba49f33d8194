//! Per-host robots.txt caching (§4.2: "`robots.txt` is cached per host
//! for `robots_ttl_hours`; disallowed URLs are completed with outcome
//! `skipped`").

use chrono::Utc;
use nc_storage::HostStateRepository;
use robotstxt::DefaultMatcher;
use tracing::{debug, warn};

use crate::error::Result;

pub struct RobotsCache {
    host_state: HostStateRepository,
    http: reqwest::Client,
    user_agent: String,
}

impl RobotsCache {
    pub fn new(host_state: HostStateRepository, http: reqwest::Client, user_agent: String) -> Self {
        Self { host_state, http, user_agent }
    }

    /// Returns `true` if `url` on `host` may be fetched by this crawler's
    /// user agent, refreshing the cached robots.txt first if it's stale
    /// or missing.
    pub async fn is_allowed(&self, host: &str, url: &str) -> Result<bool> {
        let mut state = self.host_state.get_or_create(host).await?;

        if state.robots_is_stale(Utc::now()) {
            match self.fetch_robots_txt(host).await {
                Ok(body) => {
                    self.host_state.update_robots(host, &body, Utc::now()).await?;
                    state.robots_txt = Some(body);
                    state.robots_fetched_at = Some(Utc::now());
                }
                Err(e) => {
                    // A robots.txt that 404s or times out does not block
                    // the crawl; we fall back to "allow" and retry next TTL.
                    warn!(host, error = %e, "failed to fetch robots.txt, allowing by default");
                    return Ok(true);
                }
            }
        }

        let Some(robots_txt) = state.robots_txt.as_deref() else {
            return Ok(true);
        };

        let mut matcher = DefaultMatcher::default();
        let allowed = matcher.one_agent_allowed_by_robots(robots_txt, &self.user_agent, url);
        debug!(host, url, allowed, "robots.txt check");
        Ok(allowed)
    }

    async fn fetch_robots_txt(&self, host: &str) -> Result<String> {
        let url = format!("https://{host}/robots.txt");
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Ok(String::new());
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use robotstxt::DefaultMatcher;

    #[test]
    fn disallowed_path_is_rejected() {
        let robots_txt = "User-agent: *\nDisallow: /private/\n";
        let mut matcher = DefaultMatcher::default();
        assert!(!matcher.one_agent_allowed_by_robots(robots_txt, "NewsroomPipelineBot", "https://e.com/private/a"));
        assert!(matcher.one_agent_allowed_by_robots(robots_txt, "NewsroomPipelineBot", "https://e.com/public/a"));
    }
}

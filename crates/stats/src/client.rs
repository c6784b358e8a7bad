//! Blocking HTTP client for the statistics API and headshot CDN.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use nbaflow_core::{FetchError, FetchResult};

pub const DEFAULT_STATS_BASE_URL: &str = "https://stats.nba.com/stats";
pub const DEFAULT_HEADSHOT_URL: &str =
    "https://cdn.nba.com/headshots/nba/latest/1040x760/<player_id>.png";
pub const PLAYER_ID_PLACEHOLDER: &str = "<player_id>";

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0 Safari/537.36"
);

/// Where requests go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Endpoint root, without trailing slash
    pub base_url: String,
    /// Headshot URL containing `<player_id>`
    pub headshot_url: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STATS_BASE_URL.to_string(),
            headshot_url: DEFAULT_HEADSHOT_URL.to_string(),
        }
    }
}

impl StatsConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_headshot_url(mut self, url: impl Into<String>) -> Self {
        self.headshot_url = url.into();
        self
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    pub fn headshot_url_for(&self, player_id: impl std::fmt::Display) -> FetchResult<String> {
        if !self.headshot_url.contains(PLAYER_ID_PLACEHOLDER) {
            return Err(FetchError::invalid_request(format!(
                "headshot url has no {PLAYER_ID_PLACEHOLDER} placeholder: {}",
                self.headshot_url
            )));
        }
        Ok(self
            .headshot_url
            .replace(PLAYER_ID_PLACEHOLDER, &player_id.to_string()))
    }
}

/// One connection pool shared by every request type.
///
/// Each call carries its own timeout so the executor can escalate it.
#[derive(Debug, Clone)]
pub struct StatsClient {
    http: Client,
    config: StatsConfig,
}

impl StatsClient {
    pub fn new(config: StatsConfig) -> FetchResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers())
            .build()
            .map_err(|e| FetchError::transport(format!("failed to build http client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// GET an endpoint and parse the body as JSON.
    pub fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> FetchResult<Value> {
        let url = self.config.endpoint_url(endpoint);
        debug!(%url, timeout_secs = timeout.as_secs_f64(), "requesting endpoint");

        let response = self
            .http
            .get(&url)
            .query(query)
            .timeout(timeout)
            .send()
            .map_err(|e| classify(e, timeout))?;

        check_status(response, &url)?
            .json::<Value>()
            .map_err(|e| classify(e, timeout))
    }

    /// GET raw bytes from an absolute URL.
    pub fn get_bytes(&self, url: &str, timeout: Duration) -> FetchResult<Vec<u8>> {
        debug!(%url, timeout_secs = timeout.as_secs_f64(), "requesting bytes");

        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| classify(e, timeout))?;

        let bytes = check_status(response, url)?
            .bytes()
            .map_err(|e| classify(e, timeout))?;
        Ok(bytes.to_vec())
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert("x-nba-stats-origin", HeaderValue::from_static("stats"));
    headers.insert("x-nba-stats-token", HeaderValue::from_static("true"));
    headers
}

fn check_status(response: Response, url: &str) -> FetchResult<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::http(status.as_u16(), url));
    }
    Ok(response)
}

/// Map a transport error onto the fetch taxonomy. Only timeouts stay
/// retryable.
fn classify(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::timeout(timeout)
    } else if let Some(status) = err.status() {
        FetchError::http(
            status.as_u16(),
            err.url().map(|u| u.to_string()).unwrap_or_default(),
        )
    } else if err.is_decode() {
        FetchError::decode(err.to_string())
    } else if err.is_builder() {
        FetchError::invalid_request(err.to_string())
    } else {
        FetchError::transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_joins_without_double_slash() {
        let config = StatsConfig::default().with_base_url("https://stats.test/stats/");
        assert_eq!(
            config.endpoint_url("playergamelog"),
            "https://stats.test/stats/playergamelog"
        );
    }

    #[test]
    fn headshot_url_substitutes_player_id() {
        let config = StatsConfig::default();
        assert_eq!(
            config.headshot_url_for(2544).unwrap(),
            "https://cdn.nba.com/headshots/nba/latest/1040x760/2544.png"
        );
    }

    #[test]
    fn headshot_url_without_placeholder_is_fatal() {
        let config = StatsConfig::default().with_headshot_url("https://cdn.test/static.png");
        let err = config.headshot_url_for(2544).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
        assert!(!err.is_timeout());
    }

    #[test]
    fn client_builds_with_default_config() {
        let client = StatsClient::new(StatsConfig::default()).unwrap();
        assert_eq!(client.config().base_url, DEFAULT_STATS_BASE_URL);
    }
}

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use edubridge_common::{Error, Result};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const DUCKDUCKGO_URL: &str = "https://duckduckgo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; EduBridge/0.1)";

static VQD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"vqd=["']?([0-9-]+)["']?"#).expect("valid vqd regex"));

/// One video search hit. Fields missing upstream fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoResult {
    pub title: String,
    pub link: String,
    pub thumbnail: String,
    pub duration: String,
    pub channel: String,
}

impl Default for VideoResult {
    fn default() -> Self {
        Self {
            title: String::new(),
            link: String::new(),
            thumbnail: String::new(),
            duration: "Active".to_string(),
            channel: "YouTube".to_string(),
        }
    }
}

#[async_trait]
pub trait VideoSearcher: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoResult>>;
}

/// Video search through DuckDuckGo's unauthenticated JSON endpoint.
///
/// A search takes two requests: the HTML page hands out a `vqd` token, which
/// `v.js` then requires.
pub struct DuckDuckGoVideoSearcher {
    client: Client,
    base_url: String,
}

impl DuckDuckGoVideoSearcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Media(format!("failed to build search client: {e}")))?;
        Ok(Self {
            client,
            base_url: DUCKDUCKGO_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}{}", self.base_url, path), params)
            .map_err(|e| Error::Media(format!("invalid search url: {e}")))
    }

    async fn fetch_vqd(&self, query: &str) -> Result<String> {
        let url = self.endpoint("/", &[("q", query)])?;
        let body = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Media(format!("video search token request failed: {e}")))?
            .text()
            .await
            .map_err(|e| Error::Media(format!("video search token read failed: {e}")))?;

        VQD_RE
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::Media("video search token not found".to_string()))
    }
}

#[async_trait]
impl VideoSearcher for DuckDuckGoVideoSearcher {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoResult>> {
        let vqd = self.fetch_vqd(query).await?;
        let url = self.endpoint(
            "/v.js",
            &[
                ("l", "us-en"),
                ("o", "json"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("f", ",,,"),
                ("p", "1"),
            ],
        )?;

        let response = self
            .client
            .get(url)
            .header("Referer", format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Media(format!("video search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Media(format!(
                "video search error: status={}",
                status.as_u16()
            )));
        }

        let page: DdgVideoPage = response
            .json()
            .await
            .map_err(|e| Error::Media(format!("failed to parse video search results: {e}")))?;

        let results: Vec<VideoResult> = page
            .results
            .into_iter()
            .take(limit)
            .map(VideoResult::from)
            .collect();
        debug!("video search '{}': {} results", query, results.len());
        Ok(results)
    }
}

#[derive(Deserialize)]
struct DdgVideoPage {
    #[serde(default)]
    results: Vec<DdgVideo>,
}

#[derive(Deserialize)]
struct DdgVideo {
    title: Option<String>,
    content: Option<String>,
    images: Option<DdgImages>,
    duration: Option<String>,
    publisher: Option<String>,
}

#[derive(Deserialize)]
struct DdgImages {
    large: Option<String>,
    medium: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<DdgVideo> for VideoResult {
    fn from(video: DdgVideo) -> Self {
        let defaults = VideoResult::default();
        let thumbnail = video
            .images
            .and_then(|i| non_empty(i.large).or(non_empty(i.medium)))
            .unwrap_or_default();
        Self {
            title: video.title.unwrap_or_default(),
            link: video.content.unwrap_or_default(),
            thumbnail,
            duration: non_empty(video.duration).unwrap_or(defaults.duration),
            channel: non_empty(video.publisher).unwrap_or(defaults.channel),
        }
    }
}

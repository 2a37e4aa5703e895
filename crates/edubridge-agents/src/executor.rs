use std::sync::Arc;

use edubridge_media::VideoSearcher;
use tracing::{debug, warn};

use crate::interpreter::{ToolDirective, VideoSearchPayload};

pub const DEFAULT_SEARCH_LIMIT: usize = 4;

/// Runs the side effects a directive asks for.
///
/// Only video search does any work today; every other directive passes
/// through untouched. Failures never escape: the directive comes back as it
/// went in.
pub struct ToolExecutor {
    searcher: Arc<dyn VideoSearcher>,
    limit: usize,
}

impl ToolExecutor {
    pub fn new(searcher: Arc<dyn VideoSearcher>) -> Self {
        Self {
            searcher,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub async fn execute(&self, directive: ToolDirective) -> ToolDirective {
        match directive {
            ToolDirective::VideoSearch(VideoSearchPayload::Query(query)) => {
                self.search(query).await
            }
            other => other,
        }
    }

    async fn search(&self, query: String) -> ToolDirective {
        if looks_like_url(&query) {
            warn!(
                "video search query looks like a URL, results may be poor: {}",
                query
            );
        }

        match self.searcher.search(&query, self.limit).await {
            Ok(results) => {
                debug!("video search for '{}' returned {} results", query, results.len());
                ToolDirective::VideoSearch(VideoSearchPayload::Results(results))
            }
            Err(e) => {
                warn!("video search for '{}' failed: {}", query, e);
                ToolDirective::VideoSearch(VideoSearchPayload::Query(query))
            }
        }
    }
}

fn looks_like_url(query: &str) -> bool {
    let q = query.trim().to_ascii_lowercase();
    q.starts_with("http://") || q.starts_with("https://") || q.starts_with("www.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edubridge_common::{Error, Result};
    use edubridge_media::VideoResult;
    use std::sync::Mutex;

    struct FakeSearcher {
        results: Vec<VideoResult>,
        seen: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl VideoSearcher for FakeSearcher {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<VideoResult>> {
            self.seen.lock().unwrap().push((query.to_string(), limit));
            Ok(self.results.clone())
        }
    }

    struct BrokenSearcher;

    #[async_trait]
    impl VideoSearcher for BrokenSearcher {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<VideoResult>> {
            Err(Error::Media("search backend unreachable".into()))
        }
    }

    fn result(title: &str) -> VideoResult {
        VideoResult {
            title: title.to_string(),
            link: format!("https://youtube.com/watch?v={title}"),
            ..VideoResult::default()
        }
    }

    #[tokio::test]
    async fn query_is_replaced_by_results() {
        let searcher = Arc::new(FakeSearcher {
            results: vec![result("a"), result("b")],
            seen: Mutex::new(Vec::new()),
        });
        let executor = ToolExecutor::new(searcher.clone());

        let out = executor
            .execute(ToolDirective::VideoSearch(VideoSearchPayload::Query(
                "gravity for kids".into(),
            )))
            .await;

        match out {
            ToolDirective::VideoSearch(VideoSearchPayload::Results(results)) => {
                assert_eq!(results.len(), 2);
            }
            other => panic!("expected results, got {other:?}"),
        }
        assert_eq!(
            searcher.seen.lock().unwrap().as_slice(),
            &[("gravity for kids".to_string(), DEFAULT_SEARCH_LIMIT)]
        );
    }

    #[tokio::test]
    async fn empty_results_still_count_as_success() {
        let executor = ToolExecutor::new(Arc::new(FakeSearcher {
            results: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }));
        let out = executor
            .execute(ToolDirective::VideoSearch(VideoSearchPayload::Query("x".into())))
            .await;
        assert_eq!(
            out,
            ToolDirective::VideoSearch(VideoSearchPayload::Results(Vec::new()))
        );
    }

    #[tokio::test]
    async fn failed_search_leaves_query_in_place() {
        let executor = ToolExecutor::new(Arc::new(BrokenSearcher));
        let directive = ToolDirective::VideoSearch(VideoSearchPayload::Query("volcanoes".into()));
        assert_eq!(executor.execute(directive.clone()).await, directive);
    }

    #[tokio::test]
    async fn url_queries_are_still_searched() {
        let searcher = Arc::new(FakeSearcher {
            results: vec![result("c")],
            seen: Mutex::new(Vec::new()),
        });
        let executor = ToolExecutor::new(searcher.clone()).with_limit(2);
        executor
            .execute(ToolDirective::VideoSearch(VideoSearchPayload::Query(
                "https://youtube.com/watch?v=abc".into(),
            )))
            .await;
        assert_eq!(searcher.seen.lock().unwrap()[0].1, 2);
    }

    #[tokio::test]
    async fn other_directives_pass_through() {
        let executor = ToolExecutor::new(Arc::new(BrokenSearcher));
        let directive = ToolDirective::Diagram {
            spec: "graph TD; A-->B".into(),
        };
        assert_eq!(executor.execute(directive.clone()).await, directive);
    }

    #[test]
    fn url_detection() {
        assert!(looks_like_url("https://example.com"));
        assert!(looks_like_url("  www.youtube.com/x"));
        assert!(!looks_like_url("photosynthesis for kids"));
    }
}

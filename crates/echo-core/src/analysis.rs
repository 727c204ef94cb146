//! Analysis collaborator — the remote service that turns a recording plus
//! its description into transcript, summary, quote and sentiment.
//!
//! The store depends only on the request/response shape. `HttpAnalysisClient`
//! speaks it over multipart HTTP using reqwest; tests swap in fakes.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AnalysisError;
use crate::types::{AnalysisResult, Highlight, RECORDING_FILENAME};

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Submit one recording and its description for analysis.
    async fn analyze(
        &self,
        recording: &Path,
        description: &str,
    ) -> Result<AnalysisResult, AnalysisError>;

    /// Pick one highlight from parallel lists of summaries and quotes.
    async fn highlight(
        &self,
        summaries: &[Option<String>],
        quotes: &[Option<String>],
    ) -> Result<Highlight, AnalysisError>;
}

// ── HTTP client ──

pub struct HttpAnalysisClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAnalysisClient {
    /// No request timeout is set here; bounding the wait is `AnalysisPolicy`'s job.
    pub fn new(base_url: &str) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .user_agent("echo-journal/0.1")
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        Self::new(&config.backend_host)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_form(&self, path: &str, form: Form) -> Result<String, AnalysisError> {
        let url = self.endpoint(path);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(
        &self,
        recording: &Path,
        description: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let audio = tokio::fs::read(recording).await?;
        info!(
            "analyze request: {} bytes of audio, {} chars of description",
            audio.len(),
            description.len()
        );

        let file = Part::bytes(audio)
            .file_name(RECORDING_FILENAME)
            .mime_str("audio/m4a")?;
        let form = Form::new()
            .part("file", file)
            .text("description", description.to_string());

        let body = self.post_form("analyze", form).await?;
        parse_analysis(&body)
    }

    async fn highlight(
        &self,
        summaries: &[Option<String>],
        quotes: &[Option<String>],
    ) -> Result<Highlight, AnalysisError> {
        // The endpoint takes each list as a JSON-encoded form field.
        let summaries =
            serde_json::to_string(summaries).map_err(|e| AnalysisError::Parse(e.to_string()))?;
        let quotes =
            serde_json::to_string(quotes).map_err(|e| AnalysisError::Parse(e.to_string()))?;
        let form = Form::new().text("summaries", summaries).text("quotes", quotes);

        let body = self.post_form("highlight", form).await?;
        serde_json::from_str(&body).map_err(|e| AnalysisError::Parse(e.to_string()))
    }
}

fn parse_analysis(body: &str) -> Result<AnalysisResult, AnalysisError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| AnalysisError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(AnalysisError::Parse(format!(
            "expected a JSON object, got: {}",
            body.chars().take(100).collect::<String>()
        )));
    }
    serde_json::from_value(value).map_err(|e| AnalysisError::Parse(e.to_string()))
}

// ── Retry / timeout policy ──

/// How long to wait for the collaborator and how often to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisPolicy {
    /// Bound on a single attempt; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Total attempts, at least 1.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(120)),
            max_attempts: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

impl AnalysisPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.analysis_timeout(),
            max_attempts: config.analysis_max_attempts.max(1),
            backoff: Duration::from_millis(config.analysis_retry_backoff_ms),
        }
    }

    /// Run `call` under this policy, returning the first success or the last error.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<T, AnalysisError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, call()).await {
                    Ok(result) => result,
                    Err(_) => Err(AnalysisError::Timeout(limit)),
                },
                None => call().await,
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("Analysis attempt {}/{} failed, retrying: {}", attempt, attempts, e);
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_analysis_full() {
        let body = r#"{"transcript": "I went outside.", "summary": "A walk.", "sentiment": "calm", "quote": "I went outside."}"#;
        let result = parse_analysis(body).unwrap();
        assert_eq!(result.transcript.as_deref(), Some("I went outside."));
        assert_eq!(result.summary.as_deref(), Some("A walk."));
        assert_eq!(result.quote.as_deref(), Some("I went outside."));
        assert_eq!(result.sentiment.as_deref(), Some("calm"));
    }

    #[test]
    fn test_parse_analysis_rejects_garbage() {
        assert!(matches!(parse_analysis("<html>"), Err(AnalysisError::Parse(_))));
        assert!(matches!(parse_analysis("[1, 2]"), Err(AnalysisError::Parse(_))));
        assert!(matches!(
            parse_analysis(r#"{"summary": 5}"#),
            Err(AnalysisError::Parse(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = HttpAnalysisClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(client.endpoint("analyze"), "http://127.0.0.1:5000/analyze");
        assert_eq!(client.endpoint("/highlight"), "http://127.0.0.1:5000/highlight");
    }

    #[test]
    fn test_policy_from_config() {
        let config = Config {
            analysis_timeout_seconds: 0,
            analysis_max_attempts: 3,
            analysis_retry_backoff_ms: 50,
            ..Config::default()
        };
        let policy = AnalysisPolicy::from_config(&config);
        assert_eq!(policy.timeout, None);
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_times_out_a_hung_call() {
        let policy = AnalysisPolicy {
            timeout: Some(Duration::from_secs(30)),
            max_attempts: 1,
            backoff: Duration::ZERO,
        };
        let result: Result<(), _> = policy.run(std::future::pending).await;
        assert!(matches!(result, Err(AnalysisError::Timeout(d)) if d == Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = AnalysisPolicy {
            timeout: Some(Duration::from_secs(5)),
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        };
        let counter = &calls;
        let result = policy
            .run(|| async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(AnalysisError::Status {
                        status: 502,
                        body: "bad gateway".into(),
                    })
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_single_attempt_does_not_retry() {
        let calls = AtomicU32::new(0);
        let policy = AnalysisPolicy {
            timeout: None,
            max_attempts: 1,
            backoff: Duration::from_secs(1),
        };
        let counter = &calls;
        let result: Result<(), _> = policy
            .run(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AnalysisError::Parse("nope".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

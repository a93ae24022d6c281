//! Transformer classifier served over HTTP.
//!
//! Speaks the text-classification inference protocol: `POST {"inputs": text}`
//! returning `[[{"label": .., "score": ..}, ..]]` (or the flat variant).
//! The top-scoring label is mapped onto the three-class contract through the
//! configured [`LabelScheme`]; its softmax probability is the confidence.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fedspeak_core::{
    BackendError, BackendSpec, Classification, LabelScheme, SentimentBackend, SentimentLabel,
};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model input limit in characters.
pub const MAX_INPUT_CHARS: usize = 512;

const HEALTH_PROBE: &str = "The Committee decided to maintain the target range.";

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl InferenceResponse {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            Self::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            Self::Flat(scores) => scores,
        }
    }
}

pub struct HttpClassifierBackend {
    name: String,
    http: Client,
    url: String,
    scheme: LabelScheme,
    api_token: Option<String>,
    rate_limiter: Arc<DirectLimiter>,
}

impl HttpClassifierBackend {
    /// Creates a backend for `url` with a default limit of 60 requests per minute.
    ///
    /// # Errors
    /// Returns `BackendError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        scheme: LabelScheme,
    ) -> Result<Self, BackendError> {
        Self::with_options(name, url, scheme, nonzero!(60u32), Duration::from_secs(30))
    }

    /// # Errors
    /// Returns `BackendError::Unavailable` if the HTTP client cannot be built.
    pub fn with_options(
        name: impl Into<String>,
        url: impl Into<String>,
        scheme: LabelScheme,
        requests_per_minute: NonZeroU32,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("http client: {e}")))?;

        Ok(Self {
            name: name.into(),
            http,
            url: url.into(),
            scheme,
            api_token: None,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(requests_per_minute))),
        })
    }

    /// Builds a backend from its configuration entry.
    ///
    /// The bearer token, if any, is read from the environment variable named
    /// by `api_token_env`.
    ///
    /// # Errors
    /// Returns `BackendError::Unavailable` if the entry has no url or the
    /// token variable is unset.
    pub fn from_spec(spec: &BackendSpec) -> Result<Self, BackendError> {
        let url = spec
            .url
            .clone()
            .ok_or_else(|| BackendError::Unavailable(format!("backend {} has no url", spec.name)))?;
        let rpm = spec
            .requests_per_minute
            .and_then(NonZeroU32::new)
            .unwrap_or(nonzero!(60u32));
        let scheme = spec.label_scheme.unwrap_or(LabelScheme::Sentiment);

        let mut backend = Self::with_options(
            spec.name.clone(),
            url,
            scheme,
            rpm,
            Duration::from_secs(spec.timeout_secs),
        )?;

        if let Some(var) = &spec.api_token_env {
            let token = std::env::var(var).map_err(|_| {
                BackendError::Unavailable(format!("token variable {var} is not set"))
            })?;
            backend = backend.with_api_token(token);
        }
        Ok(backend)
    }

    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn infer(&self, text: &str) -> Result<Vec<LabelScore>, BackendError> {
        self.rate_limiter.until_ready().await;

        let inputs = truncate_chars(text, MAX_INPUT_CHARS);
        let mut request = self
            .http
            .post(&self.url)
            .header("Accept", "application/json")
            .json(&InferenceRequest { inputs });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 503 {
            return Err(BackendError::Unavailable(format!("{} returned 503", self.url)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Request(format!("API error {status}: {body}")));
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(parsed.into_scores())
    }
}

#[async_trait]
impl SentimentBackend for HttpClassifierBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, text: &str) -> Result<Classification, BackendError> {
        let scores = self.infer(text).await?;
        let top = scores
            .into_iter()
            .filter(|s| s.score.is_finite())
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| BackendError::InvalidResponse("empty label list".to_string()))?;

        let label = map_label(self.scheme, &top.label).ok_or_else(|| {
            BackendError::InvalidResponse(format!("unmappable label '{}'", top.label))
        })?;
        debug!(backend = %self.name, raw = %top.label, %label, score = top.score, "Classified");
        Classification::new(label, top.score)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.infer(HEALTH_PROBE).await.map(|_| ())
    }
}

/// Maps a raw model label onto the three-class contract.
///
/// Text labels (`POSITIVE`, `NEGATIVE`, `NEUTRAL`) are checked first for
/// every scheme, then the scheme's numeric `LABEL_n` convention.
#[must_use]
pub fn map_label(scheme: LabelScheme, raw: &str) -> Option<SentimentLabel> {
    let upper = raw.trim().to_uppercase();
    let clean = upper.strip_prefix("LABEL_").unwrap_or(&upper);

    if clean.contains("NEGATIVE") {
        return Some(SentimentLabel::Negative);
    }
    if clean.contains("POSITIVE") {
        return Some(SentimentLabel::Positive);
    }
    if clean.contains("NEUTRAL") {
        return Some(SentimentLabel::Neutral);
    }

    match scheme {
        LabelScheme::FinbertFomc => match clean {
            "0" => Some(SentimentLabel::Neutral),
            "1" => Some(SentimentLabel::Negative),
            "2" => Some(SentimentLabel::Positive),
            _ if clean.contains("HAWK") => Some(SentimentLabel::Negative),
            _ if clean.contains("DOVE") || clean.contains("DOVISH") => {
                Some(SentimentLabel::Positive)
            }
            _ => None,
        },
        LabelScheme::Roberta => match clean {
            "0" => Some(SentimentLabel::Negative),
            "1" => Some(SentimentLabel::Neutral),
            "2" => Some(SentimentLabel::Positive),
            _ => None,
        },
        LabelScheme::Sentiment => None,
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

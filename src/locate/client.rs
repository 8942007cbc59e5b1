use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::core::position::ResolvedPosition;
use crate::core::types::Assembly;
use crate::utils::validation::parse_rsid_number;

use super::refsnp::RefSnpRecord;

/// NCBI Variation Services base URL
pub const DEFAULT_BASE_URL: &str = "https://api.ncbi.nlm.nih.gov/variation/v0";

/// Minimum interval between request starts without an API key
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(350);

/// Minimum interval between request starts with an API key
pub const KEYED_RATE_LIMIT: Duration = Duration::from_millis(150);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("not found")]
    NotFound,

    #[error("not an rs identifier: {0}")]
    InvalidIdentifier(String),

    #[error("HTTP {status}")]
    Http {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl LookupError {
    /// Whether a retry could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Timeout | Self::Network(_) => true,
            Self::NotFound | Self::InvalidIdentifier(_) | Self::Decode(_) => false,
        }
    }

    /// Server-requested delay before the next attempt
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
                retry_after: None,
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A service that places one variant identifier on the genome.
///
/// One call is one attempt; retries are the caller's business.
pub trait LookupService: Send + Sync + 'static {
    fn lookup(
        &self,
        variant_id: &str,
    ) -> impl Future<Output = Result<ResolvedPosition, LookupError>> + Send;
}

/// Spaces request starts at least `interval` apart across all clones
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait for the next request slot
    pub async fn wait(&self) {
        // The lock is held while sleeping so waiters are released one at a time
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Settings for [`NcbiVariationClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Overrides the default interval for the key state
    pub rate_limit: Option<Duration>,
    pub timeout: Duration,
    /// Build to place variants on
    pub assembly: Assembly,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            rate_limit: None,
            timeout: DEFAULT_TIMEOUT,
            assembly: Assembly::Grch38,
        }
    }
}

impl ClientConfig {
    /// Interval between request starts
    #[must_use]
    pub fn effective_rate_limit(&self) -> Duration {
        self.rate_limit.unwrap_or(if self.api_key.is_some() {
            KEYED_RATE_LIMIT
        } else {
            DEFAULT_RATE_LIMIT
        })
    }
}

/// dbSNP lookups through the NCBI Variation Services `refsnp` endpoint
#[derive(Debug, Clone)]
pub struct NcbiVariationClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    assembly: Assembly,
    limiter: RateLimiter,
}

impl NcbiVariationClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.effective_rate_limit()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            assembly: config.assembly,
        })
    }

    async fn fetch(&self, number: u64) -> Result<RefSnpRecord, LookupError> {
        self.limiter.wait().await;

        let url = format!("{}/refsnp/{number}", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LookupError::Http {
                status: status.as_u16(),
                retry_after,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))
    }
}

impl LookupService for NcbiVariationClient {
    async fn lookup(&self, variant_id: &str) -> Result<ResolvedPosition, LookupError> {
        let number = parse_rsid_number(variant_id)
            .ok_or_else(|| LookupError::InvalidIdentifier(variant_id.to_string()))?;

        let mut record = self.fetch(number).await?;
        // Merged records carry no placements; follow the merge once
        if let Some(target) = record.merged_into() {
            debug!(variant_id, "Merged into rs{target}");
            record = self.fetch(target).await?;
        }

        record
            .to_position(variant_id, &self.assembly)
            .ok_or(LookupError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let http = |status| LookupError::Http {
            status,
            retry_after: None,
        };
        assert!(http(429).is_transient());
        assert!(http(503).is_transient());
        assert!(!http(400).is_transient());
        assert!(LookupError::Timeout.is_transient());
        assert!(LookupError::Network("reset".to_string()).is_transient());
        assert!(!LookupError::NotFound.is_transient());
        assert!(!LookupError::Decode("eof".to_string()).is_transient());
    }

    #[test]
    fn test_rate_limit_depends_on_key() {
        let config = ClientConfig::default();
        assert_eq!(config.effective_rate_limit(), DEFAULT_RATE_LIMIT);

        let keyed = ClientConfig {
            api_key: Some("k".to_string()),
            ..ClientConfig::default()
        };
        assert_eq!(keyed.effective_rate_limit(), KEYED_RATE_LIMIT);

        let explicit = ClientConfig {
            rate_limit: Some(Duration::ZERO),
            ..keyed
        };
        assert_eq!(explicit.effective_rate_limit(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(30));
        let started = Instant::now();
        for _ in 0..3 {
            limiter.wait().await;
        }
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_invalid_identifier_makes_no_request() {
        let client = NcbiVariationClient::new(ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.lookup("GSTM1-Null").await,
            Err(LookupError::InvalidIdentifier("GSTM1-Null".to_string()))
        );
    }
}

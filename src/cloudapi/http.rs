//! HTTP transport for the CloudAPI client
//!
//! This module owns header construction, response caching, and error
//! normalization for the CloudAPI services. Every public operation in the
//! crate funnels through one of the three verbs here.

use crate::auth::Credentials;
use crate::cache::ResponseCache;
use crate::cloudapi::types::HttpOptions;
use crate::error::{Error, Result, api_error};
use chrono::Utc;
use rand::{Rng, thread_rng};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Per-call options for GET requests
#[derive(Debug, Clone, Default)]
pub(crate) struct GetOptions {
    /// Query parameters appended to the request
    pub(crate) query: Vec<(String, String)>,

    /// Cache time-to-live override for this call
    pub(crate) cache_ttl: Option<Duration>,

    /// Bypass the cache lookup (the response is still stored)
    pub(crate) no_cache: bool,
}

/// HTTP client shared by the CloudAPI services
///
/// Handles authentication headers, response caching, and error
/// normalization. GET responses are cached by request path; POST and
/// DELETE always hit the network and purge the path's cache entry on
/// success.
///
/// Requests rejected with HTTP 429 can be retried automatically; the
/// behavior is controlled by the `retry_on_rate_limit`, `max_retries`, and
/// `default_retry_after_secs` options in [`HttpOptions`].
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Base URL for API requests
    base_url: String,

    /// Credentials used to build the `Authorization` header
    credentials: Credentials,

    /// Value of the `X-Api-Version` header
    api_version: String,

    /// Response cache, absent when caching is disabled (shared across clones)
    cache: Option<Arc<ResponseCache>>,

    /// Whether to automatically retry requests when rate limited
    retry_on_rate_limit: bool,

    /// Maximum number of retry attempts for rate-limited requests
    max_retries: u32,

    /// Default retry delay in seconds if no Retry-After header is provided
    default_retry_after_secs: u64,
}

#[cfg(test)]
impl HttpClient {
    /// Set the base URL (for testing only)
    pub(crate) fn set_base_url(&mut self, url: String) {
        self.base_url = url;
    }
}

impl HttpClient {
    /// Create a new HTTP client for the given endpoint and credentials
    pub(crate) fn new(
        base_url: &str,
        credentials: Credentials,
        options: HttpOptions,
    ) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| Error::InvalidRequest(format!("invalid base URL: {}", e)))?;

        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        let cache = if options.no_cache {
            None
        } else {
            Some(Arc::new(ResponseCache::new(
                options.cache_capacity,
                options.cache_ttl,
            )))
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            api_version: options.api_version,
            cache,
            retry_on_rate_limit: options.retry_on_rate_limit,
            max_retries: options.max_retries,
            default_retry_after_secs: options.default_retry_after_secs,
        })
    }

    /// Issue a GET request, consulting the cache first
    #[instrument(skip(self, opts), level = "debug")]
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, opts: GetOptions) -> Result<T> {
        let body = self.get_raw(path, opts).await?;
        parse_body(&body)
    }

    /// Issue a GET request for an endpoint that responds with plain text
    #[instrument(skip(self, opts), level = "debug")]
    pub(crate) async fn get_text(&self, path: &str, opts: GetOptions) -> Result<String> {
        self.get_raw(path, opts).await
    }

    /// Fetch a body, consulting the cache first and storing the response
    /// on a network hit
    async fn get_raw(&self, path: &str, opts: GetOptions) -> Result<String> {
        let key = cache_key(path, &opts.query);

        if !opts.no_cache {
            if let Some(cache) = &self.cache {
                if let Some(body) = cache.get(&key, opts.cache_ttl) {
                    debug!("Cache hit for {}", key);
                    return Ok(body);
                }
            }
        }

        let url = self.build_url(path)?;
        debug!("Sending GET request to {}", path);
        let body = self
            .execute(Method::GET, url, &opts.query, None, None)
            .await?;

        if let Some(cache) = &self.cache {
            cache.put(&key, Some(body.clone()));
        }

        Ok(body)
    }

    /// Issue a POST request with a JSON body, purging the path's cache
    /// entry on success
    #[instrument(skip(self, query, body, expected), level = "debug")]
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        query: &[(String, String)],
        body: &B,
        expected: Option<StatusCode>,
    ) -> Result<T> {
        let url = self.build_url(path)?;
        let body = serde_json::to_value(body)?;

        debug!("Sending POST request to {}", path);
        let response = self
            .execute(Method::POST, url, query, Some(&body), expected)
            .await?;

        if let Some(cache) = &self.cache {
            cache.put(path, None);
        }

        parse_body(&response)
    }

    /// Issue a DELETE request, purging the path's cache entry on success
    #[instrument(skip(self, expected), level = "debug")]
    pub(crate) async fn del(&self, path: &str, expected: Option<StatusCode>) -> Result<()> {
        let url = self.build_url(path)?;

        debug!("Sending DELETE request to {}", path);
        self.execute(Method::DELETE, url, &[], None, expected)
            .await?;

        if let Some(cache) = &self.cache {
            cache.put(path, None);
        }

        Ok(())
    }

    /// Issue a HEAD request and return the `x-resource-count` header
    #[instrument(skip(self, query), level = "debug")]
    pub(crate) async fn head_count(&self, path: &str, query: &[(String, String)]) -> Result<u64> {
        let url = self.build_url(path)?;

        let mut request = self.request(Method::HEAD, url);
        if !query.is_empty() {
            request = request.query(query);
        }

        debug!("Sending HEAD request to {}", path);
        let response = request.send().await.map_err(Error::Http)?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.map_err(Error::Http)?;
            error!("API error: {} - {}", status, text);
            return Err(api_error(status, &text));
        }

        response
            .headers()
            .get("x-resource-count")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                Error::UnexpectedResponse("missing x-resource-count header".to_string())
            })
    }

    /// Build the target URL for an API path
    fn build_url(&self, path: &str) -> Result<Url> {
        let url = format!("{}{}", self.base_url, path);
        Url::parse(&url).map_err(|e| Error::InvalidRequest(format!("invalid URL: {}", e)))
    }

    /// Start a request with the `Date`, `Authorization`, `Accept`, and
    /// `X-Api-Version` headers. The same date string that is sent is the
    /// one the signature covers.
    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let date = http_date();
        let authorization = self.credentials.authorization(&date);

        self.client
            .request(method, url)
            .header("Date", date)
            .header("Authorization", authorization)
            .header("Accept", "application/json")
            .header("X-Api-Version", &self.api_version)
    }

    /// Execute a request and return the raw response body
    ///
    /// The request is rebuilt on each attempt so retries sign a fresh date.
    /// With an `expected` status, any other status is an error even when it
    /// is a success code; without one, any 2xx is accepted.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        query: &[(String, String)],
        body: Option<&serde_json::Value>,
        expected: Option<StatusCode>,
    ) -> Result<String> {
        let mut attempts = 0;

        loop {
            let mut request = self.request(method.clone(), url.clone());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(Error::Http)?;
            let status = response.status();

            // Check for rate limit response
            if status == StatusCode::TOO_MANY_REQUESTS {
                attempts += 1;

                // Extract retry-after header if available
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(self.default_retry_after_secs);

                let response_text = response.text().await.map_err(Error::Http)?;
                error!("API error: {} - {}", status, response_text);

                if self.retry_on_rate_limit && attempts <= self.max_retries {
                    // Exponential backoff with jitter, capped at a minute
                    let exp_factor = u64::pow(2, attempts - 1);
                    let mut delay = retry_after.saturating_mul(exp_factor);

                    if delay > 1 {
                        let jitter_factor = thread_rng().gen_range(0.8..1.2);
                        delay = ((delay as f64) * jitter_factor) as u64;
                    }

                    delay = std::cmp::min(delay, 60);

                    debug!(
                        "Rate limited. Retrying after {} seconds (attempt {}/{})",
                        delay, attempts, self.max_retries
                    );

                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }

                return Err(Error::RateLimit {
                    retry_after_secs: retry_after,
                });
            }

            let response_text = response.text().await.map_err(Error::Http)?;

            return match expected {
                Some(exp) if status != exp => {
                    if status.is_success() {
                        Err(Error::UnexpectedResponse(format!(
                            "expected status {}, got {}",
                            exp.as_u16(),
                            status.as_u16()
                        )))
                    } else {
                        error!("API error: {} - {}", status, response_text);
                        Err(api_error(status, &response_text))
                    }
                }
                None if !status.is_success() => {
                    error!("API error: {} - {}", status, response_text);
                    Err(api_error(status, &response_text))
                }
                _ => Ok(response_text),
            };
        }
    }
}

/// Format the current time as an HTTP-date header value
fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Cache key for a GET request: the path, plus the query when present
fn cache_key(path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        let joined: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}?{}", path, joined.join("&"))
    }
}

/// Deserialize a response body, treating an empty body as JSON `null` so
/// operations returning no content can parse into `()`
fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse response: {}", e);
        Error::UnexpectedResponse(format!("Failed to parse response: {}", e))
    })
}

//! Rate-limited HTTP retrieval.
//!
//! This module provides the [`Fetch`] trait through which every network
//! access of the crate flows, and [`Client`], its implementation on top of
//! `reqwest::Client`. The client adds:
//! * Request rate limiting as a courtesy to the platform
//! * Consistent timeouts and headers
//! * Strict status checking: any non-success status is an error
//!
//! Nothing is ever retried.
//!
//! # Example
//!
//! ```rust
//! use tubeline::http::{Client, Fetch};
//!
//! let client = Client::new(&config)?;
//! let html = client.get(url).await?;
//! ```

use std::{future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    self,
    header::{HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE},
    Body, Method, Url,
};

use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Retrieves documents over the network.
///
/// Implementations must fail with an [`ErrorKind::Network`] error carrying
/// the status code when the response status is not a success.
///
/// [`ErrorKind::Network`]: crate::error::ErrorKind::Network
pub trait Fetch {
    /// Fetches `url` and returns the response text.
    fn get(&self, url: Url) -> impl Future<Output = Result<String>> + Send;

    /// Posts a JSON `body` to `url` and returns the response text.
    fn post(&self, url: Url, body: String) -> impl Future<Output = Result<String>> + Send;
}

/// HTTP client with built-in rate limiting.
pub struct Client {
    /// Unlimited request client for special cases.
    pub unlimited: reqwest::Client,

    /// Rate limiter to not hammer the platform.
    rate_limiter: DefaultDirectRateLimiter,
}

impl Client {
    /// Rate limit interval.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum allowed calls per interval. Bursts up to this amount are
    /// served immediately; beyond that requests are delayed.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 50;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Duration to wait for individual network reads. Player programs are
    /// large, so this is more lenient than for streaming.
    const READ_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new(config: &Config) -> Result<Self> {
        // Not having `Accept-Language` set is non-fatal.
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(lang) = HeaderValue::from_str(&config.language) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .read_timeout(Self::READ_TIMEOUT)
            .default_headers(headers)
            .user_agent(&config.user_agent);

        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client.build()?,
            rate_limiter: governor::RateLimiter::direct(quota),
        })
    }

    /// Builds a request with specified method, URL and body.
    pub fn request<U, T>(&self, method: Method, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        let mut request = reqwest::Request::new(method, url.into());
        let body_mut = request.body_mut();
        *body_mut = Some(body.into());

        request
    }

    /// Executes a request with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be executed.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }

    /// Executes a request and returns the response text, failing on any
    /// non-success status.
    async fn text(&self, request: reqwest::Request) -> Result<String> {
        let method = request.method().clone();
        let url = request.url().clone();
        debug!("{method} {}", redact_query(&url));

        let response = self.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(
                status,
                format!("bad request ({})", status.as_u16()),
            ));
        }

        response.text().await.map_err(Into::into)
    }
}

impl Fetch for Client {
    async fn get(&self, url: Url) -> Result<String> {
        self.text(reqwest::Request::new(Method::GET, url)).await
    }

    async fn post(&self, url: Url, body: String) -> Result<String> {
        let mut request = self.request(Method::POST, url, body);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.text(request).await
    }
}

/// Strips the query from a URL for logging; it may hold keys or tokens.
fn redact_query(url: &Url) -> String {
    let mut url = url.clone();
    if url.query().is_some() {
        url.set_query(Some("..."));
    }
    url.to_string()
}

/// Runs `future` unless `token` fires first.
///
/// # Errors
///
/// Returns a cancellation error if `token` is or becomes cancelled before
/// `future` completes, and whatever `future` returns otherwise.
pub async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(Error::cancelled("request was cancelled")),
        result = future => result,
    }
}

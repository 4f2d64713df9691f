//! The client that all operations run on.
//!
//! A [`Client`] owns everything that outlives a single call:
//! * the retriever through which every fetch flows
//! * the [`Config`]
//! * the [`TransformCache`], so independent clients never share transforms
//! * a cancellation token that aborts pending and future fetches
//!
//! Operations are defined next to their data: [`search`](crate::search),
//! [`playlist`](crate::playlist) and [`video`](crate::video).
//!
//! # Example
//!
//! ```rust
//! use tubeline::{client::Client, config::Config, video::VideoOptions};
//!
//! let client = Client::new(Config::default())?;
//! let video = client
//!     .get_video("https://www.youtube.com/watch?v=ryT-ltTDCko", &VideoOptions::default())
//!     .await?;
//! ```

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    config::Config,
    error::Result,
    http::{self, cancellable, Fetch},
    pagination::{ListingContext, Walker},
    transform::TransformCache,
};

pub struct Client<F = http::Client> {
    pub(crate) fetch: F,
    pub(crate) config: Config,
    pub(crate) transforms: TransformCache,
    pub(crate) cancel: CancellationToken,
}

impl Client {
    /// Creates a client that fetches over the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetch = http::Client::new(&config)?;
        Self::with_fetch(config, fetch)
    }
}

impl<F: Fetch> Client<F> {
    /// Creates a client that fetches through `fetch`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configuration is invalid.
    pub fn with_fetch(config: Config, fetch: F) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fetch,
            config,
            transforms: TransformCache::new(),
            cancel: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn fetch(&self) -> &F {
        &self.fetch
    }

    /// The transforms extracted so far.
    #[must_use]
    pub fn transforms(&self) -> &TransformCache {
        &self.transforms
    }

    /// Token that cancels this client's operations.
    ///
    /// Cancelling it aborts pending fetches with a
    /// [`Cancelled`](crate::error::ErrorKind::Cancelled) error. The token
    /// stays cancelled, so every later operation fails the same way.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetches `url`, unless cancelled.
    pub(crate) async fn get(&self, url: Url) -> Result<String> {
        cancellable(&self.cancel, self.fetch.get(url)).await
    }

    pub(crate) fn walker<'a>(&'a self, context: &'a ListingContext) -> Walker<'a, F> {
        Walker::new(&self.fetch, context, &self.cancel, self.config.page_ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, testing::ScriptedFetch};

    #[test]
    fn rejects_invalid_config() {
        let config = Config {
            page_ceiling: 0,
            ..Config::default()
        };
        let err = Client::with_fetch(config, ScriptedFetch::new()).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn cancelled_client_does_not_fetch() {
        let client = Client::with_fetch(Config::default(), ScriptedFetch::new().respond("ok")).unwrap();
        client.cancellation_token().cancel();

        let err = client
            .get(Url::parse("https://www.youtube.com/").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert!(client.fetch().requests().is_empty());
    }

    #[test]
    fn clients_have_separate_caches() {
        let first = Client::with_fetch(Config::default(), ScriptedFetch::new()).unwrap();
        let second = Client::with_fetch(Config::default(), ScriptedFetch::new()).unwrap();
        assert!(!std::ptr::eq(first.transforms(), second.transforms()));
    }
}

//! Scripted retrieval for tests.
//!
//! [`ScriptedFetch`] stands in for the network: it answers requests with
//! canned responses in the order they were queued, and records every
//! request so that tests can assert what was fetched and posted.
//!
//! ```rust
//! use serde_json::json;
//! use tubeline::{testing::{page_with_initial_data, ScriptedFetch}, Client, Config, SearchOptions};
//!
//! let html = page_with_initial_data(&json!({ "contents": {} }));
//! let client = Client::with_fetch(Config::default(), ScriptedFetch::new().respond(html))?;
//! let videos = client.search("rick astley", &SearchOptions::default()).await?;
//! assert!(videos.is_empty());
//! assert_eq!(client.fetch().requests().len(), 1);
//! ```

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::{
    error::{Error, Result},
    http::Fetch,
};

/// A request as the code under test issued it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub url: Url,
    pub body: Option<String>,
}

/// Replays canned responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedFetch {
    responses: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedFetch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    #[must_use]
    pub fn respond(self, body: impl Into<String>) -> Self {
        self.push(Ok(body.into()))
    }

    /// Queues a response with a non-success status.
    #[must_use]
    pub fn fail(self, status: StatusCode) -> Self {
        self.push(Err(Error::network(
            status,
            format!("bad request ({})", status.as_u16()),
        )))
    }

    fn push(self, response: Result<String>) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Requests issued so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests issued so far with method `POST`.
    #[must_use]
    pub fn posts(&self) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == Method::POST)
            .count()
    }

    fn next(&self, method: Method, url: Url, body: Option<String>) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Recorded {
                method,
                url: url.clone(),
                body,
            });

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(Error::internal(format!("no response scripted for {url}"))))
    }
}

impl Fetch for ScriptedFetch {
    async fn get(&self, url: Url) -> Result<String> {
        self.next(Method::GET, url, None)
    }

    async fn post(&self, url: Url, body: String) -> Result<String> {
        self.next(Method::POST, url, Some(body))
    }
}

/// A page with an inline script that runs `prefix` and then assigns `data`
/// to `variable`, the way pages embed their initial data.
#[must_use]
pub fn page(variable: &str, data: &Value, prefix: &str) -> String {
    format!("<html><script>{prefix}var {variable} = {data};</script></html>")
}

/// A page that embeds `data` the way listing pages embed their initial data.
#[must_use]
pub fn page_with_initial_data(data: &Value) -> String {
    page("ytInitialData", data, "")
}

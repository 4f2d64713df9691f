//! Continuation traversal of listings.
//!
//! Listings such as playlists are served in pages. The first page is part
//! of the listing's web page; when its trailing entry is a continuation
//! marker, the next page is requested from the private browse API with the
//! marker's token, and so on.
//!
//! The [`Walker`] drives this as a loop:
//!
//! 1. Entries of the current page are filtered to the listing's entry kind
//!    and parsed in order. When taking one more would exceed the item limit,
//!    the walk stops at once and returns what it has: a reached limit is a
//!    result, not an error.
//! 2. When the page's trailing entry is a continuation marker and one more
//!    page stays within both the caller's page limit and the configured
//!    ceiling, the next page is fetched and the walk continues with it.
//!    Otherwise the walk is done.
//!
//! Pages are concatenated in fetch order, without deduplication. A failed
//! continuation request aborts the whole walk; nothing of that page is kept.

use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;
use veil::Redact;

use crate::{
    error::{Error, ErrorKind, Result},
    http::{cancellable, Fetch},
    protocol::{
        self,
        browse::{self, BROWSE_URL},
        renderer::{ContinuationItemRenderer, CONTINUATION_ITEM},
    },
    video::VideoSummary,
};

/// Page and item limits of one listing call.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct PageLimits {
    max_pages: usize,
    max_videos: usize,
}

impl PageLimits {
    /// Creates limits of at most `max_pages` pages and `max_videos` videos.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either limit is zero.
    pub fn new(max_pages: usize, max_videos: usize) -> Result<Self> {
        if max_pages < 1 {
            return Err(Error::validation(
                "`maxPages` must be larger than or equal to 1",
            ));
        }

        if max_videos < 1 {
            return Err(Error::validation(
                "`maxVideos` must be larger than or equal to 1",
            ));
        }

        Ok(Self {
            max_pages,
            max_videos,
        })
    }

    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    #[must_use]
    pub fn max_videos(&self) -> usize {
        self.max_videos
    }
}

/// A kind of listing the walker can traverse.
pub trait Listing {
    /// Key of the entries that hold videos, e.g. `playlistVideoRenderer`.
    const ENTRY: &'static str;

    /// Parses the renderer found under [`Listing::ENTRY`].
    ///
    /// # Errors
    ///
    /// Returns a structural error if the entry lacks a required field.
    fn parse(renderer: &Value) -> Result<VideoSummary>;
}

/// Everything a continuation request carries besides its token. Threaded
/// unchanged through every page of one walk.
#[derive(Clone, Eq, PartialEq, Redact)]
pub struct ListingContext {
    /// Key of the private browse API, if the listing page had one.
    #[redact]
    pub api_key: Option<String>,

    pub language: String,
    pub region: String,
    pub client_version: String,
}

/// Walks the pages of a listing.
pub struct Walker<'a, F> {
    fetch: &'a F,
    context: &'a ListingContext,
    cancel: &'a CancellationToken,

    /// Pages fetched at most, whatever the caller's limits.
    ceiling: usize,
}

impl<'a, F: Fetch> Walker<'a, F> {
    #[must_use]
    pub fn new(
        fetch: &'a F,
        context: &'a ListingContext,
        cancel: &'a CancellationToken,
        ceiling: usize,
    ) -> Self {
        Self {
            fetch,
            context,
            cancel,
            ceiling,
        }
    }

    /// Collects the videos of a listing, starting from the entries of its
    /// first page.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry does not parse, the continuation token
    /// is missing from a marker, a continuation request fails or returns no
    /// items, or the walk is cancelled.
    pub async fn walk<L: Listing>(
        &self,
        first_page: Vec<Value>,
        limits: PageLimits,
    ) -> Result<Vec<VideoSummary>> {
        let max_pages = limits.max_pages.min(self.ceiling);
        if max_pages < limits.max_pages {
            warn!(
                "limiting {} listing to {max_pages} pages instead of {}",
                L::ENTRY,
                limits.max_pages
            );
        }

        let mut videos = Vec::new();
        let mut pages_fetched = 1;
        let mut page = first_page;

        loop {
            for renderer in page.iter().filter_map(|entry| entry.get(L::ENTRY)) {
                if videos.len() + 1 > limits.max_videos {
                    debug!(
                        "reached limit of {} videos after {pages_fetched} pages",
                        limits.max_videos
                    );
                    return Ok(videos);
                }

                videos.push(L::parse(renderer)?);
            }

            let Some(marker) = page.last().and_then(|entry| entry.get(CONTINUATION_ITEM)) else {
                break;
            };

            if pages_fetched + 1 > max_pages {
                debug!("not following continuation beyond {max_pages} pages");
                break;
            }

            let marker = ContinuationItemRenderer::deserialize(marker)?;
            let token = marker
                .token()
                .ok_or_else(|| Error::structural("continuation token not found"))?;

            page = self.continuation(token).await?;
            pages_fetched += 1;
            debug!(
                "fetched page {pages_fetched} with {} entries, {} videos so far",
                page.len(),
                videos.len()
            );
        }

        Ok(videos)
    }

    /// Requests the page that `token` continues to.
    async fn continuation(&self, token: &str) -> Result<Vec<Value>> {
        let api_key = self
            .context
            .api_key
            .as_deref()
            .ok_or_else(|| Error::extraction("`INNERTUBE_API_KEY` not found"))?;

        let url = Url::parse_with_params(BROWSE_URL, &[("key", api_key)])?;
        let request = browse::Request::new(
            &self.context.language,
            &self.context.region,
            &self.context.client_version,
            token,
        );
        let body = serde_json::to_string(&request)?;

        let response = cancellable(self.cancel, self.fetch.post(url, body))
            .await
            .map_err(|e| match e.status {
                Some(status) if e.kind == ErrorKind::Network => Error::network(
                    status,
                    format!("continuation failed ({})", status.as_u16()),
                ),
                _ => e,
            })?;

        protocol::json::<browse::Response>(&response, "continuation")?
            .into_items()
            .ok_or_else(|| Error::structural("continuation items not found"))
    }
}

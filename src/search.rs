//! Search.
//!
//! Results are read from the first page of the results page only; search
//! never follows continuations.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{
    client::Client,
    config::Locale,
    error::{Error, Result},
    http::Fetch,
    pagination::{Listing, ListingContext, PageLimits},
    protocol::{self, renderer::VideoRenderer},
    video::VideoSummary,
};

/// Results page; the query is passed as `search_query`.
pub const SEARCH_URL: &str = "https://www.youtube.com/results";

const INITIAL_DATA: &str = "var ytInitialData = {";

const RESULTS: &str = "/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents/0/itemSectionRenderer/contents";

/// Longest accepted query, in characters.
const MAX_QUERY_LENGTH: usize = 100;

/// Results are capped below this.
const MAX_VIDEOS_BOUND: usize = 50;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of videos, between 1 and 49.
    pub max_videos: usize,

    /// ISO 639-1 language code, e.g. `en`.
    pub language: Option<String>,

    /// ISO 3166-2 region code, e.g. `US`.
    pub region: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_videos: 1,
            language: None,
            region: None,
        }
    }
}

impl SearchOptions {
    fn validate(&self, query: &str) -> Result<()> {
        let length = query.chars().count();
        if length == 0 || length > MAX_QUERY_LENGTH {
            return Err(Error::validation(
                "`query` must be between 1 and 100 characters long",
            ));
        }

        if self.max_videos < 1 {
            return Err(Error::validation(
                "`maxVideos` must be larger than or equal to 1",
            ));
        }

        if self.max_videos >= MAX_VIDEOS_BOUND {
            return Err(Error::validation("`maxVideos` must be smaller than 50"));
        }

        Ok(())
    }
}

/// Entries of a results page.
pub struct SearchResults;

impl Listing for SearchResults {
    const ENTRY: &'static str = "videoRenderer";

    fn parse(renderer: &Value) -> Result<VideoSummary> {
        let item = VideoRenderer::deserialize(renderer)?;
        let channel = item.owner_text.first_run();

        let duration = match item.length_text.as_ref().and_then(|text| text.simple_text.as_deref()) {
            Some(timestamp) => parse_duration_timestamp(timestamp).unwrap_or_else(|e| {
                warn!("{e}; assuming zero duration");
                Duration::ZERO
            }),
            None => Duration::ZERO,
        };

        VideoSummary::new(
            item.video_id.as_deref(),
            channel.and_then(|run| run.browse_id()),
            item.title.first_run().and_then(|run| run.text.clone()),
            channel.and_then(|run| run.text.clone()),
            item.thumbnail.thumbnails.clone(),
            duration,
            item.is_live(),
        )
    }
}

/// Converts a `H:MM:SS` or `M:SS` timestamp into a duration. An empty
/// timestamp is zero.
///
/// # Errors
///
/// Returns a structural error if a component is not a number, if there are
/// more than three, or if the total does not fit.
pub fn parse_duration_timestamp(timestamp: &str) -> Result<Duration> {
    if timestamp.is_empty() {
        return Ok(Duration::ZERO);
    }

    let malformed = || Error::structural(format!("malformed duration {timestamp}"));

    let components = timestamp
        .split(':')
        .map(|component| component.trim().parse::<u64>().map_err(|_| malformed()))
        .collect::<Result<Vec<_>>>()?;

    if components.len() > 3 {
        return Err(malformed());
    }

    let seconds = components
        .iter()
        .try_fold(0u64, |total, component| {
            total.checked_mul(60)?.checked_add(*component)
        })
        .ok_or_else(malformed)?;
    Ok(Duration::from_secs(seconds))
}

impl<F: Fetch> Client<F> {
    /// Searches for videos.
    ///
    /// # Errors
    ///
    /// Returns an error if the query or options are invalid, the fetch
    /// fails, the page lacks its initial data, or a result lacks its video
    /// or channel ID.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<VideoSummary>> {
        options.validate(query)?;
        let locale = Locale::resolve(
            options.language.as_deref(),
            options.region.as_deref(),
            &self.config,
        )?;

        let url = Url::parse_with_params(
            SEARCH_URL,
            &[
                ("hl", locale.language.as_str()),
                ("gl", locale.region.as_str()),
                ("search_query", query),
            ],
        )?;

        let html = self.get(url).await?;
        let mut data: Value = protocol::embedded(&html, INITIAL_DATA, "ytInitialData")?;
        let results = match data.pointer_mut(RESULTS).map(Value::take) {
            Some(Value::Array(results)) => results,
            _ => Vec::new(),
        };

        let context = ListingContext {
            api_key: None,
            language: locale.language,
            region: locale.region,
            client_version: self.config.client_version.clone(),
        };

        self.walker(&context)
            .walk::<SearchResults>(results, PageLimits::new(1, options.max_videos)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::Config,
        error::ErrorKind,
        testing::{page_with_initial_data, ScriptedFetch},
        video::LIVE_DURATION,
    };

    fn result(id: &str) -> Value {
        json!({
            "videoRenderer": {
                "videoId": id,
                "thumbnail": { "thumbnails": [{ "url": "https://i.ytimg.com/vi/x/hq720.jpg", "width": 360, "height": 202 }] },
                "title": { "runs": [{ "text": format!("Video {id}") }] },
                "ownerText": { "runs": [{
                    "text": "Channel",
                    "navigationEndpoint": { "browseEndpoint": { "browseId": "UC123" } }
                }] },
                "lengthText": { "simpleText": "1:02:03" }
            }
        })
    }

    fn results_page(results: Vec<Value>) -> String {
        page_with_initial_data(&json!({
            "contents": { "twoColumnSearchResultsRenderer": { "primaryContents": {
                "sectionListRenderer": { "contents": [{
                    "itemSectionRenderer": { "contents": results }
                }] }
            } } }
        }))
    }

    #[test]
    fn parses_duration_timestamps() {
        assert_eq!(parse_duration_timestamp("").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration_timestamp("0:42").unwrap(), Duration::from_secs(42));
        assert_eq!(parse_duration_timestamp("4:13").unwrap(), Duration::from_secs(253));
        assert_eq!(parse_duration_timestamp("1:02:03").unwrap(), Duration::from_secs(3723));
        assert!(parse_duration_timestamp("1:xx").is_err());
        assert!(parse_duration_timestamp("1:2:3:4").is_err());

        let err = parse_duration_timestamp("999999999999999999:0:0").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structural);
        assert_eq!(
            err.error.to_string(),
            "malformed duration 999999999999999999:0:0"
        );
    }

    #[test]
    fn parses_result() {
        let summary = SearchResults::parse(&result("ryT-ltTDCko")["videoRenderer"]).unwrap();

        assert_eq!(summary.id, "ryT-ltTDCko");
        assert_eq!(summary.url, "https://www.youtube.com/watch?v=ryT-ltTDCko");
        assert_eq!(summary.title.as_deref(), Some("Video ryT-ltTDCko"));
        assert_eq!(summary.channel_url, "https://www.youtube.com/channel/UC123");
        assert_eq!(summary.channel_name.as_deref(), Some("Channel"));
        assert_eq!(summary.duration, Duration::from_secs(3723));
        assert_eq!(summary.thumbnails.len(), 1);
        assert!(!summary.is_live);
    }

    #[test]
    fn live_badge_overrides_length() {
        let mut renderer = result("ryT-ltTDCko")["videoRenderer"].clone();
        renderer["badges"] = json!([{ "metadataBadgeRenderer": { "icon": { "iconType": "LIVE" } } }]);

        let summary = SearchResults::parse(&renderer).unwrap();
        assert!(summary.is_live);
        assert_eq!(summary.duration, LIVE_DURATION);
    }

    #[test]
    fn malformed_length_keeps_result() {
        let mut renderer = result("ryT-ltTDCko")["videoRenderer"].clone();
        renderer["lengthText"] = json!({ "simpleText": "999999999999999999:0:0" });

        let summary = SearchResults::parse(&renderer).unwrap();
        assert_eq!(summary.id, "ryT-ltTDCko");
        assert_eq!(summary.duration, Duration::ZERO);

        renderer["lengthText"] = json!({ "simpleText": "LIVE" });
        let summary = SearchResults::parse(&renderer).unwrap();
        assert_eq!(summary.duration, Duration::ZERO);
    }

    #[test]
    fn result_requires_channel() {
        let mut renderer = result("ryT-ltTDCko")["videoRenderer"].clone();
        renderer["ownerText"] = json!({ "runs": [{ "text": "Channel" }] });

        let err = SearchResults::parse(&renderer).unwrap_err();
        assert_eq!(err.error.to_string(), "missing channel ID");
    }

    #[test]
    fn validates_options() {
        let options = SearchOptions::default();
        assert!(options.validate("query").is_ok());
        assert!(options.validate("").is_err());
        assert!(options.validate(&"x".repeat(101)).is_err());
        assert!(options.validate(&"x".repeat(100)).is_ok());

        let options = SearchOptions {
            max_videos: 50,
            ..SearchOptions::default()
        };
        assert!(options.validate("query").is_err());

        let options = SearchOptions {
            max_videos: 0,
            ..SearchOptions::default()
        };
        assert!(options.validate("query").is_err());
    }

    #[tokio::test]
    async fn searches_first_page() {
        let fetch = ScriptedFetch::new().respond(results_page(vec![
            json!({ "shelfRenderer": {} }),
            result("aaaaaaaaaaa"),
            result("bbbbbbbbbbb"),
            result("ccccccccccc"),
        ]));
        let client = Client::with_fetch(Config::default(), fetch).unwrap();

        let options = SearchOptions {
            max_videos: 2,
            language: Some(String::from("de")),
            region: Some(String::from("DE")),
        };
        let videos = client.search("rick astley", &options).await.unwrap();

        let ids: Vec<_> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["aaaaaaaaaaa", "bbbbbbbbbbb"]);

        let requests = client.fetch().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url.as_str(),
            "https://www.youtube.com/results?hl=de&gl=DE&search_query=rick+astley"
        );
    }

    #[tokio::test]
    async fn empty_results_are_not_an_error() {
        let fetch = ScriptedFetch::new().respond(page_with_initial_data(&json!({ "contents": {} })));
        let client = Client::with_fetch(Config::default(), fetch).unwrap();

        let videos = client.search("nothing", &SearchOptions::default()).await.unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_query_without_fetching() {
        let client = Client::with_fetch(Config::default(), ScriptedFetch::new()).unwrap();

        let err = client.search("", &SearchOptions::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(client.fetch().requests().is_empty());
    }
}

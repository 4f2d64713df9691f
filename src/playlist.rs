//! Playlists.
//!
//! The playlist page holds the header, the first page of entries, and the
//! key for the private browse API through which further pages are fetched.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{
    client::Client,
    config::Locale,
    error::{Error, Result},
    http::Fetch,
    matcher::is_playlist_url,
    pagination::{Listing, ListingContext, PageLimits},
    protocol::{
        self,
        renderer::{PlaylistHeader, PlaylistVideoRenderer},
    },
    util::{extract, set_query_param},
    video::{channel_url, Thumbnail, VideoSummary},
};

/// Playlist page; playlists are addressed with the `list` parameter.
pub const PLAYLIST_URL: &str = "https://www.youtube.com/playlist";

const INITIAL_DATA: &str = "var ytInitialData = {";

const API_KEY: &str = r#""INNERTUBE_API_KEY":""#;

const ENTRIES: &str = "/contents/twoColumnBrowseResultsRenderer/tabs/0/tabRenderer/content/sectionListRenderer/contents/0/itemSectionRenderer/contents/0/playlistVideoListRenderer/contents";

const ALERT_TYPE: &str = "/alerts/0/alertRenderer/type";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub url: String,
    pub title: Option<String>,

    /// Channel of the playlist's owner.
    pub channel_url: String,
    pub channel_name: Option<String>,

    pub thumbnails: Vec<Thumbnail>,
    pub videos: Vec<VideoSummary>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlaylistOptions {
    /// Maximum number of pages to fetch, at least 1.
    pub max_pages: usize,

    /// Maximum number of videos to return, at least 1.
    pub max_videos: usize,

    /// ISO 639-1 language code, e.g. `en`.
    pub language: Option<String>,

    /// ISO 3166-2 region code, e.g. `US`.
    pub region: Option<String>,
}

impl Default for PlaylistOptions {
    fn default() -> Self {
        Self {
            max_pages: 1,
            max_videos: 100,
            language: None,
            region: None,
        }
    }
}

/// Entries of a playlist.
pub struct PlaylistEntries;

impl Listing for PlaylistEntries {
    const ENTRY: &'static str = "playlistVideoRenderer";

    fn parse(renderer: &Value) -> Result<VideoSummary> {
        let item = PlaylistVideoRenderer::deserialize(renderer)?;
        let channel = item.short_byline_text.first_run();

        VideoSummary::new(
            item.video_id.as_deref(),
            channel.and_then(|run| run.browse_id()),
            item.title.first_run().and_then(|run| run.text.clone()),
            channel.and_then(|run| run.text.clone()),
            item.thumbnail.thumbnails.clone(),
            Duration::from_secs(item.length_seconds.unwrap_or_default()),
            item.is_live(),
        )
    }
}

/// Playlist fields other than its videos.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Meta {
    id: String,
    url: String,
    title: Option<String>,
    channel_url: String,
    channel_name: Option<String>,
    thumbnails: Vec<Thumbnail>,
}

fn parse_meta(header: Option<&Value>) -> Result<Meta> {
    let header = header.ok_or_else(|| Error::structural("meta not found"))?;
    let renderer = PlaylistHeader::deserialize(header)?
        .playlist_header_renderer
        .unwrap_or_default();

    let id = renderer
        .playlist_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::structural("missing playlist ID"))?;

    let owner = renderer.owner_text.first_run();
    let channel_id = owner
        .and_then(|run| run.browse_id())
        .ok_or_else(|| Error::structural("missing channel ID"))?;

    Ok(Meta {
        id: id.to_owned(),
        url: Url::parse_with_params(PLAYLIST_URL, &[("list", id)])?.into(),
        title: renderer.title.simple_text.clone(),
        channel_url: channel_url(channel_id)?.into(),
        channel_name: owner.and_then(|run| run.text.clone()),
        thumbnails: renderer.thumbnails().to_vec(),
    })
}

impl<F: Fetch> Client<F> {
    /// Gets a playlist and its videos, following continuations within the
    /// limits of `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or options are invalid, a fetch fails,
    /// the page lacks its API key, initial data, header or entries, the
    /// platform reports an error for the playlist, or an entry lacks its
    /// video or channel ID.
    pub async fn get_playlist(&self, url: &str, options: &PlaylistOptions) -> Result<Playlist> {
        if !is_playlist_url(url) {
            return Err(Error::validation("`url` must be a valid playlist URL"));
        }

        let limits = PageLimits::new(options.max_pages, options.max_videos)?;
        let locale = Locale::resolve(
            options.language.as_deref(),
            options.region.as_deref(),
            &self.config,
        )?;

        let mut page_url =
            Url::parse(url).map_err(|_| Error::validation("`url` must be a valid playlist URL"))?;
        set_query_param(&mut page_url, "hl", &locale.language);
        set_query_param(&mut page_url, "gl", &locale.region);

        let html = self.get(page_url).await?;

        let api_key = extract(&html, API_KEY, r#"""#)
            .ok_or_else(|| Error::extraction("`INNERTUBE_API_KEY` not found"))?;
        let mut data: Value = protocol::embedded(&html, INITIAL_DATA, "ytInitialData")?;

        if data.pointer(ALERT_TYPE).and_then(Value::as_str) == Some("ERROR") {
            return Err(Error::platform("failed to retrieve information"));
        }

        let meta = parse_meta(data.get("header"))?;

        let entries = match data.pointer_mut(ENTRIES).map(Value::take) {
            Some(Value::Array(entries)) => entries,
            _ => return Err(Error::structural("items not found")),
        };

        let context = ListingContext {
            api_key: Some(api_key.to_owned()),
            language: locale.language,
            region: locale.region,
            client_version: self.config.client_version.clone(),
        };

        let videos = self
            .walker(&context)
            .walk::<PlaylistEntries>(entries, limits)
            .await?;

        info!("{}: {} videos", meta.id, videos.len());

        Ok(Playlist {
            id: meta.id,
            url: meta.url,
            title: meta.title,
            channel_url: meta.channel_url,
            channel_name: meta.channel_name,
            thumbnails: meta.thumbnails,
            videos,
        })
    }
}

//! Videos: metadata and audio formats.
//!
//! Everything is read from the watch page. Metadata comes from the embedded
//! player response directly. Audio formats additionally need the transforms
//! of the page's player program, which are extracted on first use and
//! cached by the client (see [`TransformCache`](crate::transform::TransformCache)).
//! Livestreams also list formats in an HLS manifest, which is fetched and
//! appended.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use url::Url;

use crate::{
    client::Client,
    config::{Locale, PlayerPolicy},
    error::{Error, Result},
    hls,
    http::Fetch,
    matcher::is_video_url,
    protocol::{self, player::PlayerResponse},
    signature,
    transform::{Extracted, Limits},
    util::{extract, set_query_param},
};

/// Base URL of the platform.
pub const YOUTUBE_URL: &str = "https://www.youtube.com";

/// Watch page; videos are addressed with the `v` parameter.
pub const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Channel pages, relative to which channel IDs are resolved.
pub const CHANNEL_URL: &str = "https://www.youtube.com/channel/";

/// Duration reported for live content, which has no end.
pub const LIVE_DURATION: Duration = Duration::from_secs(u64::MAX);

const PLAYER_RESPONSE: &str = "var ytInitialPlayerResponse = {";

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct Thumbnail {
    pub url: String,

    /// Width in pixels.
    #[serde(default)]
    pub width: u32,

    /// Height in pixels.
    #[serde(default)]
    pub height: u32,
}

/// A video as listed in search results, playlists and on its watch page.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub channel_url: String,
    pub channel_name: Option<String>,
    pub thumbnails: Vec<Thumbnail>,

    /// Play time; [`LIVE_DURATION`] for live content.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub duration: Duration,

    pub is_live: bool,
}

impl VideoSummary {
    /// Builds a summary from the fields that listings and watch pages share.
    ///
    /// # Errors
    ///
    /// Returns a structural error if the video or channel ID is missing.
    pub fn new(
        id: Option<&str>,
        channel_id: Option<&str>,
        title: Option<String>,
        channel_name: Option<String>,
        thumbnails: Vec<Thumbnail>,
        duration: Duration,
        is_live: bool,
    ) -> Result<Self> {
        let id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::structural("missing video ID"))?;
        let channel_id = channel_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::structural("missing channel ID"))?;

        Ok(Self {
            id: id.to_owned(),
            url: watch_url(id)?.into(),
            title,
            channel_url: channel_url(channel_id)?.into(),
            channel_name,
            thumbnails,
            duration: if is_live { LIVE_DURATION } else { duration },
            is_live,
        })
    }
}

/// An audio stream of a video.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    /// Fetchable URL with signature and `n` parameter resolved.
    pub url: String,

    /// Format code.
    pub itag: u32,

    pub mime_type: String,
    pub codec: String,
    pub bitrate: u64,
    pub is_live: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Video {
    #[serde(flatten)]
    pub meta: VideoSummary,
    pub formats: Vec<Format>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VideoOptions {
    /// ISO 639-1 language code, e.g. `en`.
    pub language: Option<String>,

    /// ISO 3166-2 region code, e.g. `US`.
    pub region: Option<String>,
}

/// The parts of a watch page that are used.
#[derive(Debug)]
struct WatchPage {
    response: PlayerResponse,

    /// Path of the player program, relative to [`YOUTUBE_URL`].
    player: Option<String>,
}

/// URL of the watch page of video `id`.
pub(crate) fn watch_url(id: &str) -> Result<Url> {
    Url::parse_with_params(WATCH_URL, &[("v", id)]).map_err(Into::into)
}

/// URL of the page of channel `id`.
pub(crate) fn channel_url(id: &str) -> Result<Url> {
    Url::parse(CHANNEL_URL)?.join(id).map_err(Into::into)
}

/// Parses the string codec list out of a MIME type such as
/// `audio/webm; codecs="opus"`.
fn codec(mime_type: &str) -> String {
    extract(mime_type, r#"codecs=""#, r#"""#)
        .unwrap_or_default()
        .to_owned()
}

impl<F: Fetch> Client<F> {
    /// Gets the metadata and audio formats of a video.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or options are invalid, a fetch fails,
    /// the page lacks the player response, its video details or its
    /// streaming data, or the player program's transforms cannot be
    /// extracted or applied.
    pub async fn get_video(&self, url: &str, options: &VideoOptions) -> Result<Video> {
        let page = self.watch_page(url, options).await?;
        let meta = meta(&page.response)?;
        let formats = self.formats(&page).await?;

        Ok(Video { meta, formats })
    }

    /// Gets the metadata of a video.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or options are invalid, the fetch fails,
    /// or the page lacks the player response or its video details.
    pub async fn get_video_meta(&self, url: &str, options: &VideoOptions) -> Result<VideoSummary> {
        let page = self.watch_page(url, options).await?;
        meta(&page.response)
    }

    /// Gets the audio formats of a video.
    ///
    /// # Errors
    ///
    /// See [`Client::get_video`].
    pub async fn get_video_formats(&self, url: &str, options: &VideoOptions) -> Result<Vec<Format>> {
        let page = self.watch_page(url, options).await?;
        self.formats(&page).await
    }

    async fn watch_page(&self, url: &str, options: &VideoOptions) -> Result<WatchPage> {
        if !is_video_url(url) {
            return Err(Error::validation("`url` must be a valid video URL"));
        }

        let locale = Locale::resolve(
            options.language.as_deref(),
            options.region.as_deref(),
            &self.config,
        )?;

        let mut page_url =
            Url::parse(url).map_err(|_| Error::validation("`url` must be a valid video URL"))?;
        set_query_param(&mut page_url, "hl", &locale.language);
        set_query_param(&mut page_url, "gl", &locale.region);

        let html = self.get(page_url).await?;
        let response = protocol::embedded(&html, PLAYER_RESPONSE, "playerResponse")?;
        let player = extract(&html, r#""PLAYER_JS_URL":""#, r#"""#).map(ToOwned::to_owned);

        Ok(WatchPage { response, player })
    }

    /// Resolves the audio formats of a watch page, extracting transforms
    /// from its player program if needed.
    async fn formats(&self, page: &WatchPage) -> Result<Vec<Format>> {
        let streaming = page
            .response
            .streaming_data
            .as_ref()
            .ok_or_else(|| Error::structural("`streamingData` not found"))?;

        let required = match self.config.player_policy {
            PlayerPolicy::Pinned => None,
            PlayerPolicy::FollowPage => page.player.as_deref(),
        };
        let transforms = self
            .transforms
            .get_or_populate(required, || self.extract_transforms(page.player.as_deref()))
            .await?;

        let mut formats = Vec::new();
        for descriptor in streaming.descriptors().filter(|d| d.is_audio()) {
            let url = signature::resolve_url(descriptor, &transforms.decipher, &transforms.n_param)?;
            formats.push(Format {
                url,
                itag: descriptor.itag,
                mime_type: descriptor.mime_type.clone(),
                codec: codec(&descriptor.mime_type),
                bitrate: descriptor.bitrate,
                is_live: false,
            });
        }

        if let Some(manifest_url) = streaming.hls_manifest_url.as_deref() {
            let manifest_url = Url::parse(manifest_url)
                .map_err(|e| Error::structural(format!("malformed manifest URL: {e}")))?;
            let manifest = self.get(manifest_url).await?;
            formats.extend(hls::parse_manifest(&manifest));
        }

        debug!("resolved {} audio formats", formats.len());
        Ok(formats)
    }

    /// Fetches the player program at `player` and extracts both transforms.
    async fn extract_transforms(&self, player: Option<&str>) -> Result<Extracted> {
        let player = player.ok_or_else(|| Error::extraction("`PLAYER_JS_URL` not found"))?;
        let url = Url::parse(YOUTUBE_URL)?.join(player)?;
        let program = self.get(url).await?;

        let limits = Limits {
            timeout: self.config.transform_timeout,
            memory: self.config.transform_memory_limit,
        };

        Ok(Extracted {
            player: player.to_owned(),
            decipher: signature::decipher_script(&program, limits)?,
            n_param: signature::n_param_script(&program, limits)?,
        })
    }
}

/// Reads the metadata from a player response.
fn meta(response: &PlayerResponse) -> Result<VideoSummary> {
    let details = response
        .video_details
        .as_ref()
        .ok_or_else(|| Error::structural("`videoDetails` not found"))?;

    VideoSummary::new(
        details.video_id.as_deref(),
        details.channel_id.as_deref(),
        details.title.clone(),
        details.author.clone(),
        details.thumbnail.thumbnails.clone(),
        Duration::from_secs(details.length_seconds.unwrap_or_default()),
        details.is_live_content,
    )
}

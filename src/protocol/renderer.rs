//! Listing entries and headers.
//!
//! Listings are arrays of single-key objects, the key naming the renderer:
//! ```json
//! [
//!     { "videoRenderer": { "videoId": "ryT-ltTDCko", ... } },
//!     { "shelfRenderer": { ... } },
//!     { "continuationItemRenderer": { ... } }
//! ]
//! ```
//!
//! Only the renderers that carry videos, headers and continuations are
//! modeled here; the rest is skipped by key.

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::video::Thumbnail;

/// Key of the trailing entry that signals another page.
pub const CONTINUATION_ITEM: &str = "continuationItemRenderer";

/// Text made of runs, or a single simple text.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    #[serde(default)]
    pub runs: Vec<Run>,
    pub simple_text: Option<String>,
}

impl Text {
    #[must_use]
    pub fn first_run(&self) -> Option<&Run> {
        self.runs.first()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub text: Option<String>,
    pub navigation_endpoint: Option<NavigationEndpoint>,
}

impl Run {
    /// ID of the channel this run links to.
    #[must_use]
    pub fn browse_id(&self) -> Option<&str> {
        self.navigation_endpoint
            .as_ref()?
            .browse_endpoint
            .as_ref()?
            .browse_id
            .as_deref()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEndpoint {
    pub browse_endpoint: Option<BrowseEndpoint>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseEndpoint {
    pub browse_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

/// A search result.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRenderer {
    pub video_id: Option<String>,
    #[serde(default)]
    pub thumbnail: Thumbnails,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub owner_text: Text,
    pub length_text: Option<Text>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub metadata_badge_renderer: Option<MetadataBadgeRenderer>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MetadataBadgeRenderer {
    pub icon: Option<Icon>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icon {
    pub icon_type: Option<String>,
}

impl VideoRenderer {
    /// Whether the first badge marks the result as live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.badges
            .first()
            .and_then(|badge| badge.metadata_badge_renderer.as_ref())
            .and_then(|renderer| renderer.icon.as_ref())
            .and_then(|icon| icon.icon_type.as_deref())
            == Some("LIVE")
    }
}

/// A playlist entry.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideoRenderer {
    pub video_id: Option<String>,
    #[serde(default)]
    pub thumbnail: Thumbnails,
    #[serde(default)]
    pub thumbnail_overlays: Vec<ThumbnailOverlay>,
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub short_byline_text: Text,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub length_seconds: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailOverlay {
    pub thumbnail_overlay_time_status_renderer: Option<TimeStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TimeStatus {
    pub style: Option<String>,
}

impl PlaylistVideoRenderer {
    /// Whether the first overlay marks the entry as live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.thumbnail_overlays
            .first()
            .and_then(|overlay| overlay.thumbnail_overlay_time_status_renderer.as_ref())
            .and_then(|status| status.style.as_deref())
            == Some("LIVE")
    }
}

/// Trailing entry of a page that has a successor.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationItemRenderer {
    pub continuation_endpoint: Option<ContinuationEndpoint>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationEndpoint {
    pub continuation_command: Option<ContinuationCommand>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ContinuationCommand {
    pub token: Option<String>,
}

impl ContinuationItemRenderer {
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.continuation_endpoint
            .as_ref()?
            .continuation_command
            .as_ref()?
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

/// Header of a playlist page.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistHeader {
    pub playlist_header_renderer: Option<PlaylistHeaderRenderer>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistHeaderRenderer {
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub owner_text: Text,
    pub playlist_header_banner: Option<PlaylistHeaderBanner>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistHeaderBanner {
    pub hero_playlist_thumbnail_renderer: Option<HeroPlaylistThumbnailRenderer>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HeroPlaylistThumbnailRenderer {
    #[serde(default)]
    pub thumbnail: Thumbnails,
}

impl PlaylistHeaderRenderer {
    #[must_use]
    pub fn thumbnails(&self) -> &[Thumbnail] {
        self.playlist_header_banner
            .as_ref()
            .and_then(|banner| banner.hero_playlist_thumbnail_renderer.as_ref())
            .map_or(&[][..], |hero| hero.thumbnail.thumbnails.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_live_badge() {
        let renderer: VideoRenderer = serde_json::from_value(json!({
            "videoId": "ryT-ltTDCko",
            "badges": [{ "metadataBadgeRenderer": { "icon": { "iconType": "LIVE" } } }]
        }))
        .unwrap();
        assert!(renderer.is_live());

        let renderer: VideoRenderer = serde_json::from_value(json!({
            "videoId": "ryT-ltTDCko",
            "badges": [{ "metadataBadgeRenderer": { "style": "BADGE_STYLE_TYPE_SIMPLE" } }]
        }))
        .unwrap();
        assert!(!renderer.is_live());
    }

    #[test]
    fn reads_length_seconds_from_string() {
        let renderer: PlaylistVideoRenderer = serde_json::from_value(json!({
            "videoId": "ryT-ltTDCko",
            "lengthSeconds": "696"
        }))
        .unwrap();
        assert_eq!(renderer.length_seconds, Some(696));
        assert!(!renderer.is_live());

        let renderer: PlaylistVideoRenderer =
            serde_json::from_value(json!({ "videoId": "ryT-ltTDCko" })).unwrap();
        assert_eq!(renderer.length_seconds, None);
    }

    #[test]
    fn reads_continuation_token() {
        let renderer: ContinuationItemRenderer = serde_json::from_value(json!({
            "continuationEndpoint": { "continuationCommand": { "token": "abc" } }
        }))
        .unwrap();
        assert_eq!(renderer.token(), Some("abc"));

        let renderer: ContinuationItemRenderer =
            serde_json::from_value(json!({ "trigger": "CONTINUATION_TRIGGER_ON_ITEM_SHOWN" }))
                .unwrap();
        assert_eq!(renderer.token(), None);
    }

    #[test]
    fn reads_channel_link() {
        let text: Text = serde_json::from_value(json!({
            "runs": [{
                "text": "Channel",
                "navigationEndpoint": { "browseEndpoint": { "browseId": "UC123" } }
            }]
        }))
        .unwrap();

        let run = text.first_run().unwrap();
        assert_eq!(run.text.as_deref(), Some("Channel"));
        assert_eq!(run.browse_id(), Some("UC123"));
    }
}

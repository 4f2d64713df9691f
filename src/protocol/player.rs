//! Player response embedded in watch pages.
//!
//! # Wire Format
//!
//! Trimmed to what is used:
//! ```json
//! {
//!     "videoDetails": {
//!         "videoId": "ryT-ltTDCko",
//!         "title": "...",
//!         "lengthSeconds": "696",
//!         "channelId": "UC...",
//!         "thumbnail": { "thumbnails": [{ "url": "...", "width": 168, "height": 94 }] },
//!         "author": "...",
//!         "isLiveContent": false
//!     },
//!     "streamingData": {
//!         "formats": [...],
//!         "adaptiveFormats": [{
//!             "itag": 251,
//!             "signatureCipher": "s=...&sp=sig&url=https%3A%2F%2F...",
//!             "mimeType": "audio/webm; codecs=\"opus\"",
//!             "bitrate": 140279
//!         }],
//!         "hlsManifestUrl": "https://manifest.googlevideo.com/..."
//!     }
//! }
//! ```

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::renderer::Thumbnails;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub video_details: Option<VideoDetails>,
    pub streaming_data: Option<StreamingData>,
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub channel_id: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub thumbnail: Thumbnails,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub length_seconds: Option<u64>,
    #[serde(default)]
    pub is_live_content: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    #[serde(default)]
    pub formats: Vec<StreamDescriptor>,
    #[serde(default)]
    pub adaptive_formats: Vec<StreamDescriptor>,
    pub hls_manifest_url: Option<String>,
}

impl StreamingData {
    /// Muxed formats followed by adaptive formats.
    pub fn descriptors(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.formats.iter().chain(&self.adaptive_formats)
    }
}

/// A raw stream as listed by the platform.
///
/// Either `url` is directly usable, or `signature_cipher` bundles the URL
/// with a scrambled signature.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub url: Option<String>,
    pub signature_cipher: Option<String>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub itag: u32,
    pub mime_type: String,
    #[serde(default)]
    pub bitrate: u64,
}

impl StreamDescriptor {
    #[must_use]
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_streaming_data() {
        let response: PlayerResponse = serde_json::from_value(json!({
            "streamingData": {
                "formats": [{
                    "itag": 18,
                    "url": "https://r1.example.com/videoplayback?itag=18",
                    "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                    "bitrate": 503_351
                }],
                "adaptiveFormats": [{
                    "itag": 251,
                    "signatureCipher": "s=abc&url=https%3A%2F%2Fr1.example.com",
                    "mimeType": "audio/webm; codecs=\"opus\"",
                    "bitrate": 140_279
                }]
            }
        }))
        .unwrap();

        let streaming = response.streaming_data.unwrap();
        let itags: Vec<_> = streaming.descriptors().map(|d| d.itag).collect();
        assert_eq!(itags, [18, 251]);

        let audio: Vec<_> = streaming.descriptors().filter(|d| d.is_audio()).collect();
        assert_eq!(audio.len(), 1);
        assert!(audio[0].url.is_none());
        assert!(audio[0].signature_cipher.is_some());
        assert!(streaming.hls_manifest_url.is_none());
    }

    #[test]
    fn reads_video_details() {
        let details: VideoDetails = serde_json::from_value(json!({
            "videoId": "ryT-ltTDCko",
            "lengthSeconds": "696",
            "isLiveContent": false
        }))
        .unwrap();

        assert_eq!(details.length_seconds, Some(696));
        assert!(details.thumbnail.thumbnails.is_empty());
        assert!(details.channel_id.is_none());
    }
}

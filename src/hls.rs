//! Livestream formats from HLS manifests.
//!
//! Livestreams list their audio in an `.m3u8` master playlist instead of
//! the player response. Each variant URL embeds its format code in an
//! `/itag/<n>/` path segment, which is looked up in a fixed table.

use crate::{util::extract, video::Format};

/// MIME type of every livestream format.
pub const LIVESTREAM_MIME_TYPE: &str = r#"application/x-mpegURL, codecs="H.264, aac""#;

/// Audio codec of every livestream format.
pub const LIVESTREAM_CODEC: &str = "aac";

/// Known livestream format codes and their audio bitrates.
const LIVESTREAM_BITRATES: [(u32, u64); 6] = [
    (91, 48_000),
    (92, 48_000),
    (93, 128_000),
    (94, 128_000),
    (95, 256_000),
    (96, 256_000),
];

/// The livestream format for `itag` served at `url`, if the format code is
/// known.
#[must_use]
pub fn livestream_format(itag: u32, url: &str) -> Option<Format> {
    let (itag, bitrate) = LIVESTREAM_BITRATES
        .iter()
        .copied()
        .find(|(known, _)| *known == itag)?;

    Some(Format {
        url: url.to_owned(),
        itag,
        mime_type: LIVESTREAM_MIME_TYPE.to_owned(),
        codec: LIVESTREAM_CODEC.to_owned(),
        bitrate,
        is_live: true,
    })
}

/// Parses a master playlist into livestream formats, in manifest order.
///
/// Only absolute `https://` lines are considered. Lines without an
/// `/itag/<n>/` segment, or whose format code is not a known livestream
/// format, are skipped.
#[must_use]
pub fn parse_manifest(text: &str) -> Vec<Format> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("https://"))
        .filter_map(|line| {
            let itag = extract(line, "/itag/", "/")?.parse().ok()?;
            let format = livestream_format(itag, line);
            if format.is_none() {
                trace!("skipping unknown livestream format {itag}");
            }
            format
        })
        .collect()
}

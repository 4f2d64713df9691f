//! Audio stream resolution and listing retrieval for YouTube.
//!
//! * [`Client::search`](client::Client::search) - videos matching a query
//! * [`Client::get_playlist`](client::Client::get_playlist) - a playlist and its videos
//! * [`Client::get_video`](client::Client::get_video) - metadata and fetchable audio formats
//! * [`is_video_url`] and [`is_playlist_url`] - URL shape checks
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod client;
pub mod config;
pub mod error;
pub mod hls;
pub mod http;
pub mod matcher;
pub mod pagination;
pub mod playlist;
pub mod protocol;
pub mod search;
pub mod signature;
pub mod transform;
pub mod util;
pub mod video;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::Client;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use matcher::{is_playlist_url, is_video_url};
pub use playlist::{Playlist, PlaylistOptions};
pub use search::SearchOptions;
pub use video::{Format, Thumbnail, Video, VideoOptions, VideoSummary};

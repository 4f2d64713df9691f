//! Continuation requests to the private browse API.
//!
//! # Wire Format
//!
//! Request, posted to `/youtubei/v1/browse?key=...`:
//! ```json
//! {
//!     "context": {
//!         "client": {
//!             "hl": "en",
//!             "gl": "US",
//!             "clientName": "WEB",
//!             "clientVersion": "2.20230508.00.00"
//!         },
//!         "user": {},
//!         "request": {}
//!     },
//!     "continuation": "4qmFsgKlARIk..."
//! }
//! ```
//!
//! Response, trimmed to what is used:
//! ```json
//! {
//!     "onResponseReceivedActions": [{
//!         "appendContinuationItemsAction": {
//!             "continuationItems": [
//!                 { "playlistVideoRenderer": { ... } },
//!                 { "continuationItemRenderer": { ... } }
//!             ]
//!         }
//!     }]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Endpoint of the private browse API.
pub const BROWSE_URL: &str = "https://www.youtube.com/youtubei/v1/browse";

/// Client name the browse API expects from the web client.
pub const CLIENT_NAME: &str = "WEB";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Request<'a> {
    pub context: Context<'a>,
    pub continuation: &'a str,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Context<'a> {
    pub client: ClientInfo<'a>,
    pub user: Empty,
    pub request: Empty,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo<'a> {
    pub hl: &'a str,
    pub gl: &'a str,
    pub client_name: &'a str,
    pub client_version: &'a str,
}

/// Serializes as an empty object.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Empty {}

impl<'a> Request<'a> {
    #[must_use]
    pub fn new(language: &'a str, region: &'a str, client_version: &'a str, token: &'a str) -> Self {
        Self {
            context: Context {
                client: ClientInfo {
                    hl: language,
                    gl: region,
                    client_name: CLIENT_NAME,
                    client_version,
                },
                user: Empty::default(),
                request: Empty::default(),
            },
            continuation: token,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default)]
    pub on_response_received_actions: Vec<ReceivedAction>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedAction {
    pub append_continuation_items_action: Option<AppendContinuationItemsAction>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendContinuationItemsAction {
    pub continuation_items: Option<Vec<serde_json::Value>>,
}

impl Response {
    /// Items of the next page, if the response holds any.
    #[must_use]
    pub fn into_items(self) -> Option<Vec<serde_json::Value>> {
        self.on_response_received_actions
            .into_iter()
            .next()?
            .append_continuation_items_action?
            .continuation_items
    }
}

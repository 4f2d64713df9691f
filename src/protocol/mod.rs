//! Wire shapes of the platform's documents.
//!
//! # Submodules
//!
//! * [`browse`] - continuation requests to the private browse API and their responses
//! * [`player`] - player response embedded in watch pages
//! * [`renderer`] - listing entries and headers found in initial data
//!
//! Every shape is lenient about what it does not need: fields are optional
//! or defaulted, so that a missing field surfaces as a specific error where
//! it is used instead of as a generic parse failure.
//!
//! # Usage Example
//!
//! ```
//! use tubeline::protocol::{self, browse};
//!
//! // Parse and log JSON response
//! let response: browse::Response = protocol::json(&body, "continuation")?;
//!
//! // Parse the object assigned in an inline script
//! let data: serde_json::Value = protocol::embedded(&html, "var ytInitialData = {", "ytInitialData")?;
//! ```

pub mod browse;
pub mod player;
pub mod renderer;

use std::fmt::Debug;

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    util::extract,
};

/// Terminates an object assigned in an inline script.
const ASSIGNMENT_END: &str = "};";

/// Parses and logs JSON documents.
///
/// # Arguments
///
/// * `body` - Document text to parse
/// * `origin` - Description of the document for logging
///
/// # Errors
///
/// Returns a structural error if the text is not valid JSON or does not
/// match type `T`.
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error and raw text at ERROR level
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing response ({e:?})");
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}

/// Parses an object literal assigned in an inline script of a page.
///
/// `assignment` is the text up to and including the opening brace, for
/// example `var ytInitialData = {`. The object runs up to the first `};`
/// after it.
///
/// # Errors
///
/// Returns an extraction error naming `origin` if the assignment is absent,
/// and a structural error if the object does not parse as `T`.
pub fn embedded<T>(html: &str, assignment: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    let object = extract(html, assignment, ASSIGNMENT_END)
        .ok_or_else(|| Error::extraction(format!("`{origin}` not found")))?;

    json(&format!("{{{object}}}"), origin)
}

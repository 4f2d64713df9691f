//! Client configuration.
//!
//! A [`Config`] holds everything a [`Client`](crate::client::Client) needs
//! that is not specific to a single call: the default locale, how requests
//! identify themselves, and the budgets that bound pagination and transform
//! evaluation. All fields have defaults, so a configuration file only needs
//! to name what it overrides:
//!
//! ```toml
//! language = "de"
//! region = "DE"
//! page_ceiling = 50
//! transform_timeout = 1
//! player_policy = "follow_page"
//! ```

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};

use crate::error::{Error, Result};

/// Which player program the transform cache follows.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPolicy {
    /// Extract transforms from the first player seen and keep them for the
    /// lifetime of the client, whatever player later pages reference.
    #[default]
    Pinned,

    /// Extract transforms again whenever a page references a different
    /// player program than the one the cached transforms came from.
    FollowPage,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Default ISO 639-1 language code for requests.
    pub language: String,

    /// Default ISO 3166-2 region code for requests.
    pub region: String,

    pub user_agent: String,

    /// Web client version announced to the private browse API.
    pub client_version: String,

    /// Hard ceiling on pages fetched per listing, independent of the
    /// caller's `max_pages`.
    pub page_ceiling: usize,

    /// Wall-clock budget for one transform evaluation.
    #[serde_as(as = "DurationSeconds<u64>")]
    pub transform_timeout: Duration,

    /// Memory budget in bytes for one transform evaluation.
    pub transform_memory_limit: usize,

    pub player_policy: PlayerPolicy,
}

impl Config {
    /// Web client version that the browse API accepts continuations for.
    pub const CLIENT_VERSION: &'static str = "2.20230508.00.00";

    /// Configuration files are small; anything larger is rejected unread.
    const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Loads a configuration from a TOML file.
    ///
    /// Fields missing from the file take their default values.
    ///
    /// # Errors
    ///
    /// Returns a validation error if:
    /// * the file cannot be read or is too large
    /// * the file is not valid TOML or has fields of the wrong type
    /// * the resulting configuration is invalid (see [`Config::validate`])
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition: configuration should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::validation(format!(
                "{} is too large",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        trace!("configuration from {}: {config:#?}", path.display());
        Ok(config)
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the language or region is not a code of
    /// at most two characters, or if a budget is zero.
    pub fn validate(&self) -> Result<()> {
        if self.language.is_empty() || self.language.chars().count() > 2 {
            return Err(Error::validation(
                "`language` must be an ISO 639-1 language code",
            ));
        }

        if self.region.is_empty() || self.region.chars().count() > 2 {
            return Err(Error::validation(
                "`region` must be an ISO 3166-2 region code",
            ));
        }

        if self.page_ceiling == 0 {
            return Err(Error::validation(
                "`page_ceiling` must be larger than or equal to 1",
            ));
        }

        if self.transform_timeout.is_zero() || self.transform_memory_limit == 0 {
            return Err(Error::validation("transform budgets must not be zero"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let app_name = env!("CARGO_PKG_NAME");
        let app_version = env!("CARGO_PKG_VERSION");

        // Served like a desktop browser; the watch page differs otherwise.
        let user_agent = format!(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 {app_name}/{app_version}"
        );

        Self {
            language: String::from("en"),
            region: String::from("US"),
            user_agent,
            client_version: Self::CLIENT_VERSION.to_owned(),
            page_ceiling: 200,
            transform_timeout: Duration::from_secs(2),
            transform_memory_limit: 32 * 1024 * 1024,
            player_policy: PlayerPolicy::default(),
        }
    }
}

/// Language and region of a request.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Locale {
    /// ISO 639-1 language code, sent as `hl`.
    pub language: String,

    /// ISO 3166-2 region code, sent as `gl`.
    pub region: String,
}

impl Locale {
    /// Resolves a per-call locale, falling back to the configured one when
    /// neither `language` nor `region` is given. Empty strings count as not
    /// given.
    ///
    /// # Errors
    ///
    /// Returns a validation error if only one of both is given, or if either
    /// is longer than two characters.
    pub fn resolve(language: Option<&str>, region: Option<&str>, config: &Config) -> Result<Self> {
        let language = language.filter(|language| !language.is_empty());
        let region = region.filter(|region| !region.is_empty());

        match (language, region) {
            (Some(language), Some(region)) => {
                if language.chars().count() > 2 {
                    return Err(Error::validation(
                        "`language` must be an ISO 639-1 language code",
                    ));
                }
                if region.chars().count() > 2 {
                    return Err(Error::validation(
                        "`region` must be an ISO 3166-2 region code",
                    ));
                }

                Ok(Self {
                    language: language.to_owned(),
                    region: region.to_owned(),
                })
            }
            (None, None) => Ok(Self {
                language: config.language.clone(),
                region: config.region.clone(),
            }),
            _ => Err(Error::validation(
                "`language` and `region` must be used together",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.language, "en");
        assert_eq!(config.region, "US");
        assert_eq!(config.player_policy, PlayerPolicy::Pinned);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
                region = "DE"
                transform_timeout = 5
                player_policy = "follow_page"
            "#,
        )
        .unwrap();

        assert_eq!(config.language, "en");
        assert_eq!(config.region, "DE");
        assert_eq!(config.transform_timeout, Duration::from_secs(5));
        assert_eq!(config.player_policy, PlayerPolicy::FollowPage);
        assert_eq!(config.client_version, Config::CLIENT_VERSION);
    }

    #[test]
    fn example_file_matches_defaults() {
        let config = Config::from_file("tubeline.toml.example").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn rejects_zero_ceiling() {
        let config = Config {
            page_ceiling: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_long_region() {
        let config = Config {
            region: String::from("USA"),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn locale_falls_back_to_config() {
        let config = Config::default();
        let locale = Locale::resolve(None, Some(""), &config).unwrap();
        assert_eq!(locale.language, "en");
        assert_eq!(locale.region, "US");

        let locale = Locale::resolve(Some("de"), Some("DE"), &config).unwrap();
        assert_eq!(locale.language, "de");
        assert_eq!(locale.region, "DE");
    }

    #[test]
    fn locale_requires_both_codes() {
        let config = Config::default();
        let err = Locale::resolve(Some("de"), None, &config).unwrap_err();
        assert_eq!(err.error.to_string(), "`language` and `region` must be used together");

        let err = Locale::resolve(Some("deu"), Some("DE"), &config).unwrap_err();
        assert_eq!(err.error.to_string(), "`language` must be an ISO 639-1 language code");

        let err = Locale::resolve(Some("de"), Some("DEU"), &config).unwrap_err();
        assert_eq!(err.error.to_string(), "`region` must be an ISO 3166-2 region code");
    }
}

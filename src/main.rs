use std::{error::Error, process};

use clap::{command, Parser, Subcommand, ValueHint};
use log::{debug, error, info, LevelFilter};
use serde::Serialize;

use tubeline::{config::Config, Client, PlaylistOptions, SearchOptions, VideoOptions};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Group name for mutually exclusive video output options.
const ARGS_GROUP_VIDEO: &str = "video";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file
    ///
    /// TOML file with client settings. Settings it does not name keep their
    /// defaults.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, env = "TUBELINE_CONFIG")]
    config: Option<String>,

    /// ISO 639-1 language code
    ///
    /// Must be used together with `--region`.
    #[arg(short, long, requires = "region")]
    language: Option<String>,

    /// ISO 3166-2 region code
    ///
    /// Must be used together with `--language`.
    #[arg(short, long, requires = "language")]
    region: Option<String>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Subcommand)]
enum Command {
    /// Search for videos
    Search {
        query: String,

        /// Maximum number of videos (1 to 49)
        #[arg(short = 'n', long, default_value_t = 1)]
        max_videos: usize,
    },

    /// Get a playlist and its videos
    Playlist {
        #[arg(value_hint = ValueHint::Url)]
        url: String,

        /// Maximum number of pages to fetch
        #[arg(long, default_value_t = 1)]
        max_pages: usize,

        /// Maximum number of videos to return
        #[arg(long, default_value_t = 100)]
        max_videos: usize,
    },

    /// Get a video's metadata and audio formats
    Video {
        #[arg(value_hint = ValueHint::Url)]
        url: String,

        /// Only print metadata
        #[arg(long, default_value_t = false, group = ARGS_GROUP_VIDEO)]
        meta: bool,

        /// Only print audio formats
        #[arg(long, default_value_t = false, group = ARGS_GROUP_VIDEO)]
        formats: bool,
    },
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module("tubeline", level);
    }

    logger.init();
}

fn print<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs the command and prints its result as JSON.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, or if the
/// command fails.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match args.config.as_deref() {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let client = Client::new(config)?;

    // Abort pending requests on Ctrl-C.
    let cancel = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("cancelling");
            cancel.cancel();
        }
    });

    let language = args.language;
    let region = args.region;

    match args.command {
        Command::Search { query, max_videos } => {
            let options = SearchOptions {
                max_videos,
                language,
                region,
            };
            print(&client.search(&query, &options).await?)
        }

        Command::Playlist {
            url,
            max_pages,
            max_videos,
        } => {
            let options = PlaylistOptions {
                max_pages,
                max_videos,
                language,
                region,
            };
            print(&client.get_playlist(&url, &options).await?)
        }

        Command::Video { url, meta, formats } => {
            let options = VideoOptions { language, region };
            if meta {
                print(&client.get_video_meta(&url, &options).await?)
            } else if formats {
                print(&client.get_video_formats(&url, &options).await?)
            } else {
                print(&client.get_video(&url, &options).await?)
            }
        }
    }
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and runs the requested command.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    debug!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}

//! Command line definition and the configuration resolved from it.
//!
//! Precedence: explicit flag, then environment variable, then default.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{value_parser, Arg, ArgMatches, Command};

use crate::http::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_ADDR};
use crate::logging::{LogConfig, LogFormat};
use crate::poll::{PollConfig, DEFAULT_POLL_INTERVAL};

pub const SERVER_ADDR_ENV: &str = "SCAN_CLIENT_SERVER_ADDR";
pub const DEFAULT_MAX_POLLS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: url::Url,
    pub request_timeout: Duration,
    pub poll: PollConfig,
    pub output: OutputFormat,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Scan {
        file: Option<PathBuf>,
        url: Option<String>,
    },
    Status {
        analysis_id: String,
    },
}

pub fn command() -> Command {
    Command::new("scan-client")
        .about("Submit a file or URL for scanning and report the engines' verdicts")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("server-addr")
                .long("server-addr")
                .env(SERVER_ADDR_ENV)
                .default_value(DEFAULT_SERVER_ADDR)
                .value_parser(value_parser!(url::Url)),
        )
        .arg(
            Arg::new("poll-interval-ms")
                .long("poll-interval-ms")
                .default_value("5000")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("max-polls")
                .long("max-polls")
                .help("Give up after this many status checks (0 polls forever)")
                .default_value("120")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("max-wait-secs")
                .long("max-wait-secs")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .default_value("30")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .default_value("text")
                .value_parser(["text", "json"]),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .default_value("warn"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .default_value("compact")
                .value_parser(["pretty", "compact", "json"]),
        )
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("scan")
                .about("Submit a file or a URL and wait for the verdict")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(Arg::new("url").long("url")),
        )
        .subcommand(
            Command::new("status")
                .about("Show the current state of an existing analysis")
                .arg(Arg::new("analysis_id").required(true)),
        )
}

impl ClientConfig {
    pub fn from_matches(matches: &ArgMatches) -> ClientConfig {
        let server_addr = matches
            .get_one::<url::Url>("server-addr")
            .cloned()
            .expect("server-addr has a default value");

        let interval = matches
            .get_one::<u64>("poll-interval-ms")
            .map(|ms| Duration::from_millis(*ms))
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let mut poll = PollConfig::default().with_interval(interval);
        match matches.get_one::<u32>("max-polls").copied().unwrap_or(DEFAULT_MAX_POLLS) {
            0 => {}
            max_polls => poll = poll.with_max_attempts(max_polls),
        }
        if let Some(secs) = matches.get_one::<u64>("max-wait-secs") {
            poll = poll.with_max_duration(Duration::from_secs(*secs));
        }

        let request_timeout = matches
            .get_one::<u64>("timeout-secs")
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let output = match matches.get_one::<String>("output").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        };

        let log_format = match matches.get_one::<String>("log-format").map(String::as_str) {
            Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };
        let mut log = LogConfig::new().format(log_format);
        if let Some(level) = matches.get_one::<String>("log-level") {
            log = log.level(level.as_str());
        }

        ClientConfig {
            server_addr,
            request_timeout,
            poll,
            output,
            log,
        }
    }
}

impl Action {
    pub fn from_matches(matches: &ArgMatches) -> Option<Action> {
        match matches.subcommand() {
            Some(("scan", sub)) => Some(Action::Scan {
                file: sub.get_one::<PathBuf>("file").cloned(),
                url: sub.get_one::<String>("url").cloned(),
            }),
            Some(("status", sub)) => sub
                .get_one::<String>("analysis_id")
                .map(|analysis_id| Action::Status {
                    analysis_id: analysis_id.clone(),
                }),
            _ => None,
        }
    }
}

/// Parses `args` (program name first) into configuration and action.
pub fn parse_from<I, T>(args: I) -> Result<(ClientConfig, Action), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut cmd = command();
    let matches = cmd.try_get_matches_from_mut(args)?;
    let action = Action::from_matches(&matches).ok_or_else(|| {
        cmd.error(
            clap::error::ErrorKind::MissingSubcommand,
            "a subcommand is required",
        )
    })?;
    Ok((ClientConfig::from_matches(&matches), action))
}

//! Command-line interface for the chirper demo host.

use clap::{Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command line arguments that override the configuration file.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    pub log_level: Option<String>,
    pub json_logs: bool,
    /// Stop after this many ticks instead of waiting for a signal
    pub ticks: Option<u64>,
}

fn command() -> Command {
    Command::new("Chirper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs the custom chirps plugin against a simulated city")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("chirper.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ticks")
                .short('t')
                .long("ticks")
                .value_name("COUNT")
                .help("Number of simulation ticks to run (0 runs until Ctrl+C)")
                .value_parser(clap::value_parser!(u64)),
        )
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("chirper.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            ticks: matches.get_one::<u64>("ticks").copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::try_parse_from(["chirper"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("chirper.toml"));
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
        assert_eq!(args.ticks, None);
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::try_parse_from([
            "chirper",
            "--config",
            "city.toml",
            "-l",
            "debug",
            "--json-logs",
            "--ticks",
            "40",
        ])
        .unwrap();
        assert_eq!(args.config_path, PathBuf::from("city.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.ticks, Some(40));
    }

    #[test]
    fn test_cli_rejects_bad_tick_count() {
        assert!(CliArgs::try_parse_from(["chirper", "--ticks", "soon"]).is_err());
    }
}

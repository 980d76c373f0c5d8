use crate::config::{self, normalize_rate};
use clap::Parser;
use std::path::PathBuf;

/// Forwards new timeline posts to a phone over an email-to-SMS gateway, and
/// takes commands back the same way.
///
/// Flags given here win over the config file, and keep winning after the
/// file is hot-reloaded.
#[derive(Parser, Debug, Default, Clone)]
#[clap(author, version)]
pub struct Args {
    /// Location of the config file to be loaded.
    #[clap(short = 'c', long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Times per hour to check the timeline (> 0; anything lower means 1).
    #[clap(short = 't', long, value_name = "TIMES", allow_hyphen_values = true)]
    pub times_per_hour: Option<i64>,

    /// Forward your own posts in addition to the ones you follow.
    #[clap(short = 'o', long)]
    pub own_tweets: bool,

    /// Check once and exit instead of looping.
    #[clap(short = 's', long)]
    pub single_check: bool,
}

impl Args {
    /// The file to load at startup.
    pub fn config_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(config::default_path)
    }

    #[rustfmt::skip]
    pub fn overwrite_config(&self, options: &mut config::Options) {
        if let Some(times) = self.times_per_hour {
            options.per_hour = normalize_rate(times);
        }
        if self.own_tweets  { options.own_tweets = true; }
        if self.single_check { options.keep_alive = false; }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("twitter-sms").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_flags_leave_options_alone() {
        let mut options = config::Options::default();
        parse(&[]).overwrite_config(&mut options);
        assert_eq!(options, config::Options::default());
    }

    #[test]
    fn flags_override_file_values() {
        let args = parse(&["-t", "12", "-o", "-s"]);
        let mut options = config::Options::default();
        args.overwrite_config(&mut options);
        assert_eq!(options.per_hour, 12);
        assert!(options.own_tweets);
        assert!(!options.keep_alive);
        assert_eq!(options.interval(), Duration::from_secs(300));
    }

    #[test]
    fn nonpositive_rate_flag_means_once_an_hour() {
        for raw in ["0", "-3"] {
            let args = parse(&["--times-per-hour", raw]);
            let mut options = config::Options::default();
            args.overwrite_config(&mut options);
            assert_eq!(options.per_hour, 1);
            assert_eq!(options.interval(), Duration::from_secs(3600));
        }
    }

    #[test]
    fn config_file_flag_picks_the_path() {
        let args = parse(&["--config-file", "/tmp/elsewhere.conf"]);
        assert_eq!(args.config_path(), PathBuf::from("/tmp/elsewhere.conf"));
        assert_eq!(parse(&[]).config_path(), config::default_path());
    }

    #[test]
    fn short_h_asks_for_help() {
        let err = Args::try_parse_from(["twitter-sms", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::ErrorKind::DisplayHelp);
    }
}

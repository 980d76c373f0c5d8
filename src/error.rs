use std::path::PathBuf;
use thiserror::Error;

/// Problems reading or parsing the config file. Fatal at startup, only
/// skips the reload once the loop is running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file {path} is malformed: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Network or authentication failures on any of the three sessions.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timeline request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("timeline response wasn't understood: {0}")]
    Json(#[from] serde_json::Error),

    #[error("mailbox session failed: {0}")]
    Imap(#[from] imap::Error),

    #[error("mail submission failed: {0}")]
    Smtp(#[from] lettre::smtp::error::Error),

    #[error("couldn't set up TLS: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("server misbehaved: {0}")]
    Protocol(String),
}

/// Reasons an inbound message gets thrown away.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Mime(#[from] mailparse::MailParseError),

    #[error("message has no From address")]
    NoSender,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("the account has run out of API calls")]
    QuotaExceeded,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("couldn't deliver message: {0}")]
    Delivery(String),

    #[error("couldn't parse inbound message: {0}")]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Forwards new posts from a social timeline to a phone through an
//! email-to-SMS gateway, and takes commands back by mail.

pub mod action;
pub mod args;
pub mod bridge;
pub mod config;
pub mod email;
pub mod error;
pub mod filter;
pub mod inbox;
pub mod logging;
pub mod sender;
pub mod timeline;

pub use bridge::Bridge;
pub use error::{ConfigError, Error, ParseError, Result, TransportError};

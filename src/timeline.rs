use crate::config::Account;
use crate::error::{Error, Result, TransportError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::Duration;

/// How the timeline service writes `created_at`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineItem {
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Whether the account we poll as wrote it.
    pub own_post: bool,
}

/// The two calls we need from the timeline service.
pub trait TimelineApi {
    /// API calls left in the current quota window.
    fn remaining_calls(&self, account: &Account) -> std::result::Result<u32, TransportError>;

    /// Posts from followed accounts newer than `since`, newest first.
    fn friends_timeline(
        &self,
        account: &Account,
        since: DateTime<Utc>,
    ) -> std::result::Result<Vec<TimelineItem>, TransportError>;
}

#[derive(Deserialize)]
struct RateLimitStatus {
    remaining_hits: u32,
}

#[derive(Deserialize)]
struct Status {
    created_at: String,
    text: String,
    user: User,
}

#[derive(Deserialize)]
struct User {
    screen_name: String,
}

pub fn parse_rate_limit(json: &str) -> std::result::Result<u32, TransportError> {
    let status: RateLimitStatus = serde_json::from_str(json)?;
    Ok(status.remaining_hits)
}

/// Statuses with a timestamp we can't read are dropped rather than failing
/// the whole batch.
pub fn parse_timeline(json: &str) -> std::result::Result<Vec<TimelineItem>, TransportError> {
    let statuses: Vec<Status> = serde_json::from_str(json)?;
    Ok(statuses
        .into_iter()
        .filter_map(|status| {
            match DateTime::parse_from_str(&status.created_at, CREATED_AT_FORMAT) {
                Ok(created_at) => Some(TimelineItem {
                    author: status.user.screen_name,
                    text: status.text,
                    created_at: created_at.with_timezone(&Utc),
                    own_post: false,
                }),
                Err(e) => {
                    warn!(
                        "Skipping post by {} with unreadable date {:?}: {}",
                        status.user.screen_name, status.created_at, e
                    );
                    None
                }
            }
        })
        .collect())
}

/// Blocking HTTP client for the timeline service, using basic auth.
pub struct HttpTimeline {
    client: reqwest::blocking::Client,
}

impl HttpTimeline {
    pub fn new(timeout: Duration) -> std::result::Result<HttpTimeline, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("twitter-sms/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpTimeline { client })
    }

    fn get(
        &self,
        account: &Account,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<String, TransportError> {
        let url = format!("{}/{}", account.api_url.trim_end_matches('/'), endpoint);
        let body = self
            .client
            .get(url)
            .basic_auth(&account.name, Some(&account.password))
            .query(query)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(body)
    }
}

impl TimelineApi for HttpTimeline {
    fn remaining_calls(&self, account: &Account) -> std::result::Result<u32, TransportError> {
        parse_rate_limit(&self.get(account, "account/rate_limit_status.json", &[])?)
    }

    fn friends_timeline(
        &self,
        account: &Account,
        since: DateTime<Utc>,
    ) -> std::result::Result<Vec<TimelineItem>, TransportError> {
        let body = self.get(
            account,
            "statuses/friends_timeline.json",
            &[("since", since.to_rfc2822())],
        )?;
        parse_timeline(&body)
    }
}

/// Pulls new posts and owns the watermark (`last_check`). The watermark only
/// moves after a fetch succeeds.
pub struct TimelineFetcher<A> {
    api: A,
    last_check: DateTime<Utc>,
}

impl<A: TimelineApi> TimelineFetcher<A> {
    /// Starts one interval in the past so the first check picks up posts
    /// from just before startup.
    pub fn new(api: A, interval: Duration) -> TimelineFetcher<A> {
        let mut fetcher = TimelineFetcher {
            api,
            last_check: Utc::now(),
        };
        fetcher.rewind(interval);
        fetcher
    }

    pub fn rewind(&mut self, interval: Duration) {
        let interval = chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
        self.last_check = Utc::now() - interval;
    }

    pub fn last_check(&self) -> DateTime<Utc> {
        self.last_check
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Never fails: quota exhaustion and transport errors are logged and
    /// come back as an empty batch.
    pub fn fetch(&mut self, account: &Account) -> Vec<TimelineItem> {
        match self.try_fetch(account) {
            Ok(items) => {
                debug!("Fetched {} new post(s)", items.len());
                items
            }
            Err(Error::QuotaExceeded) => {
                info!("Your account has run out of API calls; call not made.");
                Vec::new()
            }
            Err(e) => {
                warn!("Error occurred retrieving timeline. Perhaps the Internet is down? {}", e);
                Vec::new()
            }
        }
    }

    fn try_fetch(&mut self, account: &Account) -> Result<Vec<TimelineItem>> {
        if self.api.remaining_calls(account)? == 0 {
            return Err(Error::QuotaExceeded);
        }

        // Taken before the call so posts landing mid-request are picked up
        // next time.
        let started = Utc::now();
        let since = self.last_check;
        let items = self.api.friends_timeline(account, since)?;
        self.last_check = started;

        Ok(items
            .into_iter()
            .filter(|item| item.created_at > since)
            .map(|mut item| {
                item.own_post = item.author == account.name;
                item
            })
            .collect())
    }
}

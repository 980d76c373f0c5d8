#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;
use twitter_sms::config::{Account, Relay};
use twitter_sms::sender::{MailSubmission, Notification, Outbox};
use twitter_sms::timeline::{TimelineApi, TimelineItem};
use twitter_sms::{inbox::Inbox, Error, TransportError};

pub const HANDLE: &str = "alice";
pub const PHONE: &str = "5551234567@txt.example.com";
pub const RELAY: &str = "bot@example.com";

pub fn config_text(extra: &str) -> String {
    format!(
        r#"
[user]
name = "{}"
password = "hunter2"
phone = "{}"

[bot]
email = "{}"
password = "botpass"

[config]
{}
"#,
        HANDLE, PHONE, RELAY, extra
    )
}

pub fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("twitter-sms.conf");
    fs::write(&path, config_text(extra)).unwrap();
    path
}

/// Pushes the file's mtime into the future so it reads as edited.
pub fn touch_later(path: &Path) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + std::time::Duration::from_secs(60))
        .unwrap();
}

/// A raw command mail as the phone would send it.
pub fn phone_mail(body: &str) -> String {
    mail_from(PHONE, body)
}

pub fn mail_from(sender: &str, body: &str) -> String {
    format!("From: {}\r\nTo: {}\r\n\r\n{}\r\n", sender, RELAY, body)
}

pub type Hook = Box<dyn FnOnce()>;

/// Serves the same authors, newest first, with fresh timestamps on every
/// call. Hooks run one per timeline call, in order.
pub struct FakeTimeline {
    pub authors: Vec<String>,
    pub remaining: u32,
    pub fail: bool,
    pub timeline_calls: Cell<usize>,
    pub since_seen: RefCell<Vec<DateTime<Utc>>>,
    pub hooks: RefCell<VecDeque<Hook>>,
}

impl FakeTimeline {
    pub fn posting(authors: &[&str]) -> FakeTimeline {
        FakeTimeline {
            authors: authors.iter().map(|a| a.to_string()).collect(),
            remaining: 100,
            fail: false,
            timeline_calls: Cell::new(0),
            since_seen: RefCell::new(Vec::new()),
            hooks: RefCell::new(VecDeque::new()),
        }
    }

    pub fn then(self, hook: impl FnOnce() + 'static) -> FakeTimeline {
        self.hooks.borrow_mut().push_back(Box::new(hook));
        self
    }
}

impl TimelineApi for FakeTimeline {
    fn remaining_calls(&self, _: &Account) -> Result<u32, TransportError> {
        Ok(self.remaining)
    }

    fn friends_timeline(
        &self,
        _: &Account,
        since: DateTime<Utc>,
    ) -> Result<Vec<TimelineItem>, TransportError> {
        self.timeline_calls.set(self.timeline_calls.get() + 1);
        self.since_seen.borrow_mut().push(since);
        let hook = self.hooks.borrow_mut().pop_front();
        if let Some(hook) = hook {
            hook();
        }
        if self.fail {
            return Err(TransportError::Protocol("connection reset".to_string()));
        }

        let newest = Utc::now() + Duration::seconds(1);
        Ok(self
            .authors
            .iter()
            .enumerate()
            .map(|(i, author)| TimelineItem {
                author: author.clone(),
                text: format!("<post {}> & more", i),
                created_at: newest - Duration::milliseconds(i as i64),
                own_post: false,
            })
            .collect())
    }
}

#[derive(Default)]
pub struct Outcome {
    pub connects: usize,
    pub attempts: usize,
    pub delivered: Vec<Notification>,
    pub closed: usize,
}

/// Records what would have gone out. `fail_on` holds attempt numbers
/// (0-based, across the whole test) that get rejected; `hang_up_on` is the
/// attempt where the session dies, the way a refused login surfaces.
#[derive(Default)]
pub struct FakeSubmission {
    pub refuse: bool,
    pub fail_on: Vec<usize>,
    pub hang_up_on: Option<usize>,
    pub outcome: Rc<RefCell<Outcome>>,
}

pub struct FakeSession {
    fail_on: Vec<usize>,
    hang_up_on: Option<usize>,
    outcome: Rc<RefCell<Outcome>>,
}

impl MailSubmission for FakeSubmission {
    type Session = FakeSession;

    fn connect(&self, relay: &Relay) -> Result<FakeSession, TransportError> {
        assert_eq!(relay.email, RELAY);
        self.outcome.borrow_mut().connects += 1;
        if self.refuse {
            return Err(TransportError::Protocol("535 auth failed".to_string()));
        }
        Ok(FakeSession {
            fail_on: self.fail_on.clone(),
            hang_up_on: self.hang_up_on,
            outcome: self.outcome.clone(),
        })
    }
}

impl Outbox for FakeSession {
    fn deliver(&mut self, notification: &Notification) -> twitter_sms::Result<()> {
        let mut outcome = self.outcome.borrow_mut();
        let attempt = outcome.attempts;
        outcome.attempts += 1;
        if self.hang_up_on == Some(attempt) {
            return Err(TransportError::Protocol("535 5.7.8 bad credentials".to_string()).into());
        }
        if self.fail_on.contains(&attempt) {
            return Err(Error::Delivery("552 mailbox full".to_string()));
        }
        outcome.delivered.push(notification.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.outcome.borrow_mut().closed += 1;
    }
}

/// Hands out one prepared batch of raw mails per session.
#[derive(Default)]
pub struct FakeInbox {
    pub batches: VecDeque<Vec<String>>,
    pub refuse: bool,
    pub sessions: usize,
}

impl FakeInbox {
    pub fn with(batches: Vec<Vec<String>>) -> FakeInbox {
        FakeInbox {
            batches: batches.into(),
            ..FakeInbox::default()
        }
    }
}

impl Inbox for FakeInbox {
    fn take_all(&mut self, _: &Relay) -> Result<Vec<Vec<u8>>, TransportError> {
        self.sessions += 1;
        if self.refuse {
            return Err(TransportError::Protocol("login refused".to_string()));
        }
        Ok(self
            .batches
            .pop_front()
            .unwrap_or_default()
            .into_iter()
            .map(String::into_bytes)
            .collect())
    }
}

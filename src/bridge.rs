use crate::args::Args;
use crate::config::ConfigStore;
use crate::filter;
use crate::inbox::{self, Inbox};
use crate::sender::{self, MailSubmission};
use crate::timeline::{TimelineApi, TimelineFetcher, TimelineItem};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Where the loop is within a cycle. The stop flag is only looked at on the
/// way into `Refreshing` and `Sleeping`, never in the middle of network I/O.
#[derive(Debug)]
enum State {
    Refreshing,
    CheckingInbox,
    Fetching,
    Filtering(Vec<TimelineItem>),
    Sending(Vec<TimelineItem>),
    Sleeping,
    Terminated,
}

/// Ties config, timeline, outbound and inbound mail together.
pub struct Bridge<T, S, I> {
    store: ConfigStore,
    overrides: Args,
    fetcher: TimelineFetcher<T>,
    submission: S,
    inbox: I,
    stop: Arc<AtomicBool>,
}

impl<T, S, I> Bridge<T, S, I>
where
    T: TimelineApi,
    S: MailSubmission,
    I: Inbox,
{
    /// `overrides` should already have been applied to `store`; they're
    /// kept to re-apply after each hot reload.
    pub fn new(store: ConfigStore, overrides: Args, timeline: T, submission: S, inbox: I) -> Self {
        let fetcher = TimelineFetcher::new(timeline, store.interval());
        Bridge {
            store,
            overrides,
            fetcher,
            submission,
            inbox,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag ends the loop after the current cycle.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn fetcher(&self) -> &TimelineFetcher<T> {
        &self.fetcher
    }

    pub fn submission(&self) -> &S {
        &self.submission
    }

    pub fn inbox(&self) -> &I {
        &self.inbox
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Runs cycles until `keep_alive` is off or a stop is requested.
    /// Returns the batch sent in the last cycle.
    pub fn run(&mut self) -> Vec<TimelineItem> {
        let mut state = State::Refreshing;
        let mut last_batch = Vec::new();

        loop {
            state = match state {
                State::Refreshing if self.stopping() => State::Terminated,
                State::Refreshing => {
                    self.refresh_config();
                    State::CheckingInbox
                }
                State::CheckingInbox => {
                    self.check_inbox();
                    if self.store.settings().options.active {
                        State::Fetching
                    } else {
                        debug!("Texting is disabled, not checking the timeline");
                        last_batch = Vec::new();
                        State::Sleeping
                    }
                }
                State::Fetching => {
                    let account = &self.store.settings().account;
                    State::Filtering(self.fetcher.fetch(account))
                }
                State::Filtering(items) => {
                    State::Sending(filter::reduce(items, &self.store.settings().options))
                }
                State::Sending(items) => {
                    let settings = self.store.settings();
                    sender::send(
                        &self.submission,
                        &items,
                        &settings.relay,
                        &settings.account.phone,
                    );
                    last_batch = items;
                    State::Sleeping
                }
                State::Sleeping => {
                    if !self.store.settings().options.keep_alive || self.stopping() {
                        State::Terminated
                    } else {
                        self.sleep(self.store.interval());
                        State::Refreshing
                    }
                }
                State::Terminated => break,
            };
        }

        info!("Stopped checking.");
        last_batch
    }

    fn refresh_config(&mut self) {
        if self.store.settings().options.dont_refresh || !self.store.is_stale() {
            return;
        }

        match self.store.reload() {
            Ok(()) => {
                self.overrides
                    .overwrite_config(&mut self.store.settings_mut().options);
                self.fetcher.rewind(self.store.interval());
                info!("Loaded config file");
            }
            Err(e) => warn!("Keeping the current config, reload failed: {}", e),
        }
    }

    fn check_inbox(&mut self) {
        let settings = self.store.settings_mut();
        inbox::drain(
            &mut self.inbox,
            &settings.relay,
            &settings.account.phone,
            &mut settings.options,
        );
    }

    /// Sleeps in one-second slices so a stop request isn't held up by a
    /// long interval.
    fn sleep(&self, interval: Duration) {
        info!("Waiting for ~{:.1} minutes...", interval.as_secs_f64() / 60.0);
        let slice = Duration::from_secs(1);
        let mut remaining = interval;
        while !remaining.is_zero() && !self.stopping() {
            let nap = remaining.min(slice);
            thread::sleep(nap);
            remaining -= nap;
        }
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic;

use twitter_sms::args::Args;
use twitter_sms::config::ConfigStore;
use twitter_sms::inbox::ImapInbox;
use twitter_sms::sender::SmtpSubmission;
use twitter_sms::timeline::HttpTimeline;
use twitter_sms::{logging, Bridge};

fn main() -> Result<()> {
    let args = Args::parse();

    let path = args.config_path();
    let mut store = ConfigStore::load(&path)
        .with_context(|| format!("Couldn't load config from {}", path.display()))?;
    args.overwrite_config(&mut store.settings_mut().options);

    logging::init(&store.settings().options)?;
    log::info!("Loaded config file");

    let timeout = store.settings().options.timeout();
    let timeline = HttpTimeline::new(timeout).context("Couldn't set up the timeline client")?;
    let mut bridge = Bridge::new(store, args, timeline, SmtpSubmission::new(timeout), ImapInbox);

    let stop = bridge.stop_flag();
    ctrlc::set_handler(move || {
        stop.store(true, atomic::Ordering::Relaxed);
        log::info!("Got termination signal, stopping after the current cycle...");
    })?;

    bridge.run();
    Ok(())
}

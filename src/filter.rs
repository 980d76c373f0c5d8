use crate::config::Options;
use crate::timeline::TimelineItem;

/// Drops our own posts (unless asked for) and anything by an ignored author,
/// then flips the newest-first feed into the order the posts were written.
pub fn reduce(items: Vec<TimelineItem>, options: &Options) -> Vec<TimelineItem> {
    items
        .into_iter()
        .rev()
        .filter(|item| options.own_tweets || !item.own_post)
        .filter(|item| !options.no_follow.contains(&item.author))
        .collect()
}

//! Backlog estimation
//!
//! Summarises how much unfinished listening has piled up.

use crate::catalog::{Catalog, Episode};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Summary of the unfinished part of a catalog
#[derive(Debug, Clone, Default)]
pub struct BacklogEstimate {
    /// Number of unfinished episodes
    pub episode_count: usize,
    /// The unfinished episode published first
    pub oldest: Option<Episode>,
    /// Whole days since the oldest unfinished episode was published
    pub age_days: i64,
    /// Sum of the full durations of all unfinished episodes
    pub total_duration: Duration,
    /// Like `total_duration`, minus what has already been listened to
    pub remaining_duration: Duration,
    /// Backlog duration per day of backlog age, if the backlog is at least a day old
    pub average_per_day: Option<Duration>,
}

/// Estimates the backlog of unfinished episodes as of `now`
pub fn estimate(catalog: &Catalog, now: DateTime<Utc>) -> BacklogEstimate {
    let mut result = BacklogEstimate::default();

    for episode in catalog.unfinished() {
        result.episode_count += 1;
        // Whole seconds per episode, fractions are dropped
        result.total_duration = result
            .total_duration
            .saturating_add(Duration::from_secs(episode.duration_seconds as u64));
        result.remaining_duration = result
            .remaining_duration
            .saturating_add(Duration::from_secs(episode.remaining_seconds() as u64));

        let is_older = result
            .oldest
            .as_ref()
            .is_none_or(|oldest| episode.published_at < oldest.published_at);
        if is_older {
            result.oldest = Some(episode.clone());
        }
    }

    if let Some(oldest) = &result.oldest {
        result.age_days = (now - oldest.published_at).num_days().max(0);
    }

    if result.age_days > 0 {
        let days = u32::try_from(result.age_days).unwrap_or(u32::MAX);
        result.average_per_day = Some(result.total_duration / days);
    }

    result
}

/// Formats a duration as `[D day(s), ]H:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    match days {
        0 => format!("{hours}:{minutes:02}:{seconds:02}"),
        1 => format!("1 day, {hours}:{minutes:02}:{seconds:02}"),
        _ => format!("{days} days, {hours}:{minutes:02}:{seconds:02}"),
    }
}

//! Review scheduling: a simplified SM-2 variant with two ratings.
//!
//! Everything here is pure over its inputs. Time is always passed in by the
//! caller so schedules are reproducible in tests.

use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;
use log::debug;

use crate::phrase::{Phrase, Rating};

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_EASE_FACTOR: f64 = 3.0;
pub const HARD_EASE_PENALTY: f64 = 0.2;
pub const EASY_EASE_BONUS: f64 = 0.1;
/// One minute, so a hard card resurfaces almost immediately.
pub const HARD_INTERVAL_DAYS: f64 = 1.0 / 1440.0;
pub const FIRST_EASY_INTERVAL_DAYS: f64 = 1.0;
pub const SECOND_EASY_INTERVAL_DAYS: f64 = 6.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Updates the phrase's review metadata for `rating` given at `now`.
///
/// The branch on `repetition_count` uses the post-increment value: the first
/// easy rating yields one day, the second six days, and later ones multiply
/// the previous interval by the ease factor in effect before this rating.
pub fn apply_rating(phrase: &mut Phrase, rating: Rating, now: DateTime<Utc>) {
    let (repetition_count, interval_days, ease_factor) = match rating {
        Rating::Hard => (
            0,
            HARD_INTERVAL_DAYS,
            (phrase.ease_factor - HARD_EASE_PENALTY).max(MIN_EASE_FACTOR),
        ),
        Rating::Easy => {
            let repetitions = phrase.repetition_count.saturating_add(1);
            let interval = match repetitions {
                1 => FIRST_EASY_INTERVAL_DAYS,
                2 => SECOND_EASY_INTERVAL_DAYS,
                _ => phrase.interval_days * phrase.ease_factor,
            };
            (
                repetitions,
                interval,
                (phrase.ease_factor + EASY_EASE_BONUS).min(MAX_EASE_FACTOR),
            )
        }
    };

    let next_due_at = add_days(now, interval_days);

    phrase.repetition_count = repetition_count;
    phrase.interval_days = interval_days;
    phrase.ease_factor = ease_factor;
    phrase.last_reviewed_at = Some(now);
    phrase.next_due_at = next_due_at;

    debug!(
        "rated {} {}: reps={} interval={:.4}d ease={:.2} due={}",
        phrase.id,
        rating,
        phrase.repetition_count,
        phrase.interval_days,
        phrase.ease_factor,
        phrase.next_due_at.to_rfc3339()
    );
}

/// Adds a fractional number of days, saturating instead of overflowing.
pub fn add_days(from: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    // `as` saturates, so huge or infinite intervals land on i64::MAX
    let millis = (days.max(0.0) * SECONDS_PER_DAY * 1000.0).round() as i64;
    TimeDelta::try_milliseconds(millis)
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Indices of the due phrases, most overdue first. Ties keep collection order.
pub fn due_indices(phrases: &[Phrase], now: DateTime<Utc>) -> Vec<usize> {
    phrases
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_due(now))
        .sorted_by_key(|(_, p)| p.next_due_at)
        .map(|(idx, _)| idx)
        .collect()
}

/// Phrases with `next_due_at <= now`, most overdue first (stable).
pub fn select_due(phrases: &[Phrase], now: DateTime<Utc>) -> Vec<&Phrase> {
    due_indices(phrases, now)
        .into_iter()
        .map(|idx| &phrases[idx])
        .collect()
}

pub fn due_count(phrases: &[Phrase], now: DateTime<Utc>) -> usize {
    phrases.iter().filter(|p| p.is_due(now)).count()
}

/// Earliest due time strictly after `now`, for "come back later" messaging.
pub fn next_due_time(phrases: &[Phrase], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    phrases
        .iter()
        .map(|p| p.next_due_at)
        .filter(|due| *due > now)
        .min()
}

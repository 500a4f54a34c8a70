//! Collection-level operations: creating phrases and summarizing the deck.

use chrono::{DateTime, Utc};
use log::info;

use crate::error::{Error, Result};
use crate::phrase::{Formality, Phrase};
use crate::quota::UsageQuota;
use crate::scheduler;
use crate::store::PhraseDb;
use crate::translation::Translation;

/// Stores a new phrase built from a resolved translation, if the quota allows.
///
/// The use is recorded before the phrase is written, so a failure at either
/// step never leaves an uncounted phrase behind.
pub fn add_phrase<Q: UsageQuota>(
    db: &PhraseDb,
    quota: &mut Q,
    prompt_text: &str,
    translation: Translation,
    formality: Formality,
    now: DateTime<Utc>,
) -> Result<Phrase> {
    if !quota.can_proceed()? {
        return Err(Error::QuotaExhausted {
            limit: quota.limit(),
        });
    }
    let phrase = Phrase::from_translation(prompt_text.trim(), translation, formality, now);
    quota.record_use()?;
    db.insert(&phrase)?;
    info!("created phrase {} for {:?}", phrase.id, phrase.prompt_text);
    Ok(phrase)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckStatus {
    pub total: usize,
    pub due: usize,
    pub next_due_at: Option<DateTime<Utc>>,
}

impl DeckStatus {
    pub fn of(phrases: &[Phrase], now: DateTime<Utc>) -> Self {
        Self {
            total: phrases.len(),
            due: scheduler::due_count(phrases, now),
            next_due_at: scheduler::next_due_time(phrases, now),
        }
    }
}

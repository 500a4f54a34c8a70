use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::translation::Translation;

pub const INITIAL_EASE_FACTOR: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhraseId(Uuid);

impl PhraseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PhraseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PhraseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PhraseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How well the learner recalled the target text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Rating {
    Hard,
    Easy,
}

/// Register requested from the translation collaborator
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Formality {
    #[default]
    Informal,
    Formal,
}

/// A learned phrase together with its review schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub id: PhraseId,
    pub prompt_text: String,
    pub target_text: String,
    pub target_pronunciation: String,
    pub literal_gloss: Option<String>,
    pub formality: Formality,
    pub created_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_due_at: DateTime<Utc>,
    pub ease_factor: f64,
    pub interval_days: f64,
    pub repetition_count: u32,
}

impl Phrase {
    /// Creates a phrase that is due immediately.
    pub fn new(
        prompt_text: impl Into<String>,
        target_text: impl Into<String>,
        target_pronunciation: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PhraseId::new(),
            prompt_text: prompt_text.into(),
            target_text: target_text.into(),
            target_pronunciation: target_pronunciation.into(),
            literal_gloss: None,
            formality: Formality::default(),
            created_at: now,
            last_reviewed_at: None,
            next_due_at: now,
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0.0,
            repetition_count: 0,
        }
    }

    /// Builds a phrase from an already-resolved translation.
    pub fn from_translation(
        prompt_text: impl Into<String>,
        translation: Translation,
        formality: Formality,
        now: DateTime<Utc>,
    ) -> Self {
        let mut phrase = Self::new(
            prompt_text,
            translation.target_text,
            translation.target_pronunciation,
            now,
        );
        phrase.literal_gloss = translation.literal_gloss.filter(|g| !g.trim().is_empty());
        phrase.formality = formality;
        phrase
    }

    pub fn with_gloss(mut self, gloss: impl Into<String>) -> Self {
        let gloss = gloss.into();
        self.literal_gloss = if gloss.trim().is_empty() {
            None
        } else {
            Some(gloss)
        };
        self
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due_at <= now
    }
}

use thiserror::Error;

use crate::audio::AudioError;
use crate::translation::TranslationError;

/// Errors surfaced by collaborators and the collection store.
///
/// The scheduler and the session state machine never produce these; they are
/// total over well-formed input.
#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio playback failed: {0}")]
    Audio(#[from] AudioError),

    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("daily limit of {limit} new phrases reached")]
    QuotaExhausted { limit: u32 },

    #[error("no phrase matches `{0}`")]
    PhraseNotFound(String),

    #[error("`{0}` matches more than one phrase")]
    AmbiguousId(String),
}

pub type Result<T> = std::result::Result<T, Error>;

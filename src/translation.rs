use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phrase::Formality;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("nothing to translate")]
    EmptySource,

    #[error("provider returned no target text")]
    EmptyResult,

    #[error("provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub source_text: String,
    pub formality: Formality,
}

/// A resolved translation, ready to become a phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub target_text: String,
    pub target_pronunciation: String,
    pub literal_gloss: Option<String>,
}

/// Produces target text for a prompt. Implementations may block on the
/// network; the scheduling core only ever sees the resolved result.
pub trait TranslationProvider {
    fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslationError>;
}

/// Translation typed in by the learner.
#[derive(Debug, Clone, Default)]
pub struct ManualTranslation {
    pub target_text: String,
    pub target_pronunciation: String,
    pub literal_gloss: Option<String>,
}

impl TranslationProvider for ManualTranslation {
    fn translate(&self, request: &TranslationRequest) -> Result<Translation, TranslationError> {
        if request.source_text.trim().is_empty() {
            return Err(TranslationError::EmptySource);
        }
        if self.target_text.trim().is_empty() {
            return Err(TranslationError::EmptyResult);
        }
        Ok(Translation {
            target_text: self.target_text.trim().to_string(),
            target_pronunciation: self.target_pronunciation.trim().to_string(),
            literal_gloss: self
                .literal_gloss
                .as_deref()
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
        })
    }
}

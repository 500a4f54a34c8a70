use serde::{Deserialize, Serialize};

pub const DEFAULT_PLACEHOLDER: &str = "?";

/// Partitions target text into the units disclosed one at a time.
pub trait RevealUnits {
    fn units(&self, target: &str) -> Vec<String>;
}

/// One unit per written character, whitespace skipped. Suits logographic
/// scripts where every character carries meaning.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharUnits;

impl RevealUnits for CharUnits {
    fn units(&self, target: &str) -> Vec<String> {
        target
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_string())
            .collect()
    }
}

/// One unit per whitespace-separated word, for alphabetic scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordUnits;

impl RevealUnits for WordUnits {
    fn units(&self, target: &str) -> Vec<String> {
        target.split_whitespace().map(str::to_string).collect()
    }
}

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
pub enum RevealMode {
    #[default]
    Chars,
    Words,
}

impl RevealMode {
    pub fn rule(&self) -> Box<dyn RevealUnits> {
        match self {
            RevealMode::Chars => Box::new(CharUnits),
            RevealMode::Words => Box::new(WordUnits),
        }
    }
}

/// Units below `revealed` are shown, the rest replaced with `placeholder`.
pub fn mask(units: &[String], revealed: usize, placeholder: &str) -> Vec<String> {
    units
        .iter()
        .enumerate()
        .map(|(idx, unit)| {
            if idx < revealed {
                unit.clone()
            } else {
                placeholder.to_string()
            }
        })
        .collect()
}

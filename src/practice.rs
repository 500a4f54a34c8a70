//! Practice run over a [`Session`] with its collaborators attached.

use log::warn;

use crate::audio::AudioPlayback;
use crate::clock::Clock;
use crate::error::Result;
use crate::phrase::{Phrase, Rating};
use crate::reveal::{RevealUnits, DEFAULT_PLACEHOLDER};
use crate::session::{RevealState, Session, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeConfig {
    pub auto_play_audio: bool,
    pub placeholder: String,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            auto_play_audio: true,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

pub struct Practice<'a, A: AudioPlayback, C: Clock> {
    session: Session<'a>,
    config: PracticeConfig,
    audio: A,
    clock: C,
}

impl<'a, A: AudioPlayback, C: Clock> Practice<'a, A, C> {
    pub fn start(
        phrases: &'a mut [Phrase],
        unit_rule: &'a dyn RevealUnits,
        config: PracticeConfig,
        audio: A,
        clock: C,
    ) -> Self {
        let now = clock.now();
        Self {
            session: Session::start(phrases, now, unit_rule),
            config,
            audio,
            clock,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &Session<'a> {
        &self.session
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    pub fn masked_units(&self) -> Vec<String> {
        self.session.masked_units(&self.config.placeholder)
    }

    /// Advances the reveal. The transition is committed before any audio is
    /// attempted; a playback failure is returned and leaves the state as is.
    pub fn advance_reveal(&mut self) -> Result<SessionState> {
        let before = self.session.reveal_state();
        let state = self.session.advance_reveal();

        let entered_pronunciation = before == RevealState::ShowPrompt
            && state.reveal_state == RevealState::ShowPronunciation;
        let entered_reveal = before == RevealState::ShowPronunciation
            && matches!(
                state.reveal_state,
                RevealState::Revealing | RevealState::RatingReady
            );

        if self.config.auto_play_audio && (entered_pronunciation || entered_reveal) {
            self.speak_current()?;
        }
        Ok(state)
    }

    /// Rates the current phrase at the clock's current time.
    pub fn submit_rating(&mut self, rating: Rating) -> Result<SessionState> {
        if self.session.reveal_state() == RevealState::RatingReady {
            self.audio.stop();
        }
        let now = self.clock.now();
        Ok(self.session.submit_rating(rating, now))
    }

    /// Speaks the current target text, e.g. when the learner asks to hear it
    /// again or retries after a playback failure.
    pub fn speak_current(&mut self) -> Result<()> {
        let Some(text) = self.session.current_phrase().map(|p| p.target_text.clone()) else {
            return Ok(());
        };
        self.audio.speak(&text).map_err(|e| {
            warn!("audio playback failed: {e}");
            e.into()
        })
    }

    /// Ends the run, handing back the finished session.
    pub fn finish(mut self) -> Session<'a> {
        self.audio.stop();
        self.session
    }
}

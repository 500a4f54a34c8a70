use log::{debug, warn};
use std::process::{Child, Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("could not start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("speech command is empty")]
    EmptyCommand,
}

/// Speaks target text aloud. Fire-and-forget: callers do not wait for
/// playback to finish.
pub trait AudioPlayback {
    fn speak(&mut self, text: &str) -> Result<(), AudioError>;
    fn stop(&mut self);
}

impl<T: AudioPlayback + ?Sized> AudioPlayback for Box<T> {
    fn speak(&mut self, text: &str) -> Result<(), AudioError> {
        (**self).speak(text)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Playback that does nothing, for hosts without audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAudio;

impl AudioPlayback for SilentAudio {
    fn speak(&mut self, _text: &str) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Runs an external speech program (e.g. `say -v Tingting` or
/// `espeak -v zh`) with the text appended as the last argument.
#[derive(Debug)]
pub struct CommandAudio {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl CommandAudio {
    /// Parses a whitespace-separated command line.
    pub fn new(command_line: &str) -> Result<Self, AudioError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(AudioError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
            child: None,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl AudioPlayback for CommandAudio {
    fn speak(&mut self, text: &str) -> Result<(), AudioError> {
        self.stop();
        debug!("speaking via {}", self.program);
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| AudioError::Spawn {
                command: self.program.clone(),
                source,
            })?;
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                if let Err(e) = child.kill() {
                    warn!("failed to stop speech process: {e}");
                }
            }
            let _ = child.wait();
        }
    }
}

impl Drop for CommandAudio {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_program_and_args() {
        let audio = CommandAudio::new("espeak -v zh").unwrap();
        assert_eq!(audio.program(), "espeak");
        assert_eq!(audio.args, vec!["-v", "zh"]);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert_matches!(CommandAudio::new("   "), Err(AudioError::EmptyCommand));
    }

    #[test]
    fn missing_program_reports_spawn_error() {
        let mut audio = CommandAudio::new("definitely-not-a-speech-program-xyz").unwrap();
        assert_matches!(audio.speak("你好"), Err(AudioError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn speak_then_stop_reaps_child() {
        let mut audio = CommandAudio::new("true").unwrap();
        audio.speak("你好").unwrap();
        audio.stop();
        assert!(audio.child.is_none());
    }

    #[test]
    fn boxed_playback_delegates() {
        let mut audio: Box<dyn AudioPlayback> = Box::new(SilentAudio);
        assert!(audio.speak("你好").is_ok());
        audio.stop();
    }

    #[test]
    fn silent_audio_always_succeeds() {
        let mut audio = SilentAudio;
        assert!(audio.speak("anything").is_ok());
        audio.stop();
    }
}

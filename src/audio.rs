use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no music track configured")]
    NoTrack,
    #[error("failed to start player `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Background music playback.
pub trait AudioPlayer {
    fn play(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self);
}

/// Plays a track by handing it to an external player program.
///
/// Pausing stops the child process; the next play starts the track over.
pub struct CommandPlayer {
    program: String,
    track: Option<PathBuf>,
    child: Option<Child>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, track: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            track,
            child: None,
        }
    }

    pub fn default_program() -> &'static str {
        if cfg!(target_os = "macos") {
            "afplay"
        } else {
            "aplay"
        }
    }

    pub fn track(&self) -> Option<&Path> {
        self.track.as_deref()
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&mut self) -> Result<(), AudioError> {
        // a second play restarts the track
        self.pause();
        let track = self.track.as_ref().ok_or(AudioError::NoTrack)?;
        let child = Command::new(&self.program)
            .arg(track)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| AudioError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        self.child = Some(child);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_without_track_fails() {
        let mut p = CommandPlayer::new("aplay", None);
        assert!(matches!(p.play(), Err(AudioError::NoTrack)));
    }

    #[test]
    fn missing_program_reports_spawn_error() {
        let mut p = CommandPlayer::new(
            "petalcard-no-such-player-binary",
            Some(PathBuf::from("song.wav")),
        );
        let err = p.play().unwrap_err();
        assert!(matches!(err, AudioError::Spawn { .. }));
        assert!(err.to_string().contains("petalcard-no-such-player-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn playing_again_restarts_the_child() {
        let mut p = CommandPlayer::new("true", Some(PathBuf::from("song.wav")));
        p.play().unwrap();
        p.play().unwrap();
        assert!(p.child.is_some());
        p.pause();
        assert!(p.child.is_none());
    }

    #[test]
    fn pause_when_idle_is_harmless() {
        let mut p = CommandPlayer::new("aplay", Some(PathBuf::from("x.wav")));
        p.pause();
        assert_eq!(p.track(), Some(Path::new("x.wav")));
    }
}

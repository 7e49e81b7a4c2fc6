// Playback lifecycle state

use crate::error::{AudioError, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Player lifecycle status, as reported to the status observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerStatus {
    /// Initialized, nothing playing
    Idle,
    /// Session launched, waiting for the first playable frame
    Buffering,
    /// PCM is flowing to the output sink
    Playing,
    /// Reserved, never produced by the current engine
    Paused,
    /// Session ended (stop request or end of stream)
    Stopped,
    /// Session or initialization failed
    Error,
}

impl PlayerStatus {
    /// A session is in flight and owns the decode thread
    pub fn is_active(self) -> bool {
        matches!(self, PlayerStatus::Buffering | PlayerStatus::Playing)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PlayerStatus::Idle => "IDLE",
            PlayerStatus::Buffering => "BUFFERING",
            PlayerStatus::Playing => "PLAYING",
            PlayerStatus::Paused => "PAUSED",
            PlayerStatus::Stopped => "STOPPED",
            PlayerStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Check whether `from -> to` is a legal lifecycle transition
pub fn validate_transition(from: PlayerStatus, to: PlayerStatus) -> Result<()> {
    use PlayerStatus::*;

    match (from, to) {
        // init()/deinit() may always reset the player
        (_, Idle) => Ok(()),

        // init() failure
        (Idle, Error) => Ok(()),

        // play()
        (Idle, Buffering) | (Stopped, Buffering) | (Error, Buffering) => Ok(()),

        // From Buffering
        (Buffering, Playing) | (Buffering, Stopped) | (Buffering, Error) => Ok(()),

        // From Playing
        (Playing, Stopped) | (Playing, Error) => Ok(()),

        _ => Err(AudioError::InvalidState(format!(
            "Invalid status transition from {:?} to {:?}",
            from, to
        ))),
    }
}

/// Thread-safe status container
#[derive(Clone)]
pub struct StatusContainer {
    status: Arc<RwLock<PlayerStatus>>,
}

impl StatusContainer {
    pub fn new() -> Self {
        Self {
            status: Arc::new(RwLock::new(PlayerStatus::Idle)),
        }
    }

    pub fn get(&self) -> PlayerStatus {
        *self.status.read()
    }

    /// Move to `to` if the lifecycle allows it, returning the previous status
    pub fn transition(&self, to: PlayerStatus) -> Result<PlayerStatus> {
        let mut status = self.status.write();
        let from = *status;
        validate_transition(from, to)?;
        *status = to;
        log::debug!("Player status changed: {:?} -> {:?}", from, to);
        Ok(from)
    }

    /// Unconditional overwrite, used when a session is torn down
    pub fn set(&self, to: PlayerStatus) {
        *self.status.write() = to;
    }
}

impl Default for StatusContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_path_is_accepted() {
        let status = StatusContainer::new();
        assert_eq!(status.transition(PlayerStatus::Buffering), Ok(PlayerStatus::Idle));
        assert_eq!(status.transition(PlayerStatus::Playing), Ok(PlayerStatus::Buffering));
        assert_eq!(status.transition(PlayerStatus::Stopped), Ok(PlayerStatus::Playing));
        assert_eq!(status.transition(PlayerStatus::Buffering), Ok(PlayerStatus::Stopped));
        assert_eq!(status.transition(PlayerStatus::Error), Ok(PlayerStatus::Buffering));
        assert_eq!(status.get(), PlayerStatus::Error);
    }

    #[test]
    fn skipping_buffering_is_rejected() {
        let status = StatusContainer::new();
        assert!(status.transition(PlayerStatus::Playing).is_err());
        assert_eq!(status.get(), PlayerStatus::Idle);
    }

    #[test]
    fn paused_is_never_reachable() {
        for from in [
            PlayerStatus::Idle,
            PlayerStatus::Buffering,
            PlayerStatus::Playing,
            PlayerStatus::Stopped,
            PlayerStatus::Error,
        ] {
            assert!(validate_transition(from, PlayerStatus::Paused).is_err());
        }
    }

    #[test]
    fn only_buffering_and_playing_are_active() {
        let active: Vec<_> = [
            PlayerStatus::Idle,
            PlayerStatus::Buffering,
            PlayerStatus::Playing,
            PlayerStatus::Paused,
            PlayerStatus::Stopped,
            PlayerStatus::Error,
        ]
        .into_iter()
        .filter(|s| s.is_active())
        .collect();
        assert_eq!(active, vec![PlayerStatus::Buffering, PlayerStatus::Playing]);
        assert_eq!(PlayerStatus::Buffering.to_string(), "BUFFERING");
    }
}

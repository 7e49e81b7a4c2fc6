// Engine tuning knobs

use std::time::Duration;

/// Lossy recovery when the compressed window is nearly full before a top-up.
/// Dropping the oldest bytes may be audible; slowing the network reader instead
/// is the alternative this policy trades against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    /// Free space (bytes) below which the oldest bytes are dropped
    pub threshold: usize,
    /// Bytes dropped per recovery step
    pub drop_bytes: usize,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            threshold: 2 * 1024,
            drop_bytes: 2 * 1024,
        }
    }
}

/// Playback engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity of the compressed byte window
    pub window_capacity: usize,
    /// Top up from the network when the window holds fewer bytes than this
    pub low_water: usize,
    pub recovery: RecoveryPolicy,
    /// Bound on a single PCM write to the output sink
    pub sink_write_timeout: Duration,
    /// stop() polls the decode thread this often...
    pub stop_poll_interval: Duration,
    /// ...at most this many times
    pub stop_poll_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: 32 * 1024,
            low_water: 4 * 1024,
            recovery: RecoveryPolicy::default(),
            sink_write_timeout: Duration::from_millis(200),
            stop_poll_interval: Duration::from_millis(20),
            stop_poll_attempts: 50,
        }
    }
}

impl EngineConfig {
    /// Upper bound on how long stop() waits for the decode thread
    pub fn stop_deadline(&self) -> Duration {
        self.stop_poll_interval * self.stop_poll_attempts
    }

    /// Clamp inconsistent values so the decode loop can always make progress
    pub fn normalized(mut self) -> Self {
        // A frame header needs 4 bytes, and the largest MPEG audio frame is under 3 KiB
        self.window_capacity = self.window_capacity.max(4 * 1024);
        self.low_water = self.low_water.clamp(4, self.window_capacity);
        self.recovery.threshold = self.recovery.threshold.clamp(1, self.window_capacity);
        self.recovery.drop_bytes = self.recovery.drop_bytes.max(1);
        self.stop_poll_attempts = self.stop_poll_attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stream_tuning() {
        let config = EngineConfig::default();
        assert_eq!(config.window_capacity, 32768);
        assert_eq!(config.low_water, 4096);
        assert_eq!(config.recovery.drop_bytes, 2048);
        assert_eq!(config.stop_deadline(), Duration::from_secs(1));
    }

    #[test]
    fn normalized_clamps_degenerate_values() {
        let config = EngineConfig {
            window_capacity: 16,
            low_water: 1_000_000,
            recovery: RecoveryPolicy {
                threshold: 0,
                drop_bytes: 0,
            },
            stop_poll_attempts: 0,
            ..EngineConfig::default()
        }
        .normalized();

        assert_eq!(config.window_capacity, 4096);
        assert_eq!(config.low_water, 4096);
        assert_eq!(config.recovery.threshold, 1);
        assert_eq!(config.recovery.drop_bytes, 1);
        assert_eq!(config.stop_poll_attempts, 1);
    }
}

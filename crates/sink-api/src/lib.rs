// Output sink abstraction layer

use netradio_core::Result;
use std::time::Duration;

/// Fixed-rate PCM output.
///
/// Implementations take interleaved 16-bit little-endian stereo bytes. The engine
/// serializes every call behind one lock, so `reconfigure_clock` never races a write.
pub trait OutputSink: Send {
    /// Acquire the output device
    fn init(&mut self) -> Result<()>;

    /// Release the output device; safe to call when not initialized
    fn deinit(&mut self);

    /// Queue PCM bytes, waiting at most `timeout` for room.
    /// Returns how many bytes were accepted, always a whole number of sample frames.
    fn write(&mut self, pcm: &[u8], timeout: Duration) -> Result<usize>;

    /// Switch the output clock to `sample_rate`
    fn reconfigure_clock(&mut self, sample_rate: u32) -> Result<()>;

    /// Currently configured output sample rate
    fn sample_rate(&self) -> u32;

    fn is_initialized(&self) -> bool;
}

/// Output format specification for a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Device buffer size in frames
    pub buffer_size: usize,
    /// Bytes of PCM queued between the engine and the device
    pub pcm_capacity: usize,
}

impl SinkSpec {
    /// Bytes in one interleaved 16-bit sample frame
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * 2
    }

    /// Bytes per second of 16-bit PCM at this spec
    pub fn byte_rate(&self) -> usize {
        self.sample_rate as usize * self.frame_bytes()
    }
}

impl Default for SinkSpec {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_size: 1024,
            // About half a second of stereo 16-bit at 44.1 kHz
            pcm_capacity: 88 * 1024,
        }
    }
}

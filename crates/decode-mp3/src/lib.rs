// MPEG audio frame decoding over an unaligned compressed byte window

pub mod decoder;
pub mod header;

pub use decoder::Mp3FrameDecoder;
pub use header::{FrameHeader, MpegVersion};

/// Result of one decode step.
///
/// `frame_bytes` is how much of the input the caller must discard. A step can consume
/// bytes without producing samples (junk skipped, bad frame dropped), and a step that
/// consumes nothing asks the caller for more input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFrame {
    pub samples_per_channel: usize,
    pub channels: u16,
    pub sample_rate: u32,
    pub frame_bytes: usize,
    /// Interleaved samples, `samples_per_channel * channels` long
    pub pcm: Vec<i16>,
}

impl DecodedFrame {
    /// Nothing consumed, nothing produced
    pub fn need_more() -> Self {
        Self::default()
    }

    /// `bytes` consumed, nothing produced
    pub fn skipped(bytes: usize) -> Self {
        Self {
            frame_bytes: bytes,
            ..Self::default()
        }
    }

    /// Carries samples at a usable rate
    pub fn is_playable(&self) -> bool {
        self.samples_per_channel > 0 && self.sample_rate > 0 && self.channels > 0
    }
}

/// Stateful decoder that takes one frame at a time from the front of a byte window
pub trait FrameDecoder: Send {
    /// Decode the first frame found in `input`
    fn decode_frame(&mut self, input: &[u8]) -> DecodedFrame;

    /// Forget sync and inter-frame state before a new stream
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_constructors() {
        assert_eq!(DecodedFrame::need_more().frame_bytes, 0);
        assert!(!DecodedFrame::need_more().is_playable());

        let skipped = DecodedFrame::skipped(12);
        assert_eq!(skipped.frame_bytes, 12);
        assert!(skipped.pcm.is_empty());
        assert!(!skipped.is_playable());
    }

    #[test]
    fn playable_needs_rate_and_samples() {
        let frame = DecodedFrame {
            samples_per_channel: 2,
            channels: 1,
            sample_rate: 0,
            frame_bytes: 10,
            pcm: vec![1, 2],
        };
        assert!(!frame.is_playable());
        assert!(DecodedFrame {
            sample_rate: 8000,
            ..frame
        }
        .is_playable());
    }
}

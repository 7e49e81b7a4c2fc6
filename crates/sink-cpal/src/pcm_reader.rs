// Audio-callback side of the PCM channel

use netradio_ringbuffer::ByteRingBuffer;

/// Turns queued 16-bit little-endian PCM bytes into f32 device samples.
///
/// Runs inside the device callback: it never waits, and the scratch buffer
/// only grows when the device asks for a larger block than before.
pub struct PcmReader {
    pcm: ByteRingBuffer,
    scratch: Vec<u8>,
    /// Low byte of a sample whose high byte has not arrived yet
    carry: Option<u8>,
    underruns: u64,
}

impl PcmReader {
    pub fn new(pcm: ByteRingBuffer) -> Self {
        Self {
            pcm,
            scratch: Vec::new(),
            carry: None,
            underruns: 0,
        }
    }

    /// Fill `out` from the channel, zero-filling whatever is missing.
    /// Returns the number of samples taken from the channel.
    pub fn fill(&mut self, out: &mut [f32]) -> usize {
        let wanted = out.len() * 2;
        if self.scratch.len() < wanted {
            self.scratch.resize(wanted, 0);
        }

        let mut filled = 0;
        if let Some(byte) = self.carry.take() {
            self.scratch[0] = byte;
            filled = 1;
        }
        if filled < wanted {
            filled += self.pcm.try_read(&mut self.scratch[filled..wanted]);
        }

        let samples = filled / 2;
        if filled % 2 == 1 {
            self.carry = Some(self.scratch[filled - 1]);
        }

        for (sample, bytes) in out.iter_mut().zip(self.scratch[..samples * 2].chunks_exact(2)) {
            *sample = i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0;
        }

        // Zero-fill any unwritten samples to prevent playing stale data
        if samples < out.len() {
            out[samples..].fill(0.0);
            if samples > 0 {
                self.underruns += 1;
                if self.underruns % 50 == 1 {
                    log::warn!("PCM underrun count={}", self.underruns);
                }
            }
        }

        samples
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const NO_WAIT: Option<Duration> = Some(Duration::ZERO);

    #[test]
    fn converts_le_samples_to_unit_floats() {
        let pcm = ByteRingBuffer::new(64);
        let mut bytes = Vec::new();
        for sample in [0i16, i16::MIN, 16384] {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        pcm.write(&bytes, NO_WAIT);

        let mut reader = PcmReader::new(pcm);
        let mut out = [9.0f32; 3];
        assert_eq!(reader.fill(&mut out), 3);
        assert_eq!(out, [0.0, -1.0, 0.5]);
    }

    #[test]
    fn empty_channel_yields_silence() {
        let mut reader = PcmReader::new(ByteRingBuffer::new(64));
        let mut out = [0.3f32; 8];
        assert_eq!(reader.fill(&mut out), 0);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(reader.underruns(), 0);
    }

    #[test]
    fn odd_byte_is_carried_into_next_block() {
        let pcm = ByteRingBuffer::new(64);
        let mut reader = PcmReader::new(pcm.clone());
        let sample = 0x1234i16.to_le_bytes();

        pcm.write(&[0, 0, sample[0]], NO_WAIT);
        let mut out = [1.0f32; 2];
        assert_eq!(reader.fill(&mut out), 1);
        assert_eq!(out, [0.0, 0.0]);
        assert_eq!(reader.underruns(), 1);

        pcm.write(&[sample[1]], NO_WAIT);
        let mut out = [0.0f32; 1];
        assert_eq!(reader.fill(&mut out), 1);
        assert_eq!(out[0], 0x1234 as f32 / 32768.0);
    }
}

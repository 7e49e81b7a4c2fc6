// Layer III frame decoding using Symphonia

use crate::header::{find_frame, FrameHeader, SyncScan};
use crate::{DecodedFrame, FrameDecoder};
use netradio_core::{AudioError, Result};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Channels, Signal};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_MP3};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;
use symphonia::core::sample::Sample;

/// MP3 decoder that finds frame sync in an unaligned byte window
pub struct Mp3FrameDecoder {
    decoder: Option<Box<dyn Decoder>>,
    /// Channel count the current Symphonia decoder was built for
    decoder_channels: u16,
    /// Header of the last frame taken from the stream; `None` until synced
    synced: Option<FrameHeader>,
    frames_decoded: u64,
}

impl Mp3FrameDecoder {
    pub fn new() -> Self {
        Self {
            decoder: None,
            decoder_channels: 0,
            synced: None,
            frames_decoded: 0,
        }
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    fn make_decoder(header: &FrameHeader) -> Result<Box<dyn Decoder>> {
        let channels = if header.channels == 1 {
            Channels::FRONT_LEFT
        } else {
            Channels::FRONT_LEFT | Channels::FRONT_RIGHT
        };

        let mut params = CodecParameters::new();
        params
            .for_codec(CODEC_TYPE_MP3)
            .with_sample_rate(header.sample_rate)
            .with_channels(channels);

        symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| AudioError::DecodingError(format!("Failed to create decoder: {}", e)))
    }

    /// Decode one complete frame into interleaved i16 samples
    fn decode_packet(&mut self, header: &FrameHeader, frame: &[u8]) -> Result<Vec<i16>> {
        // The bit reservoir does not survive a channel layout change; start over
        if self.decoder.is_none() || self.decoder_channels != header.channels {
            if self.decoder.is_some() {
                log::debug!(
                    "Channel count changed {} -> {}, rebuilding decoder",
                    self.decoder_channels,
                    header.channels
                );
            }
            self.decoder = Some(Self::make_decoder(header)?);
            self.decoder_channels = header.channels;
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(AudioError::DecodingError("Decoder unavailable".to_string()));
        };

        let duration = header.samples_per_channel() as u64;
        let packet = Packet::new_from_slice(0, self.frames_decoded * duration, duration, frame);

        let decoded = decoder.decode(&packet).map(convert_audio_buffer_to_i16);
        match decoded {
            Ok(pcm) => Ok(pcm),
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                Err(AudioError::DecodingError("Decoder reset required".to_string()))
            }
            Err(e) => Err(AudioError::DecodingError(format!("Decoding failed: {}", e))),
        }
    }
}

impl Default for Mp3FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for Mp3FrameDecoder {
    fn decode_frame(&mut self, input: &[u8]) -> DecodedFrame {
        let (offset, header) = match find_frame(input, self.synced.as_ref()) {
            SyncScan::Frame { offset, header } => (offset, header),
            SyncScan::Partial { offset: 0 } => return DecodedFrame::need_more(),
            SyncScan::Partial { offset } => {
                log::trace!("Skipping {} bytes before frame candidate", offset);
                self.synced = None;
                return DecodedFrame::skipped(offset);
            }
            SyncScan::Junk { skip } => {
                log::debug!("No frame sync in {} bytes, skipping {}", input.len(), skip);
                self.synced = None;
                return DecodedFrame::skipped(skip);
            }
        };

        if offset > 0 {
            log::debug!("Resynced after {} junk bytes", offset);
        }

        let frame_len = header.frame_len();
        let consumed = offset + frame_len;
        let frame = &input[offset..consumed];

        match self.decode_packet(&header, frame) {
            Ok(pcm) => {
                self.synced = Some(header);
                self.frames_decoded += 1;

                let channels = header.channels as usize;
                DecodedFrame {
                    samples_per_channel: pcm.len() / channels,
                    channels: header.channels,
                    sample_rate: header.sample_rate,
                    frame_bytes: consumed,
                    pcm,
                }
            }
            Err(e) => {
                // The frame is consumed either way; the next one may decode fine
                log::debug!("Dropping undecodable frame ({} bytes): {}", frame_len, e);
                self.synced = Some(header);
                DecodedFrame::skipped(consumed)
            }
        }
    }

    fn reset(&mut self) {
        self.decoder = None;
        self.decoder_channels = 0;
        self.synced = None;
        self.frames_decoded = 0;
    }
}

/// Convert a Symphonia buffer of any sample format to interleaved i16
fn convert_audio_buffer_to_i16(buffer: AudioBufferRef) -> Vec<i16> {
    match buffer {
        AudioBufferRef::F32(buf) => interleave(&buf),
        AudioBufferRef::F64(buf) => interleave(&buf),
        AudioBufferRef::S8(buf) => interleave(&buf),
        AudioBufferRef::S16(buf) => interleave(&buf),
        AudioBufferRef::S24(buf) => interleave(&buf),
        AudioBufferRef::S32(buf) => interleave(&buf),
        AudioBufferRef::U8(buf) => interleave(&buf),
        AudioBufferRef::U16(buf) => interleave(&buf),
        AudioBufferRef::U24(buf) => interleave(&buf),
        AudioBufferRef::U32(buf) => interleave(&buf),
    }
}

fn interleave<S>(buf: &AudioBuffer<S>) -> Vec<i16>
where
    S: Sample + IntoSample<i16>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    let mut output = Vec::with_capacity(num_frames * num_channels);

    for frame_idx in 0..num_frames {
        for ch_idx in 0..num_channels {
            output.push(buf.chan(ch_idx)[frame_idx].into_sample());
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::tests::{silent_frame, MONO_22K, STEREO_44K};

    #[test]
    fn short_input_needs_more() {
        let mut decoder = Mp3FrameDecoder::new();
        let frame = decoder.decode_frame(&[0xFF, 0xF3]);
        assert_eq!(frame.frame_bytes, 0);
        assert!(!frame.is_playable());
    }

    #[test]
    fn unconfirmed_frame_needs_more() {
        let mut decoder = Mp3FrameDecoder::new();
        let mut input = silent_frame(MONO_22K);
        input.extend([0xFF, 0xF3]);
        assert_eq!(decoder.decode_frame(&input), DecodedFrame::need_more());
    }

    #[test]
    fn lone_final_frame_decodes() {
        let mut decoder = Mp3FrameDecoder::new();
        let frame = decoder.decode_frame(&silent_frame(MONO_22K));
        assert_eq!(frame.frame_bytes, 104);
        assert_eq!(frame.sample_rate, 22050);
        assert_eq!(frame.pcm.len(), 576);
        assert!(frame.is_playable());
    }

    #[test]
    fn junk_is_consumed_without_samples() {
        let mut decoder = Mp3FrameDecoder::new();
        let frame = decoder.decode_frame(&[0x00; 256]);
        assert_eq!(frame.frame_bytes, 253);
        assert_eq!(frame.samples_per_channel, 0);
        assert!(frame.pcm.is_empty());
    }

    #[test]
    fn partial_candidate_after_junk_skips_the_junk() {
        let mut decoder = Mp3FrameDecoder::new();
        let mut input = vec![0x01; 10];
        input.extend(&silent_frame(MONO_22K)[..40]);
        let frame = decoder.decode_frame(&input);
        assert_eq!(frame.frame_bytes, 10);
        assert!(!frame.is_playable());
    }

    #[test]
    fn decodes_silent_mono_frame() {
        let mut decoder = Mp3FrameDecoder::new();
        let mut input = vec![0x07; 3];
        input.extend(silent_frame(MONO_22K));
        input.extend(silent_frame(MONO_22K));

        let frame = decoder.decode_frame(&input);
        assert_eq!(frame.frame_bytes, 3 + 104);
        assert_eq!(frame.sample_rate, 22050);
        assert_eq!(frame.channels, 1);
        assert_eq!(frame.samples_per_channel, 576);
        assert_eq!(frame.pcm.len(), 576);
        assert!(frame.pcm.iter().all(|&s| s == 0));

        // Synced now: the trailing frame decodes without look-ahead
        let frame = decoder.decode_frame(&input[107..]);
        assert_eq!(frame.frame_bytes, 104);
        assert_eq!(decoder.frames_decoded(), 2);
    }

    #[test]
    fn tolerates_rate_and_channel_changes() {
        let mut decoder = Mp3FrameDecoder::new();
        let mut input = silent_frame(MONO_22K);
        input.extend(silent_frame(MONO_22K));
        let mono = decoder.decode_frame(&input);
        assert!(mono.is_playable());

        let stereo = decoder.decode_frame(&silent_frame(STEREO_44K));
        assert_eq!(stereo.frame_bytes, 417);
        assert_eq!(stereo.sample_rate, 44100);
        assert_eq!(stereo.channels, 2);
        assert_eq!(stereo.samples_per_channel, 1152);
        assert_eq!(stereo.pcm.len(), 1152 * 2);
    }

    #[test]
    fn reset_forgets_sync() {
        let mut decoder = Mp3FrameDecoder::new();
        let mut input = silent_frame(MONO_22K);
        input.extend(silent_frame(MONO_22K));
        decoder.decode_frame(&input);

        decoder.reset();
        assert_eq!(decoder.frames_decoded(), 0);
        let mut unconfirmed = silent_frame(MONO_22K);
        unconfirmed.extend([0xFF, 0xF3]);
        assert_eq!(decoder.decode_frame(&unconfirmed), DecodedFrame::need_more());
    }
}

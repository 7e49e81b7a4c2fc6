// Channel conversion and PCM packing for the output sink

/// Channel count the output sink is always fed
pub const OUTPUT_CHANNELS: u16 = 2;

/// Bytes per interleaved stereo 16-bit sample frame
pub const BYTES_PER_FRAME: usize = OUTPUT_CHANNELS as usize * 2;

/// Convert interleaved `input` with `channels` channels to interleaved stereo.
///
/// Mono samples are duplicated into both channels; stereo passes through.
/// Layouts with more channels keep their first two.
pub fn upmix_to_stereo(input: &[i16], channels: u16) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => {
            // Mono to stereo: duplicate each sample
            let mut output = Vec::with_capacity(input.len() * 2);
            for &sample in input {
                output.push(sample);
                output.push(sample);
            }
            output
        }
        2 => input.to_vec(),
        n => {
            log::debug!("Folding {} channels down to the front pair", n);
            input
                .chunks_exact(n as usize)
                .flat_map(|frame| [frame[0], frame[1]])
                .collect()
        }
    }
}

/// Pack interleaved samples as 16-bit little-endian bytes
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Up-mix and pack in one step: what the engine hands the sink
pub fn stereo_pcm_bytes(input: &[i16], channels: u16) -> Vec<u8> {
    if !needs_upmix(channels) {
        return to_le_bytes(input);
    }
    to_le_bytes(&upmix_to_stereo(input, channels))
}

/// Check if channel conversion is needed
pub fn needs_upmix(channels: u16) -> bool {
    channels != OUTPUT_CHANNELS
}

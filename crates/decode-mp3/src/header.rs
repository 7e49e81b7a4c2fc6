// MPEG audio (Layer III) frame header parsing and sync search

/// Bytes in a frame header
pub const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

const BITRATES_MPEG1_L3: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const BITRATES_MPEG2_L3: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// Decoded Layer III frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channels: u16,
    pub has_crc: bool,
}

impl FrameHeader {
    /// Parse the 4 header bytes at the start of `bytes`.
    /// Rejects reserved fields, free-format bitrate and layers other than III.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let (b1, b2, b3) = (bytes[1], bytes[2], bytes[3]);

        // 11-bit frame sync
        if bytes[0] != 0xFF || b1 & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (b1 >> 3) & 0x03 {
            0 => MpegVersion::Mpeg25,
            2 => MpegVersion::Mpeg2,
            3 => MpegVersion::Mpeg1,
            _ => return None,
        };

        // Layer III only
        if (b1 >> 1) & 0x03 != 0x01 {
            return None;
        }

        let bitrate_index = (b2 >> 4) as usize;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let bitrate_kbps = match version {
            MpegVersion::Mpeg1 => BITRATES_MPEG1_L3[bitrate_index],
            _ => BITRATES_MPEG2_L3[bitrate_index],
        };

        let base_rate = match (b2 >> 2) & 0x03 {
            0 => 44100,
            1 => 48000,
            2 => 32000,
            _ => return None,
        };
        let sample_rate = match version {
            MpegVersion::Mpeg1 => base_rate,
            MpegVersion::Mpeg2 => base_rate / 2,
            MpegVersion::Mpeg25 => base_rate / 4,
        };

        // Reserved emphasis
        if b3 & 0x03 == 0x02 {
            return None;
        }

        Some(Self {
            version,
            bitrate_kbps,
            sample_rate,
            padding: (b2 >> 1) & 0x01 == 1,
            channels: if b3 >> 6 == 0x03 { 1 } else { 2 },
            has_crc: b1 & 0x01 == 0,
        })
    }

    /// Total frame length in bytes, header included
    pub fn frame_len(&self) -> usize {
        let coefficient = match self.version {
            MpegVersion::Mpeg1 => 144,
            _ => 72,
        };
        (coefficient * self.bitrate_kbps * 1000 / self.sample_rate) as usize + self.padding as usize
    }

    pub fn samples_per_channel(&self) -> usize {
        match self.version {
            MpegVersion::Mpeg1 => 1152,
            _ => 576,
        }
    }

    /// Two headers belong to the same stream (channel mode may differ)
    pub fn is_compatible(&self, other: &FrameHeader) -> bool {
        self.version == other.version && self.sample_rate == other.sample_rate
    }
}

/// Outcome of scanning a byte window for the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScan {
    /// A complete frame starts at `offset`
    Frame { offset: usize, header: FrameHeader },
    /// A plausible header starts at `offset` but more bytes are needed to take it
    Partial { offset: usize },
    /// No header in the window; the first `skip` bytes can be discarded
    Junk { skip: usize },
}

/// Locate the next frame in `input`.
///
/// When `synced` holds the previous frame's header, a header at offset 0 is taken as is.
/// Otherwise a candidate must be followed by a compatible header before it is accepted,
/// which filters out sync patterns inside audio data. A candidate at offset 0 whose
/// frame fills `input` exactly is also taken, so a lone final frame still decodes.
pub fn find_frame(input: &[u8], synced: Option<&FrameHeader>) -> SyncScan {
    if input.len() < HEADER_LEN {
        return SyncScan::Partial { offset: 0 };
    }

    if synced.is_some() {
        if let Some(header) = FrameHeader::parse(input) {
            return if header.frame_len() <= input.len() {
                SyncScan::Frame { offset: 0, header }
            } else {
                SyncScan::Partial { offset: 0 }
            };
        }
    }

    for offset in 0..=input.len() - HEADER_LEN {
        let Some(header) = FrameHeader::parse(&input[offset..]) else {
            continue;
        };

        let next = offset + header.frame_len();
        if offset == 0 && next == input.len() {
            return SyncScan::Frame { offset, header };
        }
        if next + HEADER_LEN > input.len() {
            return SyncScan::Partial { offset };
        }
        match FrameHeader::parse(&input[next..]) {
            Some(following) if following.is_compatible(&header) => {
                return SyncScan::Frame { offset, header };
            }
            _ => continue,
        }
    }

    // Keep a tail that may hold the start of a header
    SyncScan::Junk {
        skip: input.len() - (HEADER_LEN - 1),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// MPEG-2 Layer III, 32 kbps, 22050 Hz, mono, no CRC: 104-byte frames of 576 samples
    pub(crate) const MONO_22K: [u8; 4] = [0xFF, 0xF3, 0x40, 0xC0];

    /// MPEG-1 Layer III, 128 kbps, 44100 Hz, joint stereo, no CRC: 417/418-byte frames
    pub(crate) const STEREO_44K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x44];

    pub(crate) fn silent_frame(header: [u8; 4]) -> Vec<u8> {
        let parsed = FrameHeader::parse(&header).unwrap();
        let mut frame = vec![0u8; parsed.frame_len()];
        frame[..4].copy_from_slice(&header);
        frame
    }

    #[test]
    fn parses_mpeg2_mono() {
        let header = FrameHeader::parse(&MONO_22K).unwrap();
        assert_eq!(header.version, MpegVersion::Mpeg2);
        assert_eq!(header.sample_rate, 22050);
        assert_eq!(header.bitrate_kbps, 32);
        assert_eq!(header.channels, 1);
        assert!(!header.has_crc);
        assert_eq!(header.frame_len(), 104);
        assert_eq!(header.samples_per_channel(), 576);
    }

    #[test]
    fn parses_mpeg1_stereo_with_padding() {
        let header = FrameHeader::parse(&STEREO_44K).unwrap();
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channels, 2);
        assert_eq!(header.frame_len(), 417);

        let padded = FrameHeader::parse(&[0xFF, 0xFB, 0x92, 0x44]).unwrap();
        assert!(padded.padding);
        assert_eq!(padded.frame_len(), 418);
        assert_eq!(padded.samples_per_channel(), 1152);
    }

    #[test]
    fn rejects_reserved_and_unsupported_fields() {
        // Not a sync word
        assert_eq!(FrameHeader::parse(&[0xFF, 0x7B, 0x90, 0x44]), None);
        // Reserved version
        assert_eq!(FrameHeader::parse(&[0xFF, 0xEB, 0x90, 0x44]), None);
        // Layer II
        assert_eq!(FrameHeader::parse(&[0xFF, 0xFD, 0x90, 0x44]), None);
        // Free format bitrate
        assert_eq!(FrameHeader::parse(&[0xFF, 0xFB, 0x00, 0x44]), None);
        // Bad bitrate
        assert_eq!(FrameHeader::parse(&[0xFF, 0xFB, 0xF0, 0x44]), None);
        // Reserved sample rate
        assert_eq!(FrameHeader::parse(&[0xFF, 0xFB, 0x9C, 0x44]), None);
        // Too short
        assert_eq!(FrameHeader::parse(&[0xFF, 0xFB]), None);
    }

    #[test]
    fn finds_frame_after_junk() {
        let mut input = vec![0x12, 0x34, 0xFF, 0x00, 0x55];
        input.extend(silent_frame(MONO_22K));
        input.extend(silent_frame(MONO_22K));

        match find_frame(&input, None) {
            SyncScan::Frame { offset, header } => {
                assert_eq!(offset, 5);
                assert_eq!(header.sample_rate, 22050);
            }
            other => panic!("unexpected scan result {:?}", other),
        }
    }

    #[test]
    fn unconfirmed_candidate_waits_for_more_input() {
        let mut input = silent_frame(MONO_22K);
        input.extend([0xFF, 0xF3]);
        assert_eq!(find_frame(&input, None), SyncScan::Partial { offset: 0 });
        assert_eq!(find_frame(&input[..60], None), SyncScan::Partial { offset: 0 });
    }

    #[test]
    fn lone_frame_filling_input_is_accepted() {
        let input = silent_frame(MONO_22K);
        match find_frame(&input, None) {
            SyncScan::Frame { offset, header } => {
                assert_eq!(offset, 0);
                assert_eq!(header.frame_len(), input.len());
            }
            other => panic!("unexpected scan result {:?}", other),
        }

        // Junk before it keeps the lookahead rule
        let mut padded = vec![0x20; 8];
        padded.extend(silent_frame(MONO_22K));
        assert_eq!(find_frame(&padded, None), SyncScan::Partial { offset: 8 });
    }

    #[test]
    fn synced_stream_accepts_frame_without_lookahead() {
        let input = silent_frame(MONO_22K);
        let synced = FrameHeader::parse(&MONO_22K).unwrap();
        assert!(matches!(
            find_frame(&input, Some(&synced)),
            SyncScan::Frame { offset: 0, .. }
        ));
        assert_eq!(
            find_frame(&input[..50], Some(&synced)),
            SyncScan::Partial { offset: 0 }
        );
    }

    #[test]
    fn false_sync_is_skipped() {
        // A valid-looking header whose successor is garbage, then a real pair
        let mut input = MONO_22K.to_vec();
        input.extend(vec![0x11; 100]);
        input.extend(vec![0x22; 4]);
        let real_start = input.len();
        input.extend(silent_frame(STEREO_44K));
        input.extend(silent_frame(STEREO_44K));

        match find_frame(&input, None) {
            SyncScan::Frame { offset, header } => {
                assert_eq!(offset, real_start);
                assert_eq!(header.channels, 2);
            }
            other => panic!("unexpected scan result {:?}", other),
        }
    }

    #[test]
    fn pure_junk_keeps_possible_header_tail() {
        let input = vec![0x42; 64];
        assert_eq!(find_frame(&input, None), SyncScan::Junk { skip: 61 });
        assert_eq!(find_frame(&input[..3], None), SyncScan::Partial { offset: 0 });
    }
}

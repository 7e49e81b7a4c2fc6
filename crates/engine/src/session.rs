// Decode/render task: source -> compressed window -> frame decoder -> output sink

use crate::player::{DecoderFactory, PlayerShared, SharedSink};
use crate::window::CompressedByteWindow;
use netradio_core::{AudioError, EngineConfig, PlayerStatus, StreamSource};
use netradio_decode_mp3::DecodedFrame;
use std::sync::Arc;

/// Why a session loop returned
#[derive(Debug)]
enum SessionEnd {
    Stopped,
    EndOfStream,
    Failed(AudioError),
}

/// Output sample rate the sink is currently clocked at
struct OutputClockState {
    sample_rate: u32,
}

/// Everything one playback session needs, moved onto the decode thread
pub(crate) struct DecodeSession {
    pub(crate) url: String,
    pub(crate) config: EngineConfig,
    pub(crate) shared: Arc<PlayerShared>,
    pub(crate) sink: SharedSink,
    pub(crate) source: Arc<dyn StreamSource>,
    pub(crate) decoder_factory: DecoderFactory,
}

impl DecodeSession {
    /// Thread entry point
    pub(crate) fn run(self) {
        log::info!("Decode session started for {}", self.url);

        let end = self.stream();
        self.source.close();

        match end {
            SessionEnd::Stopped => {
                log::info!("Decode session stopped");
            }
            SessionEnd::EndOfStream => {
                log::info!("Stream ended");
                self.shared.finish(PlayerStatus::Stopped);
            }
            SessionEnd::Failed(e) => {
                if self.shared.stop_requested() {
                    log::debug!("Session error after stop request: {}", e);
                } else {
                    log::error!("Playback failed: {}", e);
                    self.shared.finish(PlayerStatus::Error);
                }
            }
        }

        self.shared.mark_task_exited();
        log::debug!("Decode thread exiting");
    }

    fn stream(&self) -> SessionEnd {
        if let Err(e) = self.source.open(&self.url) {
            return SessionEnd::Failed(e);
        }
        if self.shared.stop_requested() {
            return SessionEnd::Stopped;
        }

        let mut window = CompressedByteWindow::new(self.config.window_capacity);
        let mut decoder = (self.decoder_factory)();
        decoder.reset();
        let mut clock = OutputClockState {
            sample_rate: self.sink.lock().sample_rate(),
        };
        let mut need_more = false;
        let mut draining = false;

        loop {
            if self.shared.stop_requested() {
                return SessionEnd::Stopped;
            }

            if !draining && (window.len() < self.config.low_water || need_more) {
                match self.top_up(&mut window) {
                    Ok(0) => {
                        if self.shared.stop_requested() {
                            return SessionEnd::Stopped;
                        }
                        // Play out what is still buffered before ending
                        draining = true;
                    }
                    Ok(_) => {}
                    Err(AudioError::Closed) if self.shared.stop_requested() => {
                        return SessionEnd::Stopped;
                    }
                    // A broken connection mid-stream ends the session like end of stream
                    Err(e) => {
                        log::warn!("Stream read failed, ending session: {}", e);
                        return SessionEnd::EndOfStream;
                    }
                }
                if self.shared.stop_requested() {
                    return SessionEnd::Stopped;
                }
            }

            if draining && window.is_empty() {
                return SessionEnd::EndOfStream;
            }

            let frame = decoder.decode_frame(window.as_slice());
            if frame.frame_bytes == 0 {
                if draining {
                    log::debug!("Discarding {} trailing bytes", window.len());
                    return SessionEnd::EndOfStream;
                }
                need_more = true;
                continue;
            }
            need_more = false;
            window.consume(frame.frame_bytes);

            if !frame.is_playable() {
                continue;
            }

            if self.shared.emit_playing() {
                log::info!(
                    "Playing: {} Hz, {} channel(s)",
                    frame.sample_rate,
                    frame.channels
                );
            }

            if !self.render(&frame, &mut clock) {
                return SessionEnd::Stopped;
            }
        }
    }

    /// Read more compressed bytes into the window, dropping the oldest first if it is nearly full
    fn top_up(&self, window: &mut CompressedByteWindow) -> netradio_core::Result<usize> {
        let recovery = self.config.recovery;
        if window.free_space() < recovery.threshold {
            let dropped = window.drop_oldest(recovery.drop_bytes);
            log::debug!(
                "Compressed window nearly full, dropped {} oldest bytes",
                dropped
            );
        }

        let n = self.source.read(window.spare_mut())?;
        window.commit(n);
        Ok(n)
    }

    /// Up-mix, follow the stream's clock and hand PCM to the sink.
    /// Returns false when a stop request was seen before writing.
    fn render(&self, frame: &DecodedFrame, clock: &mut OutputClockState) -> bool {
        let pcm = netradio_mixer::stereo_pcm_bytes(&frame.pcm, frame.channels);

        let mut sink = self.sink.lock();
        if self.shared.stop_requested() {
            return false;
        }

        if frame.sample_rate != clock.sample_rate {
            log::info!(
                "Stream sample rate {} Hz, reconfiguring output clock (was {} Hz)",
                frame.sample_rate,
                clock.sample_rate
            );
            if let Err(e) = sink.reconfigure_clock(frame.sample_rate) {
                log::warn!("Failed to reconfigure output clock: {}", e);
            }
            // Updated even on failure so later frames do not retry the same rate
            clock.sample_rate = frame.sample_rate;
        }

        match sink.write(&pcm, self.config.sink_write_timeout) {
            Ok(written) if written < pcm.len() => {
                log::debug!("Sink accepted {}/{} PCM bytes", written, pcm.len());
            }
            Ok(_) => {}
            Err(e) => log::warn!("Sink write failed: {}", e),
        }
        true
    }
}

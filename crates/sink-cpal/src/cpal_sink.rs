// cpal-based output sink
//
// cpal::Stream is not Send, so it lives on a dedicated device thread. The sink
// talks to that thread over a command channel and feeds it PCM through a
// ByteRingBuffer that the audio callback drains.

use crate::pcm_reader::PcmReader;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use netradio_core::{AudioError, Result};
use netradio_ringbuffer::ByteRingBuffer;
use netradio_sink_api::{OutputSink, SinkSpec};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long init() and reconfigure_clock() wait for the device thread to answer
const DEVICE_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

enum DeviceCommand {
    Reconfigure {
        sample_rate: u32,
        reply: mpsc::Sender<Result<()>>,
    },
    Shutdown,
}

struct DeviceThread {
    commands: mpsc::Sender<DeviceCommand>,
    handle: JoinHandle<()>,
}

/// Output sink that plays PCM on the default cpal output device
pub struct CpalSink {
    spec: SinkSpec,
    sample_rate: u32,
    pcm: ByteRingBuffer,
    device: Option<DeviceThread>,
}

impl CpalSink {
    pub fn new(spec: SinkSpec) -> Self {
        Self {
            spec,
            sample_rate: spec.sample_rate,
            pcm: ByteRingBuffer::new(spec.pcm_capacity),
            device: None,
        }
    }

    fn build_stream(spec: &SinkSpec, sample_rate: u32, pcm: &ByteRingBuffer) -> Result<Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceError("No output device available".to_string()))?;

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut reader = PcmReader::new(pcm.clone());
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    reader.fill(data);
                },
                |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::DeviceError(format!("Failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::DeviceError(format!("Failed to start stream: {}", e)))?;

        log::info!(
            "Output stream running: {} Hz, {} channels",
            sample_rate,
            spec.channels
        );
        Ok(stream)
    }

    /// Device thread: owns the stream and rebuilds it on clock changes
    fn device_worker(
        spec: SinkSpec,
        initial_rate: u32,
        pcm: ByteRingBuffer,
        ready: mpsc::Sender<Result<()>>,
        commands: mpsc::Receiver<DeviceCommand>,
    ) {
        let mut current_rate = initial_rate;
        let mut stream = match Self::build_stream(&spec, current_rate, &pcm) {
            Ok(stream) => Some(stream),
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        let _ = ready.send(Ok(()));

        while let Ok(command) = commands.recv() {
            match command {
                DeviceCommand::Reconfigure { sample_rate, reply } => {
                    // Old stream goes first; queued samples belong to the old clock
                    stream = None;
                    pcm.clear();

                    let result = match Self::build_stream(&spec, sample_rate, &pcm) {
                        Ok(rebuilt) => {
                            stream = Some(rebuilt);
                            current_rate = sample_rate;
                            Ok(())
                        }
                        Err(e) => {
                            log::warn!(
                                "Clock change to {} Hz failed, restoring {} Hz: {}",
                                sample_rate,
                                current_rate,
                                e
                            );
                            stream = Self::build_stream(&spec, current_rate, &pcm).ok();
                            Err(e)
                        }
                    };
                    let _ = reply.send(result);
                }
                DeviceCommand::Shutdown => break,
            }
        }

        drop(stream);
        log::debug!("Device thread exiting");
    }
}

impl OutputSink for CpalSink {
    fn init(&mut self) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let spec = self.spec;
        let rate = self.sample_rate;
        let pcm = self.pcm.clone();

        let handle = thread::Builder::new()
            .name("netradio-cpal".to_string())
            .spawn(move || Self::device_worker(spec, rate, pcm, ready_tx, command_rx))
            .map_err(|e| AudioError::ThreadError(format!("Failed to spawn device thread: {}", e)))?;

        match ready_rx.recv_timeout(DEVICE_REPLY_TIMEOUT) {
            Ok(Ok(())) => {
                self.device = Some(DeviceThread {
                    commands: command_tx,
                    handle,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(AudioError::InitializationError(e.to_string()))
            }
            Err(_) => Err(AudioError::InitializationError(
                "Output device did not start in time".to_string(),
            )),
        }
    }

    fn deinit(&mut self) {
        if let Some(device) = self.device.take() {
            let _ = device.commands.send(DeviceCommand::Shutdown);
            if device.handle.join().is_err() {
                log::error!("Device thread panicked");
            }
            self.pcm.clear();
            log::info!("Output sink released");
        }
    }

    fn write(&mut self, pcm: &[u8], timeout: Duration) -> Result<usize> {
        if self.device.is_none() {
            return Err(AudioError::InvalidState("Output sink not initialized".to_string()));
        }
        if pcm.is_empty() {
            return Ok(0);
        }

        let written = self
            .pcm
            .write_frames(pcm, self.spec.frame_bytes(), Some(timeout));
        if written == 0 {
            return Err(AudioError::Timeout(format!(
                "PCM queue full for {:?}",
                timeout
            )));
        }
        if written < pcm.len() {
            log::debug!("Short PCM write: {}/{} bytes", written, pcm.len());
        }
        Ok(written)
    }

    fn reconfigure_clock(&mut self, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidState("Sample rate must be positive".to_string()));
        }
        if sample_rate == self.sample_rate {
            return Ok(());
        }

        let Some(device) = self.device.as_ref() else {
            // Applied when the device is opened
            self.sample_rate = sample_rate;
            return Ok(());
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        device
            .commands
            .send(DeviceCommand::Reconfigure {
                sample_rate,
                reply: reply_tx,
            })
            .map_err(|_| AudioError::DeviceError("Device thread is gone".to_string()))?;

        match reply_rx.recv_timeout(DEVICE_REPLY_TIMEOUT) {
            Ok(Ok(())) => {
                log::info!("Output clock {} Hz -> {} Hz", self.sample_rate, sample_rate);
                self.sample_rate = sample_rate;
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AudioError::Timeout(format!(
                "Clock change to {} Hz not acknowledged",
                sample_rate
            ))),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some()
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.deinit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_before_init_is_rejected() {
        let mut sink = CpalSink::new(SinkSpec::default());
        assert!(!sink.is_initialized());
        assert!(matches!(
            sink.write(&[0; 4], Duration::from_millis(1)),
            Err(AudioError::InvalidState(_))
        ));
    }

    #[test]
    fn clock_change_before_init_is_recorded() {
        let mut sink = CpalSink::new(SinkSpec::default());
        assert_eq!(sink.sample_rate(), 44100);
        sink.reconfigure_clock(22050).unwrap();
        assert_eq!(sink.sample_rate(), 22050);
        assert!(sink.reconfigure_clock(0).is_err());
        assert_eq!(sink.sample_rate(), 22050);
    }

    #[test]
    fn deinit_without_init_is_a_no_op() {
        let mut sink = CpalSink::new(SinkSpec::default());
        sink.deinit();
        assert!(!sink.is_initialized());
    }
}

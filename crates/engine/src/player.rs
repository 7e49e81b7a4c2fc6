// Playback control: lifecycle, session launch and cancellation

use crate::session::DecodeSession;
use netradio_core::{
    EngineConfig, PlayerStatus, StatusContainer, StatusNotifier, StatusObserver, StreamSource,
};
use netradio_decode_mp3::{FrameDecoder, Mp3FrameDecoder};
use netradio_sink_api::OutputSink;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Output sink shared by the control thread and the decode thread
pub type SharedSink = Arc<Mutex<Box<dyn OutputSink>>>;

/// Builds a fresh decoder for each session
pub type DecoderFactory = Arc<dyn Fn() -> Box<dyn FrameDecoder> + Send + Sync>;

/// State shared between the control side and the decode thread
pub(crate) struct PlayerShared {
    status: StatusContainer,
    notifier: StatusNotifier,
    /// Serializes status changes with their delivery
    emit_lock: Mutex<()>,
    /// A session is in flight and has not emitted its terminal status yet
    active: AtomicBool,
    stop_requested: AtomicBool,
    task_running: AtomicBool,
}

impl PlayerShared {
    fn new() -> Self {
        Self {
            status: StatusContainer::new(),
            notifier: StatusNotifier::new(),
            emit_lock: Mutex::new(()),
            active: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            task_running: AtomicBool::new(false),
        }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_task_exited(&self) {
        self.task_running.store(false, Ordering::SeqCst);
    }

    fn emit(&self, to: PlayerStatus) -> bool {
        let _guard = self.emit_lock.lock();
        self.emit_locked(to)
    }

    fn emit_locked(&self, to: PlayerStatus) -> bool {
        match self.status.transition(to) {
            Ok(_) => {
                self.notifier.notify(to);
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    /// Buffering -> Playing, only while the session is live
    pub(crate) fn emit_playing(&self) -> bool {
        let _guard = self.emit_lock.lock();
        if !self.active.load(Ordering::SeqCst) || self.stop_requested() {
            return false;
        }
        if self.status.get() != PlayerStatus::Buffering {
            return false;
        }
        self.emit_locked(PlayerStatus::Playing)
    }

    /// Emit the session's terminal status; only the first caller wins
    pub(crate) fn finish(&self, terminal: PlayerStatus) -> bool {
        let _guard = self.emit_lock.lock();
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.emit_locked(terminal)
    }
}

/// Streams one URL at a time from a [`StreamSource`] into an [`OutputSink`]
pub struct StreamPlayer {
    config: EngineConfig,
    shared: Arc<PlayerShared>,
    sink: SharedSink,
    source: Arc<dyn StreamSource>,
    decoder_factory: DecoderFactory,
    /// Serializes init/deinit/play/stop
    control: Mutex<()>,
    task: Mutex<Option<JoinHandle<()>>>,
    current_url: Mutex<Option<String>>,
}

impl StreamPlayer {
    pub fn new(config: EngineConfig, sink: Box<dyn OutputSink>, source: Arc<dyn StreamSource>) -> Self {
        Self {
            config: config.normalized(),
            shared: Arc::new(PlayerShared::new()),
            sink: Arc::new(Mutex::new(sink)),
            source,
            decoder_factory: Arc::new(|| Box::new(Mp3FrameDecoder::new()) as Box<dyn FrameDecoder>),
            control: Mutex::new(()),
            task: Mutex::new(None),
            current_url: Mutex::new(None),
        }
    }

    /// Replace the MP3 decoder used for new sessions
    pub fn with_decoder_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn FrameDecoder> + Send + Sync + 'static,
    {
        self.decoder_factory = Arc::new(factory);
        self
    }

    /// Open the output sink. Failure leaves the player in Error.
    pub fn init(&self) -> bool {
        let _control = self.control.lock();
        let mut sink = self.sink.lock();
        if sink.is_initialized() {
            return true;
        }

        match sink.init() {
            Ok(()) => {
                log::info!("Output sink ready at {} Hz", sink.sample_rate());
                drop(sink);
                if !self.shared.status.get().is_active() {
                    self.shared.emit(PlayerStatus::Idle);
                }
                true
            }
            Err(e) => {
                log::error!("Failed to initialize output sink: {}", e);
                drop(sink);
                let _guard = self.shared.emit_lock.lock();
                self.shared.status.set(PlayerStatus::Error);
                self.shared.notifier.notify(PlayerStatus::Error);
                false
            }
        }
    }

    /// Stop playback and release the output sink
    pub fn deinit(&self) {
        self.stop();

        let _control = self.control.lock();
        let mut sink = self.sink.lock();
        if sink.is_initialized() {
            sink.deinit();
            drop(sink);
            self.shared.emit(PlayerStatus::Idle);
            log::info!("Player deinitialized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.sink.lock().is_initialized()
    }

    /// Start streaming `url`. Returns false, without touching the current session,
    /// when the request cannot be started.
    pub fn play(&self, url: &str) -> bool {
        let _control = self.control.lock();

        if url.is_empty() {
            log::warn!("play: empty URL");
            return false;
        }
        let status = self.shared.status.get();
        if status.is_active() {
            log::warn!("play: already {}", status);
            return false;
        }
        if !self.is_initialized() {
            log::warn!("play: player not initialized");
            return false;
        }
        if self.shared.task_running.load(Ordering::SeqCst) {
            log::warn!("play: previous session still shutting down");
            return false;
        }
        self.reap_task();

        *self.current_url.lock() = Some(url.to_string());
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.shared.active.store(true, Ordering::SeqCst);
        if !self.shared.emit(PlayerStatus::Buffering) {
            self.shared.active.store(false, Ordering::SeqCst);
            return false;
        }

        let session = DecodeSession {
            url: url.to_string(),
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            sink: Arc::clone(&self.sink),
            source: Arc::clone(&self.source),
            decoder_factory: Arc::clone(&self.decoder_factory),
        };

        self.shared.task_running.store(true, Ordering::SeqCst);
        match thread::Builder::new()
            .name("netradio-decode".to_string())
            .spawn(move || session.run())
        {
            Ok(handle) => {
                *self.task.lock() = Some(handle);
                log::info!("Playback started: {}", url);
                true
            }
            Err(e) => {
                log::error!("Failed to spawn decode thread: {}", e);
                self.shared.task_running.store(false, Ordering::SeqCst);
                self.shared.finish(PlayerStatus::Error);
                false
            }
        }
    }

    /// Stop the current session. Idempotent; returns true once nothing is playing.
    pub fn stop(&self) -> bool {
        let _control = self.control.lock();

        let active = self.shared.active.load(Ordering::SeqCst);
        if !active && !self.shared.task_running.load(Ordering::SeqCst) {
            self.reap_task();
            *self.current_url.lock() = None;
            return true;
        }

        log::info!("Stopping playback");
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        // Unblocks a decode thread parked in a network read
        self.source.close();

        for _ in 0..self.config.stop_poll_attempts {
            if !self.shared.task_running.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(self.config.stop_poll_interval);
        }

        if self.shared.task_running.load(Ordering::SeqCst) {
            log::warn!(
                "Decode thread still running after {:?}, detaching",
                self.config.stop_deadline()
            );
        } else {
            self.reap_task();
        }

        self.shared.finish(PlayerStatus::Stopped);
        *self.current_url.lock() = None;
        true
    }

    /// Register the status observer (last write wins); `None` unregisters
    pub fn set_status_callback(&self, observer: Option<Arc<dyn StatusObserver>>) {
        self.shared.notifier.set_observer(observer);
    }

    pub fn status(&self) -> PlayerStatus {
        self.shared.status.get()
    }

    pub fn current_url(&self) -> Option<String> {
        self.current_url.lock().clone()
    }

    /// The decode thread of the last session has not exited yet
    pub fn is_task_running(&self) -> bool {
        self.shared.task_running.load(Ordering::SeqCst)
    }

    /// Join a decode thread that has already exited; a detached one is dropped
    fn reap_task(&self) {
        let Some(handle) = self.task.lock().take() else {
            return;
        };
        if handle.is_finished() {
            if handle.join().is_err() {
                log::error!("Decode thread panicked");
            }
        } else if self.shared.task_running.load(Ordering::SeqCst) {
            // Still winding down; keep it for a later reap
            *self.task.lock() = Some(handle);
        }
    }
}

impl Drop for StreamPlayer {
    fn drop(&mut self) {
        self.deinit();
    }
}

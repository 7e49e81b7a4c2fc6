// Status notification for the playback lifecycle
// A single observer is supported; registering a new one replaces the old one

use crate::state::PlayerStatus;
use parking_lot::Mutex;
use std::sync::Arc;

/// Receives lifecycle transitions (UI, logging, ...)
/// Implementations should return quickly: they run on the thread that made the transition
/// and must not call back into the player
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, status: PlayerStatus);
}

impl<F> StatusObserver for F
where
    F: Fn(PlayerStatus) + Send + Sync,
{
    fn on_status(&self, status: PlayerStatus) {
        self(status)
    }
}

/// Holds the registered observer and serializes deliveries
pub struct StatusNotifier {
    observer: Mutex<Option<Arc<dyn StatusObserver>>>,
    last_emitted: Mutex<Option<PlayerStatus>>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self {
            observer: Mutex::new(None),
            last_emitted: Mutex::new(None),
        }
    }

    /// Replace the observer (last write wins); `None` unregisters
    pub fn set_observer(&self, observer: Option<Arc<dyn StatusObserver>>) {
        *self.observer.lock() = observer;
    }

    /// Deliver `status`, skipping an identical consecutive status
    pub fn notify(&self, status: PlayerStatus) {
        let mut last = self.last_emitted.lock();
        if *last == Some(status) {
            log::debug!("Status {:?} unchanged, not re-emitted", status);
            return;
        }
        *last = Some(status);

        // Cloned out so set_observer() is never blocked by a slow observer
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.on_status(status);
        }
        // `last` is held until delivery finishes so observers see transitions in order
        drop(last);
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PlayerStatus>>,
    }

    impl StatusObserver for Recorder {
        fn on_status(&self, status: PlayerStatus) {
            self.seen.lock().push(status);
        }
    }

    #[test]
    fn delivers_in_order_and_dedups() {
        let recorder = Arc::new(Recorder::default());
        let notifier = StatusNotifier::new();
        notifier.set_observer(Some(recorder.clone()));

        notifier.notify(PlayerStatus::Buffering);
        notifier.notify(PlayerStatus::Playing);
        notifier.notify(PlayerStatus::Playing);
        notifier.notify(PlayerStatus::Stopped);

        assert_eq!(
            *recorder.seen.lock(),
            vec![PlayerStatus::Buffering, PlayerStatus::Playing, PlayerStatus::Stopped]
        );
    }

    #[test]
    fn last_registered_observer_wins() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let notifier = StatusNotifier::new();

        notifier.set_observer(Some(first.clone()));
        notifier.set_observer(Some(second.clone()));
        notifier.notify(PlayerStatus::Buffering);

        assert!(first.seen.lock().is_empty());
        assert_eq!(*second.seen.lock(), vec![PlayerStatus::Buffering]);
    }

    #[test]
    fn closures_are_observers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let notifier = StatusNotifier::new();
        notifier.set_observer(Some(Arc::new(move |s: PlayerStatus| sink.lock().push(s))));

        notifier.notify(PlayerStatus::Error);
        assert_eq!(*seen.lock(), vec![PlayerStatus::Error]);
    }
}

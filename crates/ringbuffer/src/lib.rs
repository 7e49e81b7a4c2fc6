// Bounded byte channel between one producer and one consumer thread
//
// Used twice in the pipeline: HTTP reader -> decode thread (compressed bytes)
// and decode thread -> audio callback (PCM bytes).

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long read/write/clear wait for the internal lock before reporting no progress
const LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Lock budget for the best-effort size snapshots
const SNAPSHOT_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// A blocked writer re-checks for free space at least this often
const WRITE_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Fixed-capacity circular byte storage (unsynchronized)
///
/// One slot is always kept free so that `write_pos == read_pos` means empty.
pub struct ByteRing {
    buffer: Vec<u8>,
    write_pos: usize,
    read_pos: usize,
    size: usize,
    closed: bool,
}

impl ByteRing {
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        Self {
            buffer: vec![0; size],
            write_pos: 0,
            read_pos: 0,
            size,
            closed: false,
        }
    }

    pub fn write(&mut self, data: &[u8]) -> usize {
        let to_write = data.len().min(self.available_write());
        if to_write == 0 {
            return 0;
        }

        let write_end = self.write_pos + to_write;
        if write_end <= self.size {
            self.buffer[self.write_pos..write_end].copy_from_slice(&data[..to_write]);
            self.write_pos = write_end % self.size;
        } else {
            // Wrap-around: copy in two chunks
            let first_chunk = self.size - self.write_pos;
            let second_chunk = to_write - first_chunk;

            self.buffer[self.write_pos..].copy_from_slice(&data[..first_chunk]);
            self.buffer[..second_chunk].copy_from_slice(&data[first_chunk..to_write]);
            self.write_pos = second_chunk;
        }

        to_write
    }

    pub fn read(&mut self, output: &mut [u8]) -> usize {
        let to_read = output.len().min(self.available_read());
        if to_read == 0 {
            return 0;
        }

        let read_end = self.read_pos + to_read;
        if read_end <= self.size {
            output[..to_read].copy_from_slice(&self.buffer[self.read_pos..read_end]);
            self.read_pos = read_end % self.size;
        } else {
            let first_chunk = self.size - self.read_pos;
            let second_chunk = to_read - first_chunk;

            output[..first_chunk].copy_from_slice(&self.buffer[self.read_pos..]);
            output[first_chunk..to_read].copy_from_slice(&self.buffer[..second_chunk]);
            self.read_pos = second_chunk;
        }

        to_read
    }

    pub fn available_write(&self) -> usize {
        self.size - self.available_read() - 1
    }

    pub fn available_read(&self) -> usize {
        if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.size - (self.read_pos - self.write_pos)
        }
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

struct Shared {
    ring: Mutex<ByteRing>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

/// Thread-safe handle to a [`ByteRing`] with blocking, timeout-bounded operations
///
/// Timeouts: `None` waits without bound, `Some(Duration::ZERO)` never waits.
#[derive(Clone)]
pub struct ByteRingBuffer {
    inner: Arc<Shared>,
}

impl ByteRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let ring = ByteRing::new(capacity);
        let capacity = ring.size();
        Self {
            inner: Arc::new(Shared {
                ring: Mutex::new(ring),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Write `data`, waiting for free space until `timeout` elapses.
    ///
    /// Returns the bytes written; fewer than `data.len()` only on timeout,
    /// after `close()`, or when the lock could not be taken.
    pub fn write(&self, data: &[u8], timeout: Option<Duration>) -> usize {
        self.write_units(data, 1, timeout)
    }

    /// Like [`write`](Self::write), but only ever queues whole `frame_len`-byte frames.
    ///
    /// The returned count is always a multiple of `frame_len`, so a timeout never
    /// leaves a partial frame behind. A trailing partial frame in `data` is ignored.
    pub fn write_frames(
        &self,
        data: &[u8],
        frame_len: usize,
        timeout: Option<Duration>,
    ) -> usize {
        let frame_len = frame_len.max(1);
        if frame_len >= self.inner.capacity {
            log::warn!(
                "Frame of {} bytes cannot fit a {} byte ring",
                frame_len,
                self.inner.capacity
            );
            return 0;
        }
        let whole = data.len() / frame_len * frame_len;
        self.write_units(&data[..whole], frame_len, timeout)
    }

    fn write_units(&self, data: &[u8], unit: usize, timeout: Option<Duration>) -> usize {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut written = 0;

        while written < data.len() {
            let Some(mut ring) = self.inner.ring.try_lock_for(LOCK_TIMEOUT) else {
                log::trace!("ring write: lock timeout after {} bytes", written);
                break;
            };
            if ring.closed {
                break;
            }

            let room = ring.available_write() / unit * unit;
            if room == 0 {
                let wait = match deadline {
                    None => WRITE_RETRY_INTERVAL,
                    Some(deadline) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            break;
                        }
                        remaining.min(WRITE_RETRY_INTERVAL)
                    }
                };
                self.inner.not_full.wait_for(&mut ring, wait);
                continue;
            }

            let end = written + room.min(data.len() - written);
            written += ring.write(&data[written..end]);
            drop(ring);
            self.inner.not_empty.notify_all();
        }

        written
    }

    /// Wait up to `timeout` for at least one byte, then drain what is available
    /// into `buf` without waiting again. Returns 0 on timeout.
    pub fn read(&self, buf: &mut [u8], timeout: Option<Duration>) -> usize {
        if buf.is_empty() {
            return 0;
        }
        let deadline = timeout.map(|t| Instant::now() + t);

        let Some(mut ring) = self.inner.ring.try_lock_for(LOCK_TIMEOUT) else {
            log::trace!("ring read: lock timeout");
            return 0;
        };

        while ring.available_read() == 0 {
            if ring.closed {
                return 0;
            }
            match deadline {
                None => self.inner.not_empty.wait(&mut ring),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return 0;
                    }
                    self.inner.not_empty.wait_for(&mut ring, deadline - now);
                }
            }
        }

        let n = ring.read(buf);
        drop(ring);
        self.inner.not_full.notify_all();
        n
    }

    /// Drain what is available without waiting, not even for the lock.
    /// For real-time audio callbacks.
    pub fn try_read(&self, buf: &mut [u8]) -> usize {
        let Some(mut ring) = self.inner.ring.try_lock() else {
            return 0;
        };
        let n = ring.read(buf);
        drop(ring);
        if n > 0 {
            self.inner.not_full.notify_all();
        }
        n
    }

    /// Bytes ready to read (0 if the lock is contended)
    pub fn available(&self) -> usize {
        self.inner
            .ring
            .try_lock_for(SNAPSHOT_LOCK_TIMEOUT)
            .map(|ring| ring.available_read())
            .unwrap_or(0)
    }

    /// Bytes that can be written without waiting (0 if the lock is contended)
    pub fn free_space(&self) -> usize {
        self.inner
            .ring
            .try_lock_for(SNAPSHOT_LOCK_TIMEOUT)
            .map(|ring| ring.available_write())
            .unwrap_or(0)
    }

    /// Drop all buffered bytes. Only meaningful while no read/write is in flight.
    pub fn clear(&self) {
        if let Some(mut ring) = self.inner.ring.try_lock_for(LOCK_TIMEOUT) {
            ring.clear();
            drop(ring);
            self.inner.not_full.notify_all();
        }
    }

    /// Stop accepting writes and wake every waiter.
    /// Readers still drain what was buffered, then get 0 without waiting.
    pub fn close(&self) {
        self.inner.ring.lock().closed = true;
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.ring.lock().closed
    }
}

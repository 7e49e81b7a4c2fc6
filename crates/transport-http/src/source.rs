// Streaming HTTP source: a reader thread pushes socket bytes into a bounded channel,
// the decode thread pulls them out with bounded waits

use crate::client::{create_http_agent, open_stream, HttpConfig};
use netradio_core::{AudioError, Result, StreamSource};
use netradio_ringbuffer::ByteRingBuffer;
use parking_lot::Mutex;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of the consumer's wait on the channel
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Granularity of the producer's wait for free channel space
const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One open HTTP response and the channel its reader thread fills
struct Connection {
    channel: ByteRingBuffer,
    closed: AtomicBool,
    /// Read error seen by the reader thread, reported once the channel drains
    error: Mutex<Option<String>>,
}

impl Connection {
    fn new(capacity: usize) -> Self {
        Self {
            channel: ByteRingBuffer::new(capacity),
            closed: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.channel.close();
    }
}

/// HTTP stream source with a background reader thread
pub struct HttpStreamSource {
    config: HttpConfig,
    agent: ureq::Agent,
    connection: Mutex<Option<Arc<Connection>>>,
}

impl HttpStreamSource {
    pub fn new(config: HttpConfig) -> Self {
        let agent = create_http_agent(&config);
        Self {
            config,
            agent,
            connection: Mutex::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Start streaming from an already-open body reader
    pub fn attach_reader<R>(&self, reader: R) -> Result<()>
    where
        R: Read + Send + 'static,
    {
        self.close();

        let conn = Arc::new(Connection::new(self.config.channel_capacity));
        let worker_conn = Arc::clone(&conn);
        let chunk = self.config.read_chunk.max(1);

        thread::Builder::new()
            .name("netradio-http".to_string())
            .spawn(move || Self::reader_worker(worker_conn, reader, chunk))
            .map_err(|e| AudioError::ThreadError(format!("Failed to spawn HTTP reader: {}", e)))?;

        *self.connection.lock() = Some(conn);
        Ok(())
    }

    /// Reader thread: socket -> channel, blocking on the channel when the consumer falls behind
    fn reader_worker<R: Read>(conn: Arc<Connection>, mut reader: R, chunk: usize) {
        let mut buffer = vec![0u8; chunk];
        let mut total: u64 = 0;

        loop {
            if conn.closed.load(Ordering::SeqCst) {
                log::debug!("HTTP reader cancelled after {} bytes", total);
                break;
            }

            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => {
                    log::info!("HTTP stream ended after {} bytes", total);
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    if !conn.closed.load(Ordering::SeqCst) {
                        log::error!("HTTP read error: {}", e);
                        *conn.error.lock() = Some(e.to_string());
                    }
                    break;
                }
            };
            total += bytes_read as u64;

            let mut offset = 0;
            while offset < bytes_read && !conn.closed.load(Ordering::SeqCst) {
                offset += conn
                    .channel
                    .write(&buffer[offset..bytes_read], Some(WRITE_POLL_INTERVAL));
            }
        }

        // Lets the consumer drain what is left and then see end of stream
        conn.channel.close();
    }
}

impl StreamSource for HttpStreamSource {
    fn open(&self, url: &str) -> Result<()> {
        log::info!("Opening HTTP stream: {}", url);
        self.close();
        let response = open_stream(&self.agent, url, &self.config)?;
        self.attach_reader(response.into_reader())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Clone the handle out so close() is never blocked behind a waiting read
        let conn = self
            .connection
            .lock()
            .clone()
            .ok_or(AudioError::Closed)?;

        let started = Instant::now();
        loop {
            let n = conn.channel.read(buf, Some(READ_POLL_INTERVAL));
            if n > 0 {
                return Ok(n);
            }
            if conn.closed.load(Ordering::SeqCst) {
                return Err(AudioError::Closed);
            }
            if conn.channel.is_closed() && conn.channel.available() == 0 {
                return match conn.error.lock().clone() {
                    Some(message) => Err(AudioError::NetworkError(message)),
                    None => Ok(0),
                };
            }
            if started.elapsed() >= self.config.read_timeout {
                return Err(AudioError::Timeout(format!(
                    "no stream data for {:?}",
                    self.config.read_timeout
                )));
            }
        }
    }

    fn close(&self) {
        if let Some(conn) = self.connection.lock().take() {
            // The reader thread may stay parked in a socket read until the read timeout;
            // it exits on its next wake-up and nothing waits for it
            conn.shutdown();
            log::info!("HTTP stream closed");
        }
    }
}

impl Drop for HttpStreamSource {
    fn drop(&mut self) {
        self.close();
    }
}

// Network source contract consumed by the playback engine

use crate::error::Result;

/// A remote compressed-audio stream
///
/// Every method takes `&self`: the decode thread reads while the control thread
/// may `close()` the source to unblock it.
pub trait StreamSource: Send + Sync {
    /// Connect to `url`, replacing any previous connection
    fn open(&self, url: &str) -> Result<()>;

    /// Read up to `buf.len()` bytes; `Ok(0)` means end of stream
    /// (or that the source was closed)
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Tear down the connection; in-flight and later reads return promptly
    fn close(&self);
}

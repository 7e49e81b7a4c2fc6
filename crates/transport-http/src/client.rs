// HTTP client configuration and utilities

use netradio_core::{AudioError, Result};
use std::time::Duration;

/// HTTP stream configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    /// Bound on a single socket read; also the longest a consumer waits for bytes
    pub read_timeout: Duration,
    /// Bytes requested from the socket per read
    pub read_chunk: usize,
    /// Capacity of the channel between the reader thread and the consumer
    pub channel_capacity: usize,
    /// Ask the server for inline ICY metadata (the decoder cannot strip it)
    pub icy_metadata: bool,
    pub user_agent: String,
    pub max_redirects: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(8000),
            read_timeout: Duration::from_millis(8000),
            read_chunk: 2048,
            channel_capacity: 64 * 1024,
            icy_metadata: false,
            user_agent: "Mozilla/5.0 (compatible; NetRadio/0.1)".to_string(),
            max_redirects: 10,
        }
    }
}

/// Create a configured HTTP agent
pub fn create_http_agent(config: &HttpConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(config.connect_timeout)
        .timeout_read(config.read_timeout)
        .user_agent(&config.user_agent)
        .redirects(config.max_redirects)
        .build()
}

/// Issue the streaming GET request
pub fn open_stream(agent: &ureq::Agent, url: &str, config: &HttpConfig) -> Result<ureq::Response> {
    let icy = if config.icy_metadata { "1" } else { "0" };

    let response = agent
        .get(url)
        .set("Icy-MetaData", icy)
        .call()
        .map_err(|e| AudioError::NetworkError(format!("HTTP GET failed: {}", e)))?;

    let status = response.status();
    log::info!("HTTP status: {}", status);
    if status != 200 {
        // Redirects are followed by the agent; anything else non-200 is suspicious but may still stream
        log::warn!("Unexpected status code: {}", status);
    }
    if let Some(content_type) = response.header("Content-Type") {
        if !is_mpeg_audio(content_type) {
            log::warn!("Stream content type is {}, expecting MPEG audio", content_type);
        }
    }

    Ok(response)
}

/// Check if a Content-Type names MPEG audio
pub fn is_mpeg_audio(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.starts_with("audio/mpeg") || lower.starts_with("audio/mp3") || lower.starts_with("audio/x-mpeg")
}

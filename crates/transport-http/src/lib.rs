// HTTP transport for streaming audio

pub mod client;
pub mod source;

pub use client::{create_http_agent, HttpConfig};
pub use source::HttpStreamSource;

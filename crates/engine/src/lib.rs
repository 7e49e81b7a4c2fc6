// Streaming playback engine: HTTP source -> MP3 frames -> fixed-rate PCM sink

mod player;
mod session;
pub mod window;

pub use player::{DecoderFactory, SharedSink, StreamPlayer};
pub use window::CompressedByteWindow;

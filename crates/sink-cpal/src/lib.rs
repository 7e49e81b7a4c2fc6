// Host audio output using cpal

mod cpal_sink;
mod pcm_reader;

pub use cpal_sink::CpalSink;
pub use pcm_reader::PcmReader;

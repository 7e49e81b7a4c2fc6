use clap::Parser;
use netradio_core::EngineConfig;
use netradio_sink_api::SinkSpec;
use netradio_transport_http::HttpConfig;
use std::time::Duration;

/// Play an MP3 internet radio stream on the default output device
#[derive(Parser, Debug)]
#[command(name = "netradio", version)]
pub struct Args {
    /// Stream URL (HTTP or HTTPS, MP3)
    pub url: String,

    /// Stop after this many seconds instead of playing until the stream ends
    #[arg(long)]
    pub seconds: Option<u64>,

    /// Output sample rate to open the device at; follows the stream once it starts
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// Compressed input window in KiB
    #[arg(long, default_value_t = 32)]
    pub window_kib: usize,

    /// Connect and read timeout in milliseconds
    #[arg(long, default_value_t = 8000)]
    pub http_timeout_ms: u64,

    /// Log per-frame detail
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            window_capacity: self.window_kib * 1024,
            ..EngineConfig::default()
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        let timeout = Duration::from_millis(self.http_timeout_ms);
        HttpConfig {
            connect_timeout: timeout,
            read_timeout: timeout,
            ..HttpConfig::default()
        }
    }

    pub fn sink_spec(&self) -> SinkSpec {
        SinkSpec {
            sample_rate: self.sample_rate,
            ..SinkSpec::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_library_defaults() {
        let args = Args::parse_from(["netradio", "http://radio.test/live"]);
        assert_eq!(args.seconds, None);
        assert_eq!(args.engine_config().window_capacity, 32 * 1024);
        assert_eq!(args.http_config().read_timeout, Duration::from_secs(8));
        assert_eq!(args.sink_spec(), SinkSpec::default());
    }

    #[test]
    fn flags_map_onto_configs() {
        let args = Args::parse_from([
            "netradio",
            "--seconds",
            "30",
            "--sample-rate",
            "48000",
            "--window-kib",
            "64",
            "--http-timeout-ms",
            "2500",
            "http://radio.test/live",
        ]);
        assert_eq!(args.seconds, Some(30));
        assert_eq!(args.sink_spec().sample_rate, 48000);
        assert_eq!(args.engine_config().window_capacity, 64 * 1024);
        assert_eq!(args.http_config().connect_timeout, Duration::from_millis(2500));
    }
}

//! `netradio`: play one MP3 stream until it ends, fails, is interrupted, or `--seconds` elapse.

mod args;

use anyhow::{bail, Context, Result};
use args::Args;
use clap::Parser;
use netradio_core::{PlayerStatus, StatusObserver};
use netradio_engine::StreamPlayer;
use netradio_sink_cpal::CpalSink;
use netradio_transport_http::HttpStreamSource;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

enum Event {
    Status(PlayerStatus),
    Interrupt,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let source = Arc::new(HttpStreamSource::new(args.http_config()));
    let sink = CpalSink::new(args.sink_spec());
    let player = StreamPlayer::new(args.engine_config(), Box::new(sink), source);

    let (events, incoming) = mpsc::channel();

    let status_events = events.clone();
    let observer: Arc<dyn StatusObserver> = Arc::new(move |status: PlayerStatus| {
        let _ = status_events.send(Event::Status(status));
    });
    player.set_status_callback(Some(observer));

    ctrlc::set_handler(move || {
        let _ = events.send(Event::Interrupt);
    })
    .context("install Ctrl-C handler")?;

    if !player.init() {
        bail!("could not open the audio output device");
    }
    if !player.play(&args.url) {
        bail!("could not start playback of {}", args.url);
    }

    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs(s));
    let outcome = wait_for_end(&incoming, deadline);

    player.stop();
    player.deinit();

    match outcome {
        PlayerStatus::Error => bail!("playback of {} failed", args.url),
        _ => Ok(()),
    }
}

/// Print status changes until the session ends, Ctrl-C arrives or `deadline` passes.
/// Returns the last status seen.
fn wait_for_end(incoming: &mpsc::Receiver<Event>, deadline: Option<Instant>) -> PlayerStatus {
    let mut last = PlayerStatus::Idle;
    loop {
        let event = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match incoming.recv_timeout(remaining) {
                    Ok(event) => event,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        log::info!("Time limit reached");
                        return last;
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => return last,
                }
            }
            None => match incoming.recv() {
                Ok(event) => event,
                Err(_) => return last,
            },
        };

        match event {
            Event::Status(status) => {
                println!("status: {}", status);
                last = status;
                if matches!(status, PlayerStatus::Stopped | PlayerStatus::Error) {
                    return last;
                }
            }
            Event::Interrupt => {
                log::info!("Interrupted");
                return last;
            }
        }
    }
}

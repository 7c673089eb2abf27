use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use std::time::Duration;
use tokio::sync::broadcast;

use drumline::app::{spawn_detector, DetectorHandle, RunOptions};
use drumline::audio::{self, AudioSource, CpalAudioSource, WavFileSource};
use drumline::cli::{Cli, Command};
use drumline::config::Config;
use drumline::defaults;
use drumline::output;
use drumline::server::{EventServer, ServerEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    audio::suppress_audio_warnings();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).context("failed to load config")?,
        None => Config::load_or_default().context("failed to load config")?,
    }
    .with_env_overrides();

    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(threshold) = cli.threshold {
        config.detector.hysteresis_threshold = threshold;
    }
    if let Some(low) = cli.band_low {
        config.detector.band_low_hz = low;
    }
    if let Some(high) = cli.band_high {
        config.detector.band_high_hz = high;
    }
    config
        .detector
        .validate()
        .context("invalid detector settings")?;

    match cli.command {
        None => listen(config, cli.duration, cli.meter).await,
        Some(Command::Devices) => devices(),
        Some(Command::Analyze { file, json }) => analyze(config, &file, json).await,
        Some(Command::Serve { addr }) => serve(config, addr, cli.duration).await,
    }
}

fn open_capture(config: &Config) -> anyhow::Result<Box<dyn drumline::audio::AudioSource>> {
    let source = CpalAudioSource::new(config.audio.device.as_deref(), config.audio.chunk_ms)
        .context("failed to open capture device")?;
    eprintln!(
        "Listening at {} Hz, {} channel(s)",
        source.sample_rate(),
        source.channels()
    );
    Ok(Box::new(source))
}

async fn wait_for_stop(handle: &DetectorHandle, duration: Option<Duration>) {
    let deadline = duration.map(|d| tokio::time::Instant::now() + d);
    loop {
        if !handle.is_running() {
            return;
        }
        if let Some(deadline) = deadline
            && tokio::time::Instant::now() >= deadline
        {
            return;
        }
        let tick = tokio::time::sleep(Duration::from_millis(100));
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return,
            _ = tick => {}
        }
    }
}

fn print_summary(stats: drumline::app::DetectorStats) {
    eprintln!();
    eprintln!(
        "{} {} chunk(s), {} hit(s), {} dropped",
        "Done:".green().bold(),
        stats.chunks,
        stats.hits,
        stats.dropped_chunks
    );
}

async fn listen(config: Config, duration: Option<Duration>, meter: bool) -> anyhow::Result<()> {
    let source = open_capture(&config)?;
    let options = RunOptions {
        show_meter: meter,
        ..RunOptions::default()
    };
    let handle = spawn_detector(source, config.detector, options)?;
    wait_for_stop(&handle, duration).await;
    print_summary(handle.stop()?);
    Ok(())
}

fn devices() -> anyhow::Result<()> {
    let devices = audio::list_devices().context("failed to enumerate devices")?;
    if devices.is_empty() {
        eprintln!("No usable input devices found");
    } else {
        output::print_device_list(&devices);
    }
    Ok(())
}

async fn analyze(config: Config, file: &std::path::Path, json: bool) -> anyhow::Result<()> {
    let source = WavFileSource::open(file, config.audio.chunk_ms)
        .with_context(|| format!("failed to open {}", file.display()))?;

    // JSON mode prints events itself via the broadcast hook to keep
    // stdout machine-readable.
    let (tx, mut rx) = broadcast::channel(defaults::EVENT_QUEUE_CAPACITY);
    let options = RunOptions {
        events: json.then(|| tx.clone()),
        show_meter: false,
        print_hits: !json,
    };
    drop(tx);

    let handle = spawn_detector(Box::new(source), config.detector, options)?;
    loop {
        if json {
            drain_hits(&mut rx)?;
        }
        if !handle.is_running() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    if json {
        drain_hits(&mut rx)?;
    }
    print_summary(handle.stop()?);
    Ok(())
}

fn drain_hits(rx: &mut broadcast::Receiver<ServerEvent>) -> anyhow::Result<()> {
    use tokio::sync::broadcast::error::TryRecvError;
    loop {
        match rx.try_recv() {
            Ok(event) => {
                if let ServerEvent::Hit { .. } = &event {
                    println!("{}", event.to_json()?);
                }
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return Ok(()),
        }
    }
}

async fn serve(
    config: Config,
    addr: Option<String>,
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let server = EventServer::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    eprintln!("Serving hit events on {}", server.local_addr());

    let hello = ServerEvent::Hello {
        version: env!("CARGO_PKG_VERSION").to_string(),
        band_low_hz: config.detector.band_low_hz,
        band_high_hz: config.detector.band_high_hz,
        hysteresis_threshold: config.detector.hysteresis_threshold,
    };

    let (tx, _rx) = broadcast::channel(defaults::EVENT_QUEUE_CAPACITY);
    let shutdown = server.shutdown_handle();
    let server_task = tokio::spawn(server.run(tx.clone(), hello));

    let source = open_capture(&config)?;
    let options = RunOptions {
        events: Some(tx),
        show_meter: false,
        print_hits: true,
    };
    let handle = spawn_detector(source, config.detector, options)?;

    wait_for_stop(&handle, duration).await;

    shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
    print_summary(handle.stop()?);
    server_task.await?.context("event server failed")?;
    Ok(())
}

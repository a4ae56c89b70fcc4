//! Serial Data Visualizer - Main Entry Point
//!
//! Terminal front end for the acquisition engine: `monitor` streams a live
//! device to the terminal, `replay` summarizes a recording.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use serde::Serialize;
use serialvis_rs::{
    backend::{DeviceConnector, SerialPortConnector, SessionEvent},
    config::AppConfig,
    store::Snapshot,
    types::format_value,
    Coordinator, SessionState,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "serialvis",
    version,
    about = "Live multi-channel serial data visualizer",
    long_about = "Reads comma-separated readings from a serial device, one line per sample row,\n\
                  keeps the latest samples of every channel and records them to CSV."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (TOML or JSON); defaults to the platform config directory
    #[arg(long, global = true, env = "SERIALVIS_CONFIG")]
    config: Option<PathBuf>,

    /// Override channel names, e.g. `--channels A6,A7`
    #[arg(long, global = true, value_delimiter = ',')]
    channels: Option<Vec<String>>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a live device to the terminal
    Monitor(MonitorArgs),
    /// Load a recording and print per-channel statistics
    Replay(ReplayArgs),
}

#[derive(Args)]
struct MonitorArgs {
    /// Serial port, e.g. /dev/ttyACM0 or COM3
    #[arg(long)]
    port: Option<String>,

    /// Baud rate (defaults to the configured rate)
    #[arg(long)]
    baud: Option<u32>,

    /// Record accepted rows; without a path a timestamped file is used
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    record: Option<Option<PathBuf>>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Use a generated waveform instead of hardware
    #[arg(long)]
    mock: bool,

    /// Row rate of the mock device in Hz
    #[arg(long, default_value_t = 50)]
    mock_rate: u32,
}

#[derive(Args)]
struct ReplayArgs {
    /// Recording to load
    file: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

/// Per-channel summary printed by `replay`
#[derive(Debug, Serialize)]
struct ChannelReport {
    name: String,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
    mean: Option<f64>,
    last: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load_or_default(),
    };
    if let Some(names) = cli.channels {
        config.channels.names = names.into_iter().map(|n| n.trim().to_string()).collect();
    }

    match cli.command {
        Command::Monitor(args) => monitor(config, args),
        Command::Replay(args) => replay(config, args),
    }
}

/// Initialize tracing; the guard must live until exit so file logs are flushed
fn init_logging(verbose: u8, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let default_filter = match verbose {
        0 => "info,serialvis_rs=debug",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

fn monitor(config: AppConfig, args: MonitorArgs) -> anyhow::Result<()> {
    let baud = args.baud.unwrap_or(config.serial.default_baud);
    let connector = make_connector(&config, &args)?;
    let address = match (&args.port, args.mock) {
        (Some(port), _) => port.clone(),
        (None, true) => "mock0".to_string(),
        (None, false) => bail!("--port is required unless --mock is given"),
    };
    let interval = config.render.interval();

    let mut coordinator = Coordinator::new(config, connector)?;
    coordinator.open(&address, baud)?;

    match &args.record {
        Some(Some(path)) => coordinator.start_recording(path)?,
        Some(None) => {
            let path = coordinator.start_recording_auto()?;
            println!("Recording to {}", path.display());
        }
        None => {}
    }

    println!(
        "Monitoring {} at {} baud [{}]. Keys: p = pause/resume, r = record, q = quit",
        address,
        baud,
        coordinator.channel_names().join(", ")
    );

    let keys = spawn_key_reader();
    let deadline = args.duration.map(|s| Instant::now() + Duration::from_secs(s));
    let mut last_rows = 0;

    loop {
        match keys.recv_timeout(interval) {
            Ok('q') => break,
            Ok('p') => match coordinator.state() {
                SessionState::Paused => {
                    coordinator.resume();
                    println!("Resumed");
                }
                _ => {
                    coordinator.pause();
                    println!("Paused");
                }
            },
            Ok('r') => toggle_recording(&mut coordinator),
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            // stdin closed; keep running until the duration or the device ends
            Err(RecvTimeoutError::Disconnected) => std::thread::sleep(interval),
        }

        for event in coordinator.poll_events() {
            match event {
                SessionEvent::DeviceError(reason) => eprintln!("Device error: {}", reason),
                SessionEvent::RecordingError(reason) => eprintln!("Recording stopped: {}", reason),
                other => tracing::debug!("Session event: {:?}", other),
            }
        }
        if coordinator.state() == SessionState::Disconnected {
            break;
        }

        let snapshot = coordinator.snapshot();
        if snapshot.total_rows != last_rows {
            last_rows = snapshot.total_rows;
            println!("{}", render_line(&snapshot));
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
    }

    if let Some(stats) = coordinator.stats() {
        println!(
            "{} lines read, {} rows accepted, {} rejected ({:.1}%), {:.1} rows/s",
            stats.lines_read,
            stats.rows_accepted,
            stats.lines_rejected,
            stats.reject_rate(),
            stats.effective_row_rate
        );
    }
    if let Some(summary) = coordinator.stop_recording()? {
        println!(
            "Recorded {} rows to {}",
            summary.rows_written,
            summary.path.display()
        );
    }
    coordinator.close();
    Ok(())
}

fn make_connector(
    config: &AppConfig,
    args: &MonitorArgs,
) -> anyhow::Result<Box<dyn DeviceConnector>> {
    if !args.mock {
        return Ok(Box::new(SerialPortConnector));
    }

    #[cfg(feature = "mock-device")]
    {
        use serialvis_rs::backend::{MockConnector, MockDataPattern};

        let patterns = (0..config.channels.count())
            .map(|i| match i % 3 {
                0 => MockDataPattern::default(),
                1 => MockDataPattern::Triangle {
                    period: 4.0,
                    amplitude: 5.0,
                },
                _ => MockDataPattern::Counter {
                    step: 1.0,
                    min: 0.0,
                    max: 1023.0,
                },
            })
            .collect();
        Ok(Box::new(MockConnector::generator(patterns, args.mock_rate)))
    }

    #[cfg(not(feature = "mock-device"))]
    {
        let _ = config;
        bail!("--mock requires the mock-device feature")
    }
}

fn toggle_recording(coordinator: &mut Coordinator) {
    if coordinator.is_recording() {
        match coordinator.stop_recording() {
            Ok(Some(summary)) => println!(
                "Recorded {} rows to {}",
                summary.rows_written,
                summary.path.display()
            ),
            Ok(None) => {}
            Err(e) => eprintln!("Failed to stop recording: {}", e),
        }
    } else {
        match coordinator.start_recording_auto() {
            Ok(path) => println!("Recording to {}", path.display()),
            Err(e) => eprintln!("Failed to start recording: {}", e),
        }
    }
}

/// Read single-character commands from stdin on a background thread
fn spawn_key_reader() -> Receiver<char> {
    let (tx, rx) = unbounded();
    let spawned = std::thread::Builder::new()
        .name("serialvis-keys".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if let Some(key) = line.trim().chars().next() {
                    if tx.send(key.to_ascii_lowercase()).is_err() {
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Keyboard commands unavailable: {}", e);
    }
    rx
}

fn render_line(snapshot: &Snapshot) -> String {
    snapshot
        .channels
        .iter()
        .map(|c| match c.last() {
            Some(value) => format!("{}={}", c.name, format_value(value)),
            None => format!("{}=-", c.name),
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn replay(config: AppConfig, args: ReplayArgs) -> anyhow::Result<()> {
    let mut coordinator = Coordinator::with_serial_port(config)?;
    let summary = coordinator
        .load_playback(&args.file)
        .with_context(|| format!("Failed to replay {}", args.file.display()))?;

    for name in summary.missing_channels() {
        eprintln!("Channel {} not found in {}", name, args.file.display());
    }

    let reports: Vec<ChannelReport> = coordinator
        .snapshot()
        .channels
        .into_iter()
        .map(|channel| {
            let count = channel.len();
            let range = channel.value_range();
            ChannelReport {
                mean: (count > 0).then(|| channel.values.iter().sum::<f64>() / count as f64),
                last: channel.last(),
                min: range.map(|(min, _)| min),
                max: range.map(|(_, max)| max),
                count,
                name: channel.name,
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("{} rows from {}", summary.rows, summary.path.display());
    println!(
        "{:<12} {:>8} {:>12} {:>12} {:>12} {:>12}",
        "channel", "count", "min", "max", "mean", "last"
    );
    let show = |v: Option<f64>| v.map(format_value).unwrap_or_else(|| "-".to_string());
    for r in &reports {
        println!(
            "{:<12} {:>8} {:>12} {:>12} {:>12} {:>12}",
            r.name,
            r.count,
            show(r.min),
            show(r.max),
            show(r.mean),
            show(r.last)
        );
    }
    Ok(())
}

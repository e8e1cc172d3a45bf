use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use motif_core::completion::CompletionListener;
use motif_core::config::Config;
use motif_core::player::{MultiChannelPlayer, SequencePlayer, SequenceProgress, StopOutcome};
use motif_core::playlist::{build_sequential, build_simultaneous, Session};
use motif_core::transport::OscTransport;
use motif_types::{Channel, ChannelId, CompletionEvent, Melody};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_RUN_SECS: f64 = 10.0;

const USAGE: &str = "usage: motif [--verbose] [--loop] [--simultaneous] [--for SECS] FILE...";

struct Args {
    verbose: bool,
    sequence_loop: bool,
    simultaneous: bool,
    run_for: Duration,
    files: Vec<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args {
        verbose: false,
        sequence_loop: false,
        simultaneous: false,
        run_for: Duration::from_secs_f64(DEFAULT_RUN_SECS),
        files: Vec::new(),
    };
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--verbose" | "-v" => args.verbose = true,
            "--loop" => args.sequence_loop = true,
            "--simultaneous" | "-s" => args.simultaneous = true,
            "--for" => {
                let value = raw.next().ok_or("--for needs a number of seconds")?;
                let secs: f64 = value
                    .parse()
                    .map_err(|_| format!("--for: {:?} is not a number", value))?;
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(format!("--for: {} must be positive", secs));
                }
                args.run_for = Duration::from_secs_f64(secs);
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("unknown option {}\n{}", flag, USAGE)),
            _ => args.files.push(PathBuf::from(arg)),
        }
    }
    if args.files.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(args)
}

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("motif")
        .join("motif.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create(std::env::temp_dir().join("motif.log"))) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("motif: logging disabled ({})", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("motif: logging disabled ({})", e);
        return;
    }

    log::info!("motif starting (log level: {:?})", log_level);
}

fn other(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

/// One channel per file, routed by position, with the file's melody selected.
fn load_session(files: &[PathBuf]) -> io::Result<Session> {
    let mut session = Session::default();
    for (i, path) in files.iter().enumerate() {
        let contents = std::fs::read_to_string(path)?;
        let melody: Melody = serde_json::from_str(&contents)
            .map_err(|e| other(format!("{}: {}", path.display(), e)))?;
        log::info!("loaded {} ({} notes) from {}", melody.name, melody.notes().len(), path.display());

        let channel_id = ChannelId::new(i as u32);
        let melody_id = melody.id;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("channel {}", i));
        let mut channel = Channel::new(channel_id, name);
        channel.add_melody(melody);
        session.channels.push(channel);
        session.selection.select(channel_id, melody_id);
    }
    Ok(session)
}

fn run_sequence(
    player: &mut SequencePlayer<OscTransport>,
    session: &Session,
    completions: &Receiver<CompletionEvent>,
) -> io::Result<()> {
    player.start(build_sequential(session)).map_err(other)?;
    println!("playing {} melodies in sequence", player.playlist().len());

    loop {
        let progress = match completions.recv_timeout(POLL_INTERVAL) {
            Ok(event) => Some(player.handle_completion(&event)),
            Err(RecvTimeoutError::Timeout) => player.poll_watchdog(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => {
                let _ = player.stop();
                return Err(other("completion listener stopped"));
            }
        };
        match progress {
            Some(SequenceProgress::Advanced { index }) => {
                if let Some(item) = player.current_item() {
                    println!("[{}] {}", index + 1, item.melody.name);
                }
            }
            Some(SequenceProgress::Wrapped) => println!("looping back to the first melody"),
            Some(SequenceProgress::Finished) => {
                println!("done");
                return Ok(());
            }
            Some(SequenceProgress::Failed(e)) => return Err(other(e)),
            Some(SequenceProgress::Ignored) | None => {}
        }
    }
}

fn run_simultaneous(
    player: &mut MultiChannelPlayer<OscTransport>,
    session: &Session,
    completions: &Receiver<CompletionEvent>,
    run_for: Duration,
) -> io::Result<()> {
    let report = player.start_all(build_simultaneous(session)).map_err(other)?;
    for (channel, e) in &report.failed {
        eprintln!("channel {} failed to start: {}", channel, e);
    }
    if report.started.is_empty() {
        return Err(other("no channel could be started"));
    }
    println!("looping {} channels for {:.1}s", report.started.len(), run_for.as_secs_f64());

    let deadline = Instant::now() + run_for;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        if let Ok(event) = completions.recv_timeout(remaining.min(POLL_INTERVAL)) {
            player.handle_completion(&event);
        }
    }

    match player.stop_all().map_err(other)? {
        StopOutcome::Stopped => println!("stopped"),
        StopOutcome::Reconciled { still_playing } => {
            eprintln!("stop-all failed; {} channels may still be playing", still_playing.len())
        }
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };
    init_logging(args.verbose);

    let config = Config::load();
    let session = load_session(&args.files)?;
    let transport = Arc::new(OscTransport::connect(config.engine_addr(), config.osc_addresses())?);
    let (_listener, completions) = CompletionListener::spawn(config.completion_settings())?;

    if args.simultaneous {
        let mut player = MultiChannelPlayer::new(transport, config.stop_policy());
        run_simultaneous(&mut player, &session, &completions, args.run_for)
    } else {
        let mut options = config.sequence_options();
        options.sequence_loop |= args.sequence_loop;
        let mut player = SequencePlayer::new(transport, options);
        run_sequence(&mut player, &session, &completions)
    }
}

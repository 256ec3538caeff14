//! melodious: an ear-training looper.
//!
//! Usage:
//!   melodious                       live session on the default output
//!   melodious --midi [filter]       live session with a MIDI keyboard
//!   melodious --idle                start parked on the rhythm track
//!   melodious --loops 6             stop after six loops
//!   melodious --wav out.wav         render loops offline to a WAV file

use mel_master::{
    connect_midi, list_midi_ports, render_loops, samples_to_wav, Controller, ControllerError, LooperConfig,
    MidiConnection,
};
use std::io::Write;
use std::time::Duration;
use std::{env, fs};
use tracing_subscriber::EnvFilter;

/// Loops rendered by `--wav` when `--loops` is not given.
const DEFAULT_WAV_LOOPS: usize = 4;

struct Options {
    wav: Option<String>,
    loops: Option<usize>,
    midi: Option<Option<String>>,
    idle: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        wav: None,
        loops: None,
        midi: None,
        idle: false,
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--wav" => {
                i += 1;
                let path = args.get(i).ok_or("--wav needs a path")?;
                options.wav = Some(path.clone());
            }
            "--loops" => {
                i += 1;
                let n = args
                    .get(i)
                    .and_then(|n| n.parse().ok())
                    .ok_or("--loops needs a number")?;
                options.loops = Some(n);
            }
            "--midi" => {
                let filter = args.get(i + 1).filter(|a| !a.starts_with("--")).cloned();
                if filter.is_some() {
                    i += 1;
                }
                options.midi = Some(filter);
            }
            "--idle" => options.idle = true,
            other => return Err(format!("unknown argument {other:?}")),
        }
        i += 1;
    }
    Ok(options)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("{e}");
        eprintln!("Usage: melodious [--wav out.wav] [--loops n] [--midi [filter]] [--idle]");
        std::process::exit(2);
    });

    let result = match &options.wav {
        Some(path) => render_to_wav(path, options.loops.unwrap_or(DEFAULT_WAV_LOOPS)),
        None => play_live(&options),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn play_live(options: &Options) -> Result<(), ControllerError> {
    let mut ctrl = Controller::default();
    ctrl.play()?;

    // Held for the whole session; dropping it closes the port.
    let _midi = match &options.midi {
        Some(filter) => match ctrl.take_live_input() {
            Some(live) => Some(open_midi(filter.as_deref(), live)?),
            None => None,
        },
        None => None,
    };
    if options.idle {
        ctrl.set_idle(true)?;
    }

    println!("Playing... (Ctrl+C to quit)");
    while ctrl.is_playing() {
        for score in ctrl.drain_scores() {
            println!("\rScore: {score}                ");
        }
        if let Some(snap) = ctrl.snapshot() {
            print!("\r{:<9} | {:>3.0}% | Loop {}", snap.phase, snap.position * 100.0, snap.loops_completed + 1);
            let _ = std::io::stdout().flush();
            if options.loops.is_some_and(|n| snap.loops_completed >= n as u64) {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.stop();
    println!("\rDone.                          ");
    Ok(())
}

fn open_midi(filter: Option<&str>, live: mel_master::LiveInput) -> Result<MidiConnection, ControllerError> {
    match connect_midi(filter, live) {
        Ok(connection) => {
            println!("MIDI input: {}", connection.port_name());
            Ok(connection)
        }
        Err(e) => {
            let ports = list_midi_ports().unwrap_or_default();
            if ports.is_empty() {
                eprintln!("No MIDI inputs found.");
            } else {
                eprintln!("Available MIDI inputs:");
                for port in &ports {
                    eprintln!("  {port}");
                }
            }
            Err(e)
        }
    }
}

fn render_to_wav(path: &str, loops: usize) -> Result<(), ControllerError> {
    let config = LooperConfig::default();
    println!("Rendering {} loops to {} at {} Hz...", loops, path, config.sample_rate);

    let rendered = render_loops(config, loops, None)?;
    let wav = samples_to_wav(&rendered.samples, 1, rendered.sample_rate)?;
    fs::write(path, &wav)?;

    println!("Wrote {} bytes", wav.len());
    Ok(())
}

//! semshutter CLI
//!
//! Usage:
//!   semshutter --interactive                 # Type samples, watch the loop decide
//!   semshutter --replay trace.jsonl          # Replay a recorded trace
//!   semshutter --serve                       # HTTP + WebSocket session host
//!   semshutter --replay trace.txt --json     # JSON lines output

use clap::Parser;
use colored::Colorize;
use log::debug;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use semshutter::config::ShutterConfig;
use semshutter::core::{fuse_with, run_server, CaptureDecisionLoop, SampleParser, TraceSource};
use semshutter::types::{LoopEvent, ScoreSample, ValidationMode};
use semshutter::{ShutterError, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "semshutter",
    version = VERSION,
    about = "Semantic shutter - decide when a camera frame is worth capturing",
    long_about = "semshutter fuses three perception scores (object confidence, hand-object\n\
                  interaction, text-image similarity) into one confidence, requires it to\n\
                  stay high and steady, and fires the shutter.\n\n\
                  Modes:\n  \
                  --interactive  Type samples line by line (default)\n  \
                  --replay FILE  Replay a recorded trace (JSON lines or text)\n  \
                  --serve        HTTP + WebSocket session host\n\n\
                  Sample lines:\n  \
                  obj=0.92 hand=0.10 text=0.81 [label=\"coffee cup\"]\n  \
                  0.92 0.10 0.81\n\n\
                  Interactive commands: reset, mode <strict|standard|lenient>, quit"
)]
struct Args {
    /// Replay a recorded trace file
    #[arg(short, long, value_name = "FILE")]
    replay: Option<String>,

    /// Spacing of untimed trace frames in milliseconds
    #[arg(long, default_value_t = 33)]
    interval_ms: u64,

    /// Interactive mode - read samples from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run the session host
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Validation mode (overrides the config file)
    #[arg(short, long)]
    mode: Option<ValidationMode>,

    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Output as JSON lines
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show per-signal breakdown
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.no_color {
        colored::control::set_override(false);
    }

    let result = match load_config(&args) {
        Ok(config) => run(&args, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: ShutterConfig) -> Result<(), ShutterError> {
    if args.serve {
        run_serve(args, config).await;
        Ok(())
    } else if let Some(ref path) = args.replay {
        run_replay(path, args, &config)
    } else {
        // Interactive is also the default
        run_interactive(args, &config)
    }
}

fn load_config(args: &Args) -> Result<ShutterConfig, ShutterError> {
    let mut config = match args.config {
        Some(ref path) => ShutterConfig::load(path)?,
        None => ShutterConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    debug!("config: mode={} policy={:?}", config.mode, config.capture.trigger_policy);
    Ok(config)
}

/// Replay a recorded trace
fn run_replay(path: &str, args: &Args, config: &ShutterConfig) -> Result<(), ShutterError> {
    let file = File::open(path)?;
    let mut source = TraceSource::new(BufReader::new(file));
    let mut capture = CaptureDecisionLoop::with_config(config.mode, config.loop_config());

    // Print as frames arrive so a bad line later on keeps the output before it
    let mut captures = 0;
    let frames = capture.replay_each(
        &mut source,
        Instant::now(),
        Duration::from_millis(args.interval_ms),
        |event| {
            if event.triggered {
                captures += 1;
            }
            print_event(&event, None, args, config)
        },
    )?;

    if !args.json {
        println!();
        println!(
            "Replayed {} frames from {}: {} capture(s), verified={}",
            frames,
            path,
            captures,
            capture.is_verified()
        );
    }
    Ok(())
}

/// Read samples from stdin, one per line
fn run_interactive(args: &Args, config: &ShutterConfig) -> Result<(), ShutterError> {
    let parser = SampleParser::new();
    let mut capture = CaptureDecisionLoop::with_config(config.mode, config.loop_config());

    print_header(capture.mode());
    println!("Enter samples as `obj=.. hand=.. text=..` or three numbers.");
    println!("Commands: reset, mode <strict|standard|lenient>, quit");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line_no = 0;

    loop {
        print!("[{}] > ", capture.mode());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            println!("\nSession ended. Frames: {}", capture.frame_count());
            break;
        }
        if line.eq_ignore_ascii_case("reset") {
            capture.reset_cycle();
            println!("{}", "cycle reset".cyan());
            continue;
        }
        if let Some(rest) = line.strip_prefix("mode ") {
            match rest.parse::<ValidationMode>() {
                Ok(mode) => {
                    capture.set_mode(mode);
                    println!("{}", format!("mode -> {}", mode).cyan());
                }
                Err(e) => eprintln!("{}", e.to_string().yellow()),
            }
            continue;
        }

        // Bad lines are reported, the session keeps going
        let sample = match parser.parse(line) {
            Ok(sample) => sample,
            Err(e) => {
                eprintln!("{}", e.at_line(line_no).to_string().yellow());
                continue;
            }
        };

        let event = capture.on_frame(&sample);
        print_event(&event, Some(&sample), args, config)?;
    }
    Ok(())
}

/// Print one event in the selected format
fn print_event(
    event: &LoopEvent,
    sample: Option<&ScoreSample>,
    args: &Args,
    config: &ShutterConfig,
) -> Result<(), ShutterError> {
    if args.json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    if args.no_color {
        println!("{}", event.to_parseable_string());
    } else {
        println!("{}", event.to_terminal_string());
    }

    if args.verbose {
        if let Some(sample) = sample {
            print_breakdown(sample, event, config);
        }
    }
    if event.almost_there {
        println!("{}", "  almost there".yellow());
    }
    Ok(())
}

/// Per-signal breakdown for one frame
fn print_breakdown(sample: &ScoreSample, event: &LoopEvent, config: &ShutterConfig) {
    let fusion = fuse_with(sample, event.mode, &config.fusion);
    println!(
        "  ┌ object={:.3} hand={:.3} text={:.3}",
        sample.object_confidence, sample.hand_object_iou, sample.text_image_similarity
    );
    if let Some(ref label) = sample.semantic_label {
        println!("  │ label: {}", label);
    }
    println!(
        "  │ {} fused={:.4} threshold={:.2}{}",
        event.mode,
        fusion.fused,
        fusion.threshold,
        if fusion.fallback_applied { " (hand-free fallback)" } else { "" }
    );
    println!(
        "  └ {} | detected {:.1}s | timer {}",
        event.reason,
        event.detection_elapsed_ms as f64 / 1000.0,
        if event.auto_capture_armed { "armed" } else { "disarmed" }
    );
}

fn print_header(mode: ValidationMode) {
    println!("{}", "========================================".bold());
    println!("{}", format!("  semshutter v{} - {}", VERSION, mode.settings_label()).bold());
    println!("{}", "========================================".bold());
    println!();
}

/// Run the session host
async fn run_serve(args: &Args, config: ShutterConfig) {
    println!();
    println!("semshutter v{} - session host (default mode {})", VERSION, config.mode);
    println!();

    if let Err(e) = run_server(&args.addr, config).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

//! `ergoreach-cli` – ErgoReach Command Line Interface
//!
//! This binary drives the ErgoReach engine from recordings.  It:
//!
//! 1. Checks for `~/.ergoreach/config.toml`; runs a **First-Run Wizard** when
//!    the file is absent.
//! 2. Drops the user into an **interactive REPL** with slash-commands
//!    (`/load`, `/run`, `/calibrate`, `/status`, `/help`, …).
//! 3. Intercepts **Ctrl-C** to stop playback and exit safely.
//!
//! `ergoreach replay <file>` skips all of the above and prints one JSON
//! `TickOutput` per recorded frame on stdout.

mod config;
mod repl;

use colored::Colorize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use ergoreach_runtime::{ReplayProvider, Session, init_tracing};

fn main() -> ExitCode {
    // Logs go to stderr; set ERGOREACH_LOG_FORMAT=json for JSON lines.
    let _tracing = init_tracing("ergoreach");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [cmd, file] if cmd == "replay" => replay(file),
        [] => {
            interactive();
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("usage: ergoreach [replay <file>]");
            ExitCode::from(2)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Non-interactive replay
// ─────────────────────────────────────────────────────────────────────────────

fn replay(file: &str) -> ExitCode {
    let (cfg, err) = config::load_or_default();
    if let Some(e) = err {
        warn!(error = %e, "config unreadable; using defaults");
    }

    let mut provider = match ReplayProvider::open(cfg.resolve_recording(file)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {}", "Replay failed".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let mut session = match Session::new(cfg.session) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "Invalid session settings".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    while !shutdown.load(Ordering::SeqCst) {
        let Some(tick) = session.step(&mut provider) else {
            break;
        };
        let line = match serde_json::to_string(&tick) {
            Ok(line) => line,
            Err(e) => {
                eprintln!("{}: {}", "Serialization failed".red(), e);
                return ExitCode::FAILURE;
            }
        };
        // A closed pipe ends the replay quietly.
        if writeln!(out, "{line}").is_err() {
            break;
        }
    }
    info!(ticks = session.tick_count(), "replay finished");
    ExitCode::SUCCESS
}

// ─────────────────────────────────────────────────────────────────────────────
// Interactive mode
// ─────────────────────────────────────────────────────────────────────────────

fn interactive() {
    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        println!("{}", "  ✓ Exiting ErgoReach.".green());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── First-Run Wizard ──────────────────────────────────────────────────
    match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(_)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
        }
    }
    let (cfg, _) = config::load_or_default();

    println!();
    println!(
        "  Joint source {}, reach scale {}, preset {}",
        cfg.session.joint_source.to_string().yellow(),
        cfg.session.reach_radius_scale.to_string().yellow(),
        cfg.session.default_preset.to_string().yellow()
    );
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(shutdown, cfg);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║     ErgoReach First-Run Wizard       ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up ErgoReach.\n");

    let mut cfg = config::Config::default();

    println!("  Where do joint poses come from?");
    println!("    1) Inverse-kinematics body model  (default)");
    println!("    2) Skeletal tracking (positions only)");
    let choice = prompt_line("  Enter choice [1]: ", "1");
    cfg.session.joint_source = match choice.trim() {
        "2" => ergoreach_types::JointSource::Skeletal,
        _ => ergoreach_types::JointSource::InverseKinematics,
    };

    let scale = prompt_line(
        &format!("  Reach radius scale [{}]: ", cfg.session.reach_radius_scale),
        &cfg.session.reach_radius_scale.to_string(),
    );
    match scale.trim().parse::<f32>() {
        Ok(s) if s > 0.0 && s.is_finite() => cfg.session.reach_radius_scale = s,
        _ => println!("  {} keeping {}", "Invalid scale;".yellow(), cfg.session.reach_radius_scale),
    }

    cfg.recording_dir = prompt_line(
        &format!("  Recording directory [{}]: ", cfg.recording_dir),
        &cfg.recording_dir,
    );

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ____                 ___                 __  "#.bold().cyan());
    println!("{}", r#"  / __/__ ___ ____    / _ \___ ___ _______/ /  "#.bold().cyan());
    println!("{}", r#" / _// __/ _ `/ _ \  / , _/ -_) _ `/ __/ _ \   "#.bold().cyan());
    println!("{}", r#"/___/_/  \_, /\___/ /_/|_|\__/\_,_/\__/_//_/   "#.bold().cyan());
    println!("{}", r#"        /___/                                   "#.bold().cyan());
    println!();
    println!("  {} {}",
        "ErgoReach".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Hand amplification and RULA posture scoring");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::BufRead;
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}

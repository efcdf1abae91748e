//! REPL – Read-Eval-Print Loop for the ErgoReach interactive shell.
//!
//! Supported slash-commands:
//!   /load <file>                 – load a JSON-lines recording
//!   /run [n]                     – play `n` frames (default: the rest)
//!   /calibrate <left|right>      – start calibration for one hand
//!   /confirm <left|right>        – confirm the current calibration step
//!   /preset <n>                  – select a curve preset
//!   /shift <index> <delta>       – nudge a control point's input
//!   /set <index> <input> <output> – move a control point
//!   /intensity <amount>          – re-shape the active curve
//!   /status                      – calibration, curve and RULA summary
//!   /curve                       – print the active curve
//!   /schema                      – print the recording line JSON Schema
//!   /settings                    – interactively edit `~/.ergoreach/config.toml`
//!   /quit | /exit                – gracefully exit the CLI
//!
//! Calibration and curve commands are applied by re-ticking the most recent
//! frame, so `/confirm` uses the pose the operator is currently holding.

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ergoreach_amplify::{AmplificationOutcome, Extrapolation, ResponseCurve};
use ergoreach_perception::PoseSnapshot;
use ergoreach_runtime::provider::recorded_frame_schema;
use ergoreach_runtime::{PoseProvider, ReplayProvider, Session, TickOutput};
use ergoreach_types::{CalibrationStatus, Command, ErgoError, JointSource, Side};
use tracing::{info, warn};

use crate::config::{self, Config};

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Help,
    Load(String),
    Run(Option<usize>),
    /// A command forwarded to the session on the current frame.
    Session(Command),
    Status,
    Curve,
    Schema,
    Settings,
    Quit,
}

/// Parse one line of input.  Returns `Ok(None)` for blank lines.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let cmd = match head {
        "/help" => ShellCommand::Help,
        "/load" => match args.as_slice() {
            [path] => ShellCommand::Load((*path).to_string()),
            _ => return Err("usage: /load <file>".to_string()),
        },
        "/run" => match args.as_slice() {
            [] => ShellCommand::Run(None),
            [n] => ShellCommand::Run(Some(parse_arg(n, "frame count")?)),
            _ => return Err("usage: /run [n]".to_string()),
        },
        "/calibrate" => ShellCommand::Session(Command::BeginCalibration(side_arg(&args)?)),
        "/confirm" => ShellCommand::Session(Command::ConfirmCalibrationStep(side_arg(&args)?)),
        "/preset" => match args.as_slice() {
            [n] => ShellCommand::Session(Command::SelectPreset(parse_arg(n, "preset")?)),
            _ => return Err("usage: /preset <n>".to_string()),
        },
        "/shift" => match args.as_slice() {
            [index, delta] => ShellCommand::Session(Command::ShiftControlPoint {
                index: parse_arg(index, "index")?,
                delta: parse_arg(delta, "delta")?,
            }),
            _ => return Err("usage: /shift <index> <delta>".to_string()),
        },
        "/set" => match args.as_slice() {
            [index, input, output] => ShellCommand::Session(Command::SetControlPoint {
                index: parse_arg(index, "index")?,
                input: parse_arg(input, "input")?,
                output: parse_arg(output, "output")?,
            }),
            _ => return Err("usage: /set <index> <input> <output>".to_string()),
        },
        "/intensity" => match args.as_slice() {
            [amount] => ShellCommand::Session(Command::SetCurveIntensity(parse_arg(amount, "amount")?)),
            _ => return Err("usage: /intensity <amount>".to_string()),
        },
        "/status" => ShellCommand::Status,
        "/curve" => ShellCommand::Curve,
        "/schema" => ShellCommand::Schema,
        "/settings" => ShellCommand::Settings,
        "/quit" | "/exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(cmd))
}

fn parse_arg<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a valid {what}"))
}

fn side_arg(args: &[&str]) -> Result<Side, String> {
    match args {
        [side] => side.parse().map_err(|e: ErgoError| e.to_string()),
        _ => Err("expected a hand: left or right".to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatting
// ─────────────────────────────────────────────────────────────────────────────

fn score(value: Option<i32>) -> String {
    match value {
        Some(v) if v >= 0 => v.to_string(),
        Some(_) => "invalid".to_string(),
        None => "-".to_string(),
    }
}

fn status_label(status: CalibrationStatus) -> &'static str {
    match status {
        CalibrationStatus::Inactive => "inactive",
        CalibrationStatus::CalibrateComfort => "calibrate comfort",
        CalibrationStatus::CalibrateMax => "calibrate max",
        CalibrationStatus::Active => "active",
    }
}

/// One-line plain-text digest of a tick.
pub fn summarize(out: &TickOutput) -> String {
    let tracking = if out.tracking_valid {
        "tracking"
    } else if out.stale {
        "stale"
    } else {
        "no pose"
    };
    let hand = |side: Side| {
        let h = out.hand(side);
        let amp = match &h.amplification {
            Some(a) => match (&a.outcome, a.percent_reach) {
                (AmplificationOutcome::Amplified, Some(p)) => format!(" {:.0}%", p * 100.0),
                (AmplificationOutcome::Amplified, None) => " amplified".to_string(),
                (AmplificationOutcome::Passthrough(_), _) => String::new(),
            },
            None => String::new(),
        };
        format!("{side}={}{amp}", status_label(h.status))
    };
    format!(
        "#{} {} | {} {} | RULA L={} R={} trunk/neck={}",
        out.tick,
        tracking,
        hand(Side::Left),
        hand(Side::Right),
        score(out.left_rula),
        score(out.right_rula),
        score(out.lower_rula),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Shell state
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the interactive shell holds between lines.
pub struct Shell {
    config: Config,
    session: Session,
    recording: Option<ReplayProvider>,
    last_snapshot: PoseSnapshot,
}

impl Shell {
    pub fn new(config: Config) -> Result<Self, ErgoError> {
        let session = Session::new(config.session.clone())?;
        info!(session = %session.id(), "shell session started");
        Ok(Self {
            config,
            session,
            recording: None,
            last_snapshot: PoseSnapshot::default(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Load a recording, resolving relative paths against `recording_dir`.
    pub fn load(&mut self, path: &str) -> Result<usize, ErgoError> {
        let resolved = self.config.resolve_recording(path);
        let provider = ReplayProvider::open(&resolved)?;
        let frames = provider.remaining();
        self.recording = Some(provider);
        Ok(frames)
    }

    /// Play up to `limit` frames of the loaded recording.
    pub fn run(&mut self, limit: Option<usize>, shutdown: &AtomicBool) -> Result<Vec<TickOutput>, String> {
        let Some(recording) = self.recording.as_mut() else {
            return Err("no recording loaded; use /load <file>".to_string());
        };
        let mut outputs = Vec::new();
        while limit.is_none_or(|n| outputs.len() < n) && !shutdown.load(Ordering::SeqCst) {
            let Some(snapshot) = recording.next_snapshot() else {
                break;
            };
            let commands = recording.take_commands();
            outputs.push(self.session.tick(&snapshot, &commands));
            self.last_snapshot = snapshot;
        }
        Ok(outputs)
    }

    /// Apply one command against the most recent frame.
    pub fn apply(&mut self, command: Command) -> TickOutput {
        self.session.tick(&self.last_snapshot, &[command])
    }

    /// Swap in a new configuration.  The session restarts.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), ErgoError> {
        self.session = Session::new(config.session.clone())?;
        self.config = config;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>, config: Config) {
    let mut shell = match Shell::new(config) {
        Ok(shell) => shell,
        Err(e) => {
            println!("{}: {}", "Invalid session settings".red(), e);
            println!("  Fix them with {} after restarting with defaults.", "/settings".bold());
            match Shell::new(Config::default()) {
                Ok(shell) => shell,
                Err(e) => {
                    eprintln!("{}: {}", "Cannot start session".red(), e);
                    return;
                }
            }
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "ergoreach>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = match parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {}. Type {} for available commands.", "Error:".red(), e, "/help".bold());
                continue;
            }
        };

        match cmd {
            ShellCommand::Help => cmd_help(),
            ShellCommand::Load(path) => cmd_load(&mut shell, &path),
            ShellCommand::Run(limit) => cmd_run(&mut shell, limit, &shutdown),
            ShellCommand::Session(command) => cmd_session(&mut shell, command),
            ShellCommand::Status => cmd_status(&shell),
            ShellCommand::Curve => cmd_curve(&shell),
            ShellCommand::Schema => cmd_schema(),
            ShellCommand::Settings => cmd_settings(&mut shell),
            ShellCommand::Quit => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "ErgoReach Commands".bold().underline());
    println!("  {}            – load a JSON-lines recording", "/load <file>".bold().cyan());
    println!("  {}                 – play n frames (default: all)", "/run [n]".bold().cyan());
    println!("  {}  – start calibrating a hand", "/calibrate <side>".bold().cyan());
    println!("  {}    – confirm the current calibration step", "/confirm <side>".bold().cyan());
    println!("  {}             – select a curve preset", "/preset <n>".bold().cyan());
    println!("  {}     – nudge a control point", "/shift <i> <delta>".bold().cyan());
    println!("  {}    – move a control point", "/set <i> <in> <out>".bold().cyan());
    println!("  {}      – re-shape the active curve", "/intensity <amt>".bold().cyan());
    println!("  {}                  – calibration, curve and RULA summary", "/status".bold().cyan());
    println!("  {}                   – print the active curve", "/curve".bold().cyan());
    println!("  {}                  – JSON Schema of one recording line", "/schema".bold().cyan());
    println!("  {}                – edit ~/.ergoreach/config.toml", "/settings".bold().cyan());
    println!("  {}            – exit the CLI", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_load(shell: &mut Shell, path: &str) {
    match shell.load(path) {
        Ok(frames) => println!("{} {} frame(s) from {}", "✓ Loaded".green(), frames, path.bold()),
        Err(e) => println!("{}: {}", "Load failed".red(), e),
    }
}

fn cmd_run(shell: &mut Shell, limit: Option<usize>, shutdown: &AtomicBool) {
    match shell.run(limit, shutdown) {
        Ok(outputs) if outputs.is_empty() => println!("{}", "Recording finished.".yellow()),
        Ok(outputs) => {
            for out in &outputs {
                print_tick(out);
            }
        }
        Err(e) => println!("{} {}", "Error:".red(), e),
    }
}

fn cmd_session(shell: &mut Shell, command: Command) {
    let out = shell.apply(command);
    if out.command_errors.is_empty() {
        print_tick(&out);
    } else {
        for e in &out.command_errors {
            println!("{} {}", "Rejected:".red(), e);
        }
    }
}

fn cmd_status(shell: &Shell) {
    let session = shell.session();
    println!("{}", "Session".bold().underline());
    println!("  id     : {}", session.id().to_string().dimmed());
    println!("  ticks  : {}", session.tick_count());
    for side in Side::BOTH {
        let cal = session.calibration(side);
        println!(
            "  {:<6} : {} ({})",
            side.to_string(),
            status_label(cal.status()).yellow(),
            cal.prompt().replace('\n', " ").dimmed()
        );
        if let Some((_, boundary)) = cal.calibration() {
            println!("           reach radius {:.3} m", boundary.radius());
        }
    }
    println!(
        "  preset : {} of {}",
        session.curves().active_preset(),
        session.curves().len()
    );
    match session.last_assessment() {
        Some(a) => println!(
            "  RULA   : left {}  right {}  trunk/neck {}",
            score(Some(a.left.score)),
            score(Some(a.right.score)),
            score(Some(a.lower.score))
        ),
        None => println!("  RULA   : {}", "no pose scored yet".dimmed()),
    }
}

fn cmd_curve(shell: &Shell) {
    let bank = shell.session().curves();
    let curve = bank.active();
    println!(
        "{} {} ({:?} extrapolation)",
        "Preset".bold().underline(),
        bank.active_preset(),
        curve.extrapolation()
    );
    for (i, key) in curve.keys().iter().enumerate() {
        println!(
            "  [{}] in {:>6.3}  out {:>6.3}  tangents {:>6.3}/{:<6.3} {:?}",
            i, key.input, key.output, key.in_tangent, key.out_tangent, key.mode
        );
    }
    let samples: Vec<String> = (0..=10)
        .map(|i| {
            let x = i as f32 / 10.0;
            format!("{:.2}", bank.evaluate(x))
        })
        .collect();
    println!("  f(0.0..=1.0) = {}", samples.join(" ").dimmed());
}

fn cmd_schema() {
    match serde_json::to_string_pretty(&recorded_frame_schema()) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("{}: {}", "Schema error".red(), e),
    }
}

fn cmd_settings(shell: &mut Shell) {
    let (mut cfg, err) = config::load_or_default();
    if let Some(e) = err {
        println!("{}: {} – using defaults", "Config error".red(), e);
    }

    println!("{}", "Settings Editor".bold().underline());
    let source = prompt_str(
        &format!("  Joint source (inverse_kinematics / skeletal / none) [{}]: ", cfg.session.joint_source),
        &cfg.session.joint_source.to_string(),
    );
    match source.parse::<JointSource>() {
        Ok(s) => cfg.session.joint_source = s,
        Err(e) => println!("  {} {}, keeping {}", "Warning:".yellow(), e, cfg.session.joint_source),
    }

    cfg.session.controller_angle_offset_deg = prompt_f32(
        "  Controller angle offset (deg)",
        cfg.session.controller_angle_offset_deg,
    );
    cfg.session.reach_radius_scale = prompt_f32("  Reach radius scale", cfg.session.reach_radius_scale);

    let preset = prompt_str(
        &format!("  Default preset [{}]: ", cfg.session.default_preset),
        &cfg.session.default_preset.to_string(),
    );
    if let Ok(p) = preset.parse::<usize>() {
        cfg.session.default_preset = p;
    }

    let current = match cfg.session.extrapolation {
        Extrapolation::Clamp => "clamp",
        Extrapolation::Linear => "linear",
    };
    let extrapolation = prompt_str(&format!("  Extrapolation (clamp / linear) [{current}]: "), current);
    cfg.session.extrapolation = match extrapolation.to_lowercase().as_str() {
        "linear" => Extrapolation::Linear,
        _ => Extrapolation::Clamp,
    };

    cfg.recording_dir = prompt_str(
        &format!("  Recording directory [{}]: ", cfg.recording_dir),
        &cfg.recording_dir,
    );

    if let Err(e) = shell.reconfigure(cfg.clone()) {
        println!("{}: {} – settings not saved", "Invalid settings".red(), e);
        return;
    }
    match config::save(&cfg) {
        Ok(()) => println!(
            "{} {}",
            "✓ Settings saved to".green(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => {
            warn!(error = %e, "failed to save settings");
            println!("{}: {}", "Error saving config".red(), e);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_tick(out: &TickOutput) {
    let line = summarize(out);
    if out.tracking_valid {
        println!("  {}", line);
    } else {
        println!("  {}", line.dimmed());
    }
    for e in &out.command_errors {
        println!("    {} {}", "Rejected:".red(), e);
    }
}

/// Prompt for an f32 value.  Returns `default` when the user presses Enter.
fn prompt_f32(label: &str, default: f32) -> f32 {
    let raw = prompt_str(&format!("{label} [{default}]: "), &default.to_string());
    match raw.parse::<f32>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            println!(
                "  {} '{}' is not a valid number, keeping {}",
                "Warning:".yellow(),
                raw,
                default
            );
            default
        }
    }
}

/// Prompt for a string value.  Returns `default` when the user presses Enter.
fn prompt_str(msg: &str, default: &str) -> String {
    print!("{}", msg);
    io::stdout().flush().ok();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed
            }
        }
        Err(_) => default.to_string(),
    }
}

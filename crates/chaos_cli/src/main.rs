use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chaos_control::{AutopilotController, DecisionSource, PressStyle};
use chaos_core::PowerChange;
use chaos_world::{load_content, Session};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "chaos_cli", about = "Political chaos simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Let the autopilot govern for a fixed number of days.
    Run {
        #[arg(long)]
        days: u32,
        /// RNG seed. Random when omitted.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 1)]
        print_every: u32,
        /// Print every state change as a JSON line.
        #[arg(long)]
        events: bool,
    },
    /// Play interactively; commands are read from stdin.
    Play {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
    },
}

// ---------------------------------------------------------------------------
// Autopilot run
// ---------------------------------------------------------------------------

fn run(days: u32, seed: Option<u64>, content_dir: &str, print_every: u32, events: bool) -> Result<()> {
    let content = load_content(content_dir)?;
    let seed = seed.unwrap_or_else(rand::random);
    let mut session = Session::new(content, seed)?;

    if events {
        session.state.on_change(|event| {
            println!("{}", serde_json::to_string(event)?);
            Ok(())
        });
    }

    println!(
        "Starting session {}: days={days} seed={seed} content_version={}",
        session.id, session.content.content_version,
    );
    println!("{}", "-".repeat(80));

    let mut autopilot = AutopilotController;
    let print_every = print_every.max(1);
    for _ in 0..days {
        let crisis = session.next_crisis().clone();
        match autopilot.choose(&session.state.snapshot(), &crisis, &session.content) {
            Some(choice) => {
                if let Err(err) = session.decide(choice) {
                    tracing::warn!("decision skipped: {err:#}");
                }
            }
            None => tracing::info!(crisis = %crisis.id, "autopilot let the crisis pass"),
        }
        session.end_day()?;

        if session.state.day() % print_every == 0 {
            print_status(&session);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state on day {}:", session.state.day());
    print_status(&session);
    println!("{}", session.coalition());
    Ok(())
}

fn print_status(session: &Session) {
    let snap = session.state.snapshot();
    let power = snap
        .power
        .iter()
        .map(|(id, value)| format!("{id}={value:.0}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "[day={day:03}]  energy={energy:5.1}  chaos={chaos:5.1}  score={score:6.0}  {power}",
        day = snap.day,
        energy = snap.energy,
        chaos = snap.chaos,
        score = snap.score,
    );
}

// ---------------------------------------------------------------------------
// Interactive play
// ---------------------------------------------------------------------------

const HELP: &str = "commands: status | crisis | decide <n> | tweet <text> | press <attack|deflect|answer|joke> | ignore | next | history | quit";

fn print_changes(changes: &[PowerChange]) {
    for change in changes {
        println!(
            "  {:<12} {:5.1} -> {:5.1} ({:+.1}) {}",
            change.id.as_str(),
            change.old_value,
            change.new_value,
            change.change,
            change.reason,
        );
    }
}

fn print_crisis(session: &Session) {
    let Some(crisis) = &session.current_crisis else {
        println!("No open crisis. Type `crisis` to open one.");
        return;
    };
    println!("{} [{}]", crisis.title, crisis.id);
    println!("{}", crisis.description);
    for (i, option) in crisis.options.iter().enumerate() {
        println!(
            "  {i}) {:<20} chaos {:+.0}  energy -{:.0}",
            option.label, option.chaos, option.energy_cost
        );
    }
}

/// Executes one command line. Returns `false` when the player quits.
fn handle_command(session: &mut Session, line: &str) -> Result<bool> {
    let (command, arg) = line
        .trim()
        .split_once(' ')
        .map_or((line.trim(), ""), |(c, a)| (c, a.trim()));
    match command {
        "" => {}
        "status" => {
            print_status(session);
            println!("{}", session.coalition());
        }
        "crisis" => {
            if session.current_crisis.is_none() {
                session.next_crisis();
            }
            print_crisis(session);
        }
        "decide" => {
            let choice: usize = arg
                .parse()
                .with_context(|| format!("expected an option number, got {arg:?}"))?;
            let outcome = session.decide(choice)?;
            print_changes(&outcome.primary.power_changes);
            print_changes(&outcome.cascades);
        }
        "tweet" => {
            let (tweet, outcome) = session.send_tweet(arg)?;
            println!("Tweet sent! Chaos +{:.0}", tweet.chaos);
            print_changes(&outcome.primary.power_changes);
            print_changes(&outcome.cascades);
        }
        "press" => {
            let style: PressStyle = arg.parse()?;
            let outcome = session.hold_press(style)?;
            println!("You {style} the question!");
            print_changes(&outcome.primary.power_changes);
        }
        "ignore" => {
            session.ignore_news()?;
            println!("Breaking news ignored - media trust drops");
        }
        "next" => {
            let report = session.end_day()?;
            println!("Day {} begins.", report.day);
            if let Some(drift) = report.drift {
                print_changes(&[drift]);
            }
        }
        "history" => {
            let history = session.state.power_history();
            for record in history.iter().rev().take(10).rev() {
                print!("  day {:<3}", record.day);
                print_changes(std::slice::from_ref(&record.change));
            }
        }
        "help" => println!("{HELP}"),
        "quit" | "exit" => return Ok(false),
        other => println!("unknown command {other:?}; {HELP}"),
    }
    Ok(true)
}

fn play(seed: Option<u64>, content_dir: &str) -> Result<()> {
    let content = load_content(content_dir)?;
    let seed = seed.unwrap_or_else(rand::random);
    let mut session = Session::new(content, seed)?;
    println!("Session {} (seed {seed}). {HELP}", session.id);
    print_status(&session);

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        match handle_command(&mut session, &line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => println!("error: {err:#}"),
        }
        stdout.flush().context("flushing stdout")?;
    }

    println!("Final state:");
    print_status(&session);
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            days,
            seed,
            content_dir,
            print_every,
            events,
        } => run(days, seed, &content_dir, print_every, events)?,
        Commands::Play { seed, content_dir } => play(seed, &content_dir)?,
    }
    Ok(())
}

mod render;
mod session;

use std::env;
use std::io::Write;
use std::time::Duration;

use contracts::TrainerConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{fmt, EnvFilter};
use trainer_api::{config_from_env, TrainerApp};
use trainer_core::{EventLog, ReviewView};

use session::{Flow, Session};

fn print_usage() {
    println!("trainer-cli <command>");
    println!("commands:");
    println!("  run");
    println!("    interactive trainer (default); type `help` inside for keys");
    println!("  scenarios");
    println!("  review");
    println!("    print the event log of this storage area");
    println!("  clear-log");
    println!("  config");
    println!("environment:");
    println!("  SECTRAIN_STORAGE_PATH  sqlite file (default sectrain_storage.sqlite)");
    println!("  SECTRAIN_CHANNEL       team channel name");
    println!("  SECTRAIN_ROLE          Leader|Instructor|Trainee|Comms");
    println!("  RUST_LOG               log filter, logs go to stderr");
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,trainer_cli=info,trainer_api=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn prompt(session: &Session) {
    print!("{}> ", session.active().mode());
    let _ = std::io::stdout().flush();
}

async fn run_interactive(config: TrainerConfig) -> std::io::Result<()> {
    let app = TrainerApp::from_config(config);
    if let Some(err) = app.storage_error() {
        eprintln!("warning: event log is not persisted: {err}");
    }
    let tick_ms = app.config().tick_interval_ms.max(1);
    let mut session = Session::new(app);

    println!("{}", session.render_active());
    prompt(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let (flow, output) = session.handle(&line);
                println!("{output}");
                if flow == Flow::Quit {
                    break;
                }
                prompt(&session);
            }
            _ = ticker.tick() => {
                if let Some(output) = session.tick() {
                    println!("\n{output}");
                    prompt(&session);
                }
            }
        }
    }

    if let Some(err) = session.app().last_log_error() {
        eprintln!("warning: last event log failure: {err}");
    }
    Ok(())
}

fn print_scenarios(app: &TrainerApp) {
    for scenario in app.catalog().scenarios() {
        println!(
            "{} [{}] steps={} tags={}",
            scenario.id,
            scenario.difficulty,
            scenario.step_count(),
            scenario.tags.join(",")
        );
    }
}

fn print_review(app: &TrainerApp) {
    let review = ReviewView::open(app.log());
    if review.is_empty() {
        println!("no events logged");
        return;
    }
    for entry in review.entries() {
        println!("{} {} {}", entry.when, entry.kind, entry.payload);
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);
    let config = config_from_env();

    match command {
        None | Some("run") => {
            if let Err(err) = run_interactive(config).await {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
        Some("scenarios") => print_scenarios(&TrainerApp::in_memory(config)),
        Some("review") => print_review(&TrainerApp::from_config(config)),
        Some("clear-log") => {
            let app = TrainerApp::from_config(config);
            app.log().clear();
            match app.last_log_error() {
                Some(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
                None => println!("event log cleared"),
            }
        }
        Some("config") => println!("{config}"),
        _ => {
            print_usage();
        }
    }
}

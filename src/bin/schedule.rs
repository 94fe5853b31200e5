use anyhow::Result;
use clap::{Parser, Subcommand};
use coverage_sync::history::{Mode, ScheduleStore};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

/// Inspect or adjust the import run counter
#[derive(Parser, Debug)]
struct Args {
    /// Run-count state file
    #[arg(long, env = "SCHEDULE_STATE_PATH", default_value = "schedule_state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show run count, last run and current cadence
    Status,
    /// Zero the run count
    Reset,
    /// Count one more run
    Increment,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .init();

    let args = Args::parse();
    let store = ScheduleStore::new(&args.state);

    match args.command {
        Command::Status => {
            let state = store.load()?;
            let last = state
                .last_run
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!("run count : {}", state.run_count);
            println!("last run  : {}", last);
            println!("mode      : {}", state.mode().as_str());
            match state.mode() {
                Mode::Daily => println!(
                    "{} more run(s) before switching to weekly",
                    state.daily_runs_left()
                ),
                Mode::Weekly => println!("running weekly"),
            }
        }
        Command::Reset => {
            store.reset()?;
            println!("state reset");
        }
        Command::Increment => {
            let state = store.increment()?;
            println!("run count now {}", state.run_count);
            if state.mode() == Mode::Weekly {
                println!("reached {} runs, weekly cadence suggested", state.run_count);
            }
        }
    }
    Ok(())
}

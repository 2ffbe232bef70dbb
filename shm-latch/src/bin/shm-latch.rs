use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use shm_latch::SharedLatch;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let LatchCommand { command } = LatchCommand::parse();

    let latch = match SharedLatch::with_file(command.path()) {
        Ok(latch) => latch,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Open { .. } => {
            latch.open();
            ExitCode::SUCCESS
        }
        Command::Status { .. } => {
            let opened = latch.is_opened();
            println!("{}", if opened { "opened" } else { "closed" });
            exit_with(opened)
        }
        Command::Wait {
            interval_ms,
            timeout_ms,
            ..
        } => {
            let interval = Duration::from_millis(interval_ms);
            let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));

            let opened = loop {
                if latch.is_opened() {
                    break true;
                }

                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    break false;
                }

                std::thread::sleep(interval);
            };

            tracing::debug!(opened, "finished waiting for latch");
            exit_with(opened)
        }
    }
}

/// Open, inspect or poll a file-backed latch.
#[derive(Parser)]
#[command(version)]
struct LatchCommand {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the latch. Creates the file if it does not exist.
    Open {
        #[arg(help = "The latch file")]
        path: PathBuf,
    },
    /// Print the state of the latch, exit with status 1 if it is closed.
    Status {
        #[arg(help = "The latch file")]
        path: PathBuf,
    },
    /// Poll until the latch is opened.
    ///
    /// Exits with status 1 if the timeout elapses before that.
    Wait {
        /// Time between two polls.
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
        /// Give up after this long. Waits forever by default.
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(help = "The latch file")]
        path: PathBuf,
    },
}

impl Command {
    fn path(&self) -> &Path {
        match self {
            Command::Open { path } | Command::Status { path } | Command::Wait { path, .. } => path.as_path(),
        }
    }
}

fn exit_with(opened: bool) -> ExitCode {
    if opened {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

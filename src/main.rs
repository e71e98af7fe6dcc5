/***************************************/
/*        3rd party libraries          */
/***************************************/
use clap::Parser;
use crossbeam_channel as cbc;
use log::{error, info, warn, LevelFilter};
use std::io::BufRead;
use std::path::PathBuf;
use std::thread::Builder;

/***************************************/
/*           Local modules             */
/***************************************/
mod building;
mod config;
mod coordinator;
mod elevator;
mod emergency;
mod scheduler;
mod shared;

use coordinator::{Command, Coordinator};
use shared::Event;

#[derive(Parser, Debug)]
#[clap(about = "Multi-elevator building simulator driven by commands on stdin")]
struct Args {
    /// Path to the TOML configuration
    #[clap(long, short, default_value = "config.toml")]
    config: PathBuf,

    /// Only log warnings and errors
    #[clap(long, short)]
    quiet: bool,
}

/* Main */
fn main() {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.quiet {
        logger.filter_level(LevelFilter::Warn);
    }
    logger.init();

    // Load the configuration
    let config = unwrap_or_exit!(
        config::load_config(&args.config),
        "Failed to load configuration"
    );

    // Initialize channels
    let (command_tx, command_rx) = cbc::unbounded::<Command>();

    let mut coordinator = Coordinator::new(config, command_rx);
    let event_rx = coordinator.subscribe();

    // Start the display
    let display_thread = Builder::new().name("display".into());
    unwrap_or_exit!(
        display_thread.spawn(move || display(event_rx)),
        "Failed to start display thread"
    );

    // Start the command reader
    let input_thread = Builder::new().name("input".into());
    unwrap_or_exit!(
        input_thread.spawn(move || read_commands(command_tx)),
        "Failed to start input thread"
    );

    // Start the coordinator
    let coordinator_thread = Builder::new().name("coordinator".into());
    let coordinator_handle = unwrap_or_exit!(
        coordinator_thread.spawn(move || coordinator.run()),
        "Failed to start coordinator thread"
    );

    if coordinator_handle.join().is_err() {
        error!("Coordinator thread panicked");
        std::process::exit(1);
    }
}

// Logs every event as one JSON line until the coordinator goes away
fn display(event_rx: cbc::Receiver<Event>) {
    for event in event_rx.iter() {
        match serde_json::to_string(&event) {
            Ok(json) => info!(target: "display", "{}", json),
            Err(e) => warn!("Could not serialize event {:?}: {}", event, e),
        }
    }
}

fn read_commands(command_tx: cbc::Sender<Command>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                let quit = command == Command::Quit;
                if command_tx.send(command).is_err() || quit {
                    return;
                }
            }
            Err(e) => warn!("{}", e),
        }
    }

    // End of input
    let _ = command_tx.send(Command::Quit);
}

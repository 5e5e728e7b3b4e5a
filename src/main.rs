mod cli;

use std::io::ErrorKind;

use clap::Parser;

use smok_common::constants::{DAEMON_NAME, LOG_LEVEL};
use smok_common::logger::*;

use cli::{Args, Command};

static LOGGER: Logger = Logger::terminal("smok");
// Reads the file written by the daemon
static DAEMON_LOG: Logger = Logger::new(DAEMON_NAME, false);

#[tokio::main]
async fn main() {
    LOGGER.init(LOG_LEVEL);

    let args = Args::parse();

    if let Err(error) = args.command.handle(&DAEMON_LOG).await {
        error!("{error}");
        if error.kind() == ErrorKind::NotFound && matches!(args.command, Command::Start { .. }) {
            error!("Is {DAEMON_NAME} installed in your PATH ?");
        }
        std::process::exit(1);
    }
}

use std::io;

use clap::{Parser, Subcommand};

use smok_common::constants::{DAEMON_NAME, LOG_PATH};
use smok_common::logger::*;
use smok_common::utils::{is_daemon_running, launch_daemon, shutdown_daemon};

#[derive(Debug, Parser)]
#[command(name = "smok", about = "Controls the SMOK BLE peripheral daemon")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Subcommand, Clone)]
pub enum Command {
    Start {
        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            help = "Arguments forwarded to the daemon, e.g. -- --adapter hci1 --passkey 9876"
        )]
        daemon_args: Vec<String>,
    },
    Shutdown {
        #[arg(
            short = 'f',
            long,
            help = "If specified, forces the shutdown by killing the process instead of gracefully shutting it down"
        )]
        force: bool,
    },
    Status,
    Logs {
        #[arg(
            short = 'f',
            long,
            help = "If specified, keeps the log file open and continuously prints the latest content"
        )]
        follow: bool,
        #[arg(short = 't', long, help = "If specified, shows the last x lines")]
        tail: Option<usize>,
        #[arg(short = 'd', long, help = "If specified, purges the log file")]
        purge: bool,
    },
}

impl Command {
    pub async fn handle(&self, logger: &Logger) -> io::Result<()> {
        match self {
            Self::Start { daemon_args } => {
                if is_daemon_running()? {
                    warn!("{DAEMON_NAME} is already running");
                    return Ok(());
                }

                launch_daemon(daemon_args).await?;
                info!("{DAEMON_NAME} started, logs are written to {LOG_PATH}");
            }
            Self::Shutdown { force } => {
                if shutdown_daemon(*force)? {
                    info!("Sent shutdown signal to {DAEMON_NAME}");
                } else {
                    warn!("{DAEMON_NAME} is not running");
                }
            }
            Self::Status => {
                let state = if is_daemon_running()? {
                    "running"
                } else {
                    "stopped"
                };
                info!("{DAEMON_NAME} is {state}");
            }
            Self::Logs {
                follow,
                tail,
                purge,
            } => {
                if *purge {
                    logger.purge()?;
                } else if *follow {
                    logger.follow(*tail).await?;
                } else {
                    logger.print(*tail)?;
                }
            }
        }

        Ok(())
    }
}

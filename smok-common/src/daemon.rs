use std::io;
use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::process::Command as AsyncCommand;
use tokio::time;

use crate::constants::DAEMON_NAME;

/// Picks the pid out of a `ps -e` listing
pub fn find_daemon_pid(ps_out: &str) -> Option<&str> {
    let process = ps_out
        .lines()
        .find(|line| line.split_whitespace().last() == Some(DAEMON_NAME))?
        .trim_start();

    let offset = process.bytes().position(|c| c == b' ')?;

    Some(&process[..offset])
}

fn get_daemon_process_id() -> io::Result<Option<String>> {
    let cmd = Command::new("ps").arg("-e").output()?;
    let ps_out = String::from_utf8_lossy(&cmd.stdout);

    Ok(find_daemon_pid(&ps_out).map(str::to_owned))
}

pub fn is_daemon_running() -> io::Result<bool> {
    Ok(get_daemon_process_id()?.is_some())
}

// get running process smok-daemon
// if running process found:
// - return
//
// spawn smok-daemon with the forwarded args
// pipe stderr
// wait a sec
// get output status if process exited
// if status is not 0:
// - return err
pub async fn launch_daemon(args: &[String]) -> io::Result<()> {
    if is_daemon_running()? {
        return Ok(());
    }

    let daemon = AsyncCommand::new(DAEMON_NAME)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let out = match time::timeout(Duration::from_secs(1), daemon.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => return Ok(()),
    };

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        let stderr = stderr.trim();

        return Err(io::Error::other(format!(
            "Failed to launch {DAEMON_NAME}:\n{stderr}"
        )));
    }

    Ok(())
}

// send SIGINT to the running process for a graceful shutdown so the GATT
// application and the advertisement get unregistered,
// SIGKILL if forced
pub fn shutdown_daemon(force: bool) -> io::Result<bool> {
    let Some(pid) = get_daemon_process_id()? else {
        return Ok(false);
    };

    let signal = if force { "KILL" } else { "INT" };
    let status = Command::new("kill").args(["-s", signal, &pid]).status()?;

    if !status.success() {
        return Err(io::Error::other(format!(
            "kill -s {signal} {pid} exited with {status}"
        )));
    }

    Ok(true)
}

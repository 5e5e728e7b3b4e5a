use std::fs::{self, File};
use std::io::{self, Read, SeekFrom, Write};

use tokio::fs::File as AsyncFile;
use tokio::io::{AsyncBufReadExt as _, AsyncSeekExt as _, BufReader as AsyncBufReader};

use log::{Level, Log, Metadata, Record};

use crate::constants::LOG_PATH;

pub use log::{debug, error, info, trace, warn};

const MAX_TAIL_LINES: usize = 50;

/// Appends every record to [LOG_PATH] and, if asked, mirrors them on stdout/stderr
pub struct Logger {
    name: &'static str,
    use_stdout_stderr: bool,
    write_file: bool,
}

impl Logger {
    pub const fn new(name: &'static str, use_stdout_stderr: bool) -> Self {
        Self {
            name,
            use_stdout_stderr,
            write_file: true,
        }
    }

    /// For short lived processes that only report to the terminal
    pub const fn terminal(name: &'static str) -> Self {
        Self {
            name,
            use_stdout_stderr: true,
            write_file: false,
        }
    }

    pub const fn mirrors_terminal(&self) -> bool {
        self.use_stdout_stderr
    }

    pub fn init(&'static self, level: Level) {
        if log::set_logger(self).is_err() {
            eprintln!("Logger already initialized, ignoring");
            return;
        }
        log::set_max_level(level.to_level_filter());
    }

    /// If tail specified, prints the last x lines too before awaiting the next lines
    pub async fn follow(&self, tail: Option<usize>) -> io::Result<()> {
        println!("Waiting for log content, press CTRL+C or send SIGINT to exit");

        if tail.is_some() {
            self.print(tail)?;
        }

        let mut file = AsyncFile::open(LOG_PATH).await?;
        let mut reader = AsyncBufReader::new(file.try_clone().await?);

        file.seek(SeekFrom::End(0)).await?;

        loop {
            let mut line = String::new();

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    // Gracefully and implicitly drops file handles
                    return Ok(());
                }
                result = reader.read_line(&mut line) => {
                    match result {
                        Ok(0) => tokio::time::sleep(std::time::Duration::from_millis(200)).await,
                        Ok(_) => print!("{line}"),
                        Err(err) => return Err(err),
                    }
                }
            };
        }
    }

    pub fn print(&self, tail: Option<usize>) -> io::Result<()> {
        let mut file = match File::open(LOG_PATH) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                println!("No log file at {LOG_PATH} yet");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        if let Some(tail) = tail.filter(|v| *v <= MAX_TAIL_LINES) {
            let lines = content.lines().collect::<Vec<_>>();
            lines[lines.len().saturating_sub(tail)..]
                .iter()
                .for_each(|line| println!("{line}"));

            return Ok(());
        }

        print!("{content}");

        Ok(())
    }

    pub fn purge(&self) -> io::Result<()> {
        if !fs::exists(LOG_PATH)? {
            return Ok(());
        }

        File::options().write(true).truncate(true).open(LOG_PATH)?;

        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let content = format!("{}\n", record.args());
        let log_content = format!(
            "[{}]<{}> {}: {}",
            self.name,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            content
        );

        if self.use_stdout_stderr {
            match record.level() {
                Level::Error | Level::Warn => mirror(&mut io::stderr(), &content),
                _ => mirror(&mut io::stdout(), &content),
            }
        }

        if !self.write_file {
            return;
        }

        let written = File::options()
            .create(true)
            .append(true)
            .open(LOG_PATH)
            .and_then(|mut file| {
                file.write_all(log_content.as_bytes())?;
                file.flush()
            });

        if let Err(err) = written {
            mirror(
                &mut io::stderr(),
                &format!("Failed to write to log file at {LOG_PATH}: {err}\n"),
            );
        }
    }

    fn flush(&self) {}
}

// A closed stdout/stderr (e.g. a dropped pipe) must not take the process down
fn mirror(out: &mut impl Write, content: &str) {
    let _ = out.write_all(content.as_bytes()).and_then(|_| out.flush());
}

pub fn log_level(verbose: bool) -> Level {
    if verbose {
        Level::Debug
    } else {
        crate::constants::LOG_LEVEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn verbose_lowers_the_threshold() {
        assert_eq!(log_level(false), Level::Info);
        assert_eq!(log_level(true), Level::Debug);
        assert!(log_level(true).to_level_filter() > LevelFilter::Info);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn mirroring_to_a_closed_pipe_does_not_panic() {
        mirror(&mut ClosedPipe, "Rejected passkey attempt\n");
    }

    #[test]
    fn mirror_writes_the_whole_record() {
        let mut out = Vec::new();
        mirror(&mut out, "Temperature unit set to C\n");

        assert_eq!(out, b"Temperature unit set to C\n");
    }

    #[test]
    fn terminal_logger_does_not_write_the_file() {
        let logger = Logger::terminal("smok");

        assert!(logger.mirrors_terminal());
        assert!(!logger.write_file);
        assert!(!Logger::new("smok-daemon", false).mirrors_terminal());
    }
}

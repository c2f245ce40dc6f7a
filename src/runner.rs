// Runs Popper as a child process.
// Everything the run produces is reported as a stream of RunEvents, so that the
// caller can display progress from a different task than the one doing the work.
// Popper's stdout and stderr are separate pipes. Lines are merged in the order they
// are read, which matches the order they were printed only as far as the pipes allow.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};

use crate::clause::translate_hypothesis;
use crate::notation::Notation;
use crate::segmenter::{is_noise, looks_like_clause, segment, Segmenter};

/// How a console message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    /// Messages from popperview itself about the run.
    Info,
    /// A line printed by Popper.
    Output,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Console {
        level: ConsoleLevel,
        message: String,
    },

    /// A translated hypothesis.
    /// Partial hypotheses come from realtime mode and may still grow.
    Hypothesis { markup: Vec<String>, partial: bool },

    /// The last event of a run.
    Finished(RunStatus),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RunStatus {
    /// Popper ran and at least one hypothesis came out.
    Completed,

    /// Popper ran but printed nothing we could translate.
    NoHypothesis,

    TimedOut,

    /// The run could not be set up, or Popper could not be started.
    Failed,
}

impl RunStatus {
    pub fn verb(&self) -> &str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::NoHypothesis => "found nothing",
            RunStatus::TimedOut => "timed out",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        *self == RunStatus::Completed
    }
}

#[derive(Debug)]
pub struct RunError(pub String);

impl From<io::Error> for RunError {
    fn from(error: io::Error) -> Self {
        RunError(format!("{}", error))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RunError {}

/// Everything needed to run Popper once.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The program that runs popper.py.
    pub interpreter: String,

    /// Arguments passed to the interpreter before the script.
    pub interpreter_args: Vec<String>,

    /// Path to popper.py.
    pub popper: PathBuf,

    /// The background knowledge, bias, and examples files.
    pub bk: PathBuf,
    pub bias: PathBuf,
    pub exs: PathBuf,

    /// None means wait as long as it takes.
    pub timeout: Option<Duration>,

    /// In realtime mode, hypotheses are reported while Popper is still printing them.
    pub realtime: bool,

    pub notation: Notation,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            interpreter_args: vec!["-W".to_string(), "ignore::UserWarning".to_string()],
            popper: PathBuf::from("popper.py"),
            bk: PathBuf::from("bk.pl"),
            bias: PathBuf::from("bias.pl"),
            exs: PathBuf::from("exs.pl"),
            timeout: Some(Duration::from_secs(300)),
            realtime: false,
            notation: Notation::default(),
        }
    }
}

/// Parses a timeout like "300s" or "300".
/// Only the digits count. With no digits there is no timeout.
pub fn parse_timeout(text: &str) -> Option<Duration> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().ok().map(Duration::from_secs)
}

// Sending fails only when nobody is listening any more, which is fine.
fn report(tx: &UnboundedSender<RunEvent>, level: ConsoleLevel, message: impl Into<String>) {
    let _ = tx.send(RunEvent::Console {
        level,
        message: message.into(),
    });
}

/// Copies the input files into a fresh work directory, under the names Popper expects.
fn prepare_work_dir(config: &RunConfig) -> Result<TempDir, RunError> {
    for path in [&config.bk, &config.bias, &config.exs] {
        if !path.exists() {
            return Err(RunError(format!("File '{}' not found!", path.display())));
        }
    }
    let work_dir = tempfile::Builder::new().prefix("popper_tmp").tempdir()?;
    for (src, name) in [
        (&config.bk, "bk.pl"),
        (&config.bias, "bias.pl"),
        (&config.exs, "exs.pl"),
    ] {
        std::fs::copy(src, work_dir.path().join(name))?;
    }
    Ok(work_dir)
}

/// Decodes one line of child output. Bytes that aren't UTF-8 become U+FFFD.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

async fn next_line<R: AsyncBufRead + Unpin>(
    reader: Option<&mut R>,
    buf: &mut Vec<u8>,
) -> io::Result<usize> {
    match reader {
        Some(reader) => reader.read_until(b'\n', buf).await,
        None => Ok(0),
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn name(&self) -> &str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Merges stdout and stderr into one stream of lines, in the order they arrive.
/// A read error ends that stream with a warning.
async fn forward_output(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    line_tx: UnboundedSender<String>,
    tx: UnboundedSender<RunEvent>,
) {
    let mut out = stdout.map(BufReader::new);
    let mut err = stderr.map(BufReader::new);
    let mut out_buf = vec![];
    let mut err_buf = vec![];

    while out.is_some() || err.is_some() {
        // read_until keeps partial data in the buffer when a branch loses, so the
        // next call picks up where it left off.
        let (stream, read) = tokio::select! {
            biased;
            read = next_line(out.as_mut(), &mut out_buf), if out.is_some() => (Stream::Stdout, read),
            read = next_line(err.as_mut(), &mut err_buf), if err.is_some() => (Stream::Stderr, read),
        };
        let buf = match stream {
            Stream::Stdout => &mut out_buf,
            Stream::Stderr => &mut err_buf,
        };
        let finished = match read {
            Ok(0) => {
                if !buf.is_empty() {
                    let _ = line_tx.send(decode_line(buf));
                    buf.clear();
                }
                true
            }
            Ok(_) => {
                if line_tx.send(decode_line(buf)).is_err() {
                    return;
                }
                buf.clear();
                false
            }
            Err(e) => {
                report(
                    &tx,
                    ConsoleLevel::Warning,
                    format!("Stopped reading Popper's {}: {}", stream.name(), e),
                );
                true
            }
        };
        if finished {
            match stream {
                Stream::Stdout => out = None,
                Stream::Stderr => err = None,
            }
        }
    }
}

/// What we have seen of Popper's output so far.
struct Transcript<'a> {
    config: &'a RunConfig,
    tx: &'a UnboundedSender<RunEvent>,
    lines: Vec<String>,
    segmenter: Segmenter,
    last_partial: Option<Vec<String>>,
    hypotheses: usize,
}

impl<'a> Transcript<'a> {
    fn new(config: &'a RunConfig, tx: &'a UnboundedSender<RunEvent>) -> Self {
        Transcript {
            config,
            tx,
            lines: vec![],
            segmenter: Segmenter::new(),
            last_partial: None,
            hypotheses: 0,
        }
    }

    fn emit(&mut self, markup: Vec<String>, partial: bool) {
        self.hypotheses += 1;
        let _ = self.tx.send(RunEvent::Hypothesis { markup, partial });
    }

    fn handle_line(&mut self, line: String) {
        if is_noise(&line) {
            return;
        }
        report(self.tx, ConsoleLevel::Output, line.as_str());

        if self.config.realtime {
            let boundary = self.segmenter.push_line(&line).is_some();
            if boundary {
                self.last_partial = None;
            }
            if looks_like_clause(&line) {
                if let Some(block) = self.segmenter.current_block() {
                    let markup = translate_hypothesis(&block, self.config.notation);
                    if !markup.is_empty() && self.last_partial.as_ref() != Some(&markup) {
                        self.last_partial = Some(markup.clone());
                        self.emit(markup, true);
                    }
                }
            }
        }
        self.lines.push(line);
    }

    /// Translates the whole captured output, block by block.
    fn emit_solutions(&mut self) {
        let text = self.lines.join("\n");
        for block in segment(&text) {
            let markup = translate_hypothesis(&block, self.config.notation);
            if !markup.is_empty() {
                self.emit(markup, false);
            }
        }
    }
}

async fn run_in(config: &RunConfig, tx: &UnboundedSender<RunEvent>, work_dir: &TempDir) -> RunStatus {
    report(tx, ConsoleLevel::Info, "Running Popper...");
    let mut command = Command::new(&config.interpreter);
    command
        .args(&config.interpreter_args)
        .arg(&config.popper)
        .arg(work_dir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(?command, "spawning popper");

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            report(
                tx,
                ConsoleLevel::Error,
                format!("Could not start {}: {}", config.interpreter, e),
            );
            return RunStatus::Failed;
        }
    };

    // Popper's stderr carries as much useful output as its stdout, so both are merged.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    tokio::spawn(forward_output(
        child.stdout.take(),
        child.stderr.take(),
        line_tx,
        tx.clone(),
    ));

    let mut transcript = Transcript::new(config, tx);
    let finished = async {
        while let Some(line) = line_rx.recv().await {
            transcript.handle_line(line);
        }
        child.wait().await
    };
    let outcome = match config.timeout {
        Some(timeout) => tokio::time::timeout(timeout, finished).await,
        None => Ok(finished.await),
    };

    match outcome {
        Err(_) => {
            let _ = child.kill().await;
            let timeout = config.timeout.unwrap_or_default();
            report(
                tx,
                ConsoleLevel::Error,
                format!("Popper timed out after {:?}", timeout),
            );
            return RunStatus::TimedOut;
        }
        Ok(Err(e)) => {
            report(tx, ConsoleLevel::Error, format!("Lost track of Popper: {}", e));
            return RunStatus::Failed;
        }
        Ok(Ok(exit)) => {
            if !exit.success() {
                report(tx, ConsoleLevel::Warning, format!("Popper exited with {}", exit));
            }
        }
    }

    if !config.realtime {
        transcript.emit_solutions();
    }
    if transcript.hypotheses == 0 {
        report(tx, ConsoleLevel::Warning, "No hypothesis generated.");
        RunStatus::NoHypothesis
    } else {
        RunStatus::Completed
    }
}

/// Runs Popper to completion, reporting progress through tx.
/// This doesn't send Finished. Whoever owns the run sends it, once the run is
/// really over from their point of view.
pub async fn run(config: &RunConfig, tx: &UnboundedSender<RunEvent>) -> RunStatus {
    let status = match prepare_work_dir(config) {
        Err(e) => {
            report(tx, ConsoleLevel::Error, e.to_string());
            RunStatus::Failed
        }
        Ok(work_dir) => {
            let status = run_in(config, tx, &work_dir).await;
            let display = work_dir.path().display().to_string();
            match work_dir.close() {
                Ok(()) => report(
                    tx,
                    ConsoleLevel::Info,
                    format!("Temporary folder '{}' deleted.", display),
                ),
                Err(e) => report(
                    tx,
                    ConsoleLevel::Warning,
                    format!("Could not delete temporary folder '{}': {}", display, e),
                ),
            }
            status
        }
    };
    info!("popper run {}", status.verb());
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("300s"), Some(Duration::from_secs(300)));
        assert_eq!(parse_timeout(" 45 "), Some(Duration::from_secs(45)));
        assert_eq!(parse_timeout("1m30s"), Some(Duration::from_secs(130)));
        assert_eq!(parse_timeout(""), None);
        assert_eq!(parse_timeout("forever"), None);
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"f(A):- g(A).\n"), "f(A):- g(A).");
        assert_eq!(decode_line(b"f(a).\r\n"), "f(a).");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"caf\xe9\n"), "caf\u{FFFD}");
    }

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.interpreter_args, vec!["-W", "ignore::UserWarning"]);
        assert_eq!(config.timeout, Some(Duration::from_secs(300)));
        assert!(!config.realtime);
    }

    #[tokio::test]
    async fn test_missing_input_fails() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = RunConfig {
            bk: PathBuf::from("/nonexistent/bk.pl"),
            ..RunConfig::default()
        };
        let status = run(&config, &tx).await;
        assert_eq!(status, RunStatus::Failed);

        match rx.recv().await {
            Some(RunEvent::Console { level, message }) => {
                assert_eq!(level, ConsoleLevel::Error);
                assert!(message.contains("/nonexistent/bk.pl"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}

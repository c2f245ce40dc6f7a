use std::time::Duration;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::runner::{ConsoleLevel, RunConfig, RunEvent};

/// A stand-in for popper.py.
/// The script is run by sh with the work directory as its only argument.
/// The input files are created next to it.
pub fn fake_popper(dir: &TempDir, script: &str) -> RunConfig {
    dir.child("inputs/bk.pl").write_str("num(1).\n").unwrap();
    dir.child("inputs/bias.pl").write_str("head_pred(f,1).\n").unwrap();
    dir.child("inputs/exs.pl").write_str("pos(f(1)).\n").unwrap();
    let popper = dir.child("popper.sh");
    popper.write_str(script).unwrap();

    let inputs = dir.path().join("inputs");
    RunConfig {
        interpreter: "sh".to_string(),
        interpreter_args: vec![],
        popper: popper.path().to_path_buf(),
        bk: inputs.join("bk.pl"),
        bias: inputs.join("bias.pl"),
        exs: inputs.join("exs.pl"),
        timeout: Some(Duration::from_secs(20)),
        ..RunConfig::default()
    }
}

/// Reads events until the sender goes away.
pub async fn collect(mut rx: UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = vec![];
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// The markup of every hypothesis event, with its partial flag.
pub fn hypotheses(events: &[RunEvent]) -> Vec<(Vec<String>, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            RunEvent::Hypothesis { markup, partial } => Some((markup.clone(), *partial)),
            _ => None,
        })
        .collect()
}

/// Console messages at a given level.
pub fn console(events: &[RunEvent], wanted: ConsoleLevel) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            RunEvent::Console { level, message } if *level == wanted => Some(message.clone()),
            _ => None,
        })
        .collect()
}

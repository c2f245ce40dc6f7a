use assert_fs::TempDir;
use indoc::indoc;

use super::common::fake_popper;
use crate::history::HistoryStore;
use crate::render::SvgSink;
use crate::runner::{RunEvent, RunStatus};
use crate::session::{Session, SessionError};

/// Feeds every event of a run to the session, until Finished.
async fn drive(
    session: &mut Session<SvgSink>,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<RunEvent>,
) -> (RunStatus, usize) {
    let mut images = 0;
    while let Some(event) = rx.recv().await {
        if session.handle_event(&event).is_some() {
            images += 1;
        }
        if let RunEvent::Finished(status) = event {
            return (status, images);
        }
    }
    panic!("run ended without a Finished event");
}

#[tokio::test]
async fn test_session_records_history() {
    let dir = TempDir::new().unwrap();
    let data_dir = TempDir::new().unwrap();
    let config = fake_popper(
        &dir,
        indoc! {r#"
            echo "SOLUTION"
            echo "f(A):- g(A)."
            echo "SOLUTION"
            echo "f(A):- g(A)."
        "#},
    );

    let mut session = Session::open(data_dir.path(), SvgSink);
    let rx = session.start(config).unwrap();
    let (status, images) = drive(&mut session, rx).await;

    assert_eq!(status, RunStatus::Completed);
    assert!(!session.is_running());
    assert_eq!(images, 2);

    // Two identical hypotheses share one cached image, but both go into the history.
    assert_eq!(session.cache().len(), 1);
    assert_eq!(session.history().len(), 2);
    let stored = HistoryStore::load_from_dir(data_dir.path());
    assert_eq!(stored.entries(), session.history().entries());
    assert_eq!(stored.entries()[0].hypotheses, vec!["∀ A (f(A) ⇐ g(A))"]);

    session.clear_history().unwrap();
    assert!(HistoryStore::load_from_dir(data_dir.path()).is_empty());
}

#[tokio::test]
async fn test_realtime_hypotheses_stay_out_of_history() {
    let dir = TempDir::new().unwrap();
    let data_dir = TempDir::new().unwrap();
    let mut config = fake_popper(&dir, "echo 'f(A):- g(A).'\necho 'f(A):- h(A).'\n");
    config.realtime = true;

    let mut session = Session::open(data_dir.path(), SvgSink);
    let rx = session.start(config).unwrap();
    let (status, images) = drive(&mut session, rx).await;

    assert_eq!(status, RunStatus::Completed);
    assert_eq!(images, 2);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_one_run_at_a_time() {
    let dir = TempDir::new().unwrap();
    let data_dir = TempDir::new().unwrap();
    let config = fake_popper(&dir, "sleep 1\necho 'f(a).'\n");

    let mut session = Session::open(data_dir.path(), SvgSink);
    let rx = session.start(config.clone()).unwrap();
    assert!(session.is_running());
    assert_eq!(
        session.start(config.clone()).err(),
        Some(SessionError::AlreadyRunning)
    );

    let (status, _) = drive(&mut session, rx).await;
    assert_eq!(status, RunStatus::Completed);
    assert!(!session.is_running());

    // Once the first run has finished, another may start.
    let rx = session.start(config).unwrap();
    let (status, _) = drive(&mut session, rx).await;
    assert_eq!(status, RunStatus::Completed);
    assert_eq!(session.history().len(), 2);
}

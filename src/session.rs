use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::warn;

use crate::history::HistoryStore;
use crate::render::{RenderSink, RenderedImage};
use crate::render_cache::RenderCache;
use crate::runner::{self, RunConfig, RunEvent};

pub const DEFAULT_FONT_SIZE: u32 = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Only one Popper run may be in flight at a time.
    AlreadyRunning,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionError::AlreadyRunning => write!(f, "Popper is already running"),
        }
    }
}

impl std::error::Error for SessionError {}

// Clears the running flag when the run's task ends, however it ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The Session owns all the state that outlives a single run:
/// the running flag, the render cache, and the history.
///
/// Runs happen on a background task. Their events come back over a channel,
/// and the single consumer of that channel feeds them to handle_event.
/// Only handle_event touches the history, so it never needs a lock.
pub struct Session<S: RenderSink> {
    running: Arc<AtomicBool>,
    cache: RenderCache<S>,
    history: HistoryStore,
    pub font_size: u32,
}

impl<S: RenderSink> Session<S> {
    pub fn new(history: HistoryStore, sink: S) -> Self {
        Session {
            running: Arc::new(AtomicBool::new(false)),
            cache: RenderCache::new(sink),
            history,
            font_size: DEFAULT_FONT_SIZE,
        }
    }

    /// A session keeping its history in the given data directory.
    pub fn open(data_dir: &Path, sink: S) -> Self {
        Self::new(HistoryStore::load_from_dir(data_dir), sink)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts a Popper run on a background task.
    /// Must be called from within a tokio runtime.
    /// The receiver yields every event of the run, ending with Finished.
    pub fn start(&self, config: RunConfig) -> Result<UnboundedReceiver<RunEvent>, SessionError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("ignoring run request while another run is active");
            return Err(SessionError::AlreadyRunning);
        }
        let guard = RunGuard(self.running.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let status = runner::run(&config, &tx).await;

            // Release the flag first, so that a consumer reacting to Finished can start again.
            drop(guard);
            let _ = tx.send(RunEvent::Finished(status));
        });
        Ok(rx)
    }

    /// Processes one event from a run.
    /// Returns the rendered image when the event carried a hypothesis.
    /// Render and history failures are logged, never fatal.
    pub fn handle_event(&mut self, event: &RunEvent) -> Option<Arc<RenderedImage>> {
        let RunEvent::Hypothesis { markup, partial } = event else {
            return None;
        };

        let image = match self.cache.render(markup, self.font_size) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("could not display hypothesis: {}", e);
                None
            }
        };

        // Partial hypotheses are still changing, so only finished ones are recorded.
        if !partial {
            self.history.push(markup.clone());
            if let Err(e) = self.history.save() {
                warn!(
                    "could not save history to {}: {}",
                    self.history.path().display(),
                    e
                );
            }
        }
        image
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn clear_history(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.history.clear()
    }

    pub fn cache(&self) -> &RenderCache<S> {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

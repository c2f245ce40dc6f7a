// Splits Popper's console output into hypothesis blocks.
// Popper announces each new best program with a marker line, then prints the
// clauses of that program. A block is everything clause-like between markers.

use crate::clause::IMPLICATION;

/// Lines containing any of these start a new block.
pub const BOUNDARY_MARKERS: &[&str] = &["SOLUTION", "New best hypothesis", "Best program"];

/// Lines containing any of these are interpreter chatter, never worth showing.
const NOISE_MARKERS: &[&str] = &["pkg_resources", "Clauses of", "discontiguous"];

pub fn is_boundary(line: &str) -> bool {
    BOUNDARY_MARKERS.iter().any(|m| line.contains(m))
}

/// A cheap heuristic for whether a line might hold a clause.
pub fn looks_like_clause(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && (line.contains(IMPLICATION) || line.contains('.'))
}

pub fn is_noise(line: &str) -> bool {
    NOISE_MARKERS.iter().any(|m| line.contains(m))
}

/// Incremental segmentation state.
/// Feed it lines as they arrive; it hands back each block once the next marker closes it.
#[derive(Debug, Default)]
pub struct Segmenter {
    current: Vec<String>,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line of output.
    /// Returns the finished block if this line was a marker that closed one.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if is_boundary(line) {
            return self.flush();
        }
        if looks_like_clause(line) {
            self.current.push(line.trim().to_string());
        }
        None
    }

    /// The block being accumulated, if it has any lines yet.
    pub fn current_block(&self) -> Option<String> {
        if self.current.is_empty() {
            None
        } else {
            Some(self.current.join("\n"))
        }
    }

    /// Ends the stream, returning whatever block was in progress.
    pub fn finish(mut self) -> Option<String> {
        self.flush()
    }

    fn flush(&mut self) -> Option<String> {
        let block = self.current_block();
        self.current.clear();
        block
    }
}

/// Segments a complete captured output buffer.
pub fn segment(text: &str) -> Vec<String> {
    let mut segmenter = Segmenter::new();
    let mut blocks = vec![];
    for line in text.lines() {
        if let Some(block) = segmenter.push_line(line) {
            blocks.push(block);
        }
    }
    blocks.extend(segmenter.finish());
    blocks
}

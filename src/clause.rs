use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::literal::Literal;
use crate::notation::Notation;

/// The token separating a clause head from its body.
pub const IMPLICATION: &str = ":-";

/// Popper interleaves its scoring statistics with the clauses it prints.
/// Lines starting with these are never logic.
const METADATA_PREFIXES: &[&str] = &["tp:", "Precision", "Recall", "Size", "FN:", "FP:", "TN:"];

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}\s+").unwrap());

// Identifiers starting with an uppercase letter, including subscripted forms
// like "V₁₂" and "V_{12}". The subscript group is tried before the plain
// characters so that "V_{12}" isn't cut short at the underscore.
static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z](?:_\{[0-9]+\}|[A-Za-z0-9_₀-₉])*").unwrap());

/// A clause as Popper prints it: a head, and a body that is empty for facts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    pub head: Literal,
    pub body: Vec<Literal>,
}

/// Trims a raw output line down to clause text.
/// Returns None for blank lines and for statistics lines.
fn clause_text(raw: &str) -> Option<&str> {
    let line = raw.trim();
    let line = line.strip_suffix('.').unwrap_or(line);
    let line = match TIMESTAMP.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() || METADATA_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return None;
    }
    Some(line)
}

/// Splits a clause body into literals, on the commas outside any parentheses.
/// Unbalanced closing parentheses are ignored rather than rejected.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

impl Clause {
    /// Parses one line of Popper output.
    /// Returns None if the line doesn't hold a clause.
    pub fn parse_line(raw: &str, notation: Notation) -> Option<Clause> {
        let line = clause_text(raw)?;
        let clause = match line.split_once(IMPLICATION) {
            Some((head, body)) => Clause {
                head: Literal::decompose(head, notation),
                body: split_top_level(body)
                    .into_iter()
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(|b| Literal::parse(b, notation))
                    .collect(),
            },
            None => Clause {
                head: Literal::decompose(line, notation),
                body: vec![],
            },
        };
        Some(clause)
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// The mathematical rendering of the clause.
    /// A rule becomes a universally quantified reverse implication.
    pub fn to_markup(&self, notation: Notation) -> String {
        let head = self.head.application(true);
        if self.is_fact() {
            return head;
        }

        let body: Vec<String> = self.body.iter().map(|lit| lit.translate(notation)).collect();

        let mut vars: Vec<String> = vec![];
        let sources = self.head.args.iter().chain(body.iter());
        for source in sources {
            for m in VARIABLE.find_iter(source) {
                if !vars.iter().any(|v| v == m.as_str()) {
                    vars.push(m.as_str().to_string());
                }
            }
        }

        let conjunction = body.join(&format!(" {} ", notation.and()));
        let implication = format!("({} {} {})", head, notation.implied_by(), conjunction);
        if vars.is_empty() {
            implication
        } else {
            format!("{} {}", notation.forall(&vars), implication)
        }
    }
}

/// Translates one hypothesis block, one markup string per clause line.
/// Lines that hold no clause are skipped.
pub fn translate_hypothesis(block: &str, notation: Notation) -> Vec<String> {
    let mut answer = vec![];
    for line in block.lines() {
        match Clause::parse_line(line, notation) {
            Some(clause) => answer.push(clause.to_markup(notation)),
            None => trace!(line = %line, "skipping non-clause line"),
        }
    }
    answer
}

use std::sync::LazyLock;

use regex::Regex;

use crate::notation::Notation;
use crate::relation;
use crate::term::display_var;

/// The prefix Prolog uses for negation as failure.
pub const NEGATION_PREFIX: &str = "\\+";

static APPLICATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_]+)\((.*)\)").unwrap());

/// A single predicate application, possibly negated.
/// Arguments are kept as display-ready strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Literal {
    pub negated: bool,
    pub name: String,
    pub args: Vec<String>,
}

impl Literal {
    /// Splits "name(a, b)" into its name and arguments.
    ///
    /// This never fails. Text that doesn't look like an application is kept whole,
    /// as a zero-arity atom. The argument split is a flat split on commas, so an
    /// argument that itself contains a comma inside parentheses gets split apart.
    pub fn decompose(text: &str, notation: Notation) -> Literal {
        let text = text.trim();
        let atom = || Literal {
            negated: false,
            name: text.to_string(),
            args: vec![],
        };
        if !text.contains('(') {
            return atom();
        }
        let Some(captures) = APPLICATION.captures(text) else {
            return atom();
        };
        let args = captures[2]
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| display_var(a, notation))
            .collect();
        Literal {
            negated: false,
            name: captures[1].to_string(),
            args,
        }
    }

    /// Like decompose, but first detects a leading negation.
    pub fn parse(text: &str, notation: Notation) -> Literal {
        let text = text.trim();
        match text.strip_prefix(NEGATION_PREFIX) {
            Some(rest) => Literal {
                negated: true,
                ..Literal::decompose(rest, notation)
            },
            None => Literal::decompose(text, notation),
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Generic predicate notation, "name(a, b)".
    /// With `parens_when_empty` set, a zero-arity application renders as "name()".
    pub fn application(&self, parens_when_empty: bool) -> String {
        if self.args.is_empty() && !parens_when_empty {
            self.name.clone()
        } else {
            format!("{}({})", self.name, self.args.join(", "))
        }
    }

    /// The mathematical rendering of this literal.
    /// Known relations get their infix form, everything else is a plain application.
    pub fn translate(&self, notation: Notation) -> String {
        let expr = match relation::lookup(&self.name, self.arity()) {
            Some(rel) => (rel.rewrite)(&self.args, notation),
            None => self.application(false),
        };
        if self.negated {
            notation.not(&expr)
        } else {
            expr
        }
    }
}

/// Translates a single body literal from its source text.
pub fn translate_literal(text: &str, notation: Notation) -> String {
    Literal::parse(text, notation).translate(notation)
}

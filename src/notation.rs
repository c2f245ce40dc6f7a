use std::fmt;

/// The dialect that translated clauses are written in.
///
/// Unicode output is readable in a terminal and is what the SVG sink typesets.
/// LaTeX output is what a TeX-based renderer expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Notation {
    #[default]
    Unicode,
    Latex,
}

impl Notation {
    /// The universal quantifier, followed by the variable list.
    pub fn forall(&self, vars: &[String]) -> String {
        match self {
            Notation::Unicode => format!("∀ {}", vars.join(", ")),
            Notation::Latex => format!("\\forall {}\\", vars.join(", ")),
        }
    }

    /// The reverse implication between head and body.
    pub fn implied_by(&self) -> &'static str {
        match self {
            Notation::Unicode => "⇐",
            Notation::Latex => "\\Leftarrow",
        }
    }

    pub fn and(&self) -> &'static str {
        match self {
            Notation::Unicode => "∧",
            Notation::Latex => "\\land",
        }
    }

    pub fn times(&self) -> &'static str {
        match self {
            Notation::Unicode => "×",
            Notation::Latex => "\\times",
        }
    }

    pub fn neq(&self) -> &'static str {
        match self {
            Notation::Unicode => "≠",
            Notation::Latex => "\\neq",
        }
    }

    pub fn modulo(&self) -> &'static str {
        match self {
            Notation::Unicode => "mod",
            Notation::Latex => "\\mod",
        }
    }

    /// Wraps an expression in a logical negation.
    pub fn not(&self, expr: &str) -> String {
        match self {
            Notation::Unicode => format!("¬({})", expr),
            Notation::Latex => format!("\\lnot({})", expr),
        }
    }

    /// Attaches a subscript made of ASCII digits to a base symbol.
    pub fn subscript(&self, base: &str, digits: &str) -> String {
        match self {
            Notation::Unicode => {
                let mut answer = base.to_string();
                for c in digits.chars() {
                    answer.push(subscript_digit(c));
                }
                answer
            }
            Notation::Latex => format!("{}_{{{}}}", base, digits),
        }
    }
}

fn subscript_digit(c: char) -> char {
    match c.to_digit(10) {
        Some(d) => char::from_u32('₀' as u32 + d).unwrap_or(c),
        None => c,
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Notation::Unicode => write!(f, "unicode"),
            Notation::Latex => write!(f, "latex"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_subscript() {
        assert_eq!(Notation::Unicode.subscript("V", "1"), "V₁");
        assert_eq!(Notation::Unicode.subscript("V", "209"), "V₂₀₉");
    }

    #[test]
    fn test_latex_subscript() {
        assert_eq!(Notation::Latex.subscript("V", "12"), "V_{12}");
    }

    #[test]
    fn test_negation_wrappers() {
        assert_eq!(Notation::Unicode.not("X > Y"), "¬(X > Y)");
        assert_eq!(Notation::Latex.not("X > Y"), "\\lnot(X > Y)");
    }

    #[test]
    fn test_forall() {
        let vars = vec!["X".to_string(), "Y".to_string()];
        assert_eq!(Notation::Unicode.forall(&vars), "∀ X, Y");
        assert_eq!(Notation::Latex.forall(&vars), "\\forall X, Y\\");
    }
}

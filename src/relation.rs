// The relations that Popper's arithmetic background knowledge commonly uses.
// Each one has a dedicated infix rendering. Anything not listed here is
// rendered as a plain predicate application.

use crate::notation::Notation;

/// A rewrite for one (name, arity) pair.
/// The rewrite function is only ever called with exactly `arity` arguments.
pub struct Relation {
    pub name: &'static str,
    pub arity: usize,
    pub rewrite: fn(&[String], Notation) -> String,
}

pub static RELATIONS: &[Relation] = &[
    Relation {
        name: "add",
        arity: 3,
        rewrite: |a, _| format!("{} = {} + {}", a[2], a[0], a[1]),
    },
    Relation {
        name: "sub",
        arity: 3,
        rewrite: |a, _| format!("{} = {} - {}", a[2], a[0], a[1]),
    },
    Relation {
        name: "mult",
        arity: 3,
        rewrite: |a, n| format!("{} = {} {} {}", a[2], a[0], n.times(), a[1]),
    },
    Relation {
        name: "succ",
        arity: 2,
        rewrite: |a, _| format!("{} = {} + 1", a[1], a[0]),
    },
    Relation {
        name: "divisible",
        arity: 2,
        rewrite: |a, n| format!("{} {} {} = 0", a[0], n.modulo(), a[1]),
    },
    Relation {
        name: "greater_than",
        arity: 2,
        rewrite: |a, _| format!("{} > {}", a[0], a[1]),
    },
    Relation {
        name: "less_than",
        arity: 2,
        rewrite: |a, _| format!("{} < {}", a[0], a[1]),
    },
    Relation {
        name: "eq",
        arity: 2,
        rewrite: |a, _| format!("{} = {}", a[0], a[1]),
    },
    Relation {
        name: "neq",
        arity: 2,
        rewrite: |a, n| format!("{} {} {}", a[0], n.neq(), a[1]),
    },
];

/// Finds the rewrite for a predicate name applied to a given number of arguments.
pub fn lookup(name: &str, arity: usize) -> Option<&'static Relation> {
    RELATIONS
        .iter()
        .find(|r| r.arity == arity && r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_table_has_no_duplicate_keys() {
        for (i, a) in RELATIONS.iter().enumerate() {
            for b in &RELATIONS[i + 1..] {
                assert!(a.name != b.name || a.arity != b.arity, "duplicate {}", a.name);
            }
        }
    }

    #[test]
    fn test_lookup_requires_matching_arity() {
        assert!(lookup("add", 3).is_some());
        assert!(lookup("add", 2).is_none());
        assert!(lookup("succ", 3).is_none());
        assert!(lookup("plus", 3).is_none());
    }

    #[test]
    fn test_rewrites() {
        let xyz = args(&["X", "Y", "Z"]);
        let ab = args(&["A", "B"]);
        let n = Notation::Unicode;
        assert_eq!((lookup("add", 3).unwrap().rewrite)(&xyz, n), "Z = X + Y");
        assert_eq!((lookup("sub", 3).unwrap().rewrite)(&xyz, n), "Z = X - Y");
        assert_eq!((lookup("mult", 3).unwrap().rewrite)(&xyz, n), "Z = X × Y");
        assert_eq!((lookup("succ", 2).unwrap().rewrite)(&ab, n), "B = A + 1");
        assert_eq!((lookup("divisible", 2).unwrap().rewrite)(&ab, n), "A mod B = 0");
        assert_eq!((lookup("greater_than", 2).unwrap().rewrite)(&ab, n), "A > B");
        assert_eq!((lookup("less_than", 2).unwrap().rewrite)(&ab, n), "A < B");
        assert_eq!((lookup("eq", 2).unwrap().rewrite)(&ab, n), "A = B");
        assert_eq!((lookup("neq", 2).unwrap().rewrite)(&ab, n), "A ≠ B");
    }

    #[test]
    fn test_latex_rewrites() {
        let n = Notation::Latex;
        let xyz = args(&["X", "Y", "Z"]);
        let ab = args(&["A", "B"]);
        assert_eq!((lookup("mult", 3).unwrap().rewrite)(&xyz, n), "Z = X \\times Y");
        assert_eq!((lookup("divisible", 2).unwrap().rewrite)(&ab, n), "A \\mod B = 0");
        assert_eq!((lookup("neq", 2).unwrap().rewrite)(&ab, n), "A \\neq B");
    }
}

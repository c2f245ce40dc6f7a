use crate::notation::Notation;

/// Returns the digit suffix if the token is an auto-generated variable name,
/// like "V3" or "v12".
fn generated_suffix(token: &str) -> Option<&str> {
    let rest = token
        .strip_prefix('v')
        .or_else(|| token.strip_prefix('V'))?;
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        Some(rest)
    } else {
        None
    }
}

/// The display form of a variable token.
/// Auto-generated names become a subscripted V. Everything else passes through.
pub fn display_var(token: &str, notation: Notation) -> String {
    match generated_suffix(token) {
        Some(digits) => notation.subscript("V", digits),
        None => token.to_string(),
    }
}

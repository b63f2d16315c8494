//! Decoder for Elm string literals found in comparison failures.
//!
//! `elm-test` reports `Expect.equal` operands with `Debug.toString`, so string
//! values arrive quoted and escaped (`"multi\nline"`). Only a fixed escape
//! table is decoded; the input is never evaluated.

/// Decode an Elm string literal into its runtime value.
///
/// Values that do not start with `"`, or that lack a matching closing quote,
/// are returned unchanged. Escapes other than `\n`, `\t`, `\"` and `\\` keep
/// their backslash.
pub fn unescape_literal(value: &str) -> String {
    match literal_body(value) {
        Some(body) => decode_escapes(body),
        None => value.to_string(),
    }
}

/// The text between the quotes, if `value` is a complete literal.
fn literal_body(value: &str) -> Option<&str> {
    let body = value.strip_prefix('"')?.strip_suffix('"')?;
    // The closing quote must not itself be escaped.
    let trailing_backslashes = body.chars().rev().take_while(|c| *c == '\\').count();
    if trailing_backslashes % 2 == 1 {
        return None;
    }
    Some(body)
}

fn decode_escapes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

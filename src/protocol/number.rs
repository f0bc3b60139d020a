//! Strict decimal integer parsing.
//!
//! Both the wire codec (integer frames, bulk lengths, array counts) and the
//! value model's `as_integer()` coercion use the same rules:
//!
//! - an optional leading `-`, then one or more ASCII digits
//! - no `+`, no whitespace, no trailing garbage
//! - no leading zeros (`"0"` itself is fine, `"007"` and `"-0"` are not)
//! - the result must fit in an `i64`
//!
//! `str::parse::<i64>()` is more lenient (it accepts `+5` and `007`), so the
//! shape is checked here before handing the digits over.

/// Parses `input` as a signed 64-bit decimal integer, or returns `None`.
pub fn parse_i64(input: &[u8]) -> Option<i64> {
    let digits = match input.split_first() {
        Some((b'-', rest)) => rest,
        Some(_) => input,
        None => return None,
    };

    match digits {
        [] => return None,
        [b'0'] if digits.len() == input.len() => return Some(0),
        [b'0', ..] => return None,
        _ => {}
    }

    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    // Only ASCII is left at this point, so the UTF-8 check cannot fail.
    std::str::from_utf8(input).ok()?.parse().ok()
}

// String to number conversion (locale-independent)

/// Parse a Lua numeric literal out of a string.
///
/// Accepts optional surrounding ASCII whitespace, an optional sign, and
/// either a `0x`/`0X` hexadecimal integer or a decimal literal (with
/// fraction/exponent). Anything else yields `None`.
pub fn str_to_number(s: &str) -> Option<f64> {
    let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if s.is_empty() {
        return None;
    }

    let (negative, digits) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() {
        return None;
    }

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        // Hex literals are integers; wrap like Lua does on overflow
        u64::from_str_radix(hex, 16)
            .map(|v| v as i64 as f64)
            .ok()?
    } else {
        // Reject forms like "inf"/"nan" that f64::from_str accepts but Lua
        // does not treat as numerals
        if !digits
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        {
            return None;
        }
        digits.parse::<f64>().ok()?
    };

    Some(if negative { -value } else { value })
}

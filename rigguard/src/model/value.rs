//! Parsing helpers for string-typed specification values.

/// Parse a leading decimal number with an optional unit suffix.
///
/// `"650"`, `"650W"`, `"3.5 GHz"` and `"-5"` parse; `"DDR4"`, `"2x8GB"` and
/// `""` do not.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    let (number, unit) = s.split_at(end);
    if !unit
        .trim()
        .chars()
        .all(|c| c.is_alphabetic() || c == '%' || c == '/')
    {
        return None;
    }
    number.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Lowercased unit suffix of a numeric value, `""` for a bare number.
///
/// `None` when the value is not numeric at all.
pub fn unit_suffix(raw: &str) -> Option<String> {
    parse_number(raw)?;
    let s = raw.trim();
    let start = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    Some(s[start..].trim().to_lowercase())
}

/// Whether two numeric values are stated in the same unit. A bare number
/// matches any unit.
pub fn same_unit(a: &str, b: &str) -> bool {
    match (unit_suffix(a), unit_suffix(b)) {
        (Some(x), Some(y)) => x.is_empty() || y.is_empty() || x == y,
        _ => false,
    }
}

/// First run of digits in the value, e.g. `"16GB DDR5"` -> 16.
pub fn leading_digits(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok()
}

/// Split a delimited list into trimmed, lowercased, non-empty tokens.
pub fn split_list(raw: &str, delimiters: &str) -> Vec<String> {
    raw.split(|c: char| delimiters.contains(c))
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Case-insensitive equality after trimming.
pub fn same_text(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

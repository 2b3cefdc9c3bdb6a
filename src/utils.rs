use miette::SourceSpan;

/// Parses a deck number. Accepts Fortran style `D` exponents (`1.5D-3`) and never consults
/// the process locale.
pub fn parse_float(literal: &str) -> Option<f64> {
    let literal = literal.trim();
    // Rust would also accept `inf` and `NaN`, which are words in a deck.
    if !literal.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    if let Ok(value) = literal.parse::<f64>() {
        return Some(value);
    }
    if literal.contains(['d', 'D']) {
        return literal.replace(['d', 'D'], "E").parse::<f64>().ok();
    }
    None
}

pub fn parse_int(literal: &str) -> Option<i64> {
    let literal = literal.trim();
    literal
        .strip_prefix('+')
        .unwrap_or(literal)
        .parse::<i64>()
        .ok()
}

pub fn is_numeric(literal: &str) -> bool {
    parse_float(literal).is_some()
}

/// Span of the first case-insensitive whole-word occurrence of `word` in `line`, or the whole
/// line when the word cannot be located. Used to label diagnostics.
pub fn word_span(line: &str, word: &str) -> SourceSpan {
    let upper_line = line.to_ascii_uppercase();
    let upper_word = word.to_ascii_uppercase();
    let mut from = 0;
    while let Some(found) = upper_line[from..].find(&upper_word) {
        let start = from + found;
        let end = start + upper_word.len();
        let bounded_left = start == 0 || upper_line[..start].ends_with(char::is_whitespace);
        let bounded_right =
            end == upper_line.len() || upper_line[end..].starts_with(char::is_whitespace);
        if bounded_left && bounded_right {
            return (start, upper_word.len()).into();
        }
        from = end;
    }
    (0, line.len()).into()
}

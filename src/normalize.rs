//! Question text -> canonical expression text.
//!
//! `normalize` is total and idempotent. It never fails: parsing, not
//! normalization, is where malformed input is detected.

/// Power operator in normalized text.
pub const POWER_OPERATOR: &str = "**";

fn superscript_digit(c: char) -> Option<char> {
    Some(match c {
        '⁰' => '0',
        '¹' => '1',
        '²' => '2',
        '³' => '3',
        '⁴' => '4',
        '⁵' => '5',
        '⁶' => '6',
        '⁷' => '7',
        '⁸' => '8',
        '⁹' => '9',
        '⁻' => '-',
        _ => return None,
    })
}

/// `x²³` -> `x^23`, `x⁻¹` -> `x^-1`.
fn expand_superscripts(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut in_run = false;
    for c in text.chars() {
        match superscript_digit(c) {
            Some(d) => {
                if !in_run {
                    out.push('^');
                    in_run = true;
                }
                out.push(d);
            }
            None => {
                in_run = false;
                out.push(c);
            }
        }
    }
    out
}

/// `2x` -> `2*x`, `x2` -> `x*2`.
fn insert_implicit_multiplication(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if let Some(p) = prev {
            let digit_letter = p.is_ascii_digit() && c.is_alphabetic();
            let letter_digit = p.is_alphabetic() && c.is_ascii_digit();
            if digit_letter || letter_digit {
                out.push('*');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn strip_leading_solve(text: &str) -> Option<&str> {
    let head = text.get(..5)?;
    if !head.eq_ignore_ascii_case("solve") {
        return None;
    }
    let rest = &text[5..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn strip_affixes(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let before = current;
        if let Some(rest) = strip_leading_solve(current) {
            current = rest;
        }
        current = current.trim_end_matches('?').trim();
        if current == before {
            return current.to_string();
        }
    }
}

/// Rewrites raw question text into canonical expression text.
///
/// 1. unicode superscript digits become `^` + digits,
/// 2. `^` becomes `**`,
/// 3. `*` is inserted between adjacent digits and letters (both orders),
/// 4. a leading `solve` token and trailing `?` are stripped.
///
/// # Examples
///
/// ```
/// use mathroute::normalize;
///
/// assert_eq!(normalize("Solve 2x² + 3 = 11?"), "2*x**2 + 3 = 11");
/// assert_eq!(normalize(&normalize("x^2")), normalize("x^2"));
/// ```
#[must_use]
pub fn normalize(question: &str) -> String {
    let text = expand_superscripts(question);
    let text = text.replace('^', POWER_OPERATOR);
    let text = insert_implicit_multiplication(&text);
    strip_affixes(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_becomes_power() {
        assert_eq!(normalize("x^2"), "x**2");
        assert_eq!(normalize("derivative of x^2"), "derivative of x**2");
    }

    #[test]
    fn test_superscripts() {
        assert_eq!(normalize("x²"), "x**2");
        assert_eq!(normalize("x²³ + y⁴"), "x**23 + y**4");
        assert_eq!(normalize("x⁻¹"), "x**-1");
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(normalize("2x"), "2*x");
        assert_eq!(normalize("3xy + x2"), "3*xy + x*2");
        assert_eq!(normalize("2.5t"), "2.5*t");
    }

    #[test]
    fn test_strips_solve_and_question_mark() {
        assert_eq!(normalize("solve x + 2 = 5"), "x + 2 = 5");
        assert_eq!(normalize("SOLVE   x = 1 ??"), "x = 1");
        assert_eq!(normalize("solve solve x=1"), "x=1");
        assert_eq!(normalize("solver x"), "solver x");
        assert_eq!(normalize("solve"), "");
    }

    #[test]
    fn test_total_on_odd_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("???"), "");
        assert_eq!(normalize("∫∫ ∞ ⁻"), "∫∫ ∞ **-");
    }

    #[test]
    fn test_idempotent() {
        for q in [
            "Solve 2x² + 3 = 11?",
            "derivative of 3x^2 + 2x",
            "limit of sin(x)/x as x → 0",
            "solve solve ??",
            "x⁻¹ + 2²",
            "what is 2+2?",
            "",
            "   ",
            "e^(2t)",
        ] {
            let once = normalize(q);
            assert_eq!(normalize(&once), once, "input: {q:?}");
        }
    }
}
